//! Control surface assembly
//!
//! Builds the control objects of a physical controller, routes its incoming
//! events through a dispatcher and mirrors button state back to its LEDs.

mod midimix;


pub use midimix::{ChannelStrip, MidiMix, SPECIAL_BUTTON_NAMES, STRIP_COUNT};

use crate::controls::{ButtonCallback, ButtonControl, ButtonState};
use crate::midi::MidiMessage;
use std::sync::Arc;
use tracing::warn;

/// Outgoing MIDI used for LED feedback
pub trait IndicatorSink: Send + Sync {
    fn send(&self, message: MidiMessage) -> anyhow::Result<()>;
}

/// Callback lighting a button LED while the button is active
///
/// Send failures are logged and dropped; feedback is best effort.
pub fn led_handler(sink: Arc<dyn IndicatorSink>, channel: u8, note: u8, on_velocity: u8) -> ButtonCallback {
    Arc::new(move |button: &ButtonControl, state: ButtonState| {
        let velocity = if state.active() { on_velocity } else { 0 };
        let message = MidiMessage::NoteOn { channel, note, velocity };
        if let Err(e) = sink.send(message) {
            warn!("LED update for '{}' failed: {}", button.name(), e);
        }
    })
}
