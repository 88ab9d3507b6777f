//! Mixer engine seam and the surface-to-mixer binding

pub mod fader_law;

pub use fader_law::{amplitude_to_db, db_to_amplitude, FaderLaw};

use crate::controls::{ButtonControl, ButtonState, ContinuousControl};
use crate::surface::MidiMix;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Audio engine driven by the surface
///
/// Calls arrive from the MIDI thread while a control lock is held, so
/// implementations must return quickly and must not call back into the
/// control that triggered them.
pub trait MixerEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Channel strip gain, `-inf` for silence
    fn set_fader_db(&self, strip: usize, db: f64);

    /// Channel strip pan in `-1.0..=1.0`
    fn set_pan(&self, strip: usize, pan: f64);

    fn set_mute(&self, strip: usize, muted: bool);

    fn set_master_db(&self, db: f64);
}

/// Mixer that logs every call, for running without an audio backend
pub struct LoggingMixer {
    name: String,
    execution_count: AtomicU64,
}

impl LoggingMixer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            execution_count: AtomicU64::new(0),
        }
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_count.load(Ordering::Relaxed)
    }

    fn log(&self, action: &str, params: std::fmt::Arguments<'_>) {
        let exec_num = self.execution_count.fetch_add(1, Ordering::Relaxed) + 1;
        info!("🎚️  {} #{} {} {}", self.name, exec_num, action, params);
    }
}

impl MixerEngine for LoggingMixer {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_fader_db(&self, strip: usize, db: f64) {
        self.log("fader", format_args!("strip={} db={}", strip, format_db(db)));
    }

    fn set_pan(&self, strip: usize, pan: f64) {
        self.log("pan", format_args!("strip={} pan={:+.3}", strip, pan));
    }

    fn set_mute(&self, strip: usize, muted: bool) {
        self.log("mute", format_args!("strip={} muted={}", strip, muted));
    }

    fn set_master_db(&self, db: f64) {
        self.log("master", format_args!("db={}", format_db(db)));
    }
}

fn format_db(db: f64) -> String {
    if db == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:.2}", db)
    }
}

/// Wire strip faders, first-row knobs, mute buttons and the master fader
/// to `engine`. Returns the number of callbacks installed.
pub fn bind_mixer(surface: &MidiMix, engine: Arc<dyn MixerEngine>, law: Arc<FaderLaw>) -> usize {
    let mut bound = 0;

    for (strip, channel) in surface.channels().iter().enumerate() {
        let fader_engine = Arc::clone(&engine);
        let fader_law = Arc::clone(&law);
        if channel.fader.add_callback(Arc::new(move |_: &ContinuousControl, _old: i32, new: i32| {
            fader_engine.set_fader_db(strip, fader_law.db(new));
        })) {
            bound += 1;
        }

        let pan_engine = Arc::clone(&engine);
        if channel.knobs[0].add_callback(Arc::new(move |knob: &ContinuousControl, _old: i32, _new: i32| {
            pan_engine.set_pan(strip, knob.mapped_value_f64());
        })) {
            bound += 1;
        }

        let mute_engine = Arc::clone(&engine);
        if channel.mute.add_callback(Arc::new(move |_: &ButtonControl, state: ButtonState| {
            mute_engine.set_mute(strip, state.active());
        })) {
            bound += 1;
        }
    }

    let master_engine = Arc::clone(&engine);
    if surface.master().add_callback(Arc::new(move |_: &ContinuousControl, _old: i32, new: i32| {
        master_engine.set_master_db(law.db(new));
    })) {
        bound += 1;
    }

    debug!("Bound {} surface callbacks to mixer '{}'", bound, engine.name());
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurfaceConfig;
    use crate::controls::Behaviour;
    use crate::event::Event;
    use crate::midi::MidiMessage;
    use crate::surface::IndicatorSink;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Fader(usize, f64),
        Pan(usize, f64),
        Mute(usize, bool),
        Master(f64),
    }

    #[derive(Default)]
    struct RecordingMixer {
        calls: Mutex<Vec<Call>>,
    }

    impl MixerEngine for RecordingMixer {
        fn name(&self) -> &str {
            "recording"
        }
        fn set_fader_db(&self, strip: usize, db: f64) {
            self.calls.lock().push(Call::Fader(strip, db));
        }
        fn set_pan(&self, strip: usize, pan: f64) {
            self.calls.lock().push(Call::Pan(strip, pan));
        }
        fn set_mute(&self, strip: usize, muted: bool) {
            self.calls.lock().push(Call::Mute(strip, muted));
        }
        fn set_master_db(&self, db: f64) {
            self.calls.lock().push(Call::Master(db));
        }
    }

    struct NullSink;

    impl IndicatorSink for NullSink {
        fn send(&self, _message: MidiMessage) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn setup() -> (MidiMix, Arc<RecordingMixer>) {
        let config = SurfaceConfig {
            fader_behaviour: Behaviour::Jump,
            ..SurfaceConfig::default()
        };
        let surface = MidiMix::new(&config, Arc::new(NullSink)).unwrap();
        let mixer = Arc::new(RecordingMixer::default());
        let bound = bind_mixer(&surface, mixer.clone(), Arc::new(FaderLaw::default()));
        assert_eq!(bound, 8 * 3 + 1);
        (surface, mixer)
    }

    fn cc(control: u8, value: u8) -> Event {
        Event::ControlChange { channel: 0, control, value }
    }

    #[test]
    fn test_fader_and_master_drive_gain() {
        let (surface, mixer) = setup();

        // Strip 2 fader is CC 15 + 2*4 + 3
        surface.dispatch(&cc(26, 127));
        surface.dispatch(&cc(47, 1));

        assert_eq!(
            *mixer.calls.lock(),
            vec![Call::Fader(2, 0.0), Call::Master(-98.35)]
        );
    }

    #[test]
    fn test_knob_drives_pan() {
        let (surface, mixer) = setup();

        // First knob of strip 1
        surface.dispatch(&cc(19, 127));
        surface.dispatch(&cc(19, 0));

        assert_eq!(*mixer.calls.lock(), vec![Call::Pan(1, 1.0), Call::Pan(1, -1.0)]);
    }

    #[test]
    fn test_mute_button_toggles() {
        let (surface, mixer) = setup();

        let press = Event::NoteOn { channel: 0, note: 3, velocity: 127 };
        let release = Event::NoteOff { channel: 0, note: 3, velocity: 0 };
        surface.dispatch(&press);
        surface.dispatch(&release);

        let calls = mixer.calls.lock().clone();
        assert_eq!(calls.first(), Some(&Call::Mute(1, true)));
        assert_eq!(calls.last(), Some(&Call::Mute(1, true)));
        assert!(surface.channels()[1].mute.active());
    }

    #[test]
    fn test_logging_mixer_counts_calls() {
        let mixer = LoggingMixer::new("console");
        mixer.set_fader_db(0, f64::NEG_INFINITY);
        mixer.set_pan(0, 0.25);
        mixer.set_mute(0, true);
        mixer.set_master_db(-6.0);
        assert_eq!(mixer.execution_count(), 4);
        assert_eq!(mixer.name(), "console");
    }
}
