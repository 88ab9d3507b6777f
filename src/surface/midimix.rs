//! Akai MIDImix layout
//!
//! Eight channel strips of three knobs, three buttons and a fader, a master
//! fader and three function buttons. Knobs and faders send consecutive CCs
//! strip by strip; buttons send notes in the same order.

use super::{led_handler, IndicatorSink};
use crate::config::SurfaceConfig;
use crate::controls::{
    Behaviour, ButtonControl, ButtonMode, ContinuousControl, ContinuousSettings, Rational,
};
use crate::dispatcher::EventDispatcher;
use crate::event::{Event, EventType, Pattern};
use crate::midi::MidiMessage;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub const STRIP_COUNT: usize = 8;

const KNOBS_PER_STRIP: usize = 3;
const BUTTONS_PER_STRIP: usize = 3;
/// Knobs plus fader
const CONTROLS_PER_STRIP: usize = KNOBS_PER_STRIP + 1;

const BUTTON_KINDS: [&str; BUTTONS_PER_STRIP] = ["Mute", "Solo", "Rec"];

pub const SPECIAL_BUTTON_NAMES: [&str; 3] = ["Bank_left", "Bank_right", "Solo_shift"];

/// Controls of one channel strip
#[derive(Debug, Clone)]
pub struct ChannelStrip {
    pub knobs: [Arc<ContinuousControl>; KNOBS_PER_STRIP],
    pub mute: Arc<ButtonControl>,
    pub solo: Arc<ButtonControl>,
    pub rec: Arc<ButtonControl>,
    pub fader: Arc<ContinuousControl>,
}

impl ChannelStrip {
    pub fn buttons(&self) -> [&Arc<ButtonControl>; BUTTONS_PER_STRIP] {
        [&self.mute, &self.solo, &self.rec]
    }
}

/// Assembled controller: controls wired to a dispatcher and LED feedback
pub struct MidiMix {
    dispatcher: Arc<EventDispatcher>,
    channels: Vec<ChannelStrip>,
    master: Arc<ContinuousControl>,
    special_buttons: Vec<Arc<ButtonControl>>,
    /// Indexed by note number
    buttons: Vec<Arc<ButtonControl>>,
    indicators: Arc<dyn IndicatorSink>,
    channel: u8,
    led_on_velocity: u8,
}

impl MidiMix {
    pub fn new(config: &SurfaceConfig, indicators: Arc<dyn IndicatorSink>) -> Result<Self> {
        config.validate()?;

        let dispatcher = Arc::new(EventDispatcher::new());
        let knob_settings = ContinuousSettings {
            map_min: Rational::from_integer(-1),
            map_max: Rational::from_integer(1),
            behaviour: config.knob_behaviour,
            latch_pick_up: config.latch_pick_up,
            ..ContinuousSettings::default()
        };
        let fader_settings = ContinuousSettings {
            behaviour: config.fader_behaviour,
            latch_pick_up: config.latch_pick_up,
            ..ContinuousSettings::default()
        };

        // Index i answers CC first_control + i and note i
        let mut continuous = Vec::with_capacity(STRIP_COUNT * CONTROLS_PER_STRIP + 1);
        let mut buttons = Vec::with_capacity(STRIP_COUNT * BUTTONS_PER_STRIP + SPECIAL_BUTTON_NAMES.len());
        let mut channels = Vec::with_capacity(STRIP_COUNT);

        for strip in 0..STRIP_COUNT {
            let knob = |n: usize| -> Result<Arc<ContinuousControl>> {
                let name = format!("Knob_ch{}_{}", strip, n);
                let control = ContinuousControl::new(name.clone(), knob_settings.clone())
                    .with_context(|| format!("Failed to create {}", name))?;
                Ok(Arc::new(control))
            };
            let knobs = [knob(1)?, knob(2)?, knob(3)?];

            let fader_name = format!("Fader_ch{}", strip);
            let fader = Arc::new(
                ContinuousControl::new(fader_name.clone(), fader_settings.clone())
                    .with_context(|| format!("Failed to create {}", fader_name))?,
            );

            let [mute, solo, rec] = BUTTON_KINDS.map(|kind| {
                ButtonControl::with_delay(
                    format!("Button_ch{}_{}", strip, kind),
                    config.strip_button_mode,
                    config.timed_toggle_delay(),
                )
            });

            continuous.extend(knobs.iter().cloned());
            continuous.push(Arc::clone(&fader));
            buttons.extend([Arc::clone(&mute), Arc::clone(&solo), Arc::clone(&rec)]);

            channels.push(ChannelStrip { knobs, mute, solo, rec, fader });
        }

        let master = Arc::new(
            ContinuousControl::new("Master", fader_settings).context("Failed to create Master")?,
        );
        continuous.push(Arc::clone(&master));

        let special_buttons: Vec<_> = SPECIAL_BUTTON_NAMES
            .iter()
            .map(|name| ButtonControl::new(*name, ButtonMode::Momentary))
            .collect();
        buttons.extend(special_buttons.iter().cloned());

        for (i, control) in continuous.iter().enumerate() {
            let pattern = Pattern::new()
                .event_type(EventType::ControlChange)
                .channel(config.channel)
                .control(config.first_control + i as u8);
            dispatcher
                .add_callback(pattern, control.event_handler())
                .with_context(|| format!("Failed to route {}", control.name()))?;
        }

        for (i, button) in buttons.iter().enumerate() {
            let note = i as u8;
            let press = Pattern::new()
                .event_type(EventType::NoteOn)
                .channel(config.channel)
                .note(note)
                .velocity(127);
            // Velocity is left open: note-on with velocity 0 arrives as note-off 0
            let release = Pattern::new()
                .event_type(EventType::NoteOff)
                .channel(config.channel)
                .note(note);
            dispatcher
                .add_callback(press, button.press_handler())
                .with_context(|| format!("Failed to route {}", button.name()))?;
            dispatcher
                .add_callback(release, button.release_handler())
                .with_context(|| format!("Failed to route {}", button.name()))?;

            button.add_callback(led_handler(
                Arc::clone(&indicators),
                config.channel,
                note,
                config.led_on_velocity,
            ));
        }

        info!(
            "🎛️  MIDImix assembled: {} continuous controls, {} buttons on channel {}",
            continuous.len(),
            buttons.len(),
            config.channel
        );
        debug!(
            "CC {}..={}, notes 0..={}, fader behaviour {:?}, knob behaviour {:?}",
            config.first_control,
            usize::from(config.first_control) + continuous.len() - 1,
            buttons.len() - 1,
            config.fader_behaviour,
            config.knob_behaviour
        );

        Ok(Self {
            dispatcher,
            channels,
            master,
            special_buttons,
            buttons,
            indicators,
            channel: config.channel,
            led_on_velocity: config.led_on_velocity,
        })
    }

    /// Send every button's current LED state, returns the number sent
    pub fn refresh_leds(&self) -> Result<usize> {
        for (note, button) in self.buttons.iter().enumerate() {
            let velocity = if button.active() { self.led_on_velocity } else { 0 };
            self.indicators
                .send(MidiMessage::NoteOn { channel: self.channel, note: note as u8, velocity })
                .with_context(|| format!("Failed to refresh LED of {}", button.name()))?;
        }
        Ok(self.buttons.len())
    }

    /// Route an incoming event, returns the number of handlers invoked
    pub fn dispatch(&self, event: &Event) -> usize {
        self.dispatcher.dispatch(event)
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn channels(&self) -> &[ChannelStrip] {
        &self.channels
    }

    pub fn master(&self) -> &Arc<ContinuousControl> {
        &self.master
    }

    /// Strip faders followed by the master fader
    pub fn faders(&self) -> Vec<Arc<ContinuousControl>> {
        self.channels
            .iter()
            .map(|c| Arc::clone(&c.fader))
            .chain(std::iter::once(Arc::clone(&self.master)))
            .collect()
    }

    /// `knob_matrix()[row][strip]`
    pub fn knob_matrix(&self) -> Vec<Vec<Arc<ContinuousControl>>> {
        (0..KNOBS_PER_STRIP)
            .map(|row| self.channels.iter().map(|c| Arc::clone(&c.knobs[row])).collect())
            .collect()
    }

    /// `button_matrix()[row][strip]`, rows are mute, solo and rec
    pub fn button_matrix(&self) -> Vec<Vec<Arc<ButtonControl>>> {
        (0..BUTTONS_PER_STRIP)
            .map(|row| self.channels.iter().map(|c| Arc::clone(c.buttons()[row])).collect())
            .collect()
    }

    /// Bank left, bank right and solo shift
    pub fn special_buttons(&self) -> &[Arc<ButtonControl>] {
        &self.special_buttons
    }

    /// Switch all faders, master included, to `behaviour`
    pub fn set_fader_behaviour(&self, behaviour: Behaviour) {
        for fader in self.faders() {
            fader.set_behaviour(behaviour);
        }
    }
}
