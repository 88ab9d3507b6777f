//! Digimix control surface
//!
//! Turns MIDI events from a hardware controller into stateful fader, knob
//! and button controls, and drives a mixer engine from them.

pub mod callbacks;
pub mod config;
pub mod controls;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod midi;
pub mod mixer;
pub mod surface;

pub use config::{AppConfig, MidiConfig, SurfaceConfig};
pub use controls::{Behaviour, ButtonControl, ButtonMode, ButtonState, ContinuousControl, ContinuousSettings};
pub use dispatcher::{EventDispatcher, EventHandler};
pub use error::{InvalidPatternError, InvalidRangeError};
pub use event::{Event, EventType, Field, Pattern, Scalar};
pub use mixer::{bind_mixer, FaderLaw, LoggingMixer, MixerEngine};
pub use surface::{IndicatorSink, MidiMix};
