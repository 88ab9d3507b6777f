//! Stateful control objects fed by the dispatcher
//!
//! Each control owns one lock guarding its value or state and notifies its
//! callback registry while holding it.

pub mod button;
pub mod button_state;
pub mod continuous;
mod timeout;

pub use button::{ButtonCallback, ButtonControl, ButtonHandler, TIMED_TOGGLE_DELAY};
pub use button_state::{ButtonMode, ButtonState, MomentaryState, TimedToggleState, ToggleState, Trigger};
pub use continuous::{
    Behaviour, ContinuousCallback, ContinuousControl, ContinuousHandler, ContinuousSettings, Rational,
    ValueUpdate,
};
