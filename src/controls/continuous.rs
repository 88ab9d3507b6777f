//! Absolute-position control (fader or knob)
//!
//! Holds a bounded integer position and maps it onto an application range
//! with exact rational arithmetic, so mapped values can be compared for
//! equality. In pick-up mode the control ignores the hardware until the
//! physical position comes within tolerance of the stored value.

use crate::callbacks::CallbackRegistry;
use crate::dispatcher::EventHandler;
use crate::error::InvalidRangeError;
use crate::event::Event;
use num_rational::Ratio;
use num_traits::ToPrimitive;
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Exact rational number used for mapped values
pub type Rational = Ratio<i64>;

/// Default pick-up tolerance: 4% of full scale
pub const PICK_UP_RANGE: (i64, i64) = (4, 100);

/// Reconciliation between the physical position and the stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behaviour {
    /// Every update is applied immediately
    #[default]
    Jump,
    /// Updates are dropped until they land within the pick-up range
    PickUp,
}

/// Callback signature: `(control, old_value, new_value)`
pub type ContinuousHandler = dyn Fn(&ContinuousControl, i32, i32) + Send + Sync;
pub type ContinuousCallback = Arc<ContinuousHandler>;

/// Construction parameters for a [`ContinuousControl`]
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousSettings {
    pub initial_value: i32,
    pub min_value: i32,
    pub max_value: i32,
    pub map_min: Rational,
    pub map_max: Rational,
    pub behaviour: Behaviour,
    /// Fraction of full scale within which a pick-up update is accepted
    pub pick_up_range: Rational,
    /// Switch to [`Behaviour::Jump`] after the first accepted pick-up update
    pub latch_pick_up: bool,
}

impl Default for ContinuousSettings {
    fn default() -> Self {
        Self {
            initial_value: 0,
            min_value: 0,
            max_value: 127,
            map_min: Rational::from_integer(0),
            map_max: Rational::from_integer(1),
            behaviour: Behaviour::Jump,
            pick_up_range: Rational::new(PICK_UP_RANGE.0, PICK_UP_RANGE.1),
            latch_pick_up: true,
        }
    }
}

/// Result of [`ContinuousControl::set_value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueUpdate {
    /// Accepted and different from the previous value; callbacks ran
    Changed { old: i32, new: i32 },
    /// Accepted but equal to the previous value
    Unchanged,
    /// Outside the pick-up tolerance, nothing happened
    Rejected,
}

#[derive(Debug, Clone, Copy)]
struct ContinuousState {
    value: i32,
    behaviour: Behaviour,
}

/// Fader or knob with a bounded value and an affine mapping
pub struct ContinuousControl {
    name: String,
    min_value: i32,
    max_value: i32,
    map_min: Rational,
    map_max: Rational,
    pick_up_range: Rational,
    latch_pick_up: bool,
    /// Reentrant so callbacks can read the control they are notified about
    state: ReentrantMutex<Cell<ContinuousState>>,
    callbacks: CallbackRegistry<ContinuousHandler>,
}

impl ContinuousControl {
    pub fn new(name: impl Into<String>, settings: ContinuousSettings) -> Result<Self, InvalidRangeError> {
        let ContinuousSettings {
            initial_value,
            min_value,
            max_value,
            map_min,
            map_max,
            behaviour,
            pick_up_range,
            latch_pick_up,
        } = settings;

        if min_value >= max_value {
            return Err(InvalidRangeError::EmptyRange {
                min: min_value,
                max: max_value,
            });
        }
        if !(min_value..=max_value).contains(&initial_value) {
            return Err(InvalidRangeError::InitialOutOfRange {
                value: initial_value,
                min: min_value,
                max: max_value,
            });
        }
        if pick_up_range < Rational::from_integer(0) {
            return Err(InvalidRangeError::NegativePickUpRange);
        }

        Ok(Self {
            name: name.into(),
            min_value,
            max_value,
            map_min,
            map_max,
            pick_up_range,
            latch_pick_up,
            state: ReentrantMutex::new(Cell::new(ContinuousState {
                value: initial_value,
                behaviour,
            })),
            callbacks: CallbackRegistry::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> i32 {
        self.state.lock().get().value
    }

    pub fn min_value(&self) -> i32 {
        self.min_value
    }

    pub fn max_value(&self) -> i32 {
        self.max_value
    }

    pub fn behaviour(&self) -> Behaviour {
        self.state.lock().get().behaviour
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        let guard = self.state.lock();
        let mut state = guard.get();
        state.behaviour = behaviour;
        guard.set(state);
    }

    /// Apply a new physical position
    ///
    /// Values outside the bounds are clamped. Callbacks run while the
    /// control's lock is held; they may read this control but must not call
    /// `set_value` on it.
    pub fn set_value(&self, new_value: i32) -> ValueUpdate {
        let guard = self.state.lock();
        let mut state = guard.get();
        let new_value = new_value.clamp(self.min_value, self.max_value);

        if state.behaviour == Behaviour::PickUp {
            if !self.within_pick_up(state.value, new_value) {
                trace!(
                    "{}: pick-up rejected {} (stored {})",
                    self.name,
                    new_value,
                    state.value
                );
                return ValueUpdate::Rejected;
            }
            if self.latch_pick_up {
                debug!("{}: picked up at {}, switching to jump", self.name, new_value);
                state.behaviour = Behaviour::Jump;
            }
        }

        let old_value = state.value;
        state.value = new_value;
        guard.set(state);

        if old_value == new_value {
            return ValueUpdate::Unchanged;
        }

        self.callbacks
            .notify(|callback| callback(self, old_value, new_value));
        ValueUpdate::Changed {
            old: old_value,
            new: new_value,
        }
    }

    fn within_pick_up(&self, current: i32, new_value: i32) -> bool {
        let distance = Rational::from_integer((i64::from(current) - i64::from(new_value)).abs());
        let span = Rational::from_integer(self.span());
        distance <= self.pick_up_range * span
    }

    fn span(&self) -> i64 {
        i64::from(self.max_value) - i64::from(self.min_value)
    }

    /// Value mapped onto `[map_min, map_max]`, exact
    pub fn mapped_value(&self) -> Rational {
        let offset = i64::from(self.value()) - i64::from(self.min_value);
        self.map_min + Rational::new(offset, self.span()) * (self.map_max - self.map_min)
    }

    /// Lossy view of [`Self::mapped_value`] for engine parameters
    pub fn mapped_value_f64(&self) -> f64 {
        self.mapped_value().to_f64().unwrap_or(f64::NAN)
    }

    pub fn add_callback(&self, callback: ContinuousCallback) -> bool {
        self.callbacks.add(callback)
    }

    pub fn remove_callback(&self, callback: &ContinuousCallback) -> bool {
        self.callbacks.remove(callback)
    }

    pub fn clear_callbacks(&self) {
        self.callbacks.clear()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Dispatcher handler feeding `control_change` values into this control
    pub fn event_handler(self: &Arc<Self>) -> EventHandler {
        let control = Arc::clone(self);
        Arc::new(move |event: &Event| {
            if let Event::ControlChange { value, .. } = *event {
                control.set_value(i32::from(value));
            }
        })
    }
}

impl fmt::Debug for ContinuousControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().get();
        f.debug_struct("ContinuousControl")
            .field("name", &self.name)
            .field("value", &state.value)
            .field("mapped_value", &self.mapped_value())
            .field("behaviour", &state.behaviour)
            .finish()
    }
}
