//! Button state tables
//!
//! One enum per mode, each with a pure transition function. `pressed` and
//! `active` are derived from the state alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Button behaviour mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonMode {
    /// Active only while held
    Momentary,
    /// Each press flips the active flag
    Toggle,
    /// Short press toggles, long press acts as momentary
    TimedToggle,
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Press,
    Release,
    /// Hold timer of a timed-toggle button expired
    MomentaryTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MomentaryState {
    Released,
    Pressed,
}

impl MomentaryState {
    fn next(self, trigger: Trigger) -> Option<Self> {
        use MomentaryState::*;
        match (self, trigger) {
            (Released, Trigger::Press) => Some(Pressed),
            (Pressed, Trigger::Release) => Some(Released),
            _ => None,
        }
    }

    fn flags(self) -> (bool, bool) {
        match self {
            MomentaryState::Released => (false, false),
            MomentaryState::Pressed => (true, true),
        }
    }

    fn name(self) -> &'static str {
        match self {
            MomentaryState::Released => "released",
            MomentaryState::Pressed => "pressed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleState {
    ReleasedInactive,
    PressedActive,
    ReleasedActive,
    PressedInactive,
}

impl ToggleState {
    fn next(self, trigger: Trigger) -> Option<Self> {
        use ToggleState::*;
        match (self, trigger) {
            (ReleasedInactive, Trigger::Press) => Some(PressedActive),
            (PressedActive, Trigger::Release) => Some(ReleasedActive),
            (ReleasedActive, Trigger::Press) => Some(PressedInactive),
            (PressedInactive, Trigger::Release) => Some(ReleasedInactive),
            _ => None,
        }
    }

    fn flags(self) -> (bool, bool) {
        match self {
            ToggleState::ReleasedInactive => (false, false),
            ToggleState::PressedActive => (true, true),
            ToggleState::ReleasedActive => (false, true),
            ToggleState::PressedInactive => (true, false),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ToggleState::ReleasedInactive => "released_inactive",
            ToggleState::PressedActive => "pressed_active",
            ToggleState::ReleasedActive => "released_active",
            ToggleState::PressedInactive => "pressed_inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimedToggleState {
    ReleasedInactive,
    /// Held, not yet long enough to count as momentary; the hold timer runs here
    TogglePressedActive,
    ToggleReleasedActive,
    TogglePressedInactive,
    MomentaryPressedActive,
}

impl TimedToggleState {
    fn next(self, trigger: Trigger) -> Option<Self> {
        use TimedToggleState::*;
        match (self, trigger) {
            (ReleasedInactive, Trigger::Press) => Some(TogglePressedActive),
            (TogglePressedActive, Trigger::Release) => Some(ToggleReleasedActive),
            (TogglePressedActive, Trigger::MomentaryTimeout) => Some(MomentaryPressedActive),
            (MomentaryPressedActive, Trigger::Release) => Some(ReleasedInactive),
            (ToggleReleasedActive, Trigger::Press) => Some(TogglePressedInactive),
            (TogglePressedInactive, Trigger::Release) => Some(ReleasedInactive),
            _ => None,
        }
    }

    fn flags(self) -> (bool, bool) {
        match self {
            TimedToggleState::ReleasedInactive => (false, false),
            TimedToggleState::TogglePressedActive => (true, true),
            TimedToggleState::ToggleReleasedActive => (false, true),
            TimedToggleState::TogglePressedInactive => (true, false),
            TimedToggleState::MomentaryPressedActive => (true, true),
        }
    }

    fn name(self) -> &'static str {
        match self {
            TimedToggleState::ReleasedInactive => "released_inactive",
            TimedToggleState::TogglePressedActive => "toggle_pressed_active",
            TimedToggleState::ToggleReleasedActive => "toggle_released_active",
            TimedToggleState::TogglePressedInactive => "toggle_pressed_inactive",
            TimedToggleState::MomentaryPressedActive => "momentary_pressed_active",
        }
    }
}

/// State of a button, tagged by mode
///
/// Transitions never leave the variant, so a button's state always belongs
/// to its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Momentary(MomentaryState),
    Toggle(ToggleState),
    TimedToggle(TimedToggleState),
}

impl ButtonState {
    pub fn initial(mode: ButtonMode) -> Self {
        match mode {
            ButtonMode::Momentary => ButtonState::Momentary(MomentaryState::Released),
            ButtonMode::Toggle => ButtonState::Toggle(ToggleState::ReleasedInactive),
            ButtonMode::TimedToggle => ButtonState::TimedToggle(TimedToggleState::ReleasedInactive),
        }
    }

    pub fn mode(&self) -> ButtonMode {
        match self {
            ButtonState::Momentary(_) => ButtonMode::Momentary,
            ButtonState::Toggle(_) => ButtonMode::Toggle,
            ButtonState::TimedToggle(_) => ButtonMode::TimedToggle,
        }
    }

    /// Destination state, or `None` if the trigger is not valid here
    pub fn next(self, trigger: Trigger) -> Option<Self> {
        match self {
            ButtonState::Momentary(s) => s.next(trigger).map(ButtonState::Momentary),
            ButtonState::Toggle(s) => s.next(trigger).map(ButtonState::Toggle),
            ButtonState::TimedToggle(s) => s.next(trigger).map(ButtonState::TimedToggle),
        }
    }

    fn flags(&self) -> (bool, bool) {
        match *self {
            ButtonState::Momentary(s) => s.flags(),
            ButtonState::Toggle(s) => s.flags(),
            ButtonState::TimedToggle(s) => s.flags(),
        }
    }

    pub fn pressed(&self) -> bool {
        self.flags().0
    }

    pub fn active(&self) -> bool {
        self.flags().1
    }

    /// Whether entering this state starts the hold timer
    pub fn arms_timer(&self) -> bool {
        matches!(
            self,
            ButtonState::TimedToggle(TimedToggleState::TogglePressedActive)
        )
    }

    pub fn name(&self) -> &'static str {
        match *self {
            ButtonState::Momentary(s) => s.name(),
            ButtonState::Toggle(s) => s.name(),
            ButtonState::TimedToggle(s) => s.name(),
        }
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
