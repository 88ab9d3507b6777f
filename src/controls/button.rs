//! Physical button modelled as a per-mode state machine
//!
//! All transitions, including the hold timer of timed-toggle buttons, go
//! through the button's own lock. A timer firing that loses the race against
//! `release()` finds a state (or timer generation) it does not expect and
//! does nothing.

use super::button_state::{ButtonMode, ButtonState, Trigger};
use super::timeout::{self, PendingTimeout};
use crate::callbacks::CallbackRegistry;
use crate::dispatcher::EventHandler;
use crate::event::Event;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Hold time after which a timed-toggle press counts as momentary
pub const TIMED_TOGGLE_DELAY: Duration = Duration::from_millis(500);

/// Callback signature: `(control, resulting_state)`
pub type ButtonHandler = dyn Fn(&ButtonControl, ButtonState) + Send + Sync;
pub type ButtonCallback = Arc<ButtonHandler>;

struct ButtonInner {
    state: ButtonState,
    timeout: Option<PendingTimeout>,
    generation: u64,
}

/// Button control; always shared through `Arc` so its timer can reach it
pub struct ButtonControl {
    name: String,
    mode: ButtonMode,
    delay: Duration,
    inner: ReentrantMutex<RefCell<ButtonInner>>,
    callbacks: CallbackRegistry<ButtonHandler>,
    this: Weak<ButtonControl>,
}

impl ButtonControl {
    pub fn new(name: impl Into<String>, mode: ButtonMode) -> Arc<Self> {
        Self::with_delay(name, mode, TIMED_TOGGLE_DELAY)
    }

    /// Button with a custom timed-toggle hold delay
    pub fn with_delay(name: impl Into<String>, mode: ButtonMode, delay: Duration) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|this| Self {
            name,
            mode,
            delay,
            inner: ReentrantMutex::new(RefCell::new(ButtonInner {
                state: ButtonState::initial(mode),
                timeout: None,
                generation: 0,
            })),
            callbacks: CallbackRegistry::new(),
            this: this.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ButtonMode {
        self.mode
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> ButtonState {
        self.inner.lock().borrow().state
    }

    pub fn pressed(&self) -> bool {
        self.state().pressed()
    }

    pub fn active(&self) -> bool {
        self.state().active()
    }

    /// Whether a hold timer is currently armed
    pub fn timer_armed(&self) -> bool {
        self.inner.lock().borrow().timeout.is_some()
    }

    /// Returns `true` if the press caused a transition
    pub fn press(&self) -> bool {
        self.transition(Trigger::Press, None)
    }

    /// Returns `true` if the release caused a transition
    pub fn release(&self) -> bool {
        self.transition(Trigger::Release, None)
    }

    fn on_timeout(&self, generation: u64) {
        self.transition(Trigger::MomentaryTimeout, Some(generation));
    }

    /// Apply `trigger` and notify callbacks, all under the button lock
    ///
    /// `timer_generation` is set for timer firings: the firing only counts if
    /// its timer is still the armed one.
    fn transition(&self, trigger: Trigger, timer_generation: Option<u64>) -> bool {
        let guard = self.inner.lock();

        let next = {
            let mut inner = guard.borrow_mut();

            if let Some(generation) = timer_generation {
                let armed = inner.timeout.as_ref().map(PendingTimeout::generation);
                if armed != Some(generation) {
                    trace!("{}: stale timeout #{} ignored", self.name, generation);
                    return false;
                }
            }

            let Some(next) = inner.state.next(trigger) else {
                trace!("{}: {:?} ignored in {}", self.name, trigger, inner.state);
                return false;
            };

            inner.state = next;
            if next.arms_timer() {
                self.arm_timeout(&mut inner);
            } else if inner.timeout.take().is_some() {
                trace!("{}: timeout cancelled", self.name);
            }
            next
        };

        debug!("{}: {:?} -> {}", self.name, trigger, next);
        self.callbacks.notify(|callback| callback(self, next));
        true
    }

    fn arm_timeout(&self, inner: &mut ButtonInner) {
        inner.generation += 1;
        let generation = inner.generation;
        let this = self.this.clone();

        let armed = timeout::arm(&self.name, self.delay, generation, move || {
            if let Some(button) = this.upgrade() {
                button.on_timeout(generation);
            }
        });

        // Replacing the previous handle cancels it
        inner.timeout = match armed {
            Ok(pending) => Some(pending),
            Err(e) => {
                warn!("{}: failed to arm hold timer: {}", self.name, e);
                None
            }
        };
    }

    pub fn add_callback(&self, callback: ButtonCallback) -> bool {
        self.callbacks.add(callback)
    }

    pub fn remove_callback(&self, callback: &ButtonCallback) -> bool {
        self.callbacks.remove(callback)
    }

    pub fn clear_callbacks(&self) {
        self.callbacks.clear()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Dispatcher handler calling [`Self::press`]
    pub fn press_handler(self: &Arc<Self>) -> EventHandler {
        let button = Arc::clone(self);
        Arc::new(move |_: &Event| {
            button.press();
        })
    }

    /// Dispatcher handler calling [`Self::release`]
    pub fn release_handler(self: &Arc<Self>) -> EventHandler {
        let button = Arc::clone(self);
        Arc::new(move |_: &Event| {
            button.release();
        })
    }
}

impl Drop for ButtonControl {
    fn drop(&mut self) {
        if self.inner.get_mut().get_mut().timeout.take().is_some() {
            trace!("{}: pending timeout cancelled on drop", self.name);
        }
    }
}

impl fmt::Debug for ButtonControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ButtonControl")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("state", &state.name())
            .field("pressed", &state.pressed())
            .field("active", &state.active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::button_state::{MomentaryState, TimedToggleState};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const SHORT: Duration = Duration::from_millis(40);

    fn recorder(button: &ButtonControl) -> Arc<Mutex<Vec<ButtonState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        button.add_callback(Arc::new(move |_: &ButtonControl, state: ButtonState| {
            sink.lock().push(state);
        }));
        seen
    }

    /// press, release, press, release; returns `active` after each step
    fn toggle_cycle(button: &ButtonControl) -> Vec<bool> {
        let mut active = Vec::new();
        button.press();
        assert!(button.pressed());
        active.push(button.active());
        button.release();
        assert!(!button.pressed());
        active.push(button.active());
        button.press();
        assert!(button.pressed());
        active.push(button.active());
        button.release();
        assert!(!button.pressed());
        active.push(button.active());
        active
    }

    #[test]
    fn test_mode_momentary() {
        let b = ButtonControl::new("b", ButtonMode::Momentary);
        assert_eq!(b.state(), ButtonState::Momentary(MomentaryState::Released));
        assert!(b.press());
        assert_eq!(b.state(), ButtonState::Momentary(MomentaryState::Pressed));
        assert!(b.active());
        assert!(b.release());
        assert_eq!(b.state(), ButtonState::Momentary(MomentaryState::Released));
        assert!(!b.active());
    }

    #[test]
    fn test_mode_toggle() {
        let b = ButtonControl::new("b", ButtonMode::Toggle);
        assert!(!b.pressed());
        assert!(!b.active());
        assert_eq!(toggle_cycle(&b), vec![true, true, false, false]);
    }

    #[test]
    fn test_invalid_trigger_is_ignored() {
        let b = ButtonControl::new("b", ButtonMode::Toggle);
        let seen = recorder(&b);

        assert!(!b.release());
        assert!(b.press());
        assert!(!b.press());
        assert_eq!(seen.lock().len(), 1);
        assert!(b.active());
    }

    #[test]
    fn test_mode_timed_toggle_quick_presses_toggle() {
        let b = ButtonControl::new("b", ButtonMode::TimedToggle);
        assert!(!b.pressed());
        assert!(!b.active());

        assert_eq!(toggle_cycle(&b), vec![true, true, false, false]);
        assert!(!b.timer_armed());
    }

    #[test]
    fn test_mode_timed_toggle_long_press_is_momentary() {
        let b = ButtonControl::with_delay("b", ButtonMode::TimedToggle, SHORT);
        let seen = recorder(&b);

        b.press();
        assert!(b.timer_armed());
        assert!(b.pressed() && b.active());

        thread::sleep(SHORT * 5);
        assert_eq!(
            b.state(),
            ButtonState::TimedToggle(TimedToggleState::MomentaryPressedActive)
        );
        assert!(!b.timer_armed());

        b.release();
        assert!(!b.pressed());
        assert!(!b.active());

        assert_eq!(
            *seen.lock(),
            vec![
                ButtonState::TimedToggle(TimedToggleState::TogglePressedActive),
                ButtonState::TimedToggle(TimedToggleState::MomentaryPressedActive),
                ButtonState::TimedToggle(TimedToggleState::ReleasedInactive),
            ]
        );

        // No latch persisted: the next quick cycle toggles normally
        assert_eq!(toggle_cycle(&b), vec![true, true, false, false]);
    }

    #[test]
    fn test_mode_timed_toggle_default_delay() {
        let b = ButtonControl::new("b", ButtonMode::TimedToggle);
        assert_eq!(b.delay(), TIMED_TOGGLE_DELAY);
        let seen = recorder(&b);

        b.press();
        thread::sleep(Duration::from_millis(300));
        assert_eq!(
            b.state(),
            ButtonState::TimedToggle(TimedToggleState::TogglePressedActive)
        );

        thread::sleep(Duration::from_millis(700));
        assert_eq!(
            b.state(),
            ButtonState::TimedToggle(TimedToggleState::MomentaryPressedActive)
        );
        b.release();
        assert!(!b.pressed());
        assert!(!b.active());
        assert!(!b.timer_armed());

        assert_eq!(
            *seen.lock(),
            vec![
                ButtonState::TimedToggle(TimedToggleState::TogglePressedActive),
                ButtonState::TimedToggle(TimedToggleState::MomentaryPressedActive),
                ButtonState::TimedToggle(TimedToggleState::ReleasedInactive),
            ]
        );
    }

    #[test]
    fn test_release_cancels_timer() {
        let b = ButtonControl::with_delay("b", ButtonMode::TimedToggle, SHORT);
        let seen = recorder(&b);

        b.press();
        b.release();
        assert!(!b.timer_armed());

        thread::sleep(SHORT * 4);
        assert_eq!(
            b.state(),
            ButtonState::TimedToggle(TimedToggleState::ToggleReleasedActive)
        );
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_rearmed_timer_measures_from_latest_press() {
        let b = ButtonControl::with_delay("b", ButtonMode::TimedToggle, Duration::from_millis(200));

        // Latch on, latch off, then hold again
        b.press();
        b.release();
        b.press();
        b.release();
        b.press();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(
            b.state(),
            ButtonState::TimedToggle(TimedToggleState::TogglePressedActive)
        );

        thread::sleep(Duration::from_millis(400));
        assert_eq!(
            b.state(),
            ButtonState::TimedToggle(TimedToggleState::MomentaryPressedActive)
        );
    }

    #[test]
    fn test_drop_cancels_pending_timer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let b = ButtonControl::with_delay("b", ButtonMode::TimedToggle, SHORT);
        {
            let calls = calls.clone();
            b.add_callback(Arc::new(move |_: &ButtonControl, _: ButtonState| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        b.press();
        drop(b);
        thread::sleep(SHORT * 4);

        // Only the press notified; the timer never reached the dropped button
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_added_twice_notifies_once() {
        let b = ButtonControl::new("b", ButtonMode::Momentary);
        let calls = Arc::new(AtomicUsize::new(0));
        let callback: ButtonCallback = {
            let calls = calls.clone();
            Arc::new(move |_: &ButtonControl, _: ButtonState| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(b.add_callback(callback.clone()));
        assert!(!b.add_callback(callback.clone()));
        assert_eq!(b.callback_count(), 1);

        b.press();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_can_read_button() {
        let b = ButtonControl::new("b", ButtonMode::Toggle);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        b.add_callback(Arc::new(move |button: &ButtonControl, state: ButtonState| {
            sink.lock().push((button.active(), state.active()));
        }));

        b.press();
        b.release();
        assert_eq!(*seen.lock(), vec![(true, true), (true, true)]);
    }

    #[test]
    fn test_concurrent_release_and_timeout() {
        // Release right around the expiry: exactly one of the two wins
        for _ in 0..20 {
            let b = ButtonControl::with_delay("b", ButtonMode::TimedToggle, Duration::from_millis(5));
            let seen = recorder(&b);

            b.press();
            thread::sleep(Duration::from_millis(5));
            b.release();
            thread::sleep(Duration::from_millis(30));

            let states = seen.lock().clone();
            let last = *states.last().unwrap();
            assert!(
                last == ButtonState::TimedToggle(TimedToggleState::ToggleReleasedActive)
                    || last == ButtonState::TimedToggle(TimedToggleState::ReleasedInactive)
            );
            assert!(states.len() == 2 || states.len() == 3);
            assert!(!b.timer_armed());
        }
    }

    #[test]
    fn test_handlers_drive_button() {
        let b = ButtonControl::new("b", ButtonMode::Momentary);
        let event = Event::NoteOn {
            channel: 0,
            note: 0,
            velocity: 127,
        };

        b.press_handler()(&event);
        assert!(b.pressed());
        b.release_handler()(&event);
        assert!(!b.pressed());
    }
}
