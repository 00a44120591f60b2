#![forbid(unsafe_code)]

//! Input controller: host input in, engine operations out.
//!
//! The controller holds no value state. It remembers only which input is
//! currently holding a spin (so a release from a different source does not
//! cancel it) and whether the field has focus (wheel input is ignored
//! otherwise).
//!
//! | input                     | engine calls                              |
//! |---------------------------|-------------------------------------------|
//! | key/pointer down (up/dn)  | one step, then start spinning that way    |
//! | key/pointer up, leave     | stop spinning                             |
//! | wheel (focused)           | one step, up for negative `delta_y`       |
//! | enter, blur               | sanitize with notification                |

use tracing::debug;
use tspin_core::{SettingValue, SpinDirection, SpinEngine};

/// Settings key that turns wheel stepping off when `false`.
pub const MOUSEWHEEL_KEY: &str = "mousewheel";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinKey {
    Up,
    Down,
    Enter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinButton {
    Up,
    Down,
}

impl SpinButton {
    #[must_use]
    pub const fn direction(self) -> SpinDirection {
        match self {
            Self::Up => SpinDirection::Up,
            Self::Down => SpinDirection::Down,
        }
    }
}

/// Host input, already decoded to the spinner's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinInput {
    KeyDown(SpinKey),
    KeyUp(SpinKey),
    PointerDown(SpinButton),
    PointerUp(SpinButton),
    PointerLeave(SpinButton),
    Wheel { delta_y: f64 },
    Focus,
    Blur,
}

/// Which input started the current spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    Key(SpinDirection),
    Pointer(SpinButton),
}

#[derive(Debug, Clone, Default)]
pub struct SpinController {
    focused: bool,
    hold: Option<Hold>,
}

impl SpinController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    #[inline]
    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.hold.is_some()
    }

    /// Apply one input. Returns `true` when the input was consumed (the host
    /// should suppress its default action).
    pub fn handle(&mut self, engine: &mut SpinEngine, input: SpinInput) -> bool {
        match input {
            SpinInput::Focus => {
                self.focused = true;
                false
            }
            SpinInput::Blur => {
                self.focused = false;
                self.release(engine);
                engine.sanitize(true);
                false
            }
            SpinInput::KeyDown(key) => match key_direction(key) {
                Some(direction) => self.press(engine, Hold::Key(direction), direction),
                None => {
                    engine.sanitize(true);
                    false
                }
            },
            SpinInput::KeyUp(key) => match key_direction(key) {
                Some(direction) => {
                    if self.hold == Some(Hold::Key(direction)) {
                        self.release(engine);
                    }
                    true
                }
                None => false,
            },
            SpinInput::PointerDown(button) => {
                self.press(engine, Hold::Pointer(button), button.direction())
            }
            SpinInput::PointerUp(button) | SpinInput::PointerLeave(button) => {
                if self.hold == Some(Hold::Pointer(button)) {
                    self.release(engine);
                }
                false
            }
            SpinInput::Wheel { delta_y } => self.wheel(engine, delta_y),
        }
    }

    fn press(&mut self, engine: &mut SpinEngine, hold: Hold, direction: SpinDirection) -> bool {
        if self.refuse_when_locked(engine) {
            return false;
        }
        // Key auto-repeat from the host arrives as more key-downs.
        if self.hold == Some(hold) && engine.spin_state().spinning {
            return true;
        }
        self.hold = Some(hold);
        match direction {
            SpinDirection::Up => {
                engine.step_up_once();
                engine.start_up_spin();
            }
            SpinDirection::Down => {
                engine.step_down_once();
                engine.start_down_spin();
            }
        }
        true
    }

    fn release(&mut self, engine: &mut SpinEngine) {
        self.hold = None;
        engine.stop_spin();
    }

    fn wheel(&mut self, engine: &mut SpinEngine, delta_y: f64) -> bool {
        let enabled = engine
            .settings()
            .extra(MOUSEWHEEL_KEY)
            .and_then(SettingValue::as_bool)
            .unwrap_or(true);
        if !self.focused || !enabled || delta_y == 0.0 || delta_y.is_nan() {
            return false;
        }
        if self.refuse_when_locked(engine) {
            return false;
        }
        if delta_y < 0.0 {
            engine.step_up_once();
        } else {
            engine.step_down_once();
        }
        true
    }

    fn refuse_when_locked(&mut self, engine: &mut SpinEngine) -> bool {
        if !engine.surface_flags().is_locked() {
            return false;
        }
        debug!("spinner locked; input ignored");
        self.release(engine);
        true
    }
}

fn key_direction(key: SpinKey) -> Option<SpinDirection> {
    match key {
        SpinKey::Up => Some(SpinDirection::Up),
        SpinKey::Down => Some(SpinDirection::Down),
        SpinKey::Enter => None,
    }
}
