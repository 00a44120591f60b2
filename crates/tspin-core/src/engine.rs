#![forbid(unsafe_code)]

//! The spin engine.
//!
//! [`SpinEngine`] ties the pieces together: it reads and writes one
//! [`ValueSurface`], keeps a [`SettingsStore`], publishes lifecycle events on
//! a [`NotificationBus`] and drives a [`SpinTimer`] from a [`Clock`].
//!
//! Hosts own all input wiring. A typical adapter calls
//! [`step_up_once`](SpinEngine::step_up_once) and
//! [`start_up_spin`](SpinEngine::start_up_spin) on press,
//! [`stop_spin`](SpinEngine::stop_spin) on release, and
//! [`poll`](SpinEngine::poll) from its event loop (using
//! [`next_deadline`](SpinEngine::next_deadline) to schedule a wake-up).
//!
//! # Invariants
//!
//! 1. A finite value written to the surface is within `[min, max]` and on the
//!    step grid selected by `forceStepDivisibility`.
//! 2. `spin_count == 0` whenever `spinning == false`.
//! 3. The timer is armed iff the engine is spinning.
//! 4. State is committed before any notification about it is emitted.
//!
//! # Failure Modes
//!
//! - **Incompatible surface**: [`SpinEngine::attach`] returns an error.
//! - **Malformed settings**: dropped with a warning; previous values stay.
//! - **Panicking listener/observer**: caught and logged per handler.
//! - **Use after destroy**: every operation becomes a logged no-op.

use std::fmt;

use tracing::{debug, warn};
use web_time::Instant;

use crate::bus::{EventDetail, ListenerId, Notification, NotificationBus, SpinEvent};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SpinError};
use crate::pairing::{self, PairingWarning, check_pairing};
use crate::settings::{SettingValue, Settings, SettingsPatch};
use crate::store::{ObserverId, SettingsStore};
use crate::surface::{SurfaceFlags, ValueSurface};
use crate::timer::{SpinPhase, SpinTimer};
use crate::value::{self, SpinDirection};

/// Overdue ticks handled by one poll before the interval is re-based.
pub const MAX_CATCH_UP_TICKS: u32 = 64;

/// Observable spin state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpinState {
    pub spinning: bool,
    pub direction: Option<SpinDirection>,
    /// Auto-repeat ticks since the current spin started.
    pub spin_count: u32,
}

/// A value accepted by [`SpinEngine::set_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueInput {
    Number(f64),
    Text(String),
}

impl From<f64> for ValueInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ValueInput {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ValueInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ValueInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

pub struct SpinEngine {
    surface: Box<dyn ValueSurface>,
    clock: Box<dyn Clock>,
    store: SettingsStore,
    bus: NotificationBus,
    state: SpinState,
    timer: SpinTimer,
    /// Last finite value committed to the surface.
    last_valid: Option<f64>,
    pairing_warnings: Vec<PairingWarning>,
    destroyed: bool,
}

impl fmt::Debug for SpinEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinEngine")
            .field("text", &self.surface.text())
            .field("state", &self.state)
            .field("phase", &self.timer.phase())
            .field("settings", self.store.current())
            .field("bus", &self.bus)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl SpinEngine {
    /// Attach to `surface` using wall-clock time.
    pub fn attach(surface: impl ValueSurface + 'static, settings: Settings) -> Result<Self> {
        Self::attach_with_clock(surface, settings, SystemClock)
    }

    /// Attach to `surface` with an explicit time source.
    ///
    /// Fails when the surface is not a single-line text or number input.
    /// Otherwise the bounds are aligned to the step grid, the callback pair
    /// is checked, `initValue` is written into an empty surface and the
    /// existing text is sanitized without a change notification.
    pub fn attach_with_clock(
        surface: impl ValueSurface + 'static,
        mut settings: Settings,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        let kind = surface.kind();
        if !kind.accepts_spinner() {
            return Err(SpinError::IncompatibleSurface {
                kind: kind.to_string(),
            });
        }
        settings.align_bounds_to_step();

        let mut engine = Self {
            surface: Box::new(surface),
            clock: Box::new(clock),
            store: SettingsStore::new(settings),
            bus: NotificationBus::new(),
            state: SpinState::default(),
            timer: SpinTimer::new(),
            last_valid: None,
            pairing_warnings: Vec::new(),
            destroyed: false,
        };
        engine.check_pairing();

        let init_value = engine.settings().init_value;
        if let Some(init) = init_value {
            if engine.surface.text().trim().is_empty() {
                let constrained = value::constrain(init, engine.settings());
                engine.commit(constrained, false);
            }
        }
        engine.sanitize(false);

        debug!(
            text = %engine.surface.text(),
            min = ?engine.settings().min,
            max = ?engine.settings().max,
            step = engine.settings().step,
            "spin.attach"
        );
        Ok(engine)
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl SpinEngine {
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.store.current()
    }

    #[inline]
    #[must_use]
    pub fn spin_state(&self) -> SpinState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn timer_phase(&self) -> SpinPhase {
        self.timer.phase()
    }

    /// When the host should next call [`poll`](Self::poll).
    #[inline]
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.next_deadline()
    }

    /// Warnings from the most recent callback pairing check.
    #[must_use]
    pub fn pairing_warnings(&self) -> &[PairingWarning] {
        &self.pairing_warnings
    }

    /// Raw text currently on the surface.
    #[must_use]
    pub fn text(&self) -> String {
        self.surface.text()
    }

    #[must_use]
    pub fn surface_flags(&self) -> SurfaceFlags {
        self.surface.flags()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn is_locked(&self) -> bool {
        self.surface.flags().is_locked()
    }

    fn refuse_if_destroyed(&self, op: &'static str) -> bool {
        if self.destroyed {
            debug!(op, "spin engine already destroyed; ignoring");
        }
        self.destroyed
    }
}

// ---------------------------------------------------------------------------
// Value pipeline
// ---------------------------------------------------------------------------

impl SpinEngine {
    /// Parse the surface text through `beforeCalculation`. `NaN` if empty or
    /// unparsable.
    #[must_use]
    pub fn get_value(&self) -> f64 {
        let raw = self.settings().before_calculation.apply(&self.surface.text());
        value::parse_float_prefix(&raw)
    }

    pub fn step_up_once(&mut self) {
        self.step_once(SpinDirection::Up);
    }

    pub fn step_down_once(&mut self) {
        self.step_once(SpinDirection::Down);
    }

    fn step_once(&mut self, direction: SpinDirection) {
        if self.refuse_if_destroyed("step") {
            return;
        }
        let current = self.get_value();
        let next = value::next_value(current, direction, self.settings(), self.state.spin_count);

        if self.is_locked() {
            if self.state.spinning {
                debug!("surface locked while spinning; stopping");
                self.stop_spin();
            }
            // Nothing is written, so only a value already on a bound reports.
            self.emit_bounds(current);
            return;
        }

        self.commit(next, true);
        self.emit_bounds(next);

        if self.state.spinning && self.state.direction == Some(direction) {
            let bound = match direction {
                SpinDirection::Up => self.settings().max,
                SpinDirection::Down => self.settings().min,
            };
            if bound == Some(next) {
                debug!(direction = %direction, value = next, "bound reached; stopping spin");
                self.stop_spin();
            }
        }
    }

    /// Constrain and write `input`. Text is passed through
    /// `beforeCalculation` first. Non-finite input is ignored.
    pub fn set_value(&mut self, input: impl Into<ValueInput>) {
        if self.refuse_if_destroyed("set_value") || self.is_locked() {
            return;
        }
        let parsed = match input.into() {
            ValueInput::Number(n) => n,
            ValueInput::Text(text) => {
                value::parse_float_prefix(&self.settings().before_calculation.apply(&text))
            }
        };
        if !parsed.is_finite() {
            debug!(value = parsed, "set_value ignored non-finite input");
            return;
        }
        let constrained = value::constrain(parsed, self.settings());
        self.commit(constrained, true);
    }

    /// Re-read, constrain and rewrite the current text.
    ///
    /// Empty text becomes `replacementValue` when one is set. Unparsable text
    /// falls back to `replacementValue`, then the last committed value, then
    /// empty text. With `may_notify`, a changed text is committed to the host.
    pub fn sanitize(&mut self, may_notify: bool) {
        if self.refuse_if_destroyed("sanitize") || self.is_locked() {
            return;
        }
        let raw = self.settings().before_calculation.apply(&self.surface.text());
        let trimmed = raw.trim();
        let replacement = self.settings().replacement_value;

        if trimmed.is_empty() {
            if let Some(replacement) = replacement {
                let constrained = value::constrain(replacement, self.settings());
                self.commit(constrained, may_notify);
            }
            return;
        }

        let parsed = value::parse_float_prefix(trimmed);
        let base = if parsed.is_finite() {
            Some(parsed)
        } else {
            replacement.or(self.last_valid)
        };
        match base {
            Some(base) => {
                let constrained = value::constrain(base, self.settings());
                self.commit(constrained, may_notify);
            }
            None => {
                debug!(text = trimmed, "unparsable text with no fallback; clearing");
                self.write_text(String::new(), may_notify);
            }
        }
    }

    /// Format and write a constrained value. Returns whether the text changed.
    fn commit(&mut self, value: f64, notify: bool) -> bool {
        if !value.is_finite() {
            debug!(value, "refusing to write non-finite value");
            return false;
        }
        self.last_valid = Some(value);
        let text = value::format_value(value, self.settings());
        self.write_text(text, notify)
    }

    fn write_text(&mut self, text: String, notify: bool) -> bool {
        if self.surface.text() == text {
            return false;
        }
        self.surface.set_text(&text);
        if notify {
            self.surface.value_committed();
        }
        true
    }

    fn emit_bounds(&mut self, value: f64) {
        let (min, max) = (self.settings().min, self.settings().max);
        if max == Some(value) {
            self.emit(SpinEvent::Max);
        }
        if min == Some(value) {
            self.emit(SpinEvent::Min);
        }
    }
}

// ---------------------------------------------------------------------------
// Spin timer
// ---------------------------------------------------------------------------

impl SpinEngine {
    pub fn start_up_spin(&mut self) {
        self.start_spin(SpinDirection::Up);
    }

    pub fn start_down_spin(&mut self) {
        self.start_spin(SpinDirection::Down);
    }

    fn start_spin(&mut self, direction: SpinDirection) {
        if self.refuse_if_destroyed("start_spin") {
            return;
        }
        if self.is_locked() {
            debug!(direction = %direction, "surface locked; spin refused");
            self.stop_spin();
            return;
        }

        let restart = !(self.state.spinning && self.state.direction == Some(direction));
        self.state = SpinState {
            spinning: true,
            direction: Some(direction),
            spin_count: 0,
        };
        self.timer.cancel();
        let now = self.clock.now();
        self.timer.arm(now, self.settings().step_interval_delay);

        if restart {
            debug!(direction = %direction, "spin.start");
            self.emit(SpinEvent::StartSpin);
            self.emit(SpinEvent::start_for(direction));
        }
    }

    /// Cancel auto-repeat. Emits the stop events only if a spin was active.
    pub fn stop_spin(&mut self) {
        self.timer.cancel();
        let previous = std::mem::take(&mut self.state);
        if !previous.spinning {
            return;
        }
        debug!(
            direction = ?previous.direction,
            ticks = previous.spin_count,
            "spin.stop"
        );
        if let Some(direction) = previous.direction {
            self.emit_with_direction(SpinEvent::stop_for(direction), Some(direction));
        }
        self.emit_with_direction(SpinEvent::StopSpin, previous.direction);
    }

    /// Fire due auto-repeat ticks using the engine clock.
    pub fn poll(&mut self) -> u32 {
        let now = self.clock.now();
        self.poll_at(now)
    }

    /// Fire every auto-repeat tick due at `now`. Returns how many fired.
    pub fn poll_at(&mut self, now: Instant) -> u32 {
        if self.destroyed {
            return 0;
        }
        let mut fired = 0;
        while self.state.spinning {
            let interval = self.settings().step_interval;
            if !self.timer.take_tick(now, interval) {
                break;
            }
            let Some(direction) = self.state.direction else {
                break;
            };
            self.state.spin_count = self.state.spin_count.saturating_add(1);
            self.step_once(direction);
            fired += 1;

            if fired >= MAX_CATCH_UP_TICKS && self.state.spinning {
                debug!(fired, "spin timer backlog dropped");
                self.timer.rebase(now, interval);
                break;
            }
        }
        fired
    }
}

// ---------------------------------------------------------------------------
// Settings, notifications, teardown
// ---------------------------------------------------------------------------

impl SpinEngine {
    /// Merge `patch` into the settings, notify observers, re-check the
    /// callback pair and re-sanitize the value.
    pub fn update_settings(&mut self, patch: &SettingsPatch) {
        if self.refuse_if_destroyed("update_settings") {
            return;
        }
        let outcome = self.store.update(patch);
        for err in &outcome.rejected {
            warn!(error = %err, "ignoring setting");
        }
        self.check_pairing();
        self.sanitize(true);
    }

    pub fn observe_setting(
        &mut self,
        name: &str,
        callback: impl FnMut(&SettingValue) + 'static,
    ) -> ObserverId {
        self.store.observe(name, callback)
    }

    pub fn unobserve_setting(&mut self, id: ObserverId) -> bool {
        self.store.unobserve(id)
    }

    pub fn on(
        &mut self,
        event: SpinEvent,
        handler: impl FnMut(&Notification) + 'static,
    ) -> ListenerId {
        self.bus.on(event, handler)
    }

    pub fn off(&mut self, event: SpinEvent, id: Option<ListenerId>) -> usize {
        self.bus.off(event, id)
    }

    /// Stop spinning and drop every listener and observer.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop_spin();
        self.bus.clear();
        self.store.clear_observers();
        self.destroyed = true;
        debug!("spin.destroy");
    }

    fn check_pairing(&mut self) {
        let settings = self.settings();
        self.pairing_warnings =
            check_pairing(&settings.before_calculation, &settings.after_calculation)
                .into_iter()
                .collect();
        for warning in &self.pairing_warnings {
            pairing::report(warning);
        }
    }

    fn emit(&mut self, event: SpinEvent) {
        let direction = self.state.direction;
        self.emit_with_direction(event, direction);
    }

    fn emit_with_direction(&mut self, event: SpinEvent, direction: Option<SpinDirection>) {
        let detail = EventDetail {
            value: self.get_value(),
            direction,
        };
        self.bus.emit(event, Some(detail));
    }
}
