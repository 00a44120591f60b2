#![forbid(unsafe_code)]

//! Core spin engine for numeric spinner inputs.
//!
//! # Role in tspin
//! `tspin-core` is the host-agnostic half of a spinner. It owns the value
//! pipeline (parse, step, align, clamp, format), the auto-repeat timer with
//! its acceleration curve, the settings store with per-key observers and the
//! lifecycle notification bus. It never draws anything and never reads input
//! devices.
//!
//! # Primary responsibilities
//! - **SpinEngine**: attach to a [`ValueSurface`] and drive it.
//! - **Settings**: typed configuration with lenient dynamic patching.
//! - **NotificationBus**: `min`/`max` and start/stop spin events.
//! - **SpinTimer**: delay-then-interval auto-repeat as an explicit state
//!   machine, polled by the host.
//!
//! # How it fits in the system
//! Renderers in `tspin-widgets` observe settings and forward button input to
//! the engine. The `tspin-demo` binary drives an engine against a
//! [`LabClock`] to script deterministic timelines.

pub mod bus;
pub mod clock;
pub mod engine;
pub mod error;
pub mod pairing;
pub mod settings;
pub mod store;
pub mod surface;
pub mod timer;
pub mod value;

pub use bus::{EventDetail, ListenerId, Notification, NotificationBus, SpinEvent};
pub use clock::{Clock, LabClock, SystemClock};
pub use engine::{MAX_CATCH_UP_TICKS, SpinEngine, SpinState, ValueInput};
pub use error::{Result, SpinError};
pub use pairing::{PAIRING_SAMPLE, PairingWarning, check_pairing};
pub use settings::{SettingValue, Settings, SettingsPatch, StepDivisibility, Transform};
pub use store::{ObserverId, SettingsStore, UpdateOutcome};
pub use surface::{MemorySurface, SurfaceFlags, SurfaceKind, ValueSurface};
pub use timer::{SpinPhase, SpinTimer};
pub use value::SpinDirection;

// Re-export the time types so hosts use the same Instant as the engine.
pub use web_time::{Duration, Instant};
