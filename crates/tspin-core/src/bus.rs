#![forbid(unsafe_code)]

//! Notification bus for spin lifecycle events.
//!
//! A name-to-listeners registry with synchronous delivery.
//!
//! # Invariants
//!
//! 1. Listeners for one event run in registration order.
//! 2. A panicking listener is caught and logged; the remaining listeners
//!    still run and the bus stays usable.
//! 3. `emit` returns only after every listener has been invoked.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use ahash::AHashMap;
use tracing::error;

use crate::value::SpinDirection;

/// Lifecycle events published by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum SpinEvent {
    /// The value was clamped exactly to `min`.
    Min,
    /// The value was clamped exactly to `max`.
    Max,
    StartSpin,
    StartUpSpin,
    StartDownSpin,
    StopSpin,
    StopUpSpin,
    StopDownSpin,
}

impl SpinEvent {
    pub const ALL: [Self; 8] = [
        Self::Min,
        Self::Max,
        Self::StartSpin,
        Self::StartUpSpin,
        Self::StartDownSpin,
        Self::StopSpin,
        Self::StopUpSpin,
        Self::StopDownSpin,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::StartSpin => "startSpin",
            Self::StartUpSpin => "startUpSpin",
            Self::StartDownSpin => "startDownSpin",
            Self::StopSpin => "stopSpin",
            Self::StopUpSpin => "stopUpSpin",
            Self::StopDownSpin => "stopDownSpin",
        }
    }

    /// Look an event up by its wire name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|event| event.name().eq_ignore_ascii_case(name))
    }

    /// Direction-specific start event.
    #[must_use]
    pub const fn start_for(direction: SpinDirection) -> Self {
        match direction {
            SpinDirection::Up => Self::StartUpSpin,
            SpinDirection::Down => Self::StartDownSpin,
        }
    }

    /// Direction-specific stop event.
    #[must_use]
    pub const fn stop_for(direction: SpinDirection) -> Self {
        match direction {
            SpinDirection::Up => Self::StopUpSpin,
            SpinDirection::Down => Self::StopDownSpin,
        }
    }
}

impl fmt::Display for SpinEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine state attached to an emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventDetail {
    /// Current numeric value (`NaN` when the text is empty).
    pub value: f64,
    /// Active (or just-ended) spin direction.
    pub direction: Option<SpinDirection>,
}

/// One delivered notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Notification {
    pub event: SpinEvent,
    pub detail: Option<EventDetail>,
}

/// Handle returned by [`NotificationBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Handler = Box<dyn FnMut(&Notification)>;

struct Listener {
    id: ListenerId,
    handler: Handler,
}

/// Synchronous publish/subscribe registry keyed by [`SpinEvent`].
#[derive(Default)]
pub struct NotificationBus {
    listeners: AHashMap<SpinEvent, Vec<Listener>>,
    next_id: u64,
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<_> = SpinEvent::ALL
            .into_iter()
            .filter_map(|e| {
                let n = self.listener_count(e);
                (n > 0).then_some((e.name(), n))
            })
            .collect();
        f.debug_struct("NotificationBus")
            .field("listeners", &counts)
            .finish()
    }
}

impl NotificationBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`.
    pub fn on(
        &mut self,
        event: SpinEvent,
        handler: impl FnMut(&Notification) + 'static,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.entry(event).or_default().push(Listener {
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove one listener (`Some(id)`) or every listener (`None`) for
    /// `event`. Returns how many were removed.
    pub fn off(&mut self, event: SpinEvent, id: Option<ListenerId>) -> usize {
        let Some(list) = self.listeners.get_mut(&event) else {
            return 0;
        };
        let before = list.len();
        match id {
            Some(id) => list.retain(|l| l.id != id),
            None => list.clear(),
        }
        let removed = before - list.len();
        if list.is_empty() {
            self.listeners.remove(&event);
        }
        removed
    }

    /// Deliver `event` to its listeners. Returns how many ran to completion.
    pub fn emit(&mut self, event: SpinEvent, detail: Option<EventDetail>) -> usize {
        let Some(list) = self.listeners.get_mut(&event) else {
            return 0;
        };
        let notification = Notification { event, detail };
        let mut completed = 0;
        for listener in list.iter_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| (listener.handler)(&notification)));
            match outcome {
                Ok(()) => completed += 1,
                Err(payload) => {
                    error!(
                        event = event.name(),
                        listener = listener.id.0,
                        panic = panic_message(payload.as_ref()),
                        "spin event listener panicked"
                    );
                }
            }
        }
        completed
    }

    #[must_use]
    pub fn listener_count(&self, event: SpinEvent) -> usize {
        self.listeners.get(&event).map_or(0, Vec::len)
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Recorder = Rc<RefCell<Vec<String>>>;

    fn recorder() -> (Recorder, impl Fn(&str) -> Box<dyn FnMut(&Notification)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_for_factory = Rc::clone(&log);
        let factory = move |tag: &str| -> Box<dyn FnMut(&Notification)> {
            let log = Rc::clone(&log_for_factory);
            let tag = tag.to_owned();
            Box::new(move |n: &Notification| {
                log.borrow_mut().push(format!("{tag}:{}", n.event));
            })
        };
        (log, factory)
    }

    #[test]
    fn delivers_in_registration_order() {
        let (log, make) = recorder();
        let mut bus = NotificationBus::new();
        bus.on(SpinEvent::Max, make("a"));
        bus.on(SpinEvent::Max, make("b"));
        bus.on(SpinEvent::Min, make("c"));

        assert_eq!(bus.emit(SpinEvent::Max, None), 2);
        assert_eq!(*log.borrow(), vec!["a:max", "b:max"]);
    }

    #[test]
    fn off_removes_one_or_all() {
        let (log, make) = recorder();
        let mut bus = NotificationBus::new();
        let a = bus.on(SpinEvent::StartSpin, make("a"));
        bus.on(SpinEvent::StartSpin, make("b"));

        assert_eq!(bus.off(SpinEvent::StartSpin, Some(a)), 1);
        bus.emit(SpinEvent::StartSpin, None);
        assert_eq!(*log.borrow(), vec!["b:startSpin"]);

        assert_eq!(bus.off(SpinEvent::StartSpin, None), 1);
        assert_eq!(bus.listener_count(SpinEvent::StartSpin), 0);
        assert_eq!(bus.emit(SpinEvent::StartSpin, None), 0);
        assert_eq!(bus.off(SpinEvent::StopSpin, None), 0);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let (log, make) = recorder();
        let mut bus = NotificationBus::new();
        bus.on(SpinEvent::Min, make("first"));
        bus.on(SpinEvent::Min, |_: &Notification| panic!("listener failure"));
        bus.on(SpinEvent::Min, make("last"));

        assert_eq!(bus.emit(SpinEvent::Min, None), 2);
        assert_eq!(*log.borrow(), vec!["first:min", "last:min"]);

        // Still usable afterwards.
        assert_eq!(bus.emit(SpinEvent::Min, None), 2);
    }

    #[test]
    fn detail_is_forwarded() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let mut bus = NotificationBus::new();
        bus.on(SpinEvent::StopUpSpin, move |n: &Notification| {
            *sink.borrow_mut() = n.detail;
        });
        let detail = EventDetail {
            value: 42.0,
            direction: Some(SpinDirection::Up),
        };
        bus.emit(SpinEvent::StopUpSpin, Some(detail));
        assert_eq!(*seen.borrow(), Some(detail));
    }

    #[test]
    fn event_names_round_trip() {
        for event in SpinEvent::ALL {
            assert_eq!(SpinEvent::from_name(event.name()), Some(event));
        }
        assert_eq!(SpinEvent::from_name("STARTUPSPIN"), Some(SpinEvent::StartUpSpin));
        assert_eq!(SpinEvent::from_name("bogus"), None);
    }
}
