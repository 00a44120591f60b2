#![forbid(unsafe_code)]

//! Settings store: the current snapshot plus per-key observers.
//!
//! Observers are the only way a renderer learns about configuration
//! changes. They are keyed by setting name and fire synchronously during
//! [`SettingsStore::update`], after the new snapshot is in place, for every
//! observed key whose value differs from the previous snapshot.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use ahash::AHashMap;
use tracing::{debug, error};

use crate::bus::panic_message;
use crate::error::SpinError;
use crate::settings::{SettingValue, Settings, SettingsPatch, canonical_key};

/// Handle returned by [`SettingsStore::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

type ObserverFn = Box<dyn FnMut(&SettingValue)>;

struct Observer {
    id: ObserverId,
    callback: ObserverFn,
}

/// What an update did.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    /// Keys (canonical for engine keys) whose value changed.
    pub changed: Vec<String>,
    /// Patch entries that were dropped.
    pub rejected: Vec<SpinError>,
}

pub struct SettingsStore {
    current: Settings,
    observers: AHashMap<String, Vec<Observer>>,
    next_id: u64,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut observed: Vec<_> = self.observers.keys().collect();
        observed.sort();
        f.debug_struct("SettingsStore")
            .field("current", &self.current)
            .field("observed", &observed)
            .finish()
    }
}

/// Observer registry key: canonical engine name, or the raw extra key.
fn registry_key(name: &str) -> String {
    canonical_key(name).map_or_else(|| name.to_owned(), str::to_owned)
}

impl SettingsStore {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            current: settings,
            observers: AHashMap::new(),
            next_id: 0,
        }
    }

    #[must_use]
    pub fn current(&self) -> &Settings {
        &self.current
    }

    pub fn observe(
        &mut self,
        name: &str,
        callback: impl FnMut(&SettingValue) + 'static,
    ) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers
            .entry(registry_key(name))
            .or_default()
            .push(Observer {
                id,
                callback: Box::new(callback),
            });
        id
    }

    /// Remove an observer. Returns `true` if it was registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let mut found = false;
        self.observers.retain(|_, list| {
            let before = list.len();
            list.retain(|o| o.id != id);
            found |= list.len() != before;
            !list.is_empty()
        });
        found
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    /// Merge `patch`, replace the snapshot, then notify observers of changed
    /// keys.
    pub fn update(&mut self, patch: &SettingsPatch) -> UpdateOutcome {
        let (next, rejected) = self.current.merged(patch);
        let previous = std::mem::replace(&mut self.current, next);

        let mut changed: Vec<String> = Vec::new();
        let candidates = patch
            .iter()
            .map(|(k, _)| registry_key(k))
            .chain(self.observers.keys().cloned())
            // Re-alignment can move the bounds without them being patched.
            .chain(["min".to_owned(), "max".to_owned()]);
        for key in candidates {
            if changed.contains(&key) {
                continue;
            }
            if previous.get(&key) != self.current.get(&key) {
                changed.push(key);
            }
        }
        debug!(
            changed = ?changed,
            rejected = rejected.len(),
            "settings.update"
        );

        for key in &changed {
            let Some(value) = self.current.get(key) else {
                continue;
            };
            let Some(list) = self.observers.get_mut(key) else {
                continue;
            };
            for observer in list.iter_mut() {
                let outcome = catch_unwind(AssertUnwindSafe(|| (observer.callback)(&value)));
                if let Err(payload) = outcome {
                    error!(
                        setting = key.as_str(),
                        observer = observer.id.0,
                        panic = panic_message(payload.as_ref()),
                        "setting observer panicked"
                    );
                }
            }
        }

        UpdateOutcome { changed, rejected }
    }
}
