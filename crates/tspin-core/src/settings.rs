#![forbid(unsafe_code)]

//! Spinner settings: typed defaults, dynamic patches, and coercion.
//!
//! [`Settings`] is a plain value. Updates never mutate it in place; a
//! [`SettingsPatch`] is merged over a clone and the result replaces the old
//! snapshot wholesale. Patches carry loosely-typed [`SettingValue`]s because
//! hosts feed them from attributes, JSON and scripting layers: a value that
//! cannot be coerced is reported and dropped, and the previous value stays.
//!
//! Keys the engine does not interpret are kept in [`Settings::extras`] so
//! renderers and adapters can read their own configuration back out.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use ahash::AHashMap;
use tracing::warn;
use web_time::Duration;

use crate::error::SpinError;
use crate::value::{clean, grid_ratio};

/// Canonical setting names.
pub mod keys {
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const STEP: &str = "step";
    pub const DECIMALS: &str = "decimals";
    pub const FORCE_STEP_DIVISIBILITY: &str = "forceStepDivisibility";
    pub const STEP_INTERVAL: &str = "stepInterval";
    pub const STEP_INTERVAL_DELAY: &str = "stepIntervalDelay";
    pub const BOOSTER: &str = "booster";
    pub const BOOST_AT: &str = "boostAt";
    pub const MAX_BOOSTED_STEP: &str = "maxBoostedStep";
    pub const FIRST_CLICK_VALUE_IF_EMPTY: &str = "firstClickValueIfEmpty";
    pub const REPLACEMENT_VALUE: &str = "replacementValue";
    pub const INIT_VALUE: &str = "initValue";
    pub const BEFORE_CALCULATION: &str = "beforeCalculation";
    pub const AFTER_CALCULATION: &str = "afterCalculation";

    /// Every key the engine interprets.
    pub const ENGINE_KEYS: [&str; 15] = [
        MIN,
        MAX,
        STEP,
        DECIMALS,
        FORCE_STEP_DIVISIBILITY,
        STEP_INTERVAL,
        STEP_INTERVAL_DELAY,
        BOOSTER,
        BOOST_AT,
        MAX_BOOSTED_STEP,
        FIRST_CLICK_VALUE_IF_EMPTY,
        REPLACEMENT_VALUE,
        INIT_VALUE,
        BEFORE_CALCULATION,
        AFTER_CALCULATION,
    ];
}

/// Map a key (canonical, lowercase or legacy snake_case) to its canonical
/// engine name. Returns `None` for keys the engine does not interpret.
#[must_use]
pub fn canonical_key(key: &str) -> Option<&'static str> {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let canonical = match folded.as_str() {
        "min" => keys::MIN,
        "max" => keys::MAX,
        "step" => keys::STEP,
        "decimals" => keys::DECIMALS,
        "forcestepdivisibility" => keys::FORCE_STEP_DIVISIBILITY,
        "stepinterval" => keys::STEP_INTERVAL,
        "stepintervaldelay" => keys::STEP_INTERVAL_DELAY,
        "booster" => keys::BOOSTER,
        "boostat" => keys::BOOST_AT,
        "maxboostedstep" => keys::MAX_BOOSTED_STEP,
        "firstclickvalueifempty" => keys::FIRST_CLICK_VALUE_IF_EMPTY,
        "replacementval" | "replacementvalue" => keys::REPLACEMENT_VALUE,
        "initval" | "initvalue" => keys::INIT_VALUE,
        "beforecalculation" | "callbackbeforecalculation" => keys::BEFORE_CALCULATION,
        "aftercalculation" | "callbackaftercalculation" => keys::AFTER_CALCULATION,
        _ => return None,
    };
    Some(canonical)
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

type TransformFn = dyn Fn(&str) -> String;

/// A string-to-string hook applied before parsing or after formatting.
///
/// Equality is identity: two transforms are equal when they are both the
/// identity or share the same closure allocation.
#[derive(Clone, Default)]
pub struct Transform {
    func: Option<Rc<TransformFn>>,
}

impl Transform {
    #[must_use]
    pub fn identity() -> Self {
        Self { func: None }
    }

    #[must_use]
    pub fn new(func: impl Fn(&str) -> String + 'static) -> Self {
        Self {
            func: Some(Rc::new(func)),
        }
    }

    /// True unless a custom closure has been installed.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.func.is_none()
    }

    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        match &self.func {
            Some(func) => func(input),
            None => input.to_owned(),
        }
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        match (&self.func, &other.func) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            f.write_str("Transform(identity)")
        } else {
            f.write_str("Transform(custom)")
        }
    }
}

// ---------------------------------------------------------------------------
// SettingValue
// ---------------------------------------------------------------------------

/// A loosely-typed setting value as supplied by a host.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Transform(Transform),
}

impl SettingValue {
    /// Numeric view: numbers as-is, text parsed in full (trimmed).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Null, or empty / whitespace text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => format!("{s:?}"),
            Self::Transform(t) => format!("{t:?}"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Transform> for SettingValue {
    fn from(value: Transform) -> Self {
        Self::Transform(value)
    }
}

impl From<Option<f64>> for SettingValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Number)
    }
}

// ---------------------------------------------------------------------------
// StepDivisibility
// ---------------------------------------------------------------------------

/// How a computed value is aligned onto multiples of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum StepDivisibility {
    None,
    Floor,
    Ceil,
    #[default]
    Round,
}

impl StepDivisibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
        }
    }
}

impl fmt::Display for StepDivisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepDivisibility {
    type Err = SpinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "floor" => Ok(Self::Floor),
            "ceil" => Ok(Self::Ceil),
            "round" => Ok(Self::Round),
            other => Err(SpinError::invalid_setting(
                keys::FORCE_STEP_DIVISIBILITY,
                format!("expected none|floor|ceil|round, got {other:?}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Upper bound on display precision.
pub const MAX_DECIMALS: u32 = 100;

/// A complete settings snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Base step, always positive and finite.
    pub step: f64,
    /// Display precision.
    pub decimals: u32,
    pub force_step_divisibility: StepDivisibility,
    /// Period between auto-repeat ticks.
    pub step_interval: Duration,
    /// Delay between the start of a spin and the first repeat.
    pub step_interval_delay: Duration,
    pub booster: bool,
    /// Number of ticks between step doublings.
    pub boost_at: u32,
    /// Upper bound for the boosted step; `None` disables the cap.
    pub max_boosted_step: Option<f64>,
    /// Seed used by the first step from an empty input.
    pub first_click_value_if_empty: Option<f64>,
    /// Written by sanitize when the text is empty or unparsable.
    pub replacement_value: Option<f64>,
    /// Written at attach time when the surface starts empty.
    pub init_value: Option<f64>,
    pub before_calculation: Transform,
    pub after_calculation: Transform,
    /// Keys the engine does not interpret, preserved verbatim.
    pub extras: AHashMap<String, SettingValue>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            step: 1.0,
            decimals: 0,
            force_step_divisibility: StepDivisibility::Round,
            step_interval: Duration::from_millis(100),
            step_interval_delay: Duration::from_millis(500),
            booster: true,
            boost_at: 10,
            max_boosted_step: None,
            first_click_value_if_empty: None,
            replacement_value: None,
            init_value: None,
            before_calculation: Transform::identity(),
            after_calculation: Transform::identity(),
            extras: AHashMap::new(),
        }
    }
}

fn duration_value(d: Duration) -> SettingValue {
    SettingValue::Number(d.as_micros() as f64 / 1000.0)
}

impl Settings {
    /// Defaults with `patch` applied; rejected entries are returned.
    #[must_use]
    pub fn from_patch(patch: &SettingsPatch) -> (Self, Vec<SpinError>) {
        Self::default().merged(patch)
    }

    /// Builder-style extra key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Read any setting, engine-interpreted or extra, as a [`SettingValue`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        let Some(canonical) = canonical_key(key) else {
            return self.extras.get(key).cloned();
        };
        let value = match canonical {
            keys::MIN => self.min.into(),
            keys::MAX => self.max.into(),
            keys::STEP => SettingValue::Number(self.step),
            keys::DECIMALS => SettingValue::Number(f64::from(self.decimals)),
            keys::FORCE_STEP_DIVISIBILITY => {
                SettingValue::Text(self.force_step_divisibility.as_str().to_owned())
            }
            keys::STEP_INTERVAL => duration_value(self.step_interval),
            keys::STEP_INTERVAL_DELAY => duration_value(self.step_interval_delay),
            keys::BOOSTER => SettingValue::Bool(self.booster),
            keys::BOOST_AT => SettingValue::Number(f64::from(self.boost_at)),
            keys::MAX_BOOSTED_STEP => self.max_boosted_step.into(),
            keys::FIRST_CLICK_VALUE_IF_EMPTY => self.first_click_value_if_empty.into(),
            keys::REPLACEMENT_VALUE => self.replacement_value.into(),
            keys::INIT_VALUE => self.init_value.into(),
            keys::BEFORE_CALCULATION => SettingValue::Transform(self.before_calculation.clone()),
            keys::AFTER_CALCULATION => SettingValue::Transform(self.after_calculation.clone()),
            _ => return None,
        };
        Some(value)
    }

    /// An extra (engine-uninterpreted) key.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&SettingValue> {
        self.extras.get(key)
    }

    /// Merge `patch` over a copy of `self`.
    ///
    /// Entries that fail coercion keep the previous value and are returned as
    /// errors. When the patch touches `step`, `min` or `max` and the step is
    /// not 1, the bounds are re-aligned to the step grid.
    #[must_use]
    pub fn merged(&self, patch: &SettingsPatch) -> (Self, Vec<SpinError>) {
        let mut next = self.clone();
        let mut rejected = Vec::new();
        let mut grid_touched = false;

        for (key, value) in patch.iter() {
            match canonical_key(key) {
                Some(canonical) => {
                    if matches!(canonical, keys::STEP | keys::MIN | keys::MAX) {
                        grid_touched = true;
                    }
                    if let Err(err) = next.apply_one(canonical, value) {
                        rejected.push(err);
                    }
                }
                None => {
                    next.extras.insert(key.to_owned(), value.clone());
                }
            }
        }

        if grid_touched {
            next.align_bounds_to_step();
        }
        (next, rejected)
    }

    /// Snap `max` down and `min` up onto the step grid (step != 1 only).
    ///
    /// When no grid point lies between the bounds, snapping would cross
    /// them; the bounds are then left as given.
    pub fn align_bounds_to_step(&mut self) {
        if self.step == 1.0 {
            return;
        }
        let step = self.step;
        let max = self.max.map(|max| clean(grid_ratio(max, step).floor() * step));
        let min = self.min.map(|min| clean(grid_ratio(min, step).ceil() * step));
        if matches!((min, max), (Some(lo), Some(hi)) if lo > hi) {
            warn!(
                min = ?self.min,
                max = ?self.max,
                step,
                "no step multiple between bounds; keeping them unaligned"
            );
            return;
        }
        self.min = min;
        self.max = max;
    }

    fn apply_one(&mut self, key: &'static str, value: &SettingValue) -> Result<(), SpinError> {
        let invalid = |expected: &str| {
            SpinError::invalid_setting(
                key,
                format!("expected {expected}, got {}", value.describe()),
            )
        };
        match key {
            keys::MIN => {
                self.min = optional_number(value).ok_or_else(|| invalid("a number or null"))?;
            }
            keys::MAX => {
                self.max = optional_number(value).ok_or_else(|| invalid("a number or null"))?;
            }
            keys::STEP => {
                self.step = value
                    .as_f64()
                    .filter(|n| *n > 0.0)
                    .ok_or_else(|| invalid("a positive number"))?;
            }
            keys::DECIMALS => {
                let n = value
                    .as_f64()
                    .filter(|n| *n >= 0.0)
                    .ok_or_else(|| invalid("a non-negative integer"))?;
                self.decimals = (n.trunc() as u32).min(MAX_DECIMALS);
            }
            keys::FORCE_STEP_DIVISIBILITY => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("none|floor|ceil|round"))?;
                self.force_step_divisibility = text.parse()?;
            }
            keys::STEP_INTERVAL => {
                self.step_interval = millis(value).ok_or_else(|| invalid("milliseconds"))?;
            }
            keys::STEP_INTERVAL_DELAY => {
                self.step_interval_delay = millis(value).ok_or_else(|| invalid("milliseconds"))?;
            }
            keys::BOOSTER => {
                self.booster = value.as_bool().ok_or_else(|| invalid("a boolean"))?;
            }
            keys::BOOST_AT => {
                let n = value
                    .as_f64()
                    .filter(|n| *n >= 1.0)
                    .ok_or_else(|| invalid("a positive integer"))?;
                self.boost_at = n.trunc().min(f64::from(u32::MAX)) as u32;
            }
            keys::MAX_BOOSTED_STEP => {
                self.max_boosted_step = match value {
                    SettingValue::Bool(false) => None,
                    v if v.is_blank() => None,
                    v => Some(
                        v.as_f64()
                            .filter(|n| *n > 0.0)
                            .ok_or_else(|| invalid("a positive number, false or null"))?,
                    ),
                };
            }
            keys::FIRST_CLICK_VALUE_IF_EMPTY => {
                self.first_click_value_if_empty =
                    optional_number(value).ok_or_else(|| invalid("a number or null"))?;
            }
            keys::REPLACEMENT_VALUE => {
                self.replacement_value =
                    optional_number(value).ok_or_else(|| invalid("a number or null"))?;
            }
            keys::INIT_VALUE => {
                self.init_value =
                    optional_number(value).ok_or_else(|| invalid("a number or null"))?;
            }
            keys::BEFORE_CALCULATION => {
                self.before_calculation =
                    transform(value).ok_or_else(|| invalid("a transform or null"))?;
            }
            keys::AFTER_CALCULATION => {
                self.after_calculation =
                    transform(value).ok_or_else(|| invalid("a transform or null"))?;
            }
            _ => return Err(SpinError::invalid_setting(key, "not an engine setting")),
        }
        Ok(())
    }
}

/// `Some(None)` for blank, `Some(Some(n))` for a number, `None` when invalid.
fn optional_number(value: &SettingValue) -> Option<Option<f64>> {
    if value.is_blank() {
        return Some(None);
    }
    value.as_f64().map(Some)
}

fn millis(value: &SettingValue) -> Option<Duration> {
    value
        .as_f64()
        .filter(|n| *n >= 0.0)
        .map(|ms| Duration::from_micros((ms * 1000.0).round().min(u64::MAX as f64) as u64))
}

fn transform(value: &SettingValue) -> Option<Transform> {
    match value {
        SettingValue::Transform(t) => Some(t.clone()),
        SettingValue::Null => Some(Transform::identity()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// SettingsPatch
// ---------------------------------------------------------------------------

/// An ordered set of key/value overrides.
///
/// Later entries for the same key win, since entries are applied in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    entries: Vec<(String, SettingValue)>,
}

impl SettingsPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (builder pattern).
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SettingValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<SettingValue>> FromIterator<(K, V)> for SettingsPatch {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
        assert_eq!(s.step, 1.0);
        assert_eq!(s.decimals, 0);
        assert_eq!(s.force_step_divisibility, StepDivisibility::Round);
        assert_eq!(s.step_interval, Duration::from_millis(100));
        assert_eq!(s.step_interval_delay, Duration::from_millis(500));
        assert!(s.booster);
        assert_eq!(s.boost_at, 10);
        assert_eq!(s.max_boosted_step, None);
        assert!(s.before_calculation.is_identity());
        assert!(s.after_calculation.is_identity());
    }

    #[test]
    fn canonical_key_accepts_legacy_spellings() {
        assert_eq!(canonical_key("forcestepdivisibility"), Some(keys::FORCE_STEP_DIVISIBILITY));
        assert_eq!(canonical_key("step_interval_delay"), Some(keys::STEP_INTERVAL_DELAY));
        assert_eq!(canonical_key("callback_before_calculation"), Some(keys::BEFORE_CALCULATION));
        assert_eq!(canonical_key("replacementval"), Some(keys::REPLACEMENT_VALUE));
        assert_eq!(canonical_key("buttonup_class"), None);
    }

    #[test]
    fn merge_coerces_numeric_text() {
        let patch = SettingsPatch::new()
            .set("step", "2.5")
            .set("decimals", 1)
            .set("booster", "false");
        let (s, rejected) = Settings::from_patch(&patch);
        assert!(rejected.is_empty());
        assert_eq!(s.step, 2.5);
        assert_eq!(s.decimals, 1);
        assert!(!s.booster);
    }

    #[test]
    fn malformed_values_keep_previous() {
        let base = Settings {
            step: 5.0,
            ..Settings::default()
        };
        let patch = SettingsPatch::new()
            .set("step", "abc")
            .set("decimals", -2)
            .set("forceStepDivisibility", "sideways")
            .set("boostAt", 0)
            .set("min", "lots");
        let (s, rejected) = base.merged(&patch);
        assert_eq!(rejected.len(), 5);
        assert_eq!(s.step, 5.0);
        assert_eq!(s.decimals, 0);
        assert_eq!(s.force_step_divisibility, StepDivisibility::Round);
        assert_eq!(s.boost_at, 10);
        assert_eq!(s.min, None);
        assert!(matches!(&rejected[0], SpinError::InvalidSetting { key, .. } if key == "step"));
    }

    #[test]
    fn blank_bounds_clear() {
        let base = Settings {
            min: Some(0.0),
            max: Some(10.0),
            ..Settings::default()
        };
        let (s, _) = base.merged(&SettingsPatch::new().set("min", SettingValue::Null).set("max", ""));
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
    }

    #[test]
    fn bounds_realign_when_step_changes() {
        let patch = SettingsPatch::new()
            .set("min", 3)
            .set("max", 99)
            .set("step", 5);
        let (s, _) = Settings::from_patch(&patch);
        assert_eq!(s.min, Some(5.0));
        assert_eq!(s.max, Some(95.0));
    }

    #[test]
    fn bounds_without_a_grid_point_stay_unaligned() {
        let patch = SettingsPatch::new()
            .set("min", 1)
            .set("max", 4)
            .set("step", 5);
        let (s, rejected) = Settings::from_patch(&patch);
        assert!(rejected.is_empty());
        assert_eq!(s.min, Some(1.0));
        assert_eq!(s.max, Some(4.0));
    }

    #[test]
    fn non_engine_key_is_rejected_by_apply() {
        let mut s = Settings::default();
        let err = s.apply_one("prefix", &SettingValue::from("$")).unwrap_err();
        assert!(matches!(err, SpinError::InvalidSetting { key, .. } if key == "prefix"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn bounds_untouched_with_unit_step() {
        let patch = SettingsPatch::new().set("min", 0.5).set("max", 9.5);
        let (s, _) = Settings::from_patch(&patch);
        assert_eq!(s.min, Some(0.5));
        assert_eq!(s.max, Some(9.5));
    }

    #[test]
    fn fractional_step_realign_is_exact() {
        let patch = SettingsPatch::new()
            .set("step", 0.1)
            .set("min", 0.3)
            .set("max", 0.7);
        let (s, _) = Settings::from_patch(&patch);
        assert_eq!(s.min, Some(0.3));
        assert_eq!(s.max, Some(0.7));
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let patch = SettingsPatch::new()
            .set("buttonup_class", "btn btn-primary")
            .set("verticalButtons", true);
        let (s, rejected) = Settings::from_patch(&patch);
        assert!(rejected.is_empty());
        assert_eq!(
            s.get("buttonup_class"),
            Some(SettingValue::Text("btn btn-primary".into()))
        );
        assert_eq!(s.extra("verticalButtons"), Some(&SettingValue::Bool(true)));
    }

    #[test]
    fn max_boosted_step_can_be_disabled() {
        let (s, _) = Settings::from_patch(&SettingsPatch::new().set("maxBoostedStep", 8));
        assert_eq!(s.max_boosted_step, Some(8.0));
        let (s, _) = s.merged(&SettingsPatch::new().set("maxBoostedStep", false));
        assert_eq!(s.max_boosted_step, None);
    }

    #[test]
    fn transforms_compare_by_identity() {
        let a = Transform::new(|s| s.to_owned());
        let b = Transform::new(|s| s.to_owned());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(Transform::identity(), Transform::default());
        assert_eq!(a.apply("7"), "7");
    }

    #[test]
    fn get_reports_intervals_in_millis() {
        let s = Settings::default();
        assert_eq!(s.get("stepInterval"), Some(SettingValue::Number(100.0)));
        assert_eq!(s.get("step_interval_delay"), Some(SettingValue::Number(500.0)));
        assert_eq!(s.get("missing"), None);
    }

    #[test]
    fn later_patch_entries_win() {
        let patch: SettingsPatch = [("step", 2), ("step", 4)].into_iter().collect();
        let (s, _) = Settings::from_patch(&patch);
        assert_eq!(s.step, 4.0);
    }
}
