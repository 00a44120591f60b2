#![forbid(unsafe_code)]

//! Value pipeline: parse, step, align, clamp, format.
//!
//! Everything here is a pure function of its inputs. The engine supplies the
//! current text, settings and spin count and writes back whatever comes out.
//!
//! # Invariants
//!
//! 1. [`constrain`] output is within `[min, max]` for every finite input.
//! 2. [`constrain`] output is a fixed point of the divisibility alignment
//!    (aligning it again yields the same number).
//! 3. [`boosted_step`] never returns less than the base step.

use std::fmt;

use crate::settings::{Settings, StepDivisibility};

/// Direction of a single step or of an active spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SpinDirection {
    Up,
    Down,
}

impl SpinDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

impl fmt::Display for SpinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Precision used to absorb binary float noise on grid ratios.
const GRID_EPSILON_SCALE: f64 = 1e9;

/// Parse the longest leading float literal, like `parseFloat`.
///
/// Leading whitespace is skipped; trailing garbage is ignored (`"12px"` is
/// 12). Returns `NaN` when no digits are found.
#[must_use]
pub fn parse_float_prefix(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        let negative = bytes.first() == Some(&b'-');
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Format with a fixed number of decimals, like `toFixed`.
///
/// Exact ties round to the larger magnitude (`0.125` at two decimals is
/// `"0.13"`, `-2.5` at zero is `"-3"`). Everything else is correctly rounded.
#[must_use]
pub fn to_fixed(value: f64, decimals: u32) -> String {
    // -0.0 prints as "-0"; a true zero never should.
    let value = if value == 0.0 { 0.0 } else { value };
    let prec = decimals as usize;
    let magnitude = value.abs();
    if !is_exact_tie(magnitude, decimals) {
        return format!("{value:.prec$}");
    }

    // The exact expansion ends in a 5 one digit past `decimals`.
    let mut digits = format!("{magnitude:.p$}", p = prec + 1);
    digits.pop();
    if digits.ends_with('.') {
        digits.pop();
    }
    let mut out = increment_last_digit(digits);
    if value < 0.0 {
        out.insert(0, '-');
    }
    out
}

/// Whether `magnitude * 10^decimals` lies exactly halfway between two
/// integers.
///
/// With `magnitude = m * 2^e` and `m = odd * 2^t`, the doubled scaled value is
/// `odd * 5^decimals * 2^(t + decimals + 1 + e)`, which is an odd integer
/// exactly when the power of two vanishes.
fn is_exact_tie(magnitude: f64, decimals: u32) -> bool {
    if !magnitude.is_finite() || magnitude == 0.0 {
        return false;
    }
    let bits = magnitude.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1_u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1_u64 << 52), biased - 1075)
    };
    i64::from(mantissa.trailing_zeros()) + i64::from(decimals) + 1 + exponent == 0
}

/// Add one unit in the last place of a plain decimal string.
fn increment_last_digit(digits: String) -> String {
    let mut bytes = digits.into_bytes();
    let mut carry = true;
    for b in bytes.iter_mut().rev() {
        match *b {
            b'.' => {}
            b'9' => *b = b'0',
            d => {
                *b = d + 1;
                carry = false;
                break;
            }
        }
    }
    let mut out = String::from_utf8(bytes).unwrap_or_default();
    if carry {
        out.insert(0, '1');
    }
    out
}

/// Round to `decimals` digits by formatting and re-parsing.
#[must_use]
pub fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    to_fixed(value, decimals).parse().unwrap_or(value)
}

/// Round half away from negative infinity, like `Math.round`.
#[must_use]
pub fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// `value / step`, with float noise below 1e-9 removed.
#[must_use]
pub fn grid_ratio(value: f64, step: f64) -> f64 {
    let ratio = value / step;
    if ratio.abs() < 1e6 {
        (ratio * GRID_EPSILON_SCALE).round() / GRID_EPSILON_SCALE
    } else {
        ratio
    }
}

/// Remove float noise from a value produced by grid arithmetic.
#[must_use]
pub(crate) fn clean(value: f64) -> f64 {
    if value.is_finite() && value.abs() < 1e6 {
        (value * 1e10).round() / 1e10
    } else {
        value
    }
}

/// Align `value` onto the step grid, then round to `decimals`.
#[must_use]
pub fn align_to_step(value: f64, step: f64, mode: StepDivisibility, decimals: u32) -> f64 {
    let aligned = match mode {
        StepDivisibility::None => value,
        StepDivisibility::Floor => grid_ratio(value, step).floor() * step,
        StepDivisibility::Ceil => grid_ratio(value, step).ceil() * step,
        StepDivisibility::Round => round_half_up(grid_ratio(value, step)) * step,
    };
    round_to_decimals(aligned, decimals)
}

#[must_use]
pub fn clamp_to_bounds(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut v = value;
    if let Some(min) = min {
        if v < min {
            v = min;
        }
    }
    if let Some(max) = max {
        if v > max {
            v = max;
        }
    }
    v
}

/// Midpoint of the bounds, treating a missing bound as 0.
#[must_use]
pub fn midpoint(min: Option<f64>, max: Option<f64>) -> f64 {
    (min.unwrap_or(0.0) + max.unwrap_or(0.0)) / 2.0
}

/// Result of [`boosted_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostedStep {
    /// Step to apply this tick.
    pub step: f64,
    /// True when `maxBoostedStep` capped the step.
    pub capped: bool,
}

/// Step size for the given spin count.
///
/// `step * 2^floor(spin_count / boost_at)` while boosting, capped at
/// `max_boosted_step`, and never below `step`.
#[must_use]
pub fn boosted_step(settings: &Settings, spin_count: u32) -> BoostedStep {
    let base = settings.step;
    if !settings.booster {
        return BoostedStep {
            step: base,
            capped: false,
        };
    }
    let doublings = spin_count / settings.boost_at.max(1);
    let mut step = base * 2f64.powi(doublings.min(1023) as i32);
    let mut capped = false;
    if let Some(cap) = settings.max_boosted_step {
        if step > cap {
            step = cap;
            capped = true;
        }
    }
    BoostedStep {
        step: step.max(base),
        capped,
    }
}

/// Divisibility alignment followed by clamping.
#[must_use]
pub fn constrain(value: f64, settings: &Settings) -> f64 {
    let aligned = align_to_step(
        value,
        settings.step,
        settings.force_step_divisibility,
        settings.decimals,
    );
    clamp_to_bounds(aligned, settings.min, settings.max)
}

/// Compute the value one step away from `current`.
///
/// A non-finite `current` is replaced by `firstClickValueIfEmpty` (or the
/// bounds midpoint) instead of being stepped.
#[must_use]
pub fn next_value(
    current: f64,
    direction: SpinDirection,
    settings: &Settings,
    spin_count: u32,
) -> f64 {
    if !current.is_finite() {
        let seed = settings
            .first_click_value_if_empty
            .unwrap_or_else(|| midpoint(settings.min, settings.max));
        return constrain(seed, settings);
    }

    let boost = boosted_step(settings, spin_count);
    let mut v = current;
    if boost.capped {
        v = round_half_up(grid_ratio(v, boost.step)) * boost.step;
    }
    let v = match direction {
        SpinDirection::Up => v + boost.step,
        SpinDirection::Down => v - boost.step,
    };
    constrain(clean(v), settings)
}

/// Render a constrained value for display.
#[must_use]
pub fn format_value(value: f64, settings: &Settings) -> String {
    settings
        .after_calculation
        .apply(&to_fixed(value, settings.decimals))
}
