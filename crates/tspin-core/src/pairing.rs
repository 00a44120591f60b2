#![forbid(unsafe_code)]

//! Best-effort check that the before/after calculation hooks are inverses.
//!
//! `beforeCalculation` runs on raw text before parsing and
//! `afterCalculation` runs on formatted text before display (for example
//! stripping and re-adding a currency sign). A lone hook, or a pair that does
//! not round-trip, silently corrupts values, so the engine reports it. The
//! check is advisory: nothing here ever blocks an operation.

use std::fmt;

use tracing::warn;

use crate::settings::Transform;
use crate::value::parse_float_prefix;

/// Value pushed through `after` then `before` in the round-trip self-test.
pub const PAIRING_SAMPLE: &str = "50";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingWarning {
    /// `beforeCalculation` is customized but `afterCalculation` is not.
    MissingAfterCalculation,
    /// `afterCalculation` is customized but `beforeCalculation` is not.
    MissingBeforeCalculation,
    /// Both are customized but `before(after(sample)) != sample`.
    RoundTripMismatch { sample: String, round_trip: String },
}

impl fmt::Display for PairingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAfterCalculation => f.write_str(
                "beforeCalculation is set but afterCalculation is missing; \
                 values will not be re-formatted after parsing",
            ),
            Self::MissingBeforeCalculation => f.write_str(
                "afterCalculation is set but beforeCalculation is missing; \
                 formatted values may not parse back",
            ),
            Self::RoundTripMismatch { sample, round_trip } => write!(
                f,
                "beforeCalculation and afterCalculation are not properly paired: \
                 {sample:?} round-trips to {round_trip:?}"
            ),
        }
    }
}

/// Inspect a hook pair. Returns `None` when nothing looks wrong.
#[must_use]
pub fn check_pairing(before: &Transform, after: &Transform) -> Option<PairingWarning> {
    match (before.is_identity(), after.is_identity()) {
        (true, true) => None,
        (false, true) => Some(PairingWarning::MissingAfterCalculation),
        (true, false) => Some(PairingWarning::MissingBeforeCalculation),
        (false, false) => {
            let round_trip = before.apply(&after.apply(PAIRING_SAMPLE));
            if round_trips(PAIRING_SAMPLE, &round_trip) {
                None
            } else {
                Some(PairingWarning::RoundTripMismatch {
                    sample: PAIRING_SAMPLE.to_owned(),
                    round_trip,
                })
            }
        }
    }
}

/// Numeric equality when both sides parse, string equality otherwise.
fn round_trips(sample: &str, round_trip: &str) -> bool {
    let a = parse_float_prefix(sample);
    let b = parse_float_prefix(round_trip);
    if a.is_finite() && b.is_finite() {
        a == b
    } else {
        sample == round_trip
    }
}

pub(crate) fn report(warning: &PairingWarning) {
    warn!(check = "calculation_pairing", "{warning}");
}
