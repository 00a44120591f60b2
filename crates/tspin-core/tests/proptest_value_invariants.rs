//! Property-based invariant tests for the value pipeline and stepping.
//!
//! 1. `constrain` output is within `[min, max]` for any finite input.
//! 2. `constrain` is idempotent.
//! 3. Step up then step down from an aligned value lands aligned and in bounds.
//! 4. Repeated step-ups never pass `max`; `max` fires from the first clamped
//!    call on, never before.
//! 5. The boosted step stays within `[step, maxBoostedStep]`.
//! 6. Malformed text never leaves a non-finite or out-of-bounds value.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tspin_core::value::{boosted_step, constrain, grid_ratio};
use tspin_core::{MemorySurface, Notification, Settings, SpinEngine, SpinEvent, StepDivisibility};

// ── Strategies ──────────────────────────────────────────────────────────

fn step_strategy() -> impl Strategy<Value = f64> {
    prop::sample::select(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0])
}

fn mode_strategy() -> impl Strategy<Value = StepDivisibility> {
    prop_oneof![
        Just(StepDivisibility::None),
        Just(StepDivisibility::Floor),
        Just(StepDivisibility::Ceil),
        Just(StepDivisibility::Round),
    ]
}

/// Settings with aligned bounds, the way the engine sees them after attach.
fn settings_strategy() -> impl Strategy<Value = Settings> {
    (step_strategy(), mode_strategy(), -1_000i32..=0, 10i32..=1_000).prop_map(
        |(step, mode, min, max)| {
            let mut settings = Settings {
                step,
                decimals: 2,
                force_step_divisibility: mode,
                min: Some(f64::from(min)),
                max: Some(f64::from(max)),
                ..Settings::default()
            };
            settings.align_bounds_to_step();
            settings
        },
    )
}

fn attach(text: &str, settings: Settings) -> (SpinEngine, MemorySurface) {
    let surface = MemorySurface::new(text);
    let engine = SpinEngine::attach(surface.clone(), settings).expect("attach");
    (engine, surface)
}

fn on_grid(value: f64, step: f64) -> bool {
    let ratio = grid_ratio(value, step);
    (ratio - ratio.round()).abs() < 1e-6
}

fn within(value: f64, settings: &Settings) -> bool {
    settings.min.is_none_or(|min| value >= min) && settings.max.is_none_or(|max| value <= max)
}

// ═════════════════════════════════════════════════════════════════════════
// 1–2. constrain bounds and idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn constrain_stays_in_bounds(settings in settings_strategy(), input in -1e5f64..1e5) {
        let out = constrain(input, &settings);
        prop_assert!(
            within(out, &settings),
            "{input} -> {out} outside {:?}..{:?}",
            settings.min,
            settings.max
        );
    }

    #[test]
    fn constrain_is_idempotent(settings in settings_strategy(), input in -1e5f64..1e5) {
        let once = constrain(input, &settings);
        let twice = constrain(once, &settings);
        prop_assert!((once - twice).abs() < 1e-9, "{once} re-constrained to {twice}");
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Up then down stays aligned and in bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn up_then_down_returns_aligned(settings in settings_strategy(), fraction in 0.0f64..=1.0) {
        let (min, max) = (settings.min.unwrap_or(0.0), settings.max.unwrap_or(0.0));
        let start = constrain(min + fraction * (max - min), &settings);
        let step = settings.step;
        let mode = settings.force_step_divisibility;
        let (mut engine, _) = attach(&start.to_string(), settings);

        engine.step_up_once();
        engine.step_down_once();
        let value = engine.get_value();

        prop_assert!(value.is_finite());
        prop_assert!(within(value, engine.settings()));
        if mode != StepDivisibility::None {
            prop_assert!(on_grid(value, step), "{value} is off the {step} grid");
        }
        let recheck = constrain(value, engine.settings());
        prop_assert!((recheck - value).abs() < 1e-9);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Step-ups never pass max; max fires from the first clamped call
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn step_ups_respect_max(settings in settings_strategy(), fraction in 0.0f64..=1.0, calls in 1usize..60) {
        let (min, max) = (settings.min.unwrap_or(0.0), settings.max.unwrap_or(0.0));
        let start = constrain(min + fraction * (max - min), &settings);
        let (mut engine, _) = attach(&start.to_string(), settings);

        let max_hits = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&max_hits);
        engine.on(SpinEvent::Max, move |_: &Notification| *sink.borrow_mut() += 1);

        for _ in 0..calls {
            let before = *max_hits.borrow();
            engine.step_up_once();
            let value = engine.get_value();
            prop_assert!(value <= max, "{value} exceeds {max}");
            let fired = *max_hits.borrow() > before;
            prop_assert_eq!(fired, value == max, "max fired={} at {}", fired, value);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Boosted step bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn boosted_step_bounds(
        step in step_strategy(),
        boost_at in 1u32..20,
        spin_count in 0u32..500,
        cap_factor in prop::option::of(1.0f64..50.0),
    ) {
        let settings = Settings {
            step,
            boost_at,
            max_boosted_step: cap_factor.map(|f| f * step),
            ..Settings::default()
        };
        let boosted = boosted_step(&settings, spin_count);
        prop_assert!(boosted.step >= step);
        if let Some(cap) = settings.max_boosted_step {
            prop_assert!(boosted.step <= cap);
        }
        if spin_count < boost_at {
            prop_assert_eq!(boosted.step, step);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Malformed text never leaves an invalid value
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn arbitrary_text_sanitizes_to_valid_or_empty(settings in settings_strategy(), text in ".{0,12}") {
        let (mut engine, surface) = attach("0", settings);
        surface.type_text(text);
        engine.sanitize(true);
        let value = engine.get_value();
        if surface.current_text().trim().is_empty() {
            prop_assert!(value.is_nan());
        } else {
            prop_assert!(value.is_finite());
            prop_assert!(within(value, engine.settings()));
        }
    }
}
