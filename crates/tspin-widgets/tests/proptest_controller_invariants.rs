//! Property-based invariant tests for the input controller.
//!
//! 1. Arbitrary input sequences keep the value within bounds.
//! 2. A spin is never left running without an input holding it.
//! 3. Releasing everything always leaves the timer idle.

use proptest::prelude::*;
use tspin_core::{LabClock, MemorySurface, Settings, SettingsPatch, SpinEngine, SpinPhase};
use tspin_widgets::{SpinButton, SpinController, SpinInput, SpinKey};

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Input(SpinInput),
    Wait(u64),
    Lock(bool),
}

fn input_strategy() -> impl Strategy<Value = SpinInput> {
    let key = prop_oneof![Just(SpinKey::Up), Just(SpinKey::Down), Just(SpinKey::Enter)];
    let button = prop_oneof![Just(SpinButton::Up), Just(SpinButton::Down)];
    prop_oneof![
        key.clone().prop_map(SpinInput::KeyDown),
        key.prop_map(SpinInput::KeyUp),
        button.clone().prop_map(SpinInput::PointerDown),
        button.clone().prop_map(SpinInput::PointerUp),
        button.prop_map(SpinInput::PointerLeave),
        (-3.0f64..3.0).prop_map(|delta_y| SpinInput::Wheel { delta_y }),
        Just(SpinInput::Focus),
        Just(SpinInput::Blur),
    ]
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => input_strategy().prop_map(Step::Input),
        3 => (0u64..1_500).prop_map(Step::Wait),
        1 => any::<bool>().prop_map(Step::Lock),
    ]
}

fn engine(clock: &LabClock, surface: &MemorySurface) -> SpinEngine {
    let patch = SettingsPatch::new()
        .set("min", -20)
        .set("max", 20)
        .set("step", 2);
    let (settings, _) = Settings::from_patch(&patch);
    SpinEngine::attach_with_clock(surface.clone(), settings, clock.clone()).expect("attach")
}

proptest! {
    #[test]
    fn input_sequences_keep_engine_consistent(steps in prop::collection::vec(step_strategy(), 1..80)) {
        let clock = LabClock::new();
        let surface = MemorySurface::new("0");
        let mut engine = engine(&clock, &surface);
        let mut ctl = SpinController::new();

        for step in steps {
            match step {
                Step::Input(input) => {
                    ctl.handle(&mut engine, input);
                }
                Step::Wait(ms) => {
                    clock.advance_ms(ms);
                    engine.poll();
                }
                Step::Lock(locked) => surface.set_disabled(locked),
            }
            let value = engine.get_value();
            prop_assert!(value.is_finite());
            prop_assert!((-20.0..=20.0).contains(&value), "value {value}");
            if engine.spin_state().spinning {
                prop_assert!(ctl.is_holding());
            } else {
                prop_assert_eq!(engine.spin_state().spin_count, 0);
            }
        }

        ctl.handle(&mut engine, SpinInput::Blur);
        prop_assert!(!engine.spin_state().spinning);
        prop_assert_eq!(engine.timer_phase(), SpinPhase::Idle);
    }
}
