//! Press-and-hold simulation against a lab clock.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info};
use tspin_core::{
    LabClock, MemorySurface, Notification, Settings, SpinDirection, SpinEngine, SpinEvent,
};
use tspin_widgets::{
    Renderer, SpinButton, SpinController, SpinInput, TextRenderer, bind_renderer,
};

use crate::cli::{HoldDirection, SimulateArgs};
use crate::error::{DemoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Event,
    Change,
    Release,
}

/// One line of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRecord {
    pub t_ms: u64,
    pub kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<SpinEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SpinDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TimelineRecord {
    fn new(t_ms: u64, kind: RecordKind) -> Self {
        Self {
            t_ms,
            kind,
            event: None,
            direction: None,
            value: None,
            text: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub records: Vec<TimelineRecord>,
    pub final_text: String,
    /// Final text decorated by the requested theme, if any.
    pub rendered: Option<String>,
}

impl Simulation {
    #[must_use]
    pub fn events(&self) -> impl Iterator<Item = SpinEvent> + '_ {
        self.records.iter().filter_map(|r| r.event)
    }
}

fn elapsed_ms(clock: &LabClock) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Run the timeline described by `args`.
pub fn simulate(args: &SimulateArgs) -> Result<Simulation> {
    let patch = args.settings.to_patch()?;
    let (settings, rejected) = Settings::from_patch(&patch);
    if !rejected.is_empty() {
        return Err(DemoError::RejectedSettings {
            errors: rejected.iter().map(ToString::to_string).collect(),
        });
    }

    let surface = MemorySurface::new(args.initial.as_str());
    let clock = LabClock::new();
    let mut engine = SpinEngine::attach_with_clock(surface.clone(), settings, clock.clone())?;
    let records = Rc::new(RefCell::new(Vec::new()));

    for event in SpinEvent::ALL {
        let sink = Rc::clone(&records);
        let clock = clock.clone();
        engine.on(event, move |n: &Notification| {
            let mut record = TimelineRecord::new(elapsed_ms(&clock), RecordKind::Event);
            record.event = Some(n.event);
            if let Some(detail) = n.detail {
                record.direction = detail.direction;
                record.value = detail.value.is_finite().then_some(detail.value);
            }
            sink.borrow_mut().push(record);
        });
    }

    let button = match args.hold {
        HoldDirection::Up => SpinButton::Up,
        HoldDirection::Down => SpinButton::Down,
    };
    debug!(
        hold = ?args.hold,
        hold_ms = args.hold_ms,
        tail_ms = args.tail_ms,
        "simulation.start"
    );

    let mut controller = SpinController::new();
    let mut last_text = surface.current_text();
    let record_change = |last_text: &mut String| {
        let text = surface.current_text();
        if text != *last_text {
            let mut record = TimelineRecord::new(elapsed_ms(&clock), RecordKind::Change);
            record.text = Some(text.clone());
            records.borrow_mut().push(record);
            *last_text = text;
        }
    };

    controller.handle(&mut engine, SpinInput::Focus);
    controller.handle(&mut engine, SpinInput::PointerDown(button));
    record_change(&mut last_text);
    for _ in 0..args.hold_ms / args.tick_ms {
        clock.advance_ms(args.tick_ms);
        engine.poll();
        record_change(&mut last_text);
    }

    records
        .borrow_mut()
        .push(TimelineRecord::new(elapsed_ms(&clock), RecordKind::Release));
    controller.handle(&mut engine, SpinInput::PointerUp(button));
    for _ in 0..args.tail_ms / args.tick_ms {
        clock.advance_ms(args.tick_ms);
        engine.poll();
        record_change(&mut last_text);
    }

    let final_text = engine.text();
    let rendered = args.theme.map(|theme| {
        let renderer = Rc::new(RefCell::new(TextRenderer::new(theme.into())));
        let binding = bind_renderer(&mut engine, &renderer);
        let out = renderer.borrow().render(&final_text);
        binding.unbind(&mut engine, &renderer);
        out
    });
    engine.destroy();

    let records = records.take();
    info!(
        records = records.len(),
        final_text = final_text.as_str(),
        "simulation.finish"
    );
    Ok(Simulation {
        records,
        final_text,
        rendered,
    })
}

/// Write the timeline as a table or as JSON lines.
pub fn write_timeline(sim: &Simulation, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        for record in &sim.records {
            serde_json::to_writer(&mut *out, record)?;
            writeln!(out)?;
        }
        return Ok(());
    }

    for record in &sim.records {
        let label = match (record.kind, record.event) {
            (RecordKind::Event, Some(event)) => event.name(),
            (RecordKind::Change, _) => "change",
            (RecordKind::Release, _) => "release",
            (RecordKind::Event, None) => "event",
        };
        let detail = match (&record.text, record.value) {
            (Some(text), _) => text.clone(),
            (None, Some(value)) => value.to_string(),
            (None, None) => String::new(),
        };
        writeln!(out, "{:>7}ms  {label:<14} {detail}", record.t_ms)?;
    }
    writeln!(out, "final: {}", sim.final_text)?;
    if let Some(rendered) = &sim.rendered {
        writeln!(out, "{rendered}")?;
    }
    Ok(())
}

pub fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let sim = simulate(args)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_timeline(&sim, args.json, &mut out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{SettingsArgs, ThemeArg};

    fn args() -> SimulateArgs {
        SimulateArgs {
            settings: SettingsArgs {
                no_booster: true,
                ..SettingsArgs::default()
            },
            initial: "0".into(),
            hold: HoldDirection::Up,
            hold_ms: 1_000,
            tail_ms: 200,
            tick_ms: 10,
            theme: None,
            json: false,
        }
    }

    #[test]
    fn hold_produces_expected_changes() {
        let sim = simulate(&args()).expect("simulate");
        let changes: Vec<u64> = sim
            .records
            .iter()
            .filter(|r| r.kind == RecordKind::Change)
            .map(|r| r.t_ms)
            .collect();
        assert_eq!(changes, vec![0, 600, 700, 800, 900, 1000]);
        assert_eq!(sim.final_text, "6");
        let events: Vec<_> = sim.events().collect();
        assert_eq!(
            events,
            vec![
                SpinEvent::StartSpin,
                SpinEvent::StartUpSpin,
                SpinEvent::StopUpSpin,
                SpinEvent::StopSpin,
            ]
        );
    }

    #[test]
    fn json_lines_are_parseable() {
        let sim = simulate(&args()).expect("simulate");
        let mut buf = Vec::new();
        write_timeline(&sim, true, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        let first: serde_json::Value =
            serde_json::from_str(text.lines().next().expect("line")).expect("json");
        assert_eq!(first["kind"], "event");
        assert_eq!(first["event"], "startSpin");
        assert_eq!(first["direction"], "up");
        assert_eq!(text.lines().count(), sim.records.len());
    }

    #[test]
    fn theme_renders_final_value() {
        let mut a = args();
        a.theme = Some(ThemeArg::Bracketed);
        a.settings.extra = vec!["prefix=$".into()];
        let sim = simulate(&a).expect("simulate");
        assert_eq!(sim.rendered.as_deref(), Some("[-] [ $ 6 ] [+]"));

        let mut buf = Vec::new();
        write_timeline(&sim, false, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("final: 6"));
        assert!(text.lines().any(|l| l.contains("startUpSpin")));
    }

    #[test]
    fn rejected_settings_fail_with_usage_code() {
        let mut a = args();
        a.settings.step = Some(-1.0);
        let err = simulate(&a).unwrap_err();
        assert!(matches!(err, DemoError::RejectedSettings { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
