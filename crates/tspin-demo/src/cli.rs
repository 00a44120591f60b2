use clap::{Args, Parser, Subcommand, ValueEnum};
use tspin_core::{SettingValue, SettingsPatch, StepDivisibility};
use tspin_widgets::Theme;

use crate::error::{DemoError, Result};
use crate::settings::run_show_settings;
use crate::simulate::run_simulate;

#[derive(Debug, Parser)]
#[command(
    name = "tspin-demo",
    about = "Drive a tspin engine through scripted press-and-hold timelines",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Hold a spin button against a lab clock and print the timeline.
    Simulate(SimulateArgs),

    /// Print the effective settings after applying the given options.
    #[command(name = "show-settings")]
    ShowSettings(SettingsArgs),
}

/// Engine settings shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<f64>,

    #[arg(long)]
    pub step: Option<f64>,

    #[arg(long)]
    pub decimals: Option<u32>,

    /// Grid alignment: none, floor, ceil or round.
    #[arg(long)]
    pub divisibility: Option<StepDivisibility>,

    /// Auto-repeat interval in milliseconds.
    #[arg(long)]
    pub interval: Option<u64>,

    /// Delay before auto-repeat starts, in milliseconds.
    #[arg(long)]
    pub delay: Option<u64>,

    #[arg(long)]
    pub no_booster: bool,

    #[arg(long)]
    pub boost_at: Option<u32>,

    #[arg(long)]
    pub max_boosted_step: Option<f64>,

    /// Extra setting as KEY=VALUE (repeatable). Values parse as
    /// bool, number, `null`, or text.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub extra: Vec<String>,
}

impl SettingsArgs {
    /// Build the settings patch these options describe.
    pub fn to_patch(&self) -> Result<SettingsPatch> {
        let mut patch = SettingsPatch::new();
        if let Some(min) = self.min {
            patch.insert("min", min);
        }
        if let Some(max) = self.max {
            patch.insert("max", max);
        }
        if let Some(step) = self.step {
            patch.insert("step", step);
        }
        if let Some(decimals) = self.decimals {
            patch.insert("decimals", f64::from(decimals));
        }
        if let Some(mode) = self.divisibility {
            patch.insert("forceStepDivisibility", mode.as_str());
        }
        if let Some(ms) = self.interval {
            patch.insert("stepInterval", ms as f64);
        }
        if let Some(ms) = self.delay {
            patch.insert("stepIntervalDelay", ms as f64);
        }
        if self.no_booster {
            patch.insert("booster", false);
        }
        if let Some(n) = self.boost_at {
            patch.insert("boostAt", f64::from(n));
        }
        if let Some(cap) = self.max_boosted_step {
            patch.insert("maxBoostedStep", cap);
        }
        for raw in &self.extra {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| DemoError::invalid(format!("expected KEY=VALUE, got {raw:?}")))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(DemoError::invalid(format!("empty key in {raw:?}")));
            }
            patch.insert(key, parse_loose(value));
        }
        Ok(patch)
    }
}

/// Loose typing for command-line setting values.
#[must_use]
pub fn parse_loose(raw: &str) -> SettingValue {
    let trimmed = raw.trim();
    match trimmed {
        "" | "null" => SettingValue::Null,
        "true" => SettingValue::Bool(true),
        "false" => SettingValue::Bool(false),
        _ => match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => SettingValue::Number(n),
            _ => SettingValue::Text(raw.to_owned()),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum HoldDirection {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Vanilla,
    Bracketed,
    Vertical,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Vanilla => Self::Vanilla,
            ThemeArg::Bracketed => Self::Bracketed,
            ThemeArg::Vertical => Self::Vertical,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Text in the field before the press.
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub initial: String,

    #[arg(long, value_enum, default_value_t = HoldDirection::Up)]
    pub hold: HoldDirection,

    /// How long the button stays pressed.
    #[arg(long, default_value_t = 2_000)]
    pub hold_ms: u64,

    /// How long to keep polling after release.
    #[arg(long, default_value_t = 200)]
    pub tail_ms: u64,

    /// Clock advance per poll.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Render the final value with this theme.
    #[arg(long, value_enum)]
    pub theme: Option<ThemeArg>,

    /// Emit JSON lines instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run_from_env() -> Result<()> {
    crate::init_tracing();
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::ShowSettings(args) => run_show_settings(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_options() {
        let cli = Cli::try_parse_from([
            "tspin-demo",
            "simulate",
            "--min",
            "-10",
            "--max",
            "10",
            "--step",
            "0.5",
            "--divisibility",
            "floor",
            "--hold",
            "down",
            "--set",
            "prefix=$",
            "--json",
        ])
        .expect("parse");
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.hold, HoldDirection::Down);
        assert!(args.json);
        assert_eq!(args.settings.min, Some(-10.0));
        assert_eq!(args.settings.divisibility, Some(StepDivisibility::Floor));

        let patch = args.settings.to_patch().expect("patch");
        let entries: Vec<_> = patch.iter().map(|(k, _)| k.to_owned()).collect();
        assert_eq!(
            entries,
            ["min", "max", "step", "forceStepDivisibility", "prefix"]
        );
    }

    #[test]
    fn rejects_malformed_extra() {
        let args = SettingsArgs {
            extra: vec!["no-equals".into()],
            ..SettingsArgs::default()
        };
        let err = args.to_patch().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn loose_values() {
        assert_eq!(parse_loose("true"), SettingValue::Bool(true));
        assert_eq!(parse_loose(" 2.5 "), SettingValue::Number(2.5));
        assert_eq!(parse_loose("null"), SettingValue::Null);
        assert_eq!(parse_loose("EUR"), SettingValue::Text("EUR".into()));
    }

    #[test]
    fn tick_must_be_positive() {
        assert!(Cli::try_parse_from(["tspin-demo", "simulate", "--tick-ms", "0"]).is_err());
    }
}
