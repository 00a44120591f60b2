//! `show-settings`: the effective configuration as JSON.

use std::io::{self, Write};

use serde_json::{Map, Number, Value};
use tspin_core::settings::keys::ENGINE_KEYS;
use tspin_core::{SettingValue, Settings};

use crate::cli::SettingsArgs;
use crate::error::{DemoError, Result};

/// JSON view of a setting value. Transforms show as `"<identity>"` or
/// `"<custom>"`.
#[must_use]
pub fn to_json(value: &SettingValue) -> Value {
    match value {
        SettingValue::Null => Value::Null,
        SettingValue::Bool(b) => Value::Bool(*b),
        SettingValue::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        SettingValue::Text(s) => Value::String(s.clone()),
        SettingValue::Transform(t) if t.is_identity() => Value::String("<identity>".into()),
        SettingValue::Transform(_) => Value::String("<custom>".into()),
    }
}

/// Every engine key plus every extra, keyed by name.
#[must_use]
pub fn effective_settings(settings: &Settings) -> Map<String, Value> {
    let mut out = Map::new();
    for key in ENGINE_KEYS {
        if let Some(value) = settings.get(key) {
            out.insert(key.to_owned(), to_json(&value));
        }
    }
    for (key, value) in &settings.extras {
        out.insert(key.clone(), to_json(value));
    }
    out
}

pub fn run_show_settings(args: &SettingsArgs) -> Result<()> {
    let (settings, rejected) = Settings::from_patch(&args.to_patch()?);
    if !rejected.is_empty() {
        return Err(DemoError::RejectedSettings {
            errors: rejected.iter().map(ToString::to_string).collect(),
        });
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &effective_settings(&settings))?;
    writeln!(out)?;
    Ok(())
}
