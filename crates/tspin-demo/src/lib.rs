#![forbid(unsafe_code)]

//! Command-line driver for the tspin engine.
//!
//! `simulate` attaches an engine to an in-memory field, holds one of the
//! buttons against a [`tspin_core::LabClock`] and prints every event and
//! value change. `show-settings` prints the configuration an engine would
//! see for the same options.

pub mod cli;
pub mod error;
pub mod settings;
pub mod simulate;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{DemoError, Result};

use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
