#![forbid(unsafe_code)]

//! Error types for the spin engine.
//!
//! Only attaching to a surface can fail outright. Everything else the engine
//! does is recovered locally; [`SpinError::InvalidSetting`] exists so the
//! settings coercion layer has a typed reason to log when it drops a value.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpinError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpinError {
    #[error("cannot attach a spinner to a {kind} surface; a single-line text or number input is required")]
    IncompatibleSurface { kind: String },

    #[error("invalid value for setting `{key}`: {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl SpinError {
    #[must_use]
    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
