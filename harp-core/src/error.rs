//! # Error Types
//!
//! Every recoverable condition the trainer can hit, grouped the way the
//! caller has to react to it:
//!
//! - [`CatalogError`] - a lick definition (or a whole file) could not be loaded.
//!   Collected at start-up, never fatal to the rest of the catalog.
//! - [`SelectionError`] - the requested bucket is empty. Shown to the user.
//! - [`ConfigError`] - an invalid BPM or configuration file.
//! - [`MissingSampleWarning`] - a note had no sample and was played as silence.

use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::Register;
use crate::harp::HarpKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// The file could not be read or is not valid JSON.
    #[error("Could not load lick file {path}: {message}")]
    File { path: PathBuf, message: String },

    /// A single entry is malformed; only that entry is dropped.
    #[error("Lick #{index} in {path}: {message}")]
    Entry {
        path: PathBuf,
        index: usize,
        message: String,
    },

    /// A tab reference outside the Richter layout.
    #[error("Unknown tab '{0}'")]
    UnknownTab(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("No licks available for {key} / {scale} / {register}")]
    NoLicksAvailable {
        key: HarpKey,
        scale: String,
        register: Register,
    },

    #[error("No reference scale available for {key} / {scale}")]
    NoScaleAvailable { key: HarpKey, scale: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    /// BPM outside the supported range. Values are rejected, never clamped.
    #[error("BPM {value} is outside the supported range {min}-{max}")]
    BpmOutOfRange { value: f64, min: f64, max: f64 },

    #[error("Unknown value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A note event whose sample could not be resolved.
///
/// The event is replaced by silence of the same length, so nothing after it moves.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("No sample for tab {tab} on a {key} harp (note #{index}); playing silence")]
pub struct MissingSampleWarning {
    pub key: HarpKey,
    pub tab: String,
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_input() {
        let err = CatalogError::Entry {
            path: PathBuf::from("licks/blues.json"),
            index: 3,
            message: "duration must be greater than zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Lick #3 in licks/blues.json: duration must be greater than zero"
        );

        let err = SelectionError::NoLicksAvailable {
            key: HarpKey::D,
            scale: "Minor".to_string(),
            register: Register::Low,
        };
        assert_eq!(err.to_string(), "No licks available for D / Minor / low");

        let err = ConfigError::BpmOutOfRange { value: 500.0, min: 20.0, max: 400.0 };
        assert_eq!(err.to_string(), "BPM 500 is outside the supported range 20-400");
    }
}
