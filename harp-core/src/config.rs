//! # Trainer Configuration
//!
//! User settings persisted as pretty-printed JSON. Every field has a default,
//! so a partial file (or no file at all) is valid.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::catalog::Register;
use crate::error::ConfigError;
use crate::harp::HarpKey;
use crate::sequencer::PlayMode;
use crate::timeline::{Bpm, DEFAULT_BPM};

/// Environment variable naming the config file to use.
pub const CONFIG_ENV: &str = "HARP_TRAINER_CONFIG";
/// Config file looked up in the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "harp_trainer.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Lick files or directories of `.json` files; empty uses the bundled licks
    pub catalog_paths: Vec<PathBuf>,
    /// Root of the `<KEY>_harp/` sample folders; synthesized tones when unset
    pub samples_dir: Option<PathBuf>,
    pub key: HarpKey,
    pub scale: String,
    pub register: Register,
    pub bpm: f64,
    pub mode: PlayMode,
    /// Pick a new lick for every call-and-response cycle
    pub reselect_each_cycle: bool,
    /// Fixed RNG seed for reproducible lick order
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            catalog_paths: Vec::new(),
            samples_dir: None,
            key: HarpKey::C,
            scale: "Major".to_string(),
            register: Register::Middle,
            bpm: DEFAULT_BPM,
            mode: PlayMode::Once,
            reselect_each_cycle: false,
            seed: None,
        }
    }
}

impl TrainerConfig {
    /// Loads from `$HARP_TRAINER_CONFIG`, or `harp_trainer.json`.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Reads and validates a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut data = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut data))
            .map_err(io_error)?;
        let config: TrainerConfig = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.bpm()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = File::create(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        file.write_all(json.as_bytes()).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn bpm(&self) -> Result<Bpm, ConfigError> {
        Bpm::new(self.bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("harp-config-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial.json");
        std::fs::write(&path, r#"{ "key": "G", "scale": "Blues", "bpm": 90, "mode": "call_and_response" }"#)
            .unwrap();
        let config = TrainerConfig::load_from(&path).unwrap();
        assert_eq!(config.key, HarpKey::G);
        assert_eq!(config.scale, "Blues");
        assert_eq!(config.register, Register::Middle);
        assert_eq!(config.mode, PlayMode::CallAndResponse);
        assert_eq!(config.bpm().unwrap().value(), 90.0);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("saved.json");
        let config = TrainerConfig {
            key: HarpKey::Bb,
            register: Register::High,
            reselect_each_cycle: true,
            seed: Some(7),
            samples_dir: Some(PathBuf::from("samples")),
            ..TrainerConfig::default()
        };
        config.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"key\": \"Bb\""));
        assert_eq!(TrainerConfig::load_from(&path).unwrap(), config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_files_are_config_errors() {
        let path = temp_path("bad-bpm.json");
        std::fs::write(&path, r#"{ "bpm": 999 }"#).unwrap();
        assert!(matches!(
            TrainerConfig::load_from(&path),
            Err(ConfigError::BpmOutOfRange { .. })
        ));

        std::fs::write(&path, r#"{ "key": "H" }"#).unwrap();
        assert!(matches!(TrainerConfig::load_from(&path), Err(ConfigError::Parse { .. })));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            TrainerConfig::load_from(&temp_path("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
