//! Emulator configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Instructions executed per host turn unless configured otherwise.
pub const DEFAULT_QUANTUM: u32 = 100_000;

/// Tunables for the execution scheduler.
///
/// The quantum is never zero; every constructor and the deserializer
/// reject it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct VmConfig {
    /// Maximum instructions per scheduling slice.
    quantum: u32,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawConfig {
    quantum: u32,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
        }
    }
}

impl TryFrom<RawConfig> for VmConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Self::with_quantum(raw.quantum)
    }
}

impl VmConfig {
    pub fn with_quantum(quantum: u32) -> Result<Self, ConfigError> {
        if quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        Ok(Self { quantum })
    }

    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::try_from(raw)
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
        }
    }
}

/// Errors that can occur while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("quantum must be at least one instruction")]
    ZeroQuantum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(VmConfig::default().quantum(), 100_000);
        assert_eq!(VmConfig::from_json("{}").unwrap(), VmConfig::default());
    }

    #[test]
    fn test_from_json() {
        let config = VmConfig::from_json(r#"{ "quantum": 500 }"#).unwrap();
        assert_eq!(config.quantum(), 500);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert_eq!(VmConfig::from_json(r#"{ "quantum": 0 }"#), Err(ConfigError::ZeroQuantum));
        assert!(matches!(VmConfig::from_json("quantum = 5"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_quantum_unrepresentable() {
        assert_eq!(VmConfig::with_quantum(0), Err(ConfigError::ZeroQuantum));
        assert_eq!(VmConfig::with_quantum(1).unwrap().quantum(), 1);
        // Direct deserialization goes through the same check.
        assert!(serde_json::from_str::<VmConfig>(r#"{ "quantum": 0 }"#).is_err());
        let config: VmConfig = serde_json::from_str(r#"{ "quantum": 7 }"#).unwrap();
        assert_eq!(config.quantum(), 7);
    }
}
