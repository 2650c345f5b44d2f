//! Run configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "qubits": 1024,
//!   "test_fraction": 0.25,
//!   "abort_threshold": 4,
//!   "parity_check": [[1, 1, 0], [0, 1, 1]],
//!   "confirm_keys": true,
//!   "hasher": { "input_len": 288, "output_len": 24, "load_factor": 1.0 }
//! }
//! ```
//!
//! The hash seed is not part of the configuration: every run draws a fresh one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QkdError, Result};
use crate::privacy_amplification::HasherConfig;
use crate::reconciliation::ParityCheckMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Qubits sent per run.
    pub qubits: usize,
    /// Share of the sifted key sacrificed for parameter estimation.
    pub test_fraction: f64,
    /// Largest tolerated number of mismatches among the tested bits.
    pub abort_threshold: usize,
    pub parity_check: ParityCheckMatrix,
    /// Compare key tags after reconciliation.
    pub confirm_keys: bool,
    pub hasher: HasherConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            qubits: 1024,
            test_fraction: 0.25,
            abort_threshold: 4,
            parity_check: ParityCheckMatrix::repetition3(),
            confirm_keys: true,
            hasher: HasherConfig::new(288, 24, 1.0, None),
        }
    }
}

impl ProtocolConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.qubits == 0 {
            return Err(QkdError::InvalidConfig("qubits must be positive".into()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction <= 1.0) {
            return Err(QkdError::InvalidConfig(format!(
                "test_fraction must lie in (0, 1], got {}",
                self.test_fraction
            )));
        }
        if let Some(seed) = self.hasher.seed {
            return Err(QkdError::InvalidConfig(format!(
                "hasher seed {} is fixed, but the protocol draws a fresh seed for every run",
                seed
            )));
        }
        self.hasher.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy_amplification::HashSeed;

    #[test]
    fn test_default_is_valid() {
        ProtocolConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ProtocolConfig::from_json_str(
            r#"{"qubits": 64, "hasher": {"input_len": 12, "output_len": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.qubits, 64);
        assert_eq!(config.test_fraction, 0.25);
        assert_eq!(config.parity_check, ParityCheckMatrix::repetition3());
        assert_eq!(config.hasher.seed, None);
        assert_eq!(config.hasher.load_factor, 1.0);
    }

    #[test]
    fn test_fixed_hash_seed_is_rejected() {
        assert!(matches!(
            ProtocolConfig::from_json_str(
                r#"{"hasher": {"input_len": 12, "output_len": 4, "seed": 7}}"#
            ),
            Err(QkdError::InvalidConfig(_))
        ));
        let mut config = ProtocolConfig::default();
        config.hasher.seed = Some(HashSeed(7));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = ProtocolConfig::default();
        config.abort_threshold = 9;
        let text = config.to_json_pretty().unwrap();
        assert_eq!(ProtocolConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            ProtocolConfig::from_json_str(r#"{"qubits": 0}"#),
            Err(QkdError::InvalidConfig(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_json_str(r#"{"test_fraction": 0.0}"#),
            Err(QkdError::InvalidConfig(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_json_str(r#"{"hasher": {"input_len": 4, "output_len": 8}}"#),
            Err(QkdError::InvalidConfig(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_json_str(r#"{"parity_check": [[1, 0], [1]]}"#),
            Err(QkdError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            ProtocolConfig::from_path("/nonexistent/bb84.json"),
            Err(QkdError::Io(_))
        ));
    }
}
