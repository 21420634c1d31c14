#![forbid(unsafe_code)]

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aditivo_engines::ValuationConfig;
use aditivo_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] ContractViolation),
}

/// Runtime configuration shared by the ledger, totals and registry runtimes.
///
/// Deserialises from TOML; absent keys keep their `mvp_v1()` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub valuation: ValuationConfig,
    /// Largest tolerated gap between the stored and the derived total.
    pub consistency_epsilon: Decimal,
    /// Re-derive the total inside every mutating unit of work.
    pub verify_after_mutation: bool,
}

impl EngineConfig {
    pub fn mvp_v1() -> Self {
        Self {
            valuation: ValuationConfig::mvp_v1(),
            consistency_epsilon: Decimal::new(5, 3),
            verify_after_mutation: true,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.consistency_epsilon.is_sign_negative() && !self.consistency_epsilon.is_zero() {
            return Err(ContractViolation::InvalidValue {
                field: "engine_config.consistency_epsilon",
                reason: "must be >= 0",
            });
        }
        Ok(())
    }
}
