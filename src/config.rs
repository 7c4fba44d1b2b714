use crate::core::currency::CurrencyTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const ENV_STABLES: &str = "PNL_STABLE_CURRENCIES";
pub const ENV_MAJORS: &str = "PNL_MAJOR_CURRENCIES";
pub const ENV_VISIBLE_ONLY: &str = "PNL_COMPUTE_VISIBLE_ONLY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Engine settings: the currency role table and the default compute mode.
///
/// ```json
/// {
///   "currencies": { "stables": ["USD", "USDC"], "majors": ["BTC", "ETH"] },
///   "computeVisibleOnly": false
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub currencies: CurrencyTable,
    pub compute_visible_only: bool,
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    /// Defaults overridden by whichever variables are present.
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = CurrencyTable::default();
        let list = |key: &str, fallback: Vec<String>| -> Vec<String> {
            match env_map.get(key) {
                Some(raw) => raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => fallback,
            }
        };
        let stables = list(
            ENV_STABLES,
            defaults.stables().iter().map(|s| s.to_string()).collect(),
        );
        let majors = list(
            ENV_MAJORS,
            defaults.majors().iter().map(|s| s.to_string()).collect(),
        );

        let compute_visible_only = match env_map.get(ENV_VISIBLE_ONLY).map(|s| s.as_str()) {
            None | Some("") => false,
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    ENV_VISIBLE_ONLY.to_string(),
                    format!("expected true or false, got {}", other),
                ))
            }
        };

        Ok(Self {
            currencies: CurrencyTable::new(stables, majors),
            compute_visible_only,
        })
    }
}
