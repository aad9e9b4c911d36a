//! Configuration management and environment variable loading

use crate::{AugurError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default number of history entries exposed in a snapshot
pub const DEFAULT_HISTORY_WINDOW: usize = 30;

/// Load environment variables from a .env file
///
/// Safe to call multiple times. A missing file is not an error; the process
/// environment is used as-is.
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(AugurError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(AugurError::config(format!("Failed to load .env file: {}", e))),
    }
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as boolean
pub fn get_env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Runtime configuration for an Augur deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugurConfig {
    /// Directory holding one JSON state file per agent
    pub data_dir: PathBuf,

    /// Persist state to disk (false keeps everything in memory)
    pub persist_state: bool,

    /// Number of history entries returned in snapshots
    pub history_window: usize,

    /// Optional JSON file overriding the trait inference tables
    pub trait_tables: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for AugurConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./.augur/state"),
            persist_state: true,
            history_window: DEFAULT_HISTORY_WINDOW,
            trait_tables: None,
            log_level: "info".to_string(),
        }
    }
}

impl AugurConfig {
    /// Build configuration from `AUGUR_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let history_window = get_env_int("AUGUR_HISTORY_WINDOW", defaults.history_window);

        Self {
            data_dir: env::var("AUGUR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            persist_state: get_env_bool("AUGUR_PERSIST_STATE", defaults.persist_state),
            history_window: if history_window == 0 {
                DEFAULT_HISTORY_WINDOW
            } else {
                history_window
            },
            trait_tables: env::var("AUGUR_TRAIT_TABLES")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_level: get_env_or("AUGUR_LOG_LEVEL", &defaults.log_level),
        }
    }

    /// Validate values that cannot be defaulted silently
    pub fn validate(&self) -> Result<()> {
        if self.persist_state && self.data_dir.as_os_str().is_empty() {
            return Err(AugurError::config(
                "AUGUR_DATA_DIR must be set when AUGUR_PERSIST_STATE is enabled",
            ));
        }
        if let Some(path) = &self.trait_tables {
            if !path.exists() {
                return Err(AugurError::config(format!(
                    "Trait table file '{}' does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_bool() {
        env::set_var("AUGUR_TEST_BOOL_TRUE", "true");
        env::set_var("AUGUR_TEST_BOOL_0", "0");

        assert!(get_env_bool("AUGUR_TEST_BOOL_TRUE", false));
        assert!(!get_env_bool("AUGUR_TEST_BOOL_0", true));
        assert!(get_env_bool("AUGUR_TEST_NONEXISTENT", true));

        env::remove_var("AUGUR_TEST_BOOL_TRUE");
        env::remove_var("AUGUR_TEST_BOOL_0");
    }

    #[test]
    fn test_get_env_int() {
        env::set_var("AUGUR_TEST_INT", "42");
        env::set_var("AUGUR_TEST_INT_BAD", "forty");

        assert_eq!(get_env_int("AUGUR_TEST_INT", 0), 42);
        assert_eq!(get_env_int("AUGUR_TEST_INT_BAD", 7), 7);
        assert_eq!(get_env_int("AUGUR_TEST_NONEXISTENT", 99), 99);

        env::remove_var("AUGUR_TEST_INT");
        env::remove_var("AUGUR_TEST_INT_BAD");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AugurConfig::default();
        assert_eq!(config.history_window, DEFAULT_HISTORY_WINDOW);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_trait_tables_rejected() {
        let config = AugurConfig {
            trait_tables: Some(PathBuf::from("/definitely/not/here.json")),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AugurError::Config(_))));
    }
}
