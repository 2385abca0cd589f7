//! Engine behaviour configuration.

use std::{env, str::FromStr};
use thiserror::Error;

/// Environment configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} must be a valid {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Parse `var` from the environment, falling back to `default` when unset
pub(crate) fn env_or<T: FromStr>(
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, EnvConfigError> {
    match env::var(var) {
        Ok(value) => value.trim().parse().map_err(|_| EnvConfigError::Invalid {
            var,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Tunables for [`crate::CompetitionManager`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How often a mutation is re-run after losing an optimistic-concurrency race
    pub max_commit_retries: u32,
    /// Grand final reset used when a new tournament does not specify one
    pub default_grand_final_reset: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 3,
            default_grand_final_reset: true,
        }
    }
}

impl EngineConfig {
    /// Load from `ENGINE_MAX_COMMIT_RETRIES` and `ENGINE_DEFAULT_GRAND_FINAL_RESET`
    pub fn from_env() -> Result<Self, EnvConfigError> {
        let defaults = Self::default();
        let default_grand_final_reset = match env::var("ENGINE_DEFAULT_GRAND_FINAL_RESET") {
            Ok(value) => parse_flag(&value).ok_or(EnvConfigError::Invalid {
                var: "ENGINE_DEFAULT_GRAND_FINAL_RESET",
                expected: "boolean",
                value,
            })?,
            Err(_) => defaults.default_grand_final_reset,
        };
        Ok(Self {
            max_commit_retries: env_or(
                "ENGINE_MAX_COMMIT_RETRIES",
                defaults.max_commit_retries,
                "u32",
            )?,
            default_grand_final_reset,
        })
    }
}

/// Accepts 1/0, true/false, yes/no, on/off
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
