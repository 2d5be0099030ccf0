//! Runtime configuration
//!
//! Reads configuration from environment variables:
//! - `PYTRACE_TIMEOUT_MS`: how long the bridge waits for a run (default: 10000)
//! - `PYTRACE_STEP_BUDGET`: steps recorded before a trace is truncated (default: 1000)
//!
//! Command-line flags override both and are held to the same rules
//! ([`Config::with_overrides`]).

use crate::interpreter::constants::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_SEQUENCE_LEN};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STEP_BUDGET: usize = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// The interpreter recurses on the native stack, so every run gets a thread with a large one
pub const DEFAULT_RUN_STACK_SIZE: usize = 256 * 1024 * 1024;

pub const TIMEOUT_ENV: &str = "PYTRACE_TIMEOUT_MS";
pub const STEP_BUDGET_ENV: &str = "PYTRACE_STEP_BUDGET";
pub const TIMEOUT_FLAG: &str = "--timeout-ms";
pub const STEP_BUDGET_FLAG: &str = "--step-budget";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Limits applied to one traced run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerLimits {
    pub step_budget: usize,
    pub max_call_depth: usize,
    pub max_sequence_len: usize,
    /// Stack of the thread each run executes on
    pub run_stack_size: usize,
}

impl Default for TracerLimits {
    fn default() -> Self {
        TracerLimits {
            step_budget: DEFAULT_STEP_BUDGET,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
            run_stack_size: DEFAULT_RUN_STACK_SIZE,
        }
    }
}

/// Settings of the sandbox bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Wall-clock bound on one `execute` call
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Values given on the command line; each one wins over its variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub timeout_ms: Option<u64>,
    pub step_budget: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub limits: TracerLimits,
    pub bridge: BridgeConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(ms) = positive_var(&lookup, TIMEOUT_ENV)? {
            config.bridge.timeout = Duration::from_millis(ms as u64);
        }
        if let Some(budget) = positive_var(&lookup, STEP_BUDGET_ENV)? {
            config.limits.step_budget = budget;
        }
        Ok(config)
    }

    /// Apply command-line values under the same positivity rule as the environment
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(ms) = overrides.timeout_ms {
            self.bridge.timeout = Duration::from_millis(ensure_positive(TIMEOUT_FLAG, ms, &ms.to_string())?);
        }
        if let Some(budget) = overrides.step_budget {
            self.limits.step_budget = ensure_positive(STEP_BUDGET_FLAG, budget, &budget.to_string())?;
        }
        Ok(self)
    }
}

fn ensure_positive<T>(name: &'static str, value: T, raw: &str) -> Result<T, ConfigError>
where
    T: Default + PartialOrd,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        })
    }
}

fn positive_var(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) => ensure_positive(name, n, &raw).map(Some),
        Err(_) => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.limits.step_budget, 1000);
        assert_eq!(config.bridge.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = Config::from_lookup(|name| match name {
            TIMEOUT_ENV => Some("250".to_string()),
            STEP_BUDGET_ENV => Some(" 50 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bridge.timeout, Duration::from_millis(250));
        assert_eq!(config.limits.step_budget, 50);
    }

    #[test]
    fn test_rejects_invalid_numbers() {
        let err = Config::from_lookup(|name| (name == STEP_BUDGET_ENV).then(|| "0".to_string()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "PYTRACE_STEP_BUDGET must be a positive integer, got '0'"
        );
        assert!(Config::from_lookup(|name| (name == TIMEOUT_ENV).then(|| "soon".to_string())).is_err());
    }

    #[test]
    fn test_flags_override_variables() {
        let env = Config::from_lookup(|name| (name == STEP_BUDGET_ENV).then(|| "50".to_string())).unwrap();
        let config = env
            .with_overrides(Overrides {
                timeout_ms: Some(750),
                step_budget: Some(20),
            })
            .unwrap();
        assert_eq!(config.bridge.timeout, Duration::from_millis(750));
        assert_eq!(config.limits.step_budget, 20);

        let unchanged = env.with_overrides(Overrides::default()).unwrap();
        assert_eq!(unchanged, env);
    }

    #[test]
    fn test_rejects_zero_flags() {
        let err = Config::default()
            .with_overrides(Overrides {
                step_budget: Some(0),
                ..Overrides::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "--step-budget must be a positive integer, got '0'");

        let err = Config::default()
            .with_overrides(Overrides {
                timeout_ms: Some(0),
                ..Overrides::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: TIMEOUT_FLAG,
                value: "0".to_string()
            }
        );
    }
}
