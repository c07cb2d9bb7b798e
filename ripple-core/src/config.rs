//! Runtime Configuration
//!
//! Knobs for the two hardening behaviours of the flush loop. Both default to
//! the safe choice.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default limit for consecutive cascading flush passes.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Catch a panicking effect so the rest of the flush pass still runs.
    pub isolate_failures: bool,

    /// Maximum number of consecutive passes whose effects were queued by
    /// other effects. `None` disables the guard.
    pub max_cascade_depth: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            isolate_failures: true,
            max_cascade_depth: Some(DEFAULT_MAX_CASCADE_DEPTH),
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReactiveError;

    #[test]
    fn defaults_are_hardened() {
        let config = RuntimeConfig::default();
        assert!(config.isolate_failures);
        assert_eq!(config.max_cascade_depth, Some(DEFAULT_MAX_CASCADE_DEPTH));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "isolate_failures": false }"#).unwrap();
        assert!(!config.isolate_failures);
        assert_eq!(config.max_cascade_depth, Some(DEFAULT_MAX_CASCADE_DEPTH));

        let config = RuntimeConfig::from_json(r#"{ "max_cascade_depth": null }"#).unwrap();
        assert!(config.isolate_failures);
        assert_eq!(config.max_cascade_depth, None);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RuntimeConfig::from_json("{ isolate_failures: yes").unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));
    }

    #[test]
    fn round_trips_through_json() {
        let config = RuntimeConfig {
            isolate_failures: false,
            max_cascade_depth: Some(8),
        };
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(RuntimeConfig::from_json(&text).unwrap(), config);
    }
}
