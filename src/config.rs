//! Run configuration.
//!
//! One JSON document with optional `matcher`, `merger`, `resolver` and
//! `roster` sections. Missing sections take their defaults, so `{}` is a valid config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::matcher::MatcherConfig;
use crate::merger::MergerConfig;
use crate::resolver::ResolverOptions;
use crate::roster::RosterOptions;

/// Everything one reconciliation or resolution run is configured with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Alias tables and expected counts.
    #[serde(default)]
    pub matcher: MatcherConfig,
    /// Blacklist, precedence and secondary-only policy.
    #[serde(default)]
    pub merger: MergerConfig,
    /// Name clean-up and scheduling for the resolver.
    #[serde(default)]
    pub resolver: ResolverOptions,
    /// Layout of the input roster files.
    #[serde(default)]
    pub roster: RosterOptions,
}

impl ReconcileConfig {
    /// Parses a config from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` (with an empty path) or
    /// `ConfigError::Invalid` when the matcher tables do not compile.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io`, `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Checks tables that can only be validated by compiling them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` on the first bad entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matcher.compile()?;
        if self.resolver.delimiter.is_whitespace() {
            return Err(ValidationError::InvalidPattern {
                pattern: format!("{:?}", self.resolver.delimiter),
                reason: "delimiter must not be whitespace".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
