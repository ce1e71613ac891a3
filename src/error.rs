//! Error types for rollcall.
//!
//! Two outcome kinds are kept apart:
//! per-record resolution problems are [`ResolutionFailure`] values that travel
//! inside a `Result` and are recovered line by line, while batch invariant
//! violations are [`IntegrityError`]s that abort a merge run.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Validation errors that occur while checking input or configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Cannot split '{name}' into forename and surname")]
    UnsplittableName {
        name: String,
    },

    #[error("Malformed observation on line {line}: {reason}")]
    MalformedObservation {
        line: usize,
        reason: String,
    },

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        value: String,
    },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    #[error("Alias table '{table}' has an empty entry at position {index}")]
    EmptyAlias {
        table: String,
        index: usize,
    },
}

/// Why a single observation failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The register has nobody matching the triple.
    NoMatch,
    /// The register could not interpret the context (e.g. an unknown historical grouping).
    ContextLookup {
        detail: String,
    },
    /// More than one person matched the triple.
    Ambiguous {
        candidates: Vec<String>,
    },
    /// The input line could not be parsed into a triple.
    MalformedInput {
        detail: String,
    },
    /// The register backend failed for this lookup.
    RegisterUnavailable {
        detail: String,
    },
}

impl FailureKind {
    /// Returns a short stable identifier suitable for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoMatch => "no_match",
            Self::ContextLookup { .. } => "context_lookup",
            Self::Ambiguous { .. } => "ambiguous",
            Self::MalformedInput { .. } => "malformed_input",
            Self::RegisterUnavailable { .. } => "register_unavailable",
        }
    }
}

/// A recoverable per-record resolution failure.
///
/// Carries the original input triple so the caller can log it for manual triage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// The name as it appeared in the input.
    pub name: String,
    /// The affiliation context, if one was supplied.
    pub context: Option<String>,
    /// The as-of date, if the line got far enough to parse one.
    pub as_of: Option<NaiveDate>,
    /// What went wrong.
    pub kind: FailureKind,
}

impl ResolutionFailure {
    /// Creates a failure for the given input triple.
    #[must_use]
    pub fn new(name: impl Into<String>, context: Option<String>, as_of: Option<NaiveDate>, kind: FailureKind) -> Self {
        Self {
            name: name.into(),
            context,
            as_of,
            kind,
        }
    }

    /// Returns true if the register rejected the context rather than the name.
    #[must_use]
    pub const fn is_context_lookup(&self) -> bool {
        matches!(self.kind, FailureKind::ContextLookup { .. })
    }

    /// Renders the single diagnostic line emitted on the error channel.
    #[must_use]
    pub fn diagnostic_line(&self) -> String {
        let context = self.context.as_deref().unwrap_or("");
        let date = self
            .as_of
            .map(|d| d.to_string())
            .unwrap_or_default();
        format!("failed to match {} ({}) {}", self.name, context, date)
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diagnostic_line())?;
        match &self.kind {
            FailureKind::NoMatch => Ok(()),
            FailureKind::ContextLookup { detail } => write!(f, ": bad context: {detail}"),
            FailureKind::Ambiguous { candidates } => {
                write!(f, ": ambiguous between {}", candidates.join(", "))
            }
            FailureKind::MalformedInput { detail } | FailureKind::RegisterUnavailable { detail } => {
                write!(f, ": {detail}")
            }
        }
    }
}

impl std::error::Error for ResolutionFailure {}

/// Errors reported by an identity register backend.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The context string does not name any grouping the register knows.
    #[error("Unknown context: {context}")]
    UnknownContext {
        context: String,
    },

    /// More than one person matched.
    #[error("Ambiguous lookup for '{name}': {} candidates", .candidates.len())]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    /// Backend error.
    #[error("Register backend error: {0}")]
    BackendError(String),
}

/// Batch-level invariant violations. Fatal to the current merge run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("Cardinality mismatch for {scope}: expected {expected}, found {actual}")]
    CardinalityMismatch {
        scope: String,
        expected: usize,
        actual: usize,
    },

    #[error("Headcount mismatch for '{group}' in {scope}: expected {expected}, found {actual}")]
    GroupSizeMismatch {
        scope: String,
        group: String,
        expected: usize,
        actual: usize,
    },
}

impl IntegrityError {
    /// Returns the (expected, actual) pair carried by this error.
    #[must_use]
    pub const fn counts(&self) -> (usize, usize) {
        match self {
            Self::CardinalityMismatch { expected, actual, .. }
            | Self::GroupSizeMismatch { expected, actual, .. } => (*expected, *actual),
        }
    }

    /// Replaces the scope description, e.g. `distinct groups in primary roster`.
    #[must_use]
    pub fn with_scope(self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        match self {
            Self::CardinalityMismatch { expected, actual, .. } => Self::CardinalityMismatch {
                scope,
                expected,
                actual,
            },
            Self::GroupSizeMismatch { group, expected, actual, .. } => Self::GroupSizeMismatch {
                scope,
                group,
                expected,
                actual,
            },
        }
    }
}

/// Errors raised while loading run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

/// Errors raised while reading or writing roster tables.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to open roster {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Roster CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid roster row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: ValidationError,
    },
}

/// Top-level error type for rollcall.
#[derive(Debug, Error)]
pub enum RollcallError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RollcallError {
    /// Returns true if this is an integrity violation.
    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

/// Result type alias for rollcall operations.
pub type RollcallResult<T> = Result<T, RollcallError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_diagnostic_line_carries_triple() {
        let failure = ResolutionFailure::new(
            "Gareth Thomas",
            Some("Clwyd West".to_string()),
            Some(date("2004-12-07")),
            FailureKind::NoMatch,
        );
        assert_eq!(
            failure.diagnostic_line(),
            "failed to match Gareth Thomas (Clwyd West) 2004-12-07"
        );
    }

    #[test]
    fn test_context_failure_display_includes_detail() {
        let failure = ResolutionFailure {
            name: "Ian Paisley".to_string(),
            context: Some("Atlantis".to_string()),
            as_of: Some(date("2006-02-15")),
            kind: FailureKind::ContextLookup {
                detail: "Unknown context: Atlantis".to_string(),
            },
        };
        assert!(failure.is_context_lookup());
        let msg = format!("{failure}");
        assert!(msg.contains("bad context"));
        assert!(msg.contains("Atlantis"));
    }

    #[test]
    fn test_cardinality_mismatch_message() {
        let err = IntegrityError::CardinalityMismatch {
            scope: "distinct keys".to_string(),
            expected: 108,
            actual: 107,
        }
        .with_scope("distinct persons in primary roster");
        let msg = format!("{err}");
        assert!(msg.contains("108"));
        assert!(msg.contains("107"));
        assert!(msg.contains("distinct persons in primary roster"));
        assert_eq!(err.counts(), (108, 107));
    }

    #[test]
    fn test_rollcall_error_classification() {
        let integrity: RollcallError = IntegrityError::GroupSizeMismatch {
            scope: "secondary roster".to_string(),
            group: "Wales".to_string(),
            expected: 4,
            actual: 3,
        }
        .into();
        assert!(integrity.is_integrity());

        let config: RollcallError = ValidationError::UnsplittableName {
            name: "Adams".to_string(),
        }
        .into();
        assert!(!config.is_integrity());
    }
}
