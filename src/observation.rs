//! Observations: single scraped claims about a person at a point in time.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default field separator for observation lines.
pub const DEFAULT_DELIMITER: char = '#';

/// Which scraper or export produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTag(String);

impl SourceTag {
    /// Creates a source tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// A single scraped fact about a person at a point in time.
///
/// Immutable once created; one per input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// The name exactly as scraped.
    pub raw_name: String,
    /// Affiliation context such as a constituency or `House of Lords`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_context: Option<String>,
    /// The date the claim refers to.
    pub as_of_date: NaiveDate,
    /// Which source produced it.
    pub source_tag: SourceTag,
}

impl Observation {
    /// Creates an observation. An empty or whitespace-only context becomes `None`.
    #[must_use]
    pub fn new(
        raw_name: impl Into<String>,
        role_context: Option<&str>,
        as_of_date: NaiveDate,
        source_tag: SourceTag,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            role_context: role_context
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            as_of_date,
            source_tag,
        }
    }

    /// Parses a `name<delim>context<delim>YYYY-MM-DD` line.
    ///
    /// `line_no` is 1-based and only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MalformedObservation` when the line does not
    /// have exactly three fields or the name is empty, and
    /// `ValidationError::InvalidDate` when the date does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use rollcall::observation::{Observation, SourceTag};
    ///
    /// let obs = Observation::parse_line("Gerry Adams#Belfast West#2006-02-15\n", '#', 1, SourceTag::new("stdin")).unwrap();
    /// assert_eq!(obs.raw_name, "Gerry Adams");
    /// assert_eq!(obs.role_context.as_deref(), Some("Belfast West"));
    /// ```
    pub fn parse_line(
        line: &str,
        delimiter: char,
        line_no: usize,
        source_tag: SourceTag,
    ) -> Result<Self, ValidationError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(delimiter).collect();
        let [name, context, date] = fields.as_slice() else {
            return Err(ValidationError::MalformedObservation {
                line: line_no,
                reason: format!("expected 3 fields separated by '{delimiter}', found {}", fields.len()),
            });
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MalformedObservation {
                line: line_no,
                reason: "empty name".to_string(),
            });
        }

        let date = date.trim();
        let as_of_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            ValidationError::InvalidDate {
                value: date.to_string(),
            }
        })?;

        Ok(Self::new(name, Some(context), as_of_date, source_tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag() -> SourceTag {
        SourceTag::new("test")
    }

    #[test]
    fn parses_triple() {
        let obs = Observation::parse_line("Ian Paisley#North Antrim#2006-02-15", '#', 1, tag()).unwrap();
        assert_eq!(obs.raw_name, "Ian Paisley");
        assert_eq!(obs.role_context.as_deref(), Some("North Antrim"));
        assert_eq!(obs.as_of_date, NaiveDate::from_ymd_opt(2006, 2, 15).unwrap());
        assert_eq!(obs.source_tag.as_str(), "test");
    }

    #[test]
    fn empty_context_is_none() {
        let obs = Observation::parse_line("Lord Steel##2006-04-10\r\n", '#', 3, tag()).unwrap();
        assert_eq!(obs.role_context, None);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = Observation::parse_line("Ian Paisley#2006-02-15", '#', 7, tag()).unwrap_err();
        match err {
            ValidationError::MalformedObservation { line, reason } => {
                assert_eq!(line, 7);
                assert!(reason.contains("found 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_bad_date() {
        let err = Observation::parse_line("Ian Paisley#North Antrim#15/02/2006", '#', 1, tag()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDate { .. }));
    }

    #[test]
    fn custom_delimiter() {
        let obs = Observation::parse_line("A Person|Wales|2020-01-31", '|', 1, tag()).unwrap();
        assert_eq!(obs.role_context.as_deref(), Some("Wales"));
    }
}
