//! Roster records and the join key that pairs them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower-cases, trims and collapses internal whitespace.
///
/// This is the only lexical tolerance the matcher applies on its own; every
/// other variant must be listed in an alias table.
#[must_use]
pub fn normalize_part(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic join key: normalized surname, forename and canonical group.
///
/// Two records denote the same person exactly when their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonKey {
    surname: String,
    forename: String,
    group: String,
}

impl PersonKey {
    /// Builds a key, normalizing every part.
    #[must_use]
    pub fn new(surname: &str, forename: &str, group: &str) -> Self {
        Self {
            surname: normalize_part(surname),
            forename: normalize_part(forename),
            group: normalize_part(group),
        }
    }

    /// The normalized surname.
    #[must_use]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    /// The normalized forename.
    #[must_use]
    pub fn forename(&self) -> &str {
        &self.forename
    }

    /// The normalized canonical group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }
}

impl fmt::Display for PersonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.surname, self.forename, self.group)
    }
}

/// Splits a scraped email cell into addresses.
///
/// Accepts `,`, `;` or whitespace separators and drops `mailto:` prefixes.
#[must_use]
pub fn split_emails(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|e| e.trim())
        .map(|e| e.strip_prefix("mailto:").unwrap_or(e))
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lower-cases addresses and drops repeats, keeping first-seen order.
#[must_use]
pub fn dedup_emails<'a, I>(emails: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for email in emails {
        let email = email.trim().to_lowercase();
        if !email.is_empty() && seen.insert(email.clone()) {
            out.push(email);
        }
    }
    out
}

/// One source's view of a person.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Forename as the source spells it.
    pub forename: String,
    /// Surname as the source spells it.
    pub surname: String,
    /// Affiliation-group (constituency, region).
    pub group: String,
    /// Party or role label.
    #[serde(default)]
    pub party: String,
    /// Zero or more email addresses.
    #[serde(default)]
    pub emails: Vec<String>,
    /// Optional image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Fax number; usually absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
}

impl CandidateRecord {
    /// Creates a record with the identifying fields set.
    #[must_use]
    pub fn new(forename: impl Into<String>, surname: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            forename: forename.into(),
            surname: surname.into(),
            group: group.into(),
            ..Self::default()
        }
    }

    /// Sets the party label.
    #[must_use]
    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.party = party.into();
        self
    }

    /// Appends an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    /// Sets the image reference. Empty strings count as absent.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = non_empty(image.into());
        self
    }

    /// Sets the fax number. Empty strings count as absent.
    #[must_use]
    pub fn with_fax(mut self, fax: impl Into<String>) -> Self {
        self.fax = non_empty(fax.into());
        self
    }

    /// `Forename Surname` for log lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.forename.trim(), self.surname.trim())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Which rosters contributed to a canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Both rosters had the person.
    Both,
    /// Only the primary roster had the person.
    PrimaryOnly,
    /// Only the secondary roster had the person.
    SecondaryOnly,
}

/// The single reconciled record for one real-world person.
///
/// Built once by the merger and never mutated afterwards, so fields are
/// read through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    key: PersonKey,
    forename: String,
    surname: String,
    group: String,
    party: String,
    emails: Vec<String>,
    image: Option<String>,
    fax: Option<String>,
    provenance: Provenance,
}

impl CanonicalRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key: PersonKey,
        forename: String,
        surname: String,
        group: String,
        party: String,
        emails: Vec<String>,
        image: Option<String>,
        fax: Option<String>,
        provenance: Provenance,
    ) -> Self {
        Self {
            key,
            forename,
            surname,
            group,
            party,
            emails,
            image,
            fax,
            provenance,
        }
    }

    /// The join key this record was merged under.
    #[must_use]
    pub fn key(&self) -> &PersonKey {
        &self.key
    }

    /// Display forename.
    #[must_use]
    pub fn forename(&self) -> &str {
        &self.forename
    }

    /// Display surname.
    #[must_use]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    /// Display affiliation-group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Party or role label.
    #[must_use]
    pub fn party(&self) -> &str {
        &self.party
    }

    /// Lower-cased, deduplicated addresses in preference order.
    #[must_use]
    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    /// Image reference, if any source had one.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Fax number, if any source had one.
    #[must_use]
    pub fn fax(&self) -> Option<&str> {
        self.fax.as_deref()
    }

    /// Which rosters contributed.
    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        self.provenance
    }
}
