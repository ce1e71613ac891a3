//! Roster tables on disk.
//!
//! Both inputs and the merged output use the same seven columns:
//! `First,Last,Constituency,Party,Email,Fax,Image`. Multiple addresses share
//! the `Email` cell, comma-separated.
//!
//! Some scrapers only have a single `Name` column. When `First` and `Last`
//! are both blank the full name is split according to a [`NameOrder`].

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RosterError;
use crate::name::{split_full_name, NameOrder};
use crate::record::{split_emails, CandidateRecord, CanonicalRecord};

/// How each input roster lays out a `Name`-only column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterOptions {
    /// Name order of roster A.
    pub primary_name_order: NameOrder,
    /// Name order of roster B.
    pub secondary_name_order: NameOrder,
}

/// Column headers, in order.
pub const HEADERS: [&str; 7] = ["First", "Last", "Constituency", "Party", "Email", "Fax", "Image"];

#[derive(Debug, Default, Serialize, Deserialize)]
struct RosterRow {
    #[serde(rename = "First", default)]
    first: String,
    #[serde(rename = "Last", default)]
    last: String,
    #[serde(rename = "Constituency", default)]
    constituency: String,
    #[serde(rename = "Party", default)]
    party: String,
    #[serde(rename = "Email", default)]
    email: String,
    #[serde(rename = "Fax", default)]
    fax: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "Name", default, skip_serializing)]
    name: String,
}

impl RosterRow {
    fn into_record(self, order: NameOrder, row: usize) -> Result<CandidateRecord, RosterError> {
        let (first, last) = if self.first.is_empty() && self.last.is_empty() && !self.name.is_empty() {
            split_full_name(&self.name, order).map_err(|source| RosterError::Row { row, source })?
        } else {
            (self.first, self.last)
        };
        let mut record = CandidateRecord::new(first, last, self.constituency)
            .with_party(self.party)
            .with_fax(self.fax)
            .with_image(self.image);
        record.emails = split_emails(&self.email);
        Ok(record)
    }
}

impl From<&CanonicalRecord> for RosterRow {
    fn from(record: &CanonicalRecord) -> Self {
        Self {
            first: record.forename().to_string(),
            last: record.surname().to_string(),
            constituency: record.group().to_string(),
            party: record.party().to_string(),
            email: record.emails().join(","),
            fax: record.fax().unwrap_or_default().to_string(),
            image: record.image().unwrap_or_default().to_string(),
            name: String::new(),
        }
    }
}

/// Reads a roster from any reader. The first row must be the header.
///
/// # Errors
///
/// Returns `RosterError::Csv` on malformed rows.
pub fn read_roster<R: Read>(reader: R) -> Result<Vec<CandidateRecord>, RosterError> {
    read_roster_with_order(reader, NameOrder::default())
}

/// As [`read_roster`], splitting `Name`-only rows with `order`.
///
/// # Errors
///
/// Returns `RosterError::Csv` on malformed rows and `RosterError::Row` for a
/// `Name` that cannot be split. Row numbers count data rows from 1.
pub fn read_roster_with_order<R: Read>(reader: R, order: NameOrder) -> Result<Vec<CandidateRecord>, RosterError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for (idx, row) in csv.deserialize::<RosterRow>().enumerate() {
        records.push(row?.into_record(order, idx + 1)?);
    }
    Ok(records)
}

/// Reads a roster file.
///
/// # Errors
///
/// Returns `RosterError::Io` if the file cannot be opened, otherwise as
/// [`read_roster`].
pub fn read_roster_file(path: impl AsRef<Path>) -> Result<Vec<CandidateRecord>, RosterError> {
    read_roster_file_with_order(path, NameOrder::default())
}

/// As [`read_roster_file`], splitting `Name`-only rows with `order`.
///
/// # Errors
///
/// Returns `RosterError::Io` if the file cannot be opened, otherwise as
/// [`read_roster_with_order`].
pub fn read_roster_file_with_order(path: impl AsRef<Path>, order: NameOrder) -> Result<Vec<CandidateRecord>, RosterError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_roster_with_order(file, order)?;
    tracing::debug!(path = %path.display(), records = records.len(), ?order, "read roster");
    Ok(records)
}

/// Writes canonical records with a header row.
///
/// # Errors
///
/// Returns `RosterError::Csv` if a row cannot be written.
pub fn write_roster<W: Write>(writer: W, records: &[CanonicalRecord]) -> Result<(), RosterError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    if records.is_empty() {
        csv.write_record(HEADERS)?;
    }
    for record in records {
        csv.serialize(RosterRow::from(record))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes canonical records to a file, replacing it.
///
/// # Errors
///
/// Returns `RosterError::Io` if the file cannot be created, otherwise as
/// [`write_roster`].
pub fn write_roster_file(path: impl AsRef<Path>, records: &[CanonicalRecord]) -> Result<(), RosterError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_roster(BufWriter::new(file), records)
}
