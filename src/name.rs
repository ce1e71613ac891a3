//! Name canonicalization.
//!
//! Free-text personal and place names arrive in whatever casing the source
//! site used (`PAISLEY JNR`, `o'brien`, `NEWRY AND ARMAGH`). Everything here is
//! a pure string function; no lookups, no I/O.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The conjunction delimiter used in compound place names (matched in any case).
const CONJUNCTION: &str = " AND ";

/// Leading titles, longest first so `Rt. Hon. Sir` wins over `Sir`.
const TITLES: &[&str] = &[
    r"Rt\.?\s*Hon\.?\s+Sir",
    r"Rt\.?\s*Hon\.?",
    r"Hon\.?",
    r"Baroness",
    r"Lord",
    r"Lady",
    r"Sir",
    r"Mrs\.?",
    r"Ms\.?",
    r"Mr\.?",
    r"Dr\.?",
];

/// Post-nominal letters that trail a name.
const POST_NOMINALS: &[&str] = &[
    "MP", "MLA", "MEP", "MSP", "MS", "AM", "CBE", "OBE", "MBE", "QC", "KC",
];

static LEADING_TITLE: OnceLock<Regex> = OnceLock::new();
static TRAILING_POST_NOMINAL: OnceLock<Regex> = OnceLock::new();

fn leading_title() -> &'static Regex {
    LEADING_TITLE.get_or_init(|| {
        let pattern = format!(r"(?i)^\s*(?:{})(?:\s+|$)", TITLES.join("|"));
        Regex::new(&pattern).expect("title pattern is a valid regex")
    })
}

fn trailing_post_nominal() -> &'static Regex {
    TRAILING_POST_NOMINAL.get_or_init(|| {
        let pattern = format!(r",?\s+(?:{})\s*$", POST_NOMINALS.join("|"));
        Regex::new(&pattern).expect("post-nominal pattern is a valid regex")
    })
}

/// Splits `raw` into alternating word and delimiter segments.
///
/// Delimiters are `/`, the conjunction ` AND ` (any case), space, hyphen and
/// apostrophe.
/// Adjacent delimiters yield an empty word between them, so joining the
/// segments always reproduces the input.
fn segments(raw: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut word_start = 0;
    let mut i = 0;
    let bytes = raw.as_bytes();

    while i < bytes.len() {
        let delim_len = if bytes.len() - i >= CONJUNCTION.len()
            && bytes[i..i + CONJUNCTION.len()].eq_ignore_ascii_case(CONJUNCTION.as_bytes())
        {
            CONJUNCTION.len()
        } else if matches!(bytes[i], b'/' | b' ' | b'-' | b'\'') {
            1
        } else {
            0
        };

        if delim_len == 0 {
            // Advance by a whole char so slicing stays on a boundary.
            i += raw[i..].chars().next().map_or(1, char::len_utf8);
            continue;
        }

        out.push(&raw[word_start..i]);
        out.push(&raw[i..i + delim_len]);
        i += delim_len;
        word_start = i;
    }
    out.push(&raw[word_start..]);
    out
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `Mcdonald` -> `McDonald`, `Macdonald` -> `MacDonald`.
fn fix_gaelic_prefix(word: String) -> String {
    let prefix_len = if word.starts_with("Mc") {
        2
    } else if word.starts_with("Mac") {
        3
    } else {
        return word;
    };

    match word[prefix_len..].chars().next() {
        Some(c) if c.is_ascii_lowercase() => {
            let mut fixed = String::with_capacity(word.len());
            fixed.push_str(&word[..prefix_len]);
            fixed.push(c.to_ascii_uppercase());
            fixed.push_str(&word[prefix_len + 1..]);
            fixed
        }
        _ => word,
    }
}

/// Normalizes a person or place name into display casing.
///
/// Capitalization runs before the Gaelic-prefix fix-up, otherwise the
/// capitalization pass would lower the letter the fix-up raised again.
/// Delimiter segments go through the same pass, so the conjunction
/// ` AND ` comes out as ` and `.
///
/// # Examples
///
/// ```
/// use rollcall::name::canonicalize_name;
///
/// assert_eq!(canonicalize_name("o'brien"), "O'Brien");
/// assert_eq!(canonicalize_name("macdonald"), "MacDonald");
/// assert_eq!(canonicalize_name("NEWRY AND ARMAGH"), "Newry and Armagh");
/// assert_eq!(canonicalize_name("DUNWOODY-KNEAFSEY"), "Dunwoody-Kneafsey");
/// ```
#[must_use]
pub fn canonicalize_name(raw: &str) -> String {
    segments(raw)
        .into_iter()
        .map(capitalize)
        .map(fix_gaelic_prefix)
        .collect()
}

/// Removes leading titles (`Mr`, `Dr`, `Rt. Hon. Sir`, ...) and trailing
/// post-nominals (`MP`, `CBE`, ...). Whole words only, so `Drew` keeps its `Dr`.
///
/// A title is never stripped if nothing would be left of the name.
#[must_use]
pub fn strip_honorifics(raw: &str) -> String {
    let mut name = raw.trim().to_string();

    loop {
        let Some(m) = leading_title().find(&name) else { break };
        let rest = name[m.end()..].trim_start();
        if rest.is_empty() {
            break;
        }
        name = rest.to_string();
    }

    loop {
        let Some(m) = trailing_post_nominal().find(&name) else { break };
        if m.start() == 0 {
            break;
        }
        name.truncate(m.start());
    }

    name.trim().to_string()
}

/// Collapses whitespace runs and drops `*` footnote markers.
#[must_use]
pub fn tidy_whitespace(raw: &str) -> String {
    raw.replace('*', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// How a source lays out a full name in a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOrder {
    /// `Forename Surname Parts`: first token is the forename.
    ForenameFirst,
    /// `Forename Parts Surname`: last token is the surname.
    #[default]
    SurnameLast,
    /// `SURNAME PARTS FORENAME`: last token is the forename, with a trailing
    /// `Jnr` travelling with the forename.
    SurnameFirst,
}

impl FromStr for NameOrder {
    type Err = String;

    /// Accepts the serde names, with `-` or `_` between words.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "forename_first" => Ok(Self::ForenameFirst),
            "surname_last" => Ok(Self::SurnameLast),
            "surname_first" => Ok(Self::SurnameFirst),
            _ => Err(format!(
                "unknown name order '{s}' (expected forename-first, surname-last or surname-first)"
            )),
        }
    }
}

/// Splits a full name into `(forename, surname)`.
///
/// # Errors
///
/// Returns `ValidationError::UnsplittableName` when fewer than two tokens remain.
///
/// # Examples
///
/// ```
/// use rollcall::name::{split_full_name, NameOrder};
///
/// let (fore, sur) = split_full_name("PAISLEY IAN JNR", NameOrder::SurnameFirst).unwrap();
/// assert_eq!((fore.as_str(), sur.as_str()), ("IAN JNR", "PAISLEY"));
/// ```
pub fn split_full_name(raw: &str, order: NameOrder) -> Result<(String, String), ValidationError> {
    let tidy = tidy_whitespace(raw);
    let tokens: Vec<&str> = tidy.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.len() < 2 {
        return Err(ValidationError::UnsplittableName {
            name: raw.to_string(),
        });
    }

    let n = tokens.len();
    let split = match order {
        NameOrder::ForenameFirst => (tokens[0].to_string(), tokens[1..].join(" ")),
        NameOrder::SurnameLast => (tokens[..n - 1].join(" "), tokens[n - 1].to_string()),
        NameOrder::SurnameFirst => {
            let last = tokens[n - 1];
            if last.eq_ignore_ascii_case("jnr") && n >= 3 {
                (format!("{} {last}", tokens[n - 2]), tokens[..n - 2].join(" "))
            } else {
                (last.to_string(), tokens[..n - 1].join(" "))
            }
        }
    };
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_order_parses_either_separator() {
        assert_eq!("surname-first".parse::<NameOrder>(), Ok(NameOrder::SurnameFirst));
        assert_eq!("Forename_First".parse::<NameOrder>(), Ok(NameOrder::ForenameFirst));
        assert!("backwards".parse::<NameOrder>().is_err());
    }

    #[test]
    fn test_apostrophe_is_a_delimiter() {
        assert_eq!(canonicalize_name("o'brien"), "O'Brien");
        assert_eq!(canonicalize_name("O'NEILL"), "O'Neill");
    }

    #[test]
    fn test_gaelic_prefixes() {
        assert_eq!(canonicalize_name("macdonald"), "MacDonald");
        assert_eq!(canonicalize_name("mcintyre"), "McIntyre");
        assert_eq!(canonicalize_name("MCLEOD"), "McLeod");
        assert_eq!(canonicalize_name("Mc"), "Mc");
    }

    #[test]
    fn test_single_segment() {
        assert_eq!(canonicalize_name("paisley"), "Paisley");
        assert_eq!(canonicalize_name(""), "");
    }

    #[test]
    fn test_delimiters_preserved_in_place() {
        assert_eq!(canonicalize_name("ELIS-THOMAS"), "Elis-Thomas");
        assert_eq!(canonicalize_name("upper bann/lagan"), "Upper Bann/Lagan");
        assert_eq!(canonicalize_name("a  b"), "A  B");
        assert_eq!(canonicalize_name("FERMANAGH AND SOUTH TYRONE"), "Fermanagh and South Tyrone");
        assert_eq!(canonicalize_name("newry and armagh"), "Newry and Armagh");
    }

    #[test]
    fn test_idempotent() {
        for raw in [
            "o'brien",
            "macdonald",
            "MCINTYRE",
            "NEWRY AND ARMAGH",
            "mid-ulster",
            "PAISLEY JNR",
            "belfast north/south",
            "Mack",
            "ÉIREANN",
        ] {
            let once = canonicalize_name(raw);
            assert_eq!(canonicalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_strip_honorifics() {
        assert_eq!(strip_honorifics("Mr Gareth Thomas"), "Gareth Thomas");
        assert_eq!(strip_honorifics("Rt. Hon. Sir Graham Watson"), "Graham Watson");
        assert_eq!(strip_honorifics("Dr Tony Wright MP"), "Tony Wright");
        assert_eq!(strip_honorifics("Baroness Ludford"), "Ludford");
        assert_eq!(strip_honorifics("Mrs Jean Lambert, MEP"), "Jean Lambert");
        assert_eq!(strip_honorifics("Edward McMillan-Scott CBE"), "Edward McMillan-Scott");
    }

    #[test]
    fn test_strip_honorifics_whole_words_only() {
        assert_eq!(strip_honorifics("Drew Smith"), "Drew Smith");
        assert_eq!(strip_honorifics("Mrsa Jones"), "Mrsa Jones");
        assert_eq!(strip_honorifics("Lord"), "Lord");
    }

    #[test]
    fn test_tidy_whitespace() {
        assert_eq!(tidy_whitespace("  PAISLEY   IAN*\n"), "PAISLEY IAN");
    }

    #[test]
    fn test_split_full_name_orders() {
        assert_eq!(
            split_full_name("Annunziata Rees-Mogg", NameOrder::ForenameFirst).unwrap(),
            ("Annunziata".to_string(), "Rees-Mogg".to_string())
        );
        assert_eq!(
            split_full_name("Mary de la Cruz", NameOrder::ForenameFirst).unwrap(),
            ("Mary".to_string(), "de la Cruz".to_string())
        );
        assert_eq!(
            split_full_name("Carl Iwan Sargeant", NameOrder::SurnameLast).unwrap(),
            ("Carl Iwan".to_string(), "Sargeant".to_string())
        );
        assert_eq!(
            split_full_name("ADAMS GERRY", NameOrder::SurnameFirst).unwrap(),
            ("GERRY".to_string(), "ADAMS".to_string())
        );
        assert_eq!(
            split_full_name("PAISLEY IAN JNR", NameOrder::SurnameFirst).unwrap(),
            ("IAN JNR".to_string(), "PAISLEY".to_string())
        );
    }

    #[test]
    fn test_split_full_name_rejects_single_token() {
        let err = split_full_name("Cher", NameOrder::SurnameLast).unwrap_err();
        assert!(matches!(err, ValidationError::UnsplittableName { .. }));
    }
}
