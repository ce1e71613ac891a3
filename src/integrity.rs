//! Cardinality checks run before a merge is trusted.
//!
//! A scrape that lost a page or doubled a row still produces a perfectly
//! well-formed roster; the only way to notice is to count.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use crate::error::IntegrityError;

/// Counts distinct keys produced by `key_fn`.
pub fn count_distinct<I, K, F>(items: I, key_fn: F) -> usize
where
    I: IntoIterator,
    F: FnMut(I::Item) -> K,
    K: Eq + Hash,
{
    items.into_iter().map(key_fn).collect::<HashSet<K>>().len()
}

/// Fails unless `items` map to exactly `expected` distinct keys.
///
/// # Errors
///
/// Returns `IntegrityError::CardinalityMismatch` carrying `(expected, actual)`.
///
/// # Examples
///
/// ```
/// use rollcall::integrity::check_cardinality;
///
/// let seats: Vec<u32> = (0..108).collect();
/// assert!(check_cardinality(&seats, |s| *s, 108).is_ok());
/// assert!(check_cardinality(&seats[1..], |s| *s, 108).is_err());
/// ```
pub fn check_cardinality<I, K, F>(items: I, key_fn: F, expected: usize) -> Result<(), IntegrityError>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> K,
    K: Eq + Hash,
{
    let actual = count_distinct(items, key_fn);
    if actual == expected {
        Ok(())
    } else {
        Err(IntegrityError::CardinalityMismatch {
            scope: "distinct keys".to_string(),
            expected,
            actual,
        })
    }
}

/// Fails unless every group listed in `expected` has exactly that many items.
///
/// Groups present in `items` but absent from `expected` are counted against an
/// expectation of zero. The first mismatch in group-name order is reported.
///
/// # Errors
///
/// Returns `IntegrityError::GroupSizeMismatch`.
pub fn check_group_sizes<I, F>(
    items: I,
    group_fn: F,
    expected: &BTreeMap<String, usize>,
) -> Result<(), IntegrityError>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> String,
{
    let mut actual: BTreeMap<String, usize> = BTreeMap::new();
    for group in items.into_iter().map(group_fn) {
        *actual.entry(group).or_default() += 1;
    }

    let groups: std::collections::BTreeSet<&String> = expected.keys().chain(actual.keys()).collect();
    for group in groups {
        let want = expected.get(group).copied().unwrap_or(0);
        let got = actual.get(group).copied().unwrap_or(0);
        if want != got {
            return Err(IntegrityError::GroupSizeMismatch {
                scope: "roster".to_string(),
                group: group.clone(),
                expected: want,
                actual: got,
            });
        }
    }
    Ok(())
}
