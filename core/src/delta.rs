//! # Report Delta
//!
//! Pure comparison of two normalized finding collections, keyed by
//! `(host, port, vulnerability id)`. No I/O.

use std::collections::{BTreeMap, BTreeSet};

use gvmkit_common::entities::{Finding, FindingKey, Severity};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityChange {
    pub key: FindingKey,
    pub before: Severity,
    pub after: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Delta {
    /// Keys only in the newer report.
    pub added: BTreeSet<FindingKey>,
    /// Keys only in the older report.
    pub removed: BTreeSet<FindingKey>,
    /// Keys in both whose severity differs, ordered by key.
    pub changed: Vec<SeverityChange>,
    pub unchanged: usize,
}

impl Delta {
    /// True when the two reports hold the same findings at the same severities.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

fn index(findings: &[Finding]) -> BTreeMap<FindingKey, &Finding> {
    findings.iter().map(|f| (f.key(), f)).collect()
}

/// Compares `older` against `newer`.
///
/// Severity changes use exact inequality. Both inputs are expected to be
/// key-unique (see [`crate::report::normalize`]); with duplicates the last
/// finding per key wins.
pub fn delta(older: &[Finding], newer: &[Finding]) -> Delta {
    let before = index(older);
    let after = index(newer);
    let mut delta = Delta::default();

    for (key, old) in &before {
        match after.get(key) {
            None => {
                delta.removed.insert(key.clone());
            }
            Some(new) if new.severity != old.severity => delta.changed.push(SeverityChange {
                key: key.clone(),
                before: old.severity,
                after: new.severity,
            }),
            Some(_) => delta.unchanged += 1,
        }
    }

    delta.added = after
        .keys()
        .filter(|key| !before.contains_key(*key))
        .cloned()
        .collect();

    delta
}
