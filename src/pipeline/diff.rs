//! Diff engine.
//!
//! Compares the freshly extracted fingerprint against the baseline
//! position by position. Whatever the outcome, the fresh fingerprint becomes
//! the new baseline, including an empty one left by a failed fetch.

use std::fmt;

use crate::models::Fingerprint;

/// Outcome of comparing a fingerprint against the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// No baseline existed; the fingerprint was recorded as the baseline.
    Baseline,
    /// Same assets in the same order.
    Unchanged,
    /// The number of assets differs.
    CountChanged { previous: usize, current: usize },
    /// First position whose asset differs.
    EntryChanged {
        index: usize,
        previous: String,
        current: String,
    },
}

impl Change {
    /// Whether this outcome means a new build was deployed.
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            Change::CountChanged { .. } | Change::EntryChanged { .. }
        )
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Baseline => write!(f, "recorded first fingerprint as baseline"),
            Change::Unchanged => write!(f, "no change"),
            Change::CountChanged { previous, current } => {
                write!(f, "asset count changed: {previous} -> {current}")
            }
            Change::EntryChanged {
                index,
                previous,
                current,
            } => write!(f, "asset #{index} changed: {previous} -> {current}"),
        }
    }
}

/// Compare `current` against `previous` without touching any state.
pub fn compare(previous: Option<&Fingerprint>, current: &Fingerprint) -> Change {
    let Some(previous) = previous else {
        return Change::Baseline;
    };

    if previous.len() != current.len() {
        return Change::CountChanged {
            previous: previous.len(),
            current: current.len(),
        };
    }

    previous
        .iter()
        .zip(current.iter())
        .enumerate()
        .find(|(_, (prev, curr))| prev != curr)
        .map_or(Change::Unchanged, |(index, (prev, curr))| {
            Change::EntryChanged {
                index,
                previous: prev.clone(),
                current: curr.clone(),
            }
        })
}

/// Compare `current` against the stored baseline, then store it.
pub fn diff(baseline: &mut Option<Fingerprint>, current: Fingerprint) -> Change {
    let change = compare(baseline.as_ref(), &current);
    *baseline = Some(current);
    change
}
