//! Exhaustive subset enumeration over a property-label universe.

use crate::error::{AnalysisError, Result};
use std::collections::{BTreeMap, HashSet};

/// Opaque property identifier (`P31`, or a full IRI).
pub type Label = String;

/// Subset size -> every subset of that size, in enumeration order.
pub type SubsetGroups = BTreeMap<usize, Vec<Vec<Label>>>;

/// Hard cap on the universe size. 2^20 - 1 subsets is already more than any
/// union query can reasonably carry.
pub const MAX_LABELS: usize = 20;

/// Remove duplicate labels, keeping the first occurrence of each.
pub fn dedup_labels<I, S>(labels: I) -> Vec<Label>
where
    I: IntoIterator<Item = S>,
    S: Into<Label>,
{
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .map(Into::into)
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// Every non-empty subset of `labels`, grouped by cardinality.
pub fn enumerate(labels: &[Label]) -> Result<SubsetGroups> {
    enumerate_bounded(labels, MAX_LABELS)
}

/// Like [`enumerate`] with a caller-chosen cap (never above [`MAX_LABELS`]).
///
/// Subset `s` for `s` in `1..2^N` holds `labels[i]` iff bit `i` of `s` is
/// set, so each subset keeps the relative order of `labels` and groups are
/// filled in ascending bit-pattern order.
pub fn enumerate_bounded(labels: &[Label], max_labels: usize) -> Result<SubsetGroups> {
    let labels = dedup_labels(labels.iter().cloned());
    let n = labels.len();
    let cap = max_labels.min(MAX_LABELS);

    if n > cap {
        return Err(AnalysisError::CapacityExceeded { labels: n, max: cap });
    }
    let total = u32::try_from(n)
        .ok()
        .and_then(|bits| 1usize.checked_shl(bits))
        .ok_or(AnalysisError::CapacityExceeded { labels: n, max: cap })?;

    let mut groups = SubsetGroups::new();
    for bits in 1..total {
        let subset: Vec<Label> = labels
            .iter()
            .enumerate()
            .filter(|(i, _)| (bits >> i) & 1 == 1)
            .map(|(_, label)| label.clone())
            .collect();
        groups.entry(subset.len()).or_default().push(subset);
    }

    Ok(groups)
}
