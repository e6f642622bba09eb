//! Inequality statistics over per-entity property counts.
//!
//! The pipeline is: sort ascending by count, compute the discrete Gini
//! coefficient, fold the sorted sequence into (at most) ten buckets carrying
//! the running cumulative mass, then min-max normalize those cumulative
//! values into a Lorenz-style curve.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Target number of buckets for the cumulative curve.
pub const BUCKET_COUNT: usize = 10;

/// Number of distinct properties one entity carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCount {
    pub entity: String,
    pub count: u64,
}

impl PropertyCount {
    pub fn new(entity: impl Into<String>, count: u64) -> Self {
        Self {
            entity: entity.into(),
            count,
        }
    }
}

/// A contiguous run of the sorted counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub members: Vec<String>,
    /// Running sum of counts up to and including this bucket
    pub cumulative: u64,
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub gini: f64,
    /// Normalized cumulative curve, one point per bucket
    #[serde(rename = "data")]
    pub normalized_curve: Vec<f64>,
    /// Entities folded into each bucket, aligned with `normalized_curve`
    #[serde(rename = "entities")]
    pub bucket_entities: Vec<Vec<String>>,
}

/// Sort ascending by count. Stable, so ties keep their retrieval order.
pub fn sort_counts(counts: &mut [PropertyCount]) {
    counts.sort_by_key(|pc| pc.count);
}

/// Discrete Gini coefficient over counts already sorted ascending:
/// `(n + 1) / n - 2 * Σ (n + 1 - i) c[i] / (n * Σ c[i])` with 1-based `i`.
pub fn gini_coefficient(sorted: &[PropertyCount]) -> Result<f64> {
    let n = sorted.len();
    if n == 0 {
        return Err(AnalysisError::InsufficientData);
    }

    let sum: u128 = sorted.iter().map(|pc| u128::from(pc.count)).sum();
    if sum == 0 {
        return Err(AnalysisError::DegenerateDistribution(
            "every entity has zero properties".to_string(),
        ));
    }

    let top_weighted: u128 = sorted
        .iter()
        .enumerate()
        .map(|(i, pc)| (n - i) as u128 * u128::from(pc.count))
        .sum();

    let n = n as f64;
    Ok((n + 1.0) / n - (2.0 * top_weighted as f64) / (n * sum as f64))
}

/// Fold sorted counts into buckets of `ceil(n / BUCKET_COUNT)` entities.
///
/// With ten or fewer entities every entity gets its own bucket. The last
/// bucket takes whatever is left over after even chunking.
pub fn bucketize(sorted: &[PropertyCount]) -> Vec<Bucket> {
    let chunk = sorted.len().div_ceil(BUCKET_COUNT).max(1);

    let mut buckets = Vec::with_capacity(sorted.len().min(BUCKET_COUNT + 1));
    let mut members = Vec::with_capacity(chunk);
    let mut running = 0u64;

    for (i, pc) in sorted.iter().enumerate() {
        if i > 0 && i % chunk == 0 {
            buckets.push(Bucket {
                members: std::mem::take(&mut members),
                cumulative: running,
            });
        }
        running = running.saturating_add(pc.count);
        members.push(pc.entity.clone());
    }
    if !members.is_empty() {
        buckets.push(Bucket {
            members,
            cumulative: running,
        });
    }

    buckets
}

/// Min-max normalize bucket cumulative values into `[0, 1]`.
pub fn normalize(buckets: &[Bucket]) -> Result<Vec<f64>> {
    let lo = buckets.iter().map(|b| b.cumulative).min();
    let hi = buckets.iter().map(|b| b.cumulative).max();
    let (lo, hi) = match (lo, hi) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return Err(AnalysisError::InsufficientData),
    };
    if hi == lo {
        return Err(AnalysisError::DegenerateDistribution(format!(
            "all {} bucket(s) carry the same cumulative mass {}",
            buckets.len(),
            hi
        )));
    }

    let spread = (hi - lo) as f64;
    Ok(buckets
        .iter()
        .map(|b| (b.cumulative - lo) as f64 / spread)
        .collect())
}

/// Run the whole statistics stage over unsorted counts.
pub fn summarize(mut counts: Vec<PropertyCount>) -> Result<AnalysisResult> {
    sort_counts(&mut counts);
    let gini = gini_coefficient(&counts)?;
    let buckets = bucketize(&counts);
    let normalized_curve = normalize(&buckets)?;

    Ok(AnalysisResult {
        gini,
        normalized_curve,
        bucket_entities: buckets.into_iter().map(|b| b.members).collect(),
    })
}
