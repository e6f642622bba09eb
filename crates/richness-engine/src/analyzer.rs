//! The inequality pipeline: gather one property count per class member, then
//! hand the counts to [`crate::stats`].

use crate::combination::{self, Label};
use crate::error::{AnalysisError, Result};
use crate::source::EntityCountSource;
use crate::stats::{self, AnalysisResult, PropertyCount};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_MAX_LABELS: usize = 12;

/// Which property universe an analysis runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Every outgoing property counts.
    Unbounded,
    /// Only the listed labels count; an entity scores the number it carries.
    Bounded(Vec<Label>),
}

impl AnalysisMode {
    /// `Bounded` for a non-empty list, `Unbounded` otherwise.
    pub fn from_labels(labels: Vec<Label>) -> Self {
        if labels.is_empty() {
            AnalysisMode::Unbounded
        } else {
            AnalysisMode::Bounded(labels)
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AnalysisMode::Unbounded => "unbounded",
            AnalysisMode::Bounded(_) => "bounded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Maximum source lookups in flight at once
    pub concurrency: usize,
    /// Deadline for a whole run
    pub timeout: Option<Duration>,
    /// Largest label list accepted in bounded mode
    pub max_labels: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Some(DEFAULT_TIMEOUT),
            max_labels: DEFAULT_MAX_LABELS,
        }
    }
}

/// Runs analyses against one [`EntityCountSource`].
///
/// Holds no per-run state; concurrent calls share nothing but the source.
#[derive(Clone)]
pub struct InequalityAnalyzer {
    source: Arc<dyn EntityCountSource>,
    options: AnalysisOptions,
}

impl InequalityAnalyzer {
    pub fn new(source: Arc<dyn EntityCountSource>, options: AnalysisOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub async fn analyze(&self, class_id: &str, mode: &AnalysisMode) -> Result<AnalysisResult> {
        self.analyze_until(class_id, mode, &CancellationToken::new()).await
    }

    /// Like [`analyze`](Self::analyze), aborting when `cancel` fires.
    ///
    /// In-flight lookups are dropped on timeout or cancellation.
    pub async fn analyze_until(
        &self,
        class_id: &str,
        mode: &AnalysisMode,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let started = Instant::now();

        let run = async {
            let counts = self.collect_counts(class_id, mode).await?;
            stats::summarize(counts)
        };
        let bounded = async {
            match self.options.timeout {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(result) => result,
                    Err(_) => Err(AnalysisError::TimedOut(limit)),
                },
                None => run.await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            result = bounded => result,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => tracing::info!(
                class = class_id,
                mode = mode.name(),
                buckets = result.normalized_curve.len(),
                gini = result.gini,
                elapsed_ms,
                "Analysis complete"
            ),
            Err(e) => tracing::warn!(
                class = class_id,
                mode = mode.name(),
                error = %e,
                elapsed_ms,
                "Analysis failed"
            ),
        }
        outcome
    }

    /// One [`PropertyCount`] per class member, unsorted.
    pub async fn collect_counts(
        &self,
        class_id: &str,
        mode: &AnalysisMode,
    ) -> Result<Vec<PropertyCount>> {
        match mode {
            AnalysisMode::Unbounded => self.unbounded_counts(class_id).await,
            AnalysisMode::Bounded(labels) => self.bounded_counts(class_id, labels).await,
        }
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    async fn unbounded_counts(&self, class_id: &str) -> Result<Vec<PropertyCount>> {
        let entities = self.source.list_instances(class_id).await?;
        tracing::debug!(class = class_id, entities = entities.len(), "Listed class members");

        let source = &self.source;
        stream::iter(entities)
            .map(|entity| async move {
                let count = source.count_distinct_properties(&entity).await?;
                Ok::<_, AnalysisError>(PropertyCount { entity, count })
            })
            .buffered(self.concurrency())
            .try_collect()
            .await
    }

    async fn bounded_counts(&self, class_id: &str, labels: &[Label]) -> Result<Vec<PropertyCount>> {
        let groups = combination::enumerate_bounded(labels, self.options.max_labels)?;
        tracing::debug!(
            class = class_id,
            labels = labels.len(),
            levels = groups.len(),
            "Enumerated property subsets"
        );

        // One member sample; every level is answered for exactly these entities.
        let sample = self.source.list_instances(class_id).await?;
        tracing::debug!(class = class_id, entities = sample.len(), "Listed class members");
        if sample.is_empty() {
            return Ok(Vec::new());
        }

        let source = &self.source;
        let sample = &sample;
        let levels = stream::iter(groups.into_iter().rev())
            .map(|(k, subsets)| async move {
                let members = source
                    .sample_matching_any_property_set(class_id, sample, &subsets)
                    .await?;
                tracing::debug!(
                    class = class_id,
                    level = k,
                    subsets = subsets.len(),
                    members = members.len(),
                    "Fetched membership level"
                );
                Ok::<_, AnalysisError>((k, members))
            })
            .buffered(self.concurrency())
            .try_collect::<Vec<_>>()
            .await?;

        Ok(assign_highest_level(&levels, sample))
    }
}

/// Count each sampled entity as the highest level it appears in, 0 if none.
///
/// Entities outside `sample` are ignored and repeated sample entries are
/// counted once.
pub(crate) fn assign_highest_level(
    levels: &[(usize, Vec<String>)],
    sample: &[String],
) -> Vec<PropertyCount> {
    let mut highest: HashMap<&str, usize> = HashMap::new();
    for (k, members) in levels {
        for entity in members {
            let level = highest.entry(entity.as_str()).or_insert(0);
            *level = (*level).max(*k);
        }
    }

    let mut seen = HashSet::new();
    sample
        .iter()
        .filter(|entity| seen.insert(entity.as_str()))
        .map(|entity| {
            let k = highest.get(entity.as_str()).copied().unwrap_or(0);
            PropertyCount::new(entity.clone(), k as u64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_highest_level_wins() {
        let levels = vec![(2, names(&["Q1"])), (1, names(&["Q1", "Q2", "Q3"]))];
        let counts = assign_highest_level(&levels, &names(&["Q1", "Q2", "Q3", "Q4"]));
        assert_eq!(
            counts,
            vec![
                PropertyCount::new("Q1", 2),
                PropertyCount::new("Q2", 1),
                PropertyCount::new("Q3", 1),
                PropertyCount::new("Q4", 0),
            ]
        );
    }

    #[test]
    fn test_level_order_does_not_matter() {
        let levels = vec![(1, names(&["Q1", "Q2"])), (2, names(&["Q1"]))];
        let counts = assign_highest_level(&levels, &names(&["Q2", "Q1"]));
        assert_eq!(
            counts,
            vec![PropertyCount::new("Q2", 1), PropertyCount::new("Q1", 2)]
        );
    }

    #[test]
    fn test_only_sampled_entities_count() {
        let levels = vec![(2, names(&["Q7", "Q8"])), (1, names(&["Q1", "Q1"]))];
        let counts = assign_highest_level(&levels, &names(&["Q1", "Q2", "Q1"]));
        assert_eq!(
            counts,
            vec![PropertyCount::new("Q1", 1), PropertyCount::new("Q2", 0)]
        );
    }

    #[test]
    fn test_mode_from_labels() {
        assert_eq!(AnalysisMode::from_labels(Vec::new()), AnalysisMode::Unbounded);
        assert_eq!(
            AnalysisMode::from_labels(names(&["P31"])),
            AnalysisMode::Bounded(names(&["P31"]))
        );
    }
}
