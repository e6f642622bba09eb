use crate::combination::Label;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Where per-entity property information comes from.
///
/// Implementations report transport failures as `SourceUnavailable` and
/// unreadable answers as `SourceDecodeError`; they never retry on their own.
#[async_trait]
pub trait EntityCountSource: Send + Sync {
    /// Entities whose type is `class_id`.
    async fn list_instances(&self, class_id: &str) -> Result<Vec<String>>;

    /// Number of distinct outgoing properties of `entity`.
    async fn count_distinct_properties(&self, entity: &str) -> Result<u64>;

    /// Entities of `class_id` carrying every label of at least one subset.
    ///
    /// Answers are complete: any member-sampling limit applies to
    /// [`list_instances`](Self::list_instances) only.
    async fn instances_matching_any_property_set(
        &self,
        class_id: &str,
        property_subsets: &[Vec<Label>],
    ) -> Result<Vec<String>>;

    /// The members of `sample` that carry every label of at least one subset.
    ///
    /// `sample` comes from `list_instances(class_id)`. The default filters the
    /// full answer; query-backed sources push the sample into the query.
    async fn sample_matching_any_property_set(
        &self,
        class_id: &str,
        sample: &[String],
        property_subsets: &[Vec<Label>],
    ) -> Result<Vec<String>> {
        let sample: HashSet<&str> = sample.iter().map(String::as_str).collect();
        let matches = self
            .instances_matching_any_property_set(class_id, property_subsets)
            .await?;
        Ok(matches
            .into_iter()
            .filter(|entity| sample.contains(entity.as_str()))
            .collect())
    }
}
