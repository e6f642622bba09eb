#![allow(dead_code)]

use async_trait::async_trait;
use richness_core::{AnalysisError, EntityCountSource, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-process source with a fixed entity -> properties table.
#[derive(Default)]
pub struct ScriptedSource {
    entities: Vec<(String, Vec<String>)>,
    fail_on: Option<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(entities: &[(&str, &[&str])]) -> Self {
        Self {
            entities: entities
                .iter()
                .map(|(e, props)| (e.to_string(), props.iter().map(|p| p.to_string()).collect()))
                .collect(),
            ..Default::default()
        }
    }

    /// `n` entities where entity `i` (1-based) carries `i` properties.
    pub fn staircase(n: usize) -> Self {
        Self {
            entities: (1..=n)
                .map(|i| (format!("Q{}", i), (1..=i).map(|j| format!("P{}", j)).collect()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, entity: &str) -> Self {
        self.fail_on = Some(entity.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Most source calls of any kind observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntityCountSource for ScriptedSource {
    async fn list_instances(&self, _class_id: &str) -> Result<Vec<String>> {
        self.call().await;
        Ok(self.entities.iter().map(|(e, _)| e.clone()).collect())
    }

    async fn count_distinct_properties(&self, entity: &str) -> Result<u64> {
        self.call().await;

        if self.fail_on.as_deref() == Some(entity) {
            return Err(AnalysisError::SourceUnavailable(format!(
                "lookup for {} refused",
                entity
            )));
        }
        self.entities
            .iter()
            .find(|(e, _)| e == entity)
            .map(|(_, props)| props.len() as u64)
            .ok_or_else(|| AnalysisError::SourceDecodeError(format!("unknown entity {}", entity)))
    }

    async fn instances_matching_any_property_set(
        &self,
        _class_id: &str,
        property_subsets: &[Vec<String>],
    ) -> Result<Vec<String>> {
        self.call().await;
        Ok(self
            .entities
            .iter()
            .filter(|(_, props)| {
                let props: HashSet<&String> = props.iter().collect();
                property_subsets
                    .iter()
                    .any(|subset| subset.iter().all(|label| props.contains(label)))
            })
            .map(|(e, _)| e.clone())
            .collect())
    }
}
