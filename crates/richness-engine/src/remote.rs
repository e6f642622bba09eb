//! Entity count source backed by a remote SPARQL endpoint (Wikidata by default).

use crate::combination::Label;
use crate::error::{AnalysisError, Result};
use crate::source::EntityCountSource;
use crate::sparql::{count_from, entities_from, Solution, SparqlResults, Vocabulary};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://query.wikidata.org/sparql";
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Queries longer than this go out as a form POST instead of a GET.
const MAX_GET_QUERY_LEN: usize = 2048;

pub struct RemoteSparqlSource {
    client: reqwest::Client,
    endpoint: String,
    vocabulary: Vocabulary,
    limit: Option<usize>,
}

impl RemoteSparqlSource {
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: &str,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            vocabulary: Vocabulary::default(),
            limit: None,
        })
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Size of the member sample drawn by `list_instances`; `None` or `Some(0)` means the whole class.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn select(&self, query: &str) -> Result<Vec<Solution>> {
        tracing::debug!(
            endpoint = %self.endpoint,
            query_len = query.len(),
            "Sending SPARQL query"
        );

        let request = if query.len() > MAX_GET_QUERY_LEN {
            self.client.post(&self.endpoint).form(&[("query", query)])
        } else {
            self.client.get(&self.endpoint).query(&[("query", query)])
        };

        let response = request
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .send()
            .await
            .map_err(|e| AnalysisError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::SourceUnavailable(format!(
                "{} answered HTTP {}",
                self.endpoint, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::SourceUnavailable(e.to_string()))?;
        Ok(SparqlResults::from_slice(&body)?.results.bindings)
    }
}

#[async_trait]
impl EntityCountSource for RemoteSparqlSource {
    async fn list_instances(&self, class_id: &str) -> Result<Vec<String>> {
        let query = self.vocabulary.list_instances_query(class_id, self.limit)?;
        let solutions = self.select(&query).await?;
        entities_from(&solutions, "item", &self.vocabulary)
    }

    async fn count_distinct_properties(&self, entity: &str) -> Result<u64> {
        let query = self.vocabulary.count_properties_query(entity)?;
        let solutions = self.select(&query).await?;
        count_from(&solutions, "count")
    }

    async fn instances_matching_any_property_set(
        &self,
        class_id: &str,
        property_subsets: &[Vec<Label>],
    ) -> Result<Vec<String>> {
        if property_subsets.is_empty() {
            return Ok(Vec::new());
        }
        let query = self
            .vocabulary
            .matching_any_query(class_id, property_subsets, None)?;
        let solutions = self.select(&query).await?;
        entities_from(&solutions, "item", &self.vocabulary)
    }

    async fn sample_matching_any_property_set(
        &self,
        class_id: &str,
        sample: &[String],
        property_subsets: &[Vec<Label>],
    ) -> Result<Vec<String>> {
        if property_subsets.is_empty() || sample.is_empty() {
            return Ok(Vec::new());
        }
        let query = self
            .vocabulary
            .matching_any_query(class_id, property_subsets, Some(sample))?;
        let solutions = self.select(&query).await?;
        entities_from(&solutions, "item", &self.vocabulary)
    }
}
