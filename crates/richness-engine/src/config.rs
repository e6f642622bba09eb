//! Process configuration, read once from the environment at startup.

use crate::analyzer::AnalysisOptions;
use crate::combination::MAX_LABELS;
use crate::remote::DEFAULT_ENDPOINT;
use crate::sparql::Vocabulary;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_INSTANCE_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub endpoint: String,
    pub user_agent: String,
    /// Analyze this RDF file locally instead of querying `endpoint`
    pub data_path: Option<PathBuf>,
    /// Persistent oxigraph store to analyze (needs the `rocksdb` feature)
    pub store_path: Option<PathBuf>,
    pub vocabulary: Vocabulary,
    /// LIMIT on membership queries, 0 for none
    pub instance_limit: usize,
    pub request_timeout: Duration,
    pub analysis: AnalysisOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: default_user_agent(),
            data_path: None,
            store_path: None,
            vocabulary: Vocabulary::default(),
            instance_limit: DEFAULT_INSTANCE_LIMIT,
            request_timeout: Duration::from_secs(60),
            analysis: AnalysisOptions::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("richness-engine/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = parse(&get, "PORT")? {
            config.port = port;
        }
        if let Some(endpoint) = get("SPARQL_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(agent) = get("SPARQL_USER_AGENT") {
            config.user_agent = agent;
        }
        config.data_path = get("RDF_DATA_PATH").map(PathBuf::from);
        config.store_path = get("RDF_STORE_PATH").map(PathBuf::from);

        if let Some(ns) = get("ENTITY_NAMESPACE") {
            config.vocabulary.entity_ns = ns;
        }
        if let Some(ns) = get("PROPERTY_NAMESPACE") {
            config.vocabulary.property_ns = ns;
        }
        if let Some(p) = get("INSTANCE_OF") {
            config.vocabulary.instance_of = p;
        }

        if let Some(limit) = parse(&get, "INSTANCE_LIMIT")? {
            config.instance_limit = limit;
        }
        if let Some(n) = parse::<usize>(&get, "FETCH_CONCURRENCY")? {
            anyhow::ensure!(n > 0, "FETCH_CONCURRENCY must be at least 1");
            config.analysis.concurrency = n;
        }
        if let Some(secs) = parse::<u64>(&get, "ANALYSIS_TIMEOUT_SECS")? {
            config.analysis.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = parse(&get, "REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = parse::<usize>(&get, "MAX_PROPERTY_LABELS")? {
            anyhow::ensure!(
                max <= MAX_LABELS,
                "MAX_PROPERTY_LABELS must not exceed {}",
                MAX_LABELS
            );
            config.analysis.max_labels = max;
        }

        Ok(config)
    }

    /// Whether analyses run against a local store rather than `endpoint`.
    pub fn is_local(&self) -> bool {
        self.data_path.is_some() || self.store_path.is_some()
    }

    pub fn limit(&self) -> Option<usize> {
        (self.instance_limit > 0).then_some(self.instance_limit)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}
