//! Entity count source over a local oxigraph store.
//!
//! The same SPARQL shapes as the remote source are evaluated in-process, so a
//! dump of the target graph (or a test fixture) can be analyzed offline.

use crate::combination::Label;
use crate::error::{AnalysisError, Result};
use crate::source::EntityCountSource;
use crate::sparql::{count_from, entities_from, RdfTerm, Solution, Vocabulary};
use anyhow::Context;
use async_trait::async_trait;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Clone)]
pub struct LocalStoreSource {
    store: Store,
    vocabulary: Vocabulary,
    limit: Option<usize>,
}

impl LocalStoreSource {
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::from_store(Store::new()?))
    }

    /// Open (or create) a persistent store at `path`.
    #[cfg(feature = "rocksdb")]
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(path)?;
        let store =
            Store::open(path).with_context(|| format!("Failed to open store at {:?}", path))?;
        Ok(Self::from_store(store))
    }

    pub fn from_store(store: Store) -> Self {
        Self {
            store,
            vocabulary: Vocabulary::default(),
            limit: None,
        }
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

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Load an RDF file, picking the syntax from its extension.
    pub fn load_file(&self, path: &Path) -> anyhow::Result<usize> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let format = match extension.as_str() {
            "ttl" => RdfFormat::Turtle,
            "nt" => RdfFormat::NTriples,
            "nq" => RdfFormat::NQuads,
            "trig" => RdfFormat::TriG,
            "rdf" | "owl" | "xml" => RdfFormat::RdfXml,
            _ => anyhow::bail!("Unsupported RDF file type: {:?}", path),
        };

        let file =
            fs::File::open(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        let count = self.load_reader(BufReader::new(file), format)?;
        tracing::info!(path = %path.display(), triples = count, "Loaded RDF data");
        Ok(count)
    }

    /// Load Turtle text. Returns the number of new triples.
    pub fn load_turtle(&self, data: &str) -> anyhow::Result<usize> {
        self.load_reader(data.as_bytes(), RdfFormat::Turtle)
    }

    fn load_reader(&self, reader: impl Read, format: RdfFormat) -> anyhow::Result<usize> {
        let mut added = 0;
        for quad in RdfParser::from_format(format).for_reader(reader) {
            let quad = quad.map_err(|e| anyhow::anyhow!("Parse error: {}", e))?;
            if self.store.insert(&quad)? {
                added += 1;
            }
        }
        Ok(added)
    }

    async fn select(&self, query: String) -> Result<Vec<Solution>> {
        tracing::debug!(query_len = query.len(), "Evaluating SPARQL query locally");
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || evaluate(&store, &query))
            .await
            .map_err(|e| AnalysisError::SourceUnavailable(format!("store task failed: {}", e)))?
    }
}

fn evaluate(store: &Store, query: &str) -> Result<Vec<Solution>> {
    let results = store
        .query(query)
        .map_err(|e| AnalysisError::SourceUnavailable(e.to_string()))?;

    let QueryResults::Solutions(solutions) = results else {
        return Err(AnalysisError::SourceDecodeError(
            "expected SELECT solutions".to_string(),
        ));
    };

    let mut rows = Vec::new();
    for solution in solutions {
        let solution = solution.map_err(|e| AnalysisError::SourceUnavailable(e.to_string()))?;
        let row: Solution = solution
            .iter()
            .map(|(variable, term)| (variable.as_str().to_string(), to_rdf_term(term)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn to_rdf_term(term: &Term) -> RdfTerm {
    match term {
        Term::NamedNode(node) => RdfTerm::Uri {
            value: node.as_str().to_string(),
        },
        Term::BlankNode(node) => RdfTerm::Bnode {
            value: node.as_str().to_string(),
        },
        Term::Literal(literal) => RdfTerm::Literal {
            value: literal.value().to_string(),
            datatype: Some(literal.datatype().as_str().to_string()),
            lang: literal.language().map(str::to_string),
        },
        #[allow(unreachable_patterns)]
        other => RdfTerm::Literal {
            value: other.to_string(),
            datatype: None,
            lang: None,
        },
    }
}

#[async_trait]
impl EntityCountSource for LocalStoreSource {
    async fn list_instances(&self, class_id: &str) -> Result<Vec<String>> {
        let query = self.vocabulary.list_instances_query(class_id, self.limit)?;
        let solutions = self.select(query).await?;
        entities_from(&solutions, "item", &self.vocabulary)
    }

    async fn count_distinct_properties(&self, entity: &str) -> Result<u64> {
        let query = self.vocabulary.count_properties_query(entity)?;
        let solutions = self.select(query).await?;
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
        let solutions = self.select(query).await?;
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
        let solutions = self.select(query).await?;
        entities_from(&solutions, "item", &self.vocabulary)
    }
}
