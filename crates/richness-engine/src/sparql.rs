//! SPARQL query construction and result decoding shared by every source.

use crate::combination::Label;
use crate::error::{AnalysisError, Result};
use serde::Deserialize;
use std::collections::HashMap;

pub const WIKIDATA_ENTITY_NS: &str = "http://www.wikidata.org/entity/";
pub const WIKIDATA_DIRECT_PROPERTY_NS: &str = "http://www.wikidata.org/prop/direct/";
pub const WIKIDATA_INSTANCE_OF: &str = "P31";

/// How bare identifiers map onto IRIs in the target graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub entity_ns: String,
    pub property_ns: String,
    pub instance_of: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            entity_ns: WIKIDATA_ENTITY_NS.to_string(),
            property_ns: WIKIDATA_DIRECT_PROPERTY_NS.to_string(),
            instance_of: WIKIDATA_INSTANCE_OF.to_string(),
        }
    }
}

impl Vocabulary {
    /// `<iri>` for a class or entity id.
    pub fn entity_iri(&self, id: &str) -> Result<String> {
        ensure_iri(&self.entity_ns, id)
    }

    /// `<iri>` for a property label.
    pub fn property_iri(&self, label: &str) -> Result<String> {
        ensure_iri(&self.property_ns, label)
    }

    /// Strip the entity namespace so results read `Q42` rather than a full IRI.
    pub fn compact(&self, iri: &str) -> String {
        iri.strip_prefix(self.entity_ns.as_str())
            .filter(|local| !local.is_empty())
            .unwrap_or(iri)
            .to_string()
    }

    /// All class members.
    pub fn list_instances_query(&self, class_id: &str, limit: Option<usize>) -> Result<String> {
        let mut query = format!(
            "SELECT DISTINCT ?item WHERE {{ ?item {} {} . }}",
            self.property_iri(&self.instance_of)?,
            self.entity_iri(class_id)?
        );
        push_limit(&mut query, limit);
        Ok(query)
    }

    /// Number of distinct outgoing properties of one entity.
    pub fn count_properties_query(&self, entity: &str) -> Result<String> {
        let mut query = format!(
            "SELECT (COUNT(DISTINCT ?p) AS ?count) WHERE {{ {} ?p ?o .",
            self.entity_iri(entity)?
        );
        if !self.property_ns.is_empty() {
            query.push_str(&format!(
                " FILTER(STRSTARTS(STR(?p), \"{}\"))",
                self.property_ns
            ));
        }
        query.push_str(" }");
        Ok(query)
    }

    /// Class members carrying every label of at least one subset: a union of
    /// conjunctions, one branch per subset.
    ///
    /// With `members`, candidates are restricted to those entities through a
    /// `VALUES` block. The query never carries a LIMIT, so every level of a
    /// bounded run sees the complete answer for its candidates.
    pub fn matching_any_query(
        &self,
        class_id: &str,
        subsets: &[Vec<Label>],
        members: Option<&[String]>,
    ) -> Result<String> {
        let mut query = String::from("SELECT DISTINCT ?item WHERE {");
        if let Some(members) = members {
            let iris = members
                .iter()
                .map(|m| self.entity_iri(m))
                .collect::<Result<Vec<_>>>()?;
            query.push_str(&format!(" VALUES ?item {{ {} }}", iris.join(" ")));
        }
        query.push_str(&format!(
            " ?item {} {} .",
            self.property_iri(&self.instance_of)?,
            self.entity_iri(class_id)?
        ));

        let mut branches = Vec::with_capacity(subsets.len());
        for subset in subsets {
            let mut branch = String::from("{");
            for (i, label) in subset.iter().enumerate() {
                branch.push_str(&format!(" ?item {} ?v{} .", self.property_iri(label)?, i));
            }
            branch.push_str(" }");
            branches.push(branch);
        }
        if !branches.is_empty() {
            query.push(' ');
            query.push_str(&branches.join(" UNION "));
        }

        query.push_str(" }");
        Ok(query)
    }
}

fn push_limit(query: &mut String, limit: Option<usize>) {
    if let Some(limit) = limit.filter(|&l| l > 0) {
        query.push_str(&format!(" LIMIT {}", limit));
    }
}

/// Wrap `id` as an IRI reference, prefixing bare ids with `namespace`.
fn ensure_iri(namespace: &str, id: &str) -> Result<String> {
    let id = id.trim();
    let illegal = |c: char| c.is_whitespace() || "<>\"{}|^`\\".contains(c);
    if id.is_empty() || id.chars().any(illegal) {
        return Err(AnalysisError::InvalidIdentifier(id.to_string()));
    }

    if id.starts_with("http://") || id.starts_with("https://") {
        Ok(format!("<{}>", id))
    } else {
        Ok(format!("<{}{}>", namespace, id))
    }
}

/// One bound value in a solution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RdfTerm {
    Uri {
        value: String,
    },
    #[serde(alias = "typed-literal")]
    Literal {
        value: String,
        #[serde(default)]
        datatype: Option<String>,
        #[serde(default, rename = "xml:lang")]
        lang: Option<String>,
    },
    Bnode {
        value: String,
    },
}

impl RdfTerm {
    pub fn value(&self) -> &str {
        match self {
            RdfTerm::Uri { value } | RdfTerm::Literal { value, .. } | RdfTerm::Bnode { value } => {
                value
            }
        }
    }
}

/// Variable name -> bound term. Unbound variables are simply absent.
pub type Solution = HashMap<String, RdfTerm>;

/// `application/sparql-results+json` document (SELECT form only).
#[derive(Debug, Deserialize)]
pub struct SparqlResults {
    pub results: Bindings,
}

#[derive(Debug, Deserialize)]
pub struct Bindings {
    pub bindings: Vec<Solution>,
}

impl SparqlResults {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| AnalysisError::SourceDecodeError(e.to_string()))
    }
}

/// Pull the IRI bound to `var` out of every solution, compacted.
pub fn entities_from(
    solutions: &[Solution],
    var: &str,
    vocabulary: &Vocabulary,
) -> Result<Vec<String>> {
    solutions
        .iter()
        .map(|solution| match solution.get(var) {
            Some(RdfTerm::Uri { value }) => Ok(vocabulary.compact(value)),
            Some(other) => Err(AnalysisError::SourceDecodeError(format!(
                "expected an IRI for ?{}, got {:?}",
                var, other
            ))),
            None => Err(AnalysisError::SourceDecodeError(format!(
                "?{} is unbound",
                var
            ))),
        })
        .collect()
}

/// Read a non-negative integer bound to `var` in the first solution.
///
/// An empty result set counts as zero.
pub fn count_from(solutions: &[Solution], var: &str) -> Result<u64> {
    let Some(solution) = solutions.first() else {
        return Ok(0);
    };
    match solution.get(var) {
        Some(RdfTerm::Literal { value, .. }) => value.trim().parse::<u64>().map_err(|_| {
            AnalysisError::SourceDecodeError(format!("?{} is not a count: {:?}", var, value))
        }),
        Some(other) => Err(AnalysisError::SourceDecodeError(format!(
            "expected a literal for ?{}, got {:?}",
            var, other
        ))),
        None => Ok(0),
    }
}
