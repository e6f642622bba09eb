//! Property-richness inequality for knowledge-graph classes.
//!
//! Given a class, fetch its members, count how many distinct properties
//! each carries, and report a Gini coefficient together with a normalized
//! Lorenz-style cumulative curve. Bounded mode restricts the property
//! universe to a caller-supplied label list.

pub mod analyzer;
pub mod combination;
pub mod config;
pub mod error;
pub mod labels;
pub mod remote;
pub mod server;
pub mod source;
pub mod sparql;
pub mod stats;
pub mod store;

pub use analyzer::{AnalysisMode, AnalysisOptions, InequalityAnalyzer};
pub use error::{AnalysisError, Result};
pub use source::EntityCountSource;
pub use stats::{AnalysisResult, PropertyCount};
