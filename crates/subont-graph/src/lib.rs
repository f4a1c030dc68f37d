//! subont-graph: Ontology graph construction and descendant closure.
//!
//! Streams RF2 relationship rows into an in-memory parent → child graph,
//! restricts it to the subtree under a root concept, and computes the
//! descendant closure of a seed set over the result.

pub mod builder;
pub mod collect;
pub mod error;
pub mod graph;
pub mod rf2;

pub use builder::{BuildStats, GraphBuilder};
pub use collect::{collect_descendants, Closure, DescendantCollector};
pub use error::{GraphError, Result};
pub use graph::OntologyGraph;
pub use rf2::{ColumnIndex, RelationshipReader, RelationshipRecord, Rf2Reader, Rf2Row};
