//! subont-core: Shared types, configuration, and error handling for subont.
//!
//! This crate provides the foundational pieces used across the workspace:
//! - `ConceptCode`, the single canonical representation of a SNOMED CT id
//! - `RelationFilter`, which relationship types feed the ontology graph
//! - Extraction configuration loaded from file and environment
//! - `Deadline`, an optional time limit and cancellation token
//! - The top-level error type

pub mod config;
pub mod deadline;
pub mod error;
pub mod types;

pub use config::ExtractConfig;
pub use deadline::{Deadline, Interrupted};
pub use error::{Result, SubontError};
pub use types::{parse_code_list, ConceptCode, RelationFilter, IS_A_TYPE_ID, SNOMED_ROOT};
