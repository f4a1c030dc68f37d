//! subont-extract: SNOMED CT sub-terminology extraction.
//!
//! Builds the ontology under a root concept from an RF2 relationship file,
//! collects every descendant of the seed concepts, and writes the matching
//! rows of a concept or description table as a `code<TAB>term` file.

pub mod digest;
pub mod error;
pub mod pipeline;
pub mod terms;

pub use digest::FileDigest;
pub use error::{ExtractError, Result};
pub use pipeline::{run_extraction, ExtractRequest, ExtractSummary};
pub use terms::{quote_field, TermFilter, TermStats};
