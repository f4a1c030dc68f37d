//! One extraction run: relationships → rooted ontology → descendant closure →
//! filtered term file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use subont_core::{ConceptCode, Deadline, ExtractConfig, RelationFilter};
use subont_graph::{BuildStats, DescendantCollector, GraphBuilder};
use tempfile::NamedTempFile;

use crate::digest::{DigestReader, DigestWriter, FileDigest};
use crate::error::{ExtractError, Result};
use crate::terms::{TermFilter, TermStats};

/// Everything one run needs, already validated.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub rel_file: PathBuf,
    pub concept_file: PathBuf,
    pub output: PathBuf,
    pub seeds: Vec<ConceptCode>,
    pub root: ConceptCode,
    pub filter: RelationFilter,
    pub delimiter: char,
    pub active_only: bool,
    pub deadline: Deadline,
}

impl ExtractRequest {
    /// Combine file locations and seeds with typed settings from `config`.
    pub fn from_config(
        config: &ExtractConfig,
        rel_file: impl Into<PathBuf>,
        concept_file: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        seeds: Vec<ConceptCode>,
    ) -> Result<Self> {
        Ok(Self {
            rel_file: rel_file.into(),
            concept_file: concept_file.into(),
            output: output.into(),
            seeds,
            root: config.root()?,
            filter: config.relation_filter()?,
            delimiter: config.delimiter()?,
            active_only: config.active_only,
            deadline: Deadline::from_secs(config.timeout_secs),
        })
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    pub build: BuildStats,
    pub descendants: usize,
    pub unknown_seeds: Vec<ConceptCode>,
    pub terms: TermStats,
    /// Relationship file, then concept table.
    pub inputs: Vec<FileDigest>,
    /// The term file as it exists on disk after the run.
    pub output: FileDigest,
}

/// Run a complete extraction.
///
/// The term file is staged next to `output` and only moved into place once
/// every concept-table row has been processed, so a failed run leaves any
/// previous output untouched.
pub fn run_extraction(request: &ExtractRequest) -> Result<ExtractSummary> {
    if request.seeds.is_empty() {
        return Err(ExtractError::NoSeeds);
    }

    // Build the rooted ontology, hashing the relationship file as it streams.
    tracing::info!(
        path = %request.rel_file.display(),
        root = %request.root,
        filter = %request.filter,
        active_only = request.active_only,
        "Loading ontology"
    );
    let started = Instant::now();
    let file = File::open(&request.rel_file).map_err(ExtractError::io(&request.rel_file))?;
    let mut reader = BufReader::new(DigestReader::new(file));

    let builder = GraphBuilder::new(request.root)
        .with_filter(request.filter)
        .with_active_only(request.active_only)
        .with_delimiter(request.delimiter)
        .with_deadline(request.deadline.clone());
    let (graph, build) = builder.build_from_reader(&mut reader)?;

    let mut rel_digest = reader.into_inner();
    rel_digest
        .read_to_end_hashed()
        .map_err(ExtractError::io(&request.rel_file))?;

    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Ontology loaded"
    );

    // Descendant closure of the seeds.
    tracing::info!(seeds = %join_codes(&request.seeds), "Collecting descendants");
    let started = Instant::now();
    let closure = DescendantCollector::new(&graph)
        .with_deadline(request.deadline.clone())
        .collect(&request.seeds)?;

    if !closure.unknown_seeds.is_empty() {
        tracing::warn!(
            seeds = %join_codes(&closure.unknown_seeds),
            "Seed concepts not found in the ontology"
        );
    }
    if closure.is_empty() {
        tracing::warn!("No descendants found for the given seeds");
    }
    tracing::info!(
        descendants = closure.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Descendants collected"
    );

    // Filter the concept table into a staged term file.
    tracing::info!(
        path = %request.concept_file.display(),
        output = %request.output.display(),
        "Writing terms"
    );
    let started = Instant::now();
    let concepts = File::open(&request.concept_file).map_err(ExtractError::io(&request.concept_file))?;
    let mut concept_reader = BufReader::new(DigestReader::new(concepts));

    let dir = staging_dir(&request.output);
    let staged = NamedTempFile::new_in(dir).map_err(ExtractError::io(dir))?;
    let mut writer = DigestWriter::new(BufWriter::new(staged));

    let terms = TermFilter::new(&closure.descendants)
        .with_delimiter(request.delimiter)
        .with_active_only(request.active_only)
        .write_terms(&mut concept_reader, &mut writer, &request.output)?;
    writer.flush().map_err(ExtractError::io(&request.output))?;

    let mut concept_digest = concept_reader.into_inner();
    concept_digest
        .read_to_end_hashed()
        .map_err(ExtractError::io(&request.concept_file))?;

    let output = writer.digest("terms", &request.output.display().to_string());
    let staged = writer
        .into_inner()
        .into_inner()
        .map_err(|e| ExtractError::Io {
            path: request.output.clone(),
            source: e.into_error(),
        })?;
    staged.persist(&request.output).map_err(|e| ExtractError::Io {
        path: request.output.clone(),
        source: e.error,
    })?;

    if terms.rows_written == 0 {
        tracing::warn!("No concept-table rows matched the descendant set");
    }
    tracing::info!(
        rows_read = terms.rows_read,
        rows_written = terms.rows_written,
        concepts = terms.concepts_matched,
        duration_ms = started.elapsed().as_millis() as u64,
        "Terms written"
    );

    Ok(ExtractSummary {
        build,
        descendants: closure.len(),
        unknown_seeds: closure.unknown_seeds,
        terms,
        inputs: vec![
            rel_digest.digest("relationships", &request.rel_file.display().to_string()),
            concept_digest.digest("concepts", &request.concept_file.display().to_string()),
        ],
        output,
    })
}

/// Directory that receives the staged term file: the output's own directory,
/// so the final rename stays on one filesystem.
fn staging_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn join_codes(codes: &[ConceptCode]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_default_config() {
        let request = ExtractRequest::from_config(
            &ExtractConfig::default(),
            "rel.txt",
            "desc.txt",
            "out.tsv",
            vec![ConceptCode(404_684_003)],
        )
        .unwrap();

        assert_eq!(request.root, subont_core::SNOMED_ROOT);
        assert_eq!(request.filter, RelationFilter::All);
        assert_eq!(request.delimiter, '\t');
        assert!(!request.active_only);
    }

    #[test]
    fn test_request_rejects_bad_filter() {
        let config = ExtractConfig {
            relation_types: "parents".to_string(),
            ..ExtractConfig::default()
        };
        let result = ExtractRequest::from_config(&config, "r", "c", "o", vec![ConceptCode(1)]);
        assert!(matches!(result, Err(ExtractError::Core(_))));
    }

    #[test]
    fn test_no_seeds_rejected() {
        let request =
            ExtractRequest::from_config(&ExtractConfig::default(), "r", "c", "o", Vec::new()).unwrap();
        assert!(matches!(run_extraction(&request), Err(ExtractError::NoSeeds)));
    }

    #[test]
    fn test_staging_dir() {
        assert_eq!(staging_dir(Path::new("out.tsv")), Path::new("."));
        assert_eq!(staging_dir(Path::new("/data/out.tsv")), Path::new("/data"));
    }

    #[test]
    fn test_join_codes() {
        assert_eq!(join_codes(&[ConceptCode(1), ConceptCode(22)]), "1,22");
        assert_eq!(join_codes(&[]), "");
    }
}
