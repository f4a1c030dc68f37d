//! Ontology construction from relationship records.
//!
//! Rows are streamed into a full parent → child graph (each record's
//! destination becomes the parent of its source), then the graph is cut down
//! to the subtree under the configured root.

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use subont_core::{ConceptCode, Deadline, RelationFilter, SNOMED_ROOT};

use crate::error::Result;
use crate::graph::{OntologyGraph, CHECK_INTERVAL};
use crate::rf2::{RelationshipReader, RelationshipRecord};

/// Counters describing one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Data rows read (header and blank lines excluded).
    pub records_read: usize,
    /// Rows that passed the relation and active filters.
    pub records_kept: usize,
    /// Graph size before restricting to the root's subtree.
    pub full_nodes: usize,
    pub full_edges: usize,
    /// Graph size after rooting.
    pub nodes: usize,
    pub edges: usize,
    /// Whether the root occurred in the kept edges. When `false` the graph is empty.
    pub root_found: bool,
}

/// Builds a rooted [`OntologyGraph`] from RF2 relationship records.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    root: ConceptCode,
    filter: RelationFilter,
    active_only: bool,
    delimiter: char,
    deadline: Deadline,
}

impl GraphBuilder {
    /// A builder for the subtree under `root`, keeping all relationship types.
    pub fn new(root: ConceptCode) -> Self {
        Self {
            root,
            filter: RelationFilter::All,
            active_only: false,
            delimiter: '\t',
            deadline: Deadline::none(),
        }
    }

    pub fn with_filter(mut self, filter: RelationFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Skip records whose `active` flag is `0`. Records without the column are kept.
    pub fn with_active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    /// Field delimiter used by [`build_from_reader`](Self::build_from_reader).
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn root(&self) -> ConceptCode {
        self.root
    }

    pub fn filter(&self) -> RelationFilter {
        self.filter
    }

    /// Build from a stream of records.
    pub fn build<I>(&self, records: I) -> Result<OntologyGraph>
    where
        I: IntoIterator<Item = Result<RelationshipRecord>>,
    {
        self.build_with_stats(records).map(|(graph, _)| graph)
    }

    /// Build from a stream of records, also returning counters.
    ///
    /// The first failing record aborts the build; no partial graph is returned.
    pub fn build_with_stats<I>(&self, records: I) -> Result<(OntologyGraph, BuildStats)>
    where
        I: IntoIterator<Item = Result<RelationshipRecord>>,
    {
        let mut full = OntologyGraph::new();
        let mut stats = BuildStats::default();

        for record in records {
            let record = record?;
            stats.records_read += 1;
            if stats.records_read % CHECK_INTERVAL == 0 {
                self.deadline.check()?;
            }

            if !self.keeps(&record) {
                continue;
            }
            stats.records_kept += 1;
            full.add_edge(record.destination_id, record.source_id);
        }

        full.dedup_edges();
        stats.full_nodes = full.node_count();
        stats.full_edges = full.edge_count();
        stats.root_found = full.contains(self.root);

        let rooted = full.rooted_at(self.root, &self.deadline)?;
        stats.nodes = rooted.node_count();
        stats.edges = rooted.edge_count();

        if stats.root_found {
            tracing::info!(
                root = %self.root,
                filter = %self.filter,
                records_read = stats.records_read,
                records_kept = stats.records_kept,
                nodes = stats.nodes,
                edges = stats.edges,
                "Ontology graph built"
            );
        } else {
            tracing::warn!(
                root = %self.root,
                filter = %self.filter,
                records_read = stats.records_read,
                records_kept = stats.records_kept,
                "Root concept not found in relationships; ontology is empty"
            );
        }

        Ok((rooted, stats))
    }

    /// Stream an RF2 relationship file through the builder.
    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<(OntologyGraph, BuildStats)> {
        let records = RelationshipReader::new(reader, self.delimiter)?;
        if self.active_only && !records.has_active_column() {
            tracing::warn!("active-only filtering requested but the relationship file has no active column");
        }
        self.build_with_stats(records)
    }

    fn keeps(&self, record: &RelationshipRecord) -> bool {
        if self.active_only && record.active == Some(false) {
            return false;
        }
        self.filter.accepts(record.type_id)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(SNOMED_ROOT)
    }
}
