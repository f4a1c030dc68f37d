//! RF2 tabular parsing.
//!
//! RF2 release files are delimited text with a header row. Columns are
//! located by name (case-insensitive), never by position, so the same reader
//! serves relationship, concept and description files.

use std::collections::HashMap;
use std::io::BufRead;
use std::ops::Range;
use std::sync::Arc;

use subont_core::ConceptCode;

use crate::error::{GraphError, Result};

/// Column names of the relationship file used to build the graph.
pub const SOURCE_ID: &str = "sourceid";
pub const DESTINATION_ID: &str = "destinationid";
pub const TYPE_ID: &str = "typeid";
pub const ACTIVE: &str = "active";

// ── Column index ──────────────────────────────────────────────────

/// Lowercased column name → field position, built once per input stream.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    delimiter: char,
}

impl ColumnIndex {
    /// Build from a header line. Trailing line terminators and a UTF-8 BOM are ignored.
    pub fn from_header(line: &str, delimiter: char) -> Self {
        let line = trim_line_end(line).trim_start_matches('\u{feff}');
        let names: Vec<String> = line.split(delimiter).map(str::to_string).collect();
        let positions = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();
        Self {
            names,
            positions,
            delimiter,
        }
    }

    /// Position of a column, looked up case-insensitively.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.to_lowercase()).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Positions of all `names`, failing on the first one that is absent.
    pub fn require(&self, names: &[&str]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.position(name).ok_or_else(|| GraphError::MissingColumn {
                    column: name.to_string(),
                    header: self.header(),
                })
            })
            .collect()
    }

    /// The header as read, re-joined with the delimiter.
    pub fn header(&self) -> String {
        self.names.join(&self.delimiter.to_string())
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(&['\n', '\r'][..])
}

// ── Rows ──────────────────────────────────────────────────────────

/// One data row, with fields addressable by position or column name.
#[derive(Debug, Clone)]
pub struct Rf2Row {
    /// 1-based line number in the source (the header is line 1).
    pub line: usize,
    text: String,
    spans: Vec<Range<usize>>,
    columns: Arc<ColumnIndex>,
}

impl Rf2Row {
    fn parse(line: usize, mut text: String, columns: Arc<ColumnIndex>) -> Self {
        let trimmed_len = trim_line_end(&text).len();
        text.truncate(trimmed_len);

        let delimiter = columns.delimiter();
        let mut spans = Vec::with_capacity(columns.len());
        let mut start = 0;
        for (i, c) in text.char_indices() {
            if c == delimiter {
                spans.push(start..i);
                start = i + c.len_utf8();
            }
        }
        spans.push(start..text.len());

        Self {
            line,
            text,
            spans,
            columns,
        }
    }

    /// Field at `position`, if the row is long enough.
    pub fn field(&self, position: usize) -> Option<&str> {
        self.spans.get(position).map(|span| &self.text[span.clone()])
    }

    /// Field under the column `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns.position(name).and_then(|p| self.field(p))
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The raw row text without its line terminator.
    pub fn raw(&self) -> &str {
        &self.text
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    /// A `MalformedRecord` error carrying this row's line and content.
    pub fn malformed(&self, reason: impl Into<String>) -> GraphError {
        GraphError::MalformedRecord {
            line: self.line,
            reason: reason.into(),
            content: self.text.clone(),
        }
    }

    /// Fail unless the row has a field at every position in `positions`.
    pub fn ensure_fields(&self, positions: &[usize]) -> Result<()> {
        let needed = positions.iter().max().map_or(0, |&p| p + 1);
        if self.len() < needed {
            return Err(self.malformed(format!(
                "expected at least {needed} fields, found {}",
                self.len()
            )));
        }
        Ok(())
    }

    /// Parse the field at `position` as a concept code.
    pub fn code(&self, position: usize, column: &str) -> Result<ConceptCode> {
        let raw = self
            .field(position)
            .ok_or_else(|| self.malformed(format!("missing {column} field")))?;
        raw.parse()
            .map_err(|e| self.malformed(format!("invalid {column}: {e}")))
    }

    /// Parse an RF2 `active` flag (`1` or `0`).
    pub fn flag(&self, position: usize, column: &str) -> Result<bool> {
        match self.field(position) {
            Some("1") => Ok(true),
            Some("0") => Ok(false),
            Some(other) => Err(self.malformed(format!("invalid {column} flag {other:?}"))),
            None => Err(self.malformed(format!("missing {column} field"))),
        }
    }
}

/// Streaming reader over a header-prefixed delimited file.
///
/// Rows are produced one at a time; blank lines are skipped.
pub struct Rf2Reader<R> {
    reader: R,
    columns: Arc<ColumnIndex>,
    line: usize,
}

impl<R: BufRead> Rf2Reader<R> {
    /// Read the header row. Fails with [`GraphError::EmptyInput`] on an empty stream.
    pub fn new(mut reader: R, delimiter: char) -> Result<Self> {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            return Err(GraphError::EmptyInput);
        }
        Ok(Self {
            reader,
            columns: Arc::new(ColumnIndex::from_header(&header, delimiter)),
            line: 1,
        })
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    /// Number of lines consumed so far, header included.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn read_row(&mut self) -> Result<Option<Rf2Row>> {
        loop {
            let mut text = String::new();
            if self.reader.read_line(&mut text)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if trim_line_end(&text).is_empty() {
                tracing::debug!(line = self.line, "Skipping blank line");
                continue;
            }
            return Ok(Some(Rf2Row::parse(self.line, text, self.columns.clone())));
        }
    }
}

impl<R: BufRead> Iterator for Rf2Reader<R> {
    type Item = Result<Rf2Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_row().transpose()
    }
}

// ── Relationship records ──────────────────────────────────────────

/// A relationship row: `source_id —type_id→ destination_id`.
///
/// For is-a rows the source is the child and the destination the parent.
#[derive(Debug, Clone)]
pub struct RelationshipRecord {
    pub source_id: ConceptCode,
    pub destination_id: ConceptCode,
    pub type_id: ConceptCode,
    /// The `active` flag, when the file has that column.
    pub active: Option<bool>,
    row: Rf2Row,
}

impl RelationshipRecord {
    pub fn new(source_id: ConceptCode, destination_id: ConceptCode, type_id: ConceptCode) -> Self {
        let columns = ColumnIndex::from_header("sourceId\tdestinationId\ttypeId", '\t');
        let text = format!("{source_id}\t{destination_id}\t{type_id}");
        Self {
            source_id,
            destination_id,
            type_id,
            active: None,
            row: Rf2Row::parse(0, text, Arc::new(columns)),
        }
    }

    /// Source line number (0 for records built in memory).
    pub fn line(&self) -> usize {
        self.row.line
    }

    /// Any other column of the row, by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.row.get(name)
    }

    pub fn row(&self) -> &Rf2Row {
        &self.row
    }
}

/// Streaming reader producing [`RelationshipRecord`]s from an RF2 relationship file.
pub struct RelationshipReader<R> {
    rows: Rf2Reader<R>,
    source: usize,
    destination: usize,
    type_id: usize,
    active: Option<usize>,
}

impl<R: BufRead> RelationshipReader<R> {
    /// Read and validate the header; `sourceId`, `destinationId` and `typeId`
    /// must all be present before any row is processed.
    pub fn new(reader: R, delimiter: char) -> Result<Self> {
        let rows = Rf2Reader::new(reader, delimiter)?;
        let required = rows.columns().require(&[SOURCE_ID, DESTINATION_ID, TYPE_ID])?;
        let active = rows.columns().position(ACTIVE);
        Ok(Self {
            source: required[0],
            destination: required[1],
            type_id: required[2],
            active,
            rows,
        })
    }

    pub fn columns(&self) -> &ColumnIndex {
        self.rows.columns()
    }

    pub fn has_active_column(&self) -> bool {
        self.active.is_some()
    }

    fn record(&self, row: Rf2Row) -> Result<RelationshipRecord> {
        let mut positions = vec![self.source, self.destination, self.type_id];
        positions.extend(self.active);
        row.ensure_fields(&positions)?;

        Ok(RelationshipRecord {
            source_id: row.code(self.source, "sourceId")?,
            destination_id: row.code(self.destination, "destinationId")?,
            type_id: row.code(self.type_id, "typeId")?,
            active: self
                .active
                .map(|p| row.flag(p, "active"))
                .transpose()?,
            row,
        })
    }
}

impl<R: BufRead> Iterator for RelationshipReader<R> {
    type Item = Result<RelationshipRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(row.and_then(|row| self.record(row)))
    }
}
