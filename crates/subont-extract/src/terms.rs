//! Term file production: filter an RF2 concept/description table down to the
//! descendant set and write `code<TAB>term` lines.

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use subont_core::ConceptCode;
use subont_graph::rf2::ACTIVE;
use subont_graph::Rf2Reader;

use crate::error::{ExtractError, Result};

pub const CONCEPT_ID: &str = "conceptid";
pub const TERM: &str = "term";

/// Counters for one filtering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    /// Data rows read from the concept table.
    pub rows_read: usize,
    /// Rows written to the term file.
    pub rows_written: usize,
    /// Distinct concept codes that produced at least one row.
    pub concepts_matched: usize,
}

/// Filters concept-table rows by membership in a code set.
pub struct TermFilter<'a> {
    codes: &'a HashSet<ConceptCode>,
    delimiter: char,
    active_only: bool,
}

impl<'a> TermFilter<'a> {
    pub fn new(codes: &'a HashSet<ConceptCode>) -> Self {
        Self {
            codes,
            delimiter: '\t',
            active_only: false,
        }
    }

    /// Delimiter for both the concept table and the term file.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    /// Stream `reader` and write every matching row, in input order, to `writer`.
    ///
    /// All rows of a matching concept are kept, so a description file yields
    /// every synonym. No header is written. Write failures are reported
    /// against `output`.
    pub fn write_terms<R: BufRead, W: Write>(
        &self,
        reader: R,
        writer: &mut W,
        output: &Path,
    ) -> Result<TermStats> {
        let rows = Rf2Reader::new(reader, self.delimiter)?;
        let required = rows.columns().require(&[CONCEPT_ID, TERM])?;
        let (concept_col, term_col) = (required[0], required[1]);
        let active_col = if self.active_only {
            let col = rows.columns().position(ACTIVE);
            if col.is_none() {
                tracing::warn!("active-only filtering requested but the concept table has no active column");
            }
            col
        } else {
            None
        };

        let mut stats = TermStats::default();
        let mut matched = HashSet::new();
        let mut positions = vec![concept_col, term_col];
        positions.extend(active_col);

        for row in rows {
            let row = row?;
            stats.rows_read += 1;
            row.ensure_fields(&positions)?;

            if let Some(col) = active_col {
                if !row.flag(col, "active")? {
                    continue;
                }
            }

            let code = row.code(concept_col, "conceptId")?;
            if !self.codes.contains(&code) {
                continue;
            }

            let term = row.field(term_col).unwrap_or_default();
            writeln!(
                writer,
                "{code}{delim}{term}",
                delim = self.delimiter,
                term = quote_field(term, self.delimiter)
            )
            .map_err(|source| ExtractError::Io {
                path: output.to_path_buf(),
                source,
            })?;

            stats.rows_written += 1;
            matched.insert(code);
        }

        stats.concepts_matched = matched.len();
        Ok(stats)
    }
}

/// Quote a field when it contains the delimiter, a double quote or a line
/// break; embedded quotes are doubled.
pub fn quote_field(field: &str, delimiter: char) -> Cow<'_, str> {
    if field.contains(|c: char| c == delimiter || c == '"' || c == '\n' || c == '\r') {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use subont_graph::GraphError;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const DESCRIPTIONS: &str = "id\teffectiveTime\tactive\tmoduleId\tconceptId\tlanguageCode\ttypeId\tterm\tcaseSignificanceId\n\
        1\t20020131\t1\t900000000000207008\t22298006\ten\t900000000000003001\tMyocardial infarction (disorder)\t900000000000448009\n\
        2\t20020131\t1\t900000000000207008\t22298006\ten\t900000000000013009\tHeart attack\t900000000000448009\n\
        3\t20020131\t1\t900000000000207008\t57809008\ten\t900000000000013009\tMyocardial disease\t900000000000448009\n\
        4\t20020131\t0\t900000000000207008\t22298006\ten\t900000000000013009\tCardiac infarction\t900000000000448009\n";

    fn codes(values: &[u64]) -> HashSet<ConceptCode> {
        values.iter().map(|&v| ConceptCode(v)).collect()
    }

    fn run(filter: &TermFilter<'_>, input: &str) -> (String, TermStats) {
        let mut out = Vec::new();
        let stats = filter.write_terms(input.as_bytes(), &mut out, Path::new("out.tsv")).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_keeps_all_synonyms_in_order() {
        let set = codes(&[22_298_006]);
        let (out, stats) = run(&TermFilter::new(&set), DESCRIPTIONS);

        assert_eq!(
            out,
            "22298006\tMyocardial infarction (disorder)\n22298006\tHeart attack\n22298006\tCardiac infarction\n"
        );
        assert_eq!(
            stats,
            TermStats {
                rows_read: 4,
                rows_written: 3,
                concepts_matched: 1,
            }
        );
    }

    #[test]
    fn test_active_only_skips_inactive_rows() {
        let set = codes(&[22_298_006, 57_809_008]);
        let (out, stats) = run(&TermFilter::new(&set).with_active_only(true), DESCRIPTIONS);

        assert_eq!(
            out,
            "22298006\tMyocardial infarction (disorder)\n22298006\tHeart attack\n57809008\tMyocardial disease\n"
        );
        assert_eq!(stats.concepts_matched, 2);
    }

    #[test]
    fn test_empty_code_set_writes_nothing() {
        let set = HashSet::new();
        let (out, stats) = run(&TermFilter::new(&set), DESCRIPTIONS);
        assert!(out.is_empty());
        assert_eq!(stats.rows_read, 4);
        assert_eq!(stats.rows_written, 0);
    }

    #[test]
    fn test_two_column_concept_table() {
        let set = codes(&[2]);
        let (out, _) = run(&TermFilter::new(&set), "conceptId\tterm\n1\tOne\n2\tTwo\n");
        assert_eq!(out, "2\tTwo\n");
    }

    #[test]
    fn test_missing_term_column() {
        let set = codes(&[1]);
        let mut out = Vec::new();
        let result = TermFilter::new(&set).write_terms(
            "conceptId\tname\n1\tOne\n".as_bytes(),
            &mut out,
            Path::new("out.tsv"),
        );
        assert!(matches!(
            result,
            Err(ExtractError::Graph(GraphError::MissingColumn { .. }))
        ));
    }

    #[test]
    fn test_bad_concept_id_is_malformed() {
        let set = codes(&[1]);
        let mut out = Vec::new();
        let result = TermFilter::new(&set).write_terms(
            "conceptId\tterm\nx1\tOne\n".as_bytes(),
            &mut out,
            Path::new("out.tsv"),
        );
        assert!(matches!(
            result,
            Err(ExtractError::Graph(GraphError::MalformedRecord { line: 2, .. }))
        ));
    }

    #[test]
    fn test_write_failure_names_output_path() {
        let set = codes(&[1]);
        let result = TermFilter::new(&set).write_terms(
            "conceptId\tterm\n1\tOne\n".as_bytes(),
            &mut FailingWriter,
            Path::new("/data/out.tsv"),
        );
        match result {
            Err(ExtractError::Io { path, .. }) => assert_eq!(path, Path::new("/data/out.tsv")),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_quote_field() {
        assert_eq!(quote_field("Heart attack", '\t'), "Heart attack");
        assert_eq!(quote_field("Finding \"X\"", '\t'), "\"Finding \"\"X\"\"\"");
        assert_eq!(quote_field("a,b", ','), "\"a,b\"");
        assert_eq!(quote_field("a,b", '\t'), "a,b");
    }
}
