//! Core domain types shared by the graph builder, the collector and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubontError};

// ── Concept codes ─────────────────────────────────────────────────

/// A SNOMED CT concept identifier.
///
/// SCTIDs are numeric and can exceed the 32-bit range, so they are held as a
/// `u64`. Parsing rejects leading zeros, which keeps `Display` byte-for-byte
/// identical to the text the code was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConceptCode(pub u64);

/// The "Is a (attribute)" relationship type.
pub const IS_A_TYPE_ID: ConceptCode = ConceptCode(116_680_003);

/// "SNOMED CT Concept (SNOMED RT+CTV3)", the top of the hierarchy.
pub const SNOMED_ROOT: ConceptCode = ConceptCode(138_875_005);

impl ConceptCode {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl FromStr for ConceptCode {
    type Err = SubontError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| SubontError::InvalidConceptCode {
            value: s.to_string(),
            reason,
        };

        if s.is_empty() {
            return Err(invalid("empty code"));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("codes must contain only ASCII digits"));
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(invalid("leading zeros are not allowed"));
        }
        s.parse::<u64>()
            .map(ConceptCode)
            .map_err(|_| invalid("code exceeds the 64-bit range"))
    }
}

impl TryFrom<String> for ConceptCode {
    type Error = SubontError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ConceptCode> for String {
    fn from(code: ConceptCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for ConceptCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a comma-separated seed list such as `"404684003,71388002"`.
///
/// Surrounding whitespace on each item is ignored; empty items are rejected.
pub fn parse_code_list(raw: &str) -> Result<Vec<ConceptCode>> {
    raw.split(',').map(|item| item.trim().parse()).collect()
}

// ── Relationship filtering ────────────────────────────────────────

/// Which relationship rows contribute edges to the ontology graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationFilter {
    /// Only rows whose `typeId` is exactly [`IS_A_TYPE_ID`].
    IsAOnly,
    /// Every row, including concept model attributes.
    #[default]
    All,
}

impl RelationFilter {
    /// Whether a row with the given relationship type is kept.
    pub fn accepts(self, type_id: ConceptCode) -> bool {
        match self {
            Self::IsAOnly => type_id == IS_A_TYPE_ID,
            Self::All => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IsAOnly => "is-a-only",
            Self::All => "all",
        }
    }
}

impl FromStr for RelationFilter {
    type Err = SubontError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed == "116680003" {
            return Ok(Self::IsAOnly);
        }
        match trimmed.to_lowercase().as_str() {
            "is-a-only" | "is-a" => Ok(Self::IsAOnly),
            "all" => Ok(Self::All),
            _ => Err(SubontError::InvalidRelationFilter(s.to_string())),
        }
    }
}

impl fmt::Display for RelationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
