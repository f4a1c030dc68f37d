//! Configuration for sub-ontology extraction.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`SUBONT__EXTRACT__` prefix, e.g. `SUBONT__EXTRACT__ROOT_CODE`)
//! 2. Config file (`subont.toml`, `[extract]` section)
//! 3. Defaults
//!
//! Command-line flags in the binary take precedence over all of these.

use serde::Deserialize;

use crate::error::{Result, SubontError};
use crate::types::{ConceptCode, RelationFilter};

/// Extraction settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExtractConfig {
    /// Concept whose subtree the ontology is restricted to (default: SNOMED CT root).
    #[serde(default = "default_root_code")]
    pub root_code: String,

    /// Relationship types to keep: "116680003" / "is-a-only", or "all".
    #[serde(default = "default_relation_types")]
    pub relation_types: String,

    /// Single-character field delimiter of the RF2 files.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Skip rows whose `active` column is `0`.
    #[serde(default)]
    pub active_only: bool,

    /// Abort graph construction and traversal after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_root_code() -> String {
    "138875005".to_string()
}

fn default_relation_types() -> String {
    "all".to_string()
}

fn default_delimiter() -> String {
    "\t".to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            root_code: default_root_code(),
            relation_types: default_relation_types(),
            delimiter: default_delimiter(),
            active_only: false,
            timeout_secs: None,
        }
    }
}

impl ExtractConfig {
    /// Load the `[extract]` section from `<file_prefix>.toml` and the environment.
    ///
    /// A missing file or section falls back to defaults; a section that is
    /// present but malformed is an error.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("SUBONT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<ExtractConfig>("extract") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => {
                tracing::debug!(file_prefix, "No [extract] config section, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> Result<ConceptCode> {
        self.root_code.parse()
    }

    pub fn relation_filter(&self) -> Result<RelationFilter> {
        self.relation_types.parse()
    }

    pub fn delimiter(&self) -> Result<char> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(SubontError::InvalidDelimiter(self.delimiter.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SNOMED_ROOT;

    #[test]
    fn test_default_config() {
        let config = ExtractConfig::default();
        assert_eq!(config.root().unwrap(), SNOMED_ROOT);
        assert_eq!(config.relation_filter().unwrap(), RelationFilter::All);
        assert_eq!(config.delimiter().unwrap(), '\t');
        assert!(!config.active_only);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_invalid_values_surface_on_access() {
        let config = ExtractConfig {
            root_code: "root".to_string(),
            relation_types: "116680".to_string(),
            delimiter: ",,".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.root(), Err(SubontError::InvalidConceptCode { .. })));
        assert!(matches!(
            config.relation_filter(),
            Err(SubontError::InvalidRelationFilter(_))
        ));
        assert!(matches!(config.delimiter(), Err(SubontError::InvalidDelimiter(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subont.toml");
        std::fs::write(
            &path,
            "[extract]\nroot_code = \"373873005\"\nrelation_types = \"is-a-only\"\nactive_only = true\ntimeout_secs = 30\n",
        )
        .unwrap();

        let prefix = dir.path().join("subont");
        let config = ExtractConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.root().unwrap(), ConceptCode(373_873_005));
        assert_eq!(config.relation_filter().unwrap(), RelationFilter::IsAOnly);
        assert!(config.active_only);
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.delimiter().unwrap(), '\t');
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = ExtractConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.root_code, "138875005");
        assert_eq!(config.relation_types, "all");
    }
}
