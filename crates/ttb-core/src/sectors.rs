//! Sector → classification-code lookup table.
//!
//! Loaded once at process start, from `TTB_SECTORS_PATH` when set or from
//! the copy compiled into the binary otherwise, and never mutated.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const EMBEDDED_TABLE: &str = include_str!("../../../config/sectors.yaml");

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}\.\d{2}[A-Z]$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorEntry {
    pub id: String,
    pub label: String,
    pub codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SectorsFile {
    version: u32,
    sectors: Vec<SectorEntry>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct SectorTable {
    version: u32,
    sectors: Vec<SectorEntry>,
    by_id: HashMap<String, usize>,
    labels: HashMap<String, String>,
}

impl SectorTable {
    /// The table shipped with the binary.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the embedded YAML fails to parse or validate,
    /// which would indicate a broken build.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_yaml(EMBEDDED_TABLE)
    }

    /// Loads the table from `path`, or the embedded copy when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::embedded();
        };
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SectorsIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses and validates a YAML sector table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SectorsParse`] on malformed YAML and
    /// [`ConfigError::SectorsInvalid`] on duplicate ids, empty code lists, or
    /// codes that are not of the form `NN.NNX`.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: SectorsFile = serde_yaml::from_str(content)?;
        validate(&file)?;

        let by_id = file
            .sectors
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id.clone(), idx))
            .collect();

        Ok(Self {
            version: file.version,
            sectors: file.sectors,
            by_id,
            labels: file.labels,
        })
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Ordered classification codes for a sector id.
    ///
    /// `None` for an empty or unknown id, which callers treat as "no sector filter".
    #[must_use]
    pub fn codes_for(&self, sector_id: &str) -> Option<&[String]> {
        let id = sector_id.trim();
        if id.is_empty() {
            return None;
        }
        self.by_id
            .get(id)
            .map(|&idx| self.sectors[idx].codes.as_slice())
    }

    #[must_use]
    pub fn is_known(&self, sector_id: &str) -> bool {
        self.by_id.contains_key(sector_id.trim())
    }

    #[must_use]
    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.labels.get(code.trim()).map(String::as_str)
    }

    #[must_use]
    pub fn sectors(&self) -> &[SectorEntry] {
        &self.sectors
    }
}

fn validate(file: &SectorsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for sector in &file.sectors {
        let id = sector.id.trim();
        if id.is_empty() || id != sector.id {
            return Err(ConfigError::SectorsInvalid(format!(
                "sector id '{}' must be non-empty without surrounding whitespace",
                sector.id
            )));
        }
        if !seen.insert(id) {
            return Err(ConfigError::SectorsInvalid(format!(
                "duplicate sector id '{id}'"
            )));
        }
        if sector.codes.is_empty() {
            return Err(ConfigError::SectorsInvalid(format!(
                "sector '{id}' has no classification codes"
            )));
        }
        if let Some(bad) = sector.codes.iter().find(|c| !CODE_RE.is_match(c)) {
            return Err(ConfigError::SectorsInvalid(format!(
                "sector '{id}' has malformed code '{bad}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_loads() {
        let table = SectorTable::embedded().expect("embedded table must be valid");
        assert!(table.version() >= 1);
        assert!(table.sectors().len() >= 20);
    }

    #[test]
    fn codes_for_known_sector_is_ordered() {
        let table = SectorTable::embedded().unwrap();
        let codes = table.codes_for("tech").expect("tech is known");
        assert_eq!(codes.first().map(String::as_str), Some("62.01Z"));
    }

    #[test]
    fn codes_for_unknown_or_empty_is_none() {
        let table = SectorTable::embedded().unwrap();
        assert!(table.codes_for("unknown-sector-id").is_none());
        assert!(table.codes_for("").is_none());
        assert!(table.codes_for("   ").is_none());
    }

    #[test]
    fn commerce_maps_to_many_codes() {
        let table = SectorTable::embedded().unwrap();
        assert!(table.codes_for("commerce").unwrap().len() >= 40);
    }

    #[test]
    fn label_for_resolves_known_codes() {
        let table = SectorTable::embedded().unwrap();
        assert_eq!(table.label_for("62.01Z"), Some("Programmation informatique"));
        assert_eq!(table.label_for("99.99Z"), None);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let yaml = concat!(
            "version: 1\nsectors:\n",
            "  - {id: a, label: A, codes: ['62.01Z']}\n",
            "  - {id: a, label: B, codes: ['62.02A']}\n",
        );
        let err = SectorTable::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::SectorsInvalid(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_malformed_codes() {
        let yaml = "version: 1\nsectors:\n  - {id: a, label: A, codes: ['62']}\n";
        let err = SectorTable::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::SectorsInvalid(ref m) if m.contains("malformed")));
    }

    #[test]
    fn rejects_empty_code_list() {
        let yaml = "version: 1\nsectors:\n  - {id: a, label: A, codes: []}\n";
        assert!(SectorTable::from_yaml(yaml).is_err());
    }
}
