//! Bulk import of existing space codes.
//!
//! Operators paste a list of codes they already use on site. The list is
//! split into codes and handed to a [`SpaceImporter`]. Nothing here touches
//! the grid layout; the editor keeps generating its own ids.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

lazy_static! {
    static ref CODE_SEPARATOR: Regex = Regex::new(r"[,;\s]+").unwrap();
    static ref DISABILITY_MARKER: Regex = Regex::new(r"(?i)DISABLED").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedSpace {
    pub id: Uuid,
    pub code: String,
    pub is_disability: bool,
    pub imported_at: DateTime<Utc>,
}

impl ImportedSpace {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        ImportedSpace {
            id: Uuid::new_v4(),
            is_disability: is_disability_code(&code),
            code,
            imported_at: Utc::now(),
        }
    }
}

/// Split free text on commas, semicolons and whitespace. Empty pieces are
/// dropped and repeated codes are kept once, in first-seen order.
pub fn split_codes(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    CODE_SEPARATOR
        .split(text)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .filter(|code| seen.insert(code.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn is_disability_code(code: &str) -> bool {
    DISABILITY_MARKER.is_match(code)
}

pub fn parse_codes(text: &str) -> Vec<ImportedSpace> {
    split_codes(text).into_iter().map(ImportedSpace::new).collect()
}

/// Collaborator that owns the external space collection.
pub trait SpaceImporter {
    type Error;

    /// Returns how many spaces were actually added.
    fn import_spaces(&mut self, spaces: &[ImportedSpace]) -> Result<usize, Self::Error>;
}

/// Space collection kept as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct FileSpaceCatalog {
    path: PathBuf,
}

impl FileSpaceCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSpaceCatalog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spaces(&self) -> std::io::Result<Vec<ImportedSpace>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn write(&self, spaces: &[ImportedSpace]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(spaces)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())
    }
}

impl SpaceImporter for FileSpaceCatalog {
    type Error = std::io::Error;

    /// Codes already in the catalog are skipped.
    fn import_spaces(&mut self, spaces: &[ImportedSpace]) -> std::io::Result<usize> {
        let mut catalog = self.spaces()?;
        let mut known: HashSet<String> = catalog.iter().map(|s| s.code.clone()).collect();

        let before = catalog.len();
        for space in spaces {
            if known.insert(space.code.clone()) {
                catalog.push(space.clone());
            }
        }
        let added = catalog.len() - before;

        if added > 0 {
            self.write(&catalog)?;
        }
        info!("Imported {} of {} spaces into {}", added, spaces.len(), self.path.display());
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_codes_mixed_delimiters() {
        let text = "A1, A2;A3\nB1\t B2  ,,;\r\nB3 A1";
        assert_eq!(split_codes(text), vec!["A1", "A2", "A3", "B1", "B2", "B3"]);
        assert!(split_codes("  ,;\n ").is_empty());
    }

    #[test]
    fn test_disability_marker() {
        assert!(is_disability_code("A1-DISABLED"));
        assert!(is_disability_code("disabled_7"));
        assert!(is_disability_code("P-Disabled"));
        assert!(!is_disability_code("A1"));
        assert!(!is_disability_code("DIS-A1"));
    }

    #[test]
    fn test_parse_codes_flags() {
        let spaces = parse_codes("A1,A2-DISABLED");
        assert_eq!(spaces.len(), 2);
        assert!(!spaces[0].is_disability);
        assert!(spaces[1].is_disability);
        assert_ne!(spaces[0].id, spaces[1].id);
    }

    #[test]
    fn test_file_catalog_skips_known_codes() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = FileSpaceCatalog::new(dir.path().join("db/spaces.json"));

        assert_eq!(catalog.import_spaces(&parse_codes("A1 A2")).unwrap(), 2);
        assert_eq!(catalog.import_spaces(&parse_codes("A2 A3-disabled")).unwrap(), 1);

        let stored = catalog.spaces().unwrap();
        let codes: Vec<&str> = stored.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["A1", "A2", "A3-disabled"]);
        assert!(stored[2].is_disability);
    }

    #[test]
    fn test_file_catalog_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spaces.json");
        fs::write(&path, "{oops").unwrap();
        let mut catalog = FileSpaceCatalog::new(&path);
        let err = catalog.import_spaces(&parse_codes("A1")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
