/// NOAA Digital Coast lidar catalog (secondary catalog).
///
/// Digital Coast publishes its lidar holdings as an HTML table at
///   https://coast.noaa.gov/htdata/lidar1_z/
/// with one row per dataset: "ID #", "Dataset Name", "Year", and link
/// columns ("Metadata", "EPT", "Potree", "footprint", "Tile Index").
///
/// This module works from an exported copy of that table: a JSON array of
/// row objects keyed by the table's column headers. Empty cells and the
/// placeholders the export tends to contain ("None", "nan", "<NA>") are
/// treated as missing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{LapisError, Result};

pub const COL_ID: &str = "ID #";
pub const COL_NAME: &str = "Dataset Name";
pub const COL_YEAR: &str = "Year";
pub const COL_EPT: &str = "EPT";
pub const COL_METADATA: &str = "Metadata";

/// One Digital Coast dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitalCoastRecord {
    pub id: String,
    pub name: Option<String>,
    pub year: Option<String>,
    pub metadata: Option<String>,
    pub ept: Option<String>,
}

/// Digital Coast rows indexed by dataset id.
#[derive(Debug, Clone, Default)]
pub struct DigitalCoastCatalog {
    records: HashMap<String, DigitalCoastRecord>,
}

impl DigitalCoastCatalog {
    /// Parses an exported table (JSON array of row objects).
    ///
    /// Rows without an id are skipped. When an id repeats, the first row wins.
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<Map<String, Value>> = serde_json::from_str(json)
            .map_err(|e| LapisError::Parse(format!("Digital Coast table is not a JSON array of rows: {}", e)))?;

        let mut records = HashMap::new();
        for row in &rows {
            let Some(id) = cell(row, COL_ID) else {
                tracing::warn!("skipping Digital Coast row without '{}'", COL_ID);
                continue;
            };
            records.entry(id.clone()).or_insert_with(|| DigitalCoastRecord {
                id,
                name: cell(row, COL_NAME),
                year: cell(row, COL_YEAR),
                metadata: cell(row, COL_METADATA),
                ept: cell(row, COL_EPT),
            });
        }

        Ok(Self { records })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn get(&self, id: &str) -> Option<&DigitalCoastRecord> {
        self.records.get(id)
    }

    /// EPT path for a dataset id, if the catalog has one.
    pub fn ept_for(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|r| r.ept.as_deref())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A cell value as a trimmed string, with placeholders mapped to `None`.
fn cell(row: &Map<String, Value>, column: &str) -> Option<String> {
    let text = match row.get(column)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match text.as_str() {
        "" | "None" | "none" | "nan" | "NaN" | "<NA>" | "null" => None,
        _ => Some(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::fixture_digital_coast_json;

    #[test]
    fn test_catalog_indexes_by_id() {
        let catalog = DigitalCoastCatalog::from_json(fixture_digital_coast_json()).expect("fixture should parse");
        assert_eq!(catalog.len(), 3);

        let peoria = catalog.get("9176").expect("9176 should be present");
        assert_eq!(peoria.name.as_deref(), Some("2020 USGS Lidar: Illinois Peoria County"));
        assert!(peoria.ept.as_deref().unwrap_or("").ends_with("9176/ept.json"));
    }

    #[test]
    fn test_numeric_ids_are_normalised_to_strings() {
        let catalog = DigitalCoastCatalog::from_json(fixture_digital_coast_json()).unwrap();
        assert!(catalog.ept_for("6312").is_some(), "numeric ID # should be looked up as text");
    }

    #[test]
    fn test_placeholder_cells_are_missing() {
        let catalog = DigitalCoastCatalog::from_json(fixture_digital_coast_json()).unwrap();
        assert_eq!(catalog.ept_for("5001"), None, "'None' EPT cell is a missing value");
        assert_eq!(catalog.ept_for("0000"), None, "unknown id has no EPT");
    }

    #[test]
    fn test_rejects_non_array() {
        let result = DigitalCoastCatalog::from_json(r#"{"ID #": "1"}"#);
        assert!(matches!(result, Err(LapisError::Parse(_))));
    }

    #[test]
    fn test_repo_catalog_export_loads() {
        let catalog = DigitalCoastCatalog::load(Path::new("data/noaa_dav.json")).expect("sample export should load");
        assert!(!catalog.is_empty());
    }
}
