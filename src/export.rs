/// Tabular exports.
///
/// Every result table (collections, rating curves, peak-flow statistics,
/// flow-to-stage rows) is written as a JSON array of flat records, one
/// object per row, so it loads straight into a dataframe.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{LapisError, Result};

/// Writes `records` to `path` as a pretty-printed JSON array, creating the
/// parent directory if needed.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| LapisError::Parse(format!("failed to serialise records: {}", e)))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Renders any serialisable value (a record slice, a PDAL pipeline) as
/// pretty-printed JSON.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| LapisError::Parse(format!("failed to serialise records: {}", e)))
}
