/// Entwine Point Tile (EPT) resources: native CRS discovery and point-cloud
/// retrieval requests.
///
/// An EPT resource is a directory of point tiles rooted at `ept.json`, whose
/// `srs` block names the resource's native CRS. Location polygons must be
/// reprojected into that CRS before a bounds/polygon crop means anything.
///
/// Retrieval itself is done by PDAL; this module produces the pipeline
/// description (`readers.ept` + optional `writers.las`) for a collection and
/// location.

use std::path::Path;
use std::str::FromStr;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{LapisError, Result};
use crate::geometry::{self, LocationShape, Polygon};
use crate::model::{Collection, EPSG_WGS84};

// ---------------------------------------------------------------------------
// Native CRS
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct EptRoot {
    srs: Option<EptSrs>,
}

#[derive(Deserialize)]
struct EptSrs {
    authority: Option<String>,
    horizontal: Option<String>,
}

/// URL of the `ept.json` root for an EPT path (which may already be one).
pub fn ept_json_url(ept_path: &str) -> String {
    if ept_path.ends_with("ept.json") {
        ept_path.to_string()
    } else {
        format!("{}/ept.json", ept_path.trim_end_matches('/'))
    }
}

/// Extracts the horizontal EPSG code from an `ept.json` document.
///
/// # Errors
/// `LapisError::Parse` when the document has no usable EPSG `srs`.
pub fn parse_ept_srs(json: &str) -> Result<u32> {
    let root: EptRoot = serde_json::from_str(json)
        .map_err(|e| LapisError::Parse(format!("ept.json deserialization failed: {}", e)))?;

    let srs = root.srs.ok_or_else(|| LapisError::Parse("ept.json has no srs".to_string()))?;

    if let Some(authority) = &srs.authority {
        if !authority.eq_ignore_ascii_case("EPSG") {
            return Err(LapisError::Parse(format!("unsupported srs authority '{}'", authority)));
        }
    }

    let horizontal = srs
        .horizontal
        .ok_or_else(|| LapisError::Parse("ept.json srs has no horizontal code".to_string()))?;
    horizontal
        .trim()
        .parse()
        .map_err(|e| LapisError::Parse(format!("invalid srs.horizontal '{}': {}", horizontal, e)))
}

/// Fetches an EPT resource's root metadata and returns its EPSG code.
pub fn fetch_ept_crs(client: &Client, ept_path: &str) -> Result<u32> {
    let body = super::get_text(client, &ept_json_url(ept_path))?;
    parse_ept_srs(&body)
}

/// EPSG code for a collection's EPT resource, falling back to WGS84 when
/// there is no path or the metadata can't be read.
pub fn resolve_ept_crs(client: &Client, ept_path: Option<&str>) -> u32 {
    let Some(path) = ept_path else {
        return EPSG_WGS84;
    };
    match fetch_ept_crs(client, path) {
        Ok(epsg) => epsg,
        Err(e) => {
            tracing::warn!("could not read CRS for {}: {}; assuming EPSG:{}", path, e, EPSG_WGS84);
            EPSG_WGS84
        }
    }
}

// ---------------------------------------------------------------------------
// PDAL pipeline
// ---------------------------------------------------------------------------

/// How the location crops the point cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMethod {
    /// Axis-aligned bounds of the location.
    Bounds,
    /// The location polygon itself.
    Polygon,
}

impl FromStr for CropMethod {
    type Err = LapisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bounds" => Ok(CropMethod::Bounds),
            "polygon" => Ok(CropMethod::Polygon),
            other => Err(LapisError::Config(format!(
                "unknown crop method '{}', expected 'bounds' or 'polygon'",
                other
            ))),
        }
    }
}

/// PDAL bounds string `([minx, maxx], [miny, maxy])` covering every part.
/// `None` when there are no parts.
pub fn pdal_bounds(parts: &[Polygon]) -> Option<String> {
    let b = geometry::total_bounds(parts)?;
    Some(format!("([{}, {}], [{}, {}])", b.min_x, b.max_x, b.min_y, b.max_y))
}

/// Builds a PDAL pipeline reading `ept_url` cropped to the location's
/// `parts` (already in the EPT's CRS), optionally writing the result to a
/// LAS file.
///
/// # Errors
/// `LapisError::InvalidLocation` when `parts` is empty.
pub fn build_pipeline(ept_url: &str, parts: &[Polygon], method: CropMethod, write_las: Option<&Path>) -> Result<Value> {
    let bounds = pdal_bounds(parts).ok_or_else(|| LapisError::InvalidLocation {
        name: ept_url.to_string(),
        reason: "no location polygon to crop to".to_string(),
    })?;

    let mut reader = json!({
        "type": "readers.ept",
        "filename": ept_url,
        "tag": "readdata",
    });
    match method {
        CropMethod::Bounds => reader["bounds"] = json!(bounds),
        CropMethod::Polygon => reader["polygon"] = json!(geometry::parts_to_wkt(parts)),
    }

    let mut stages = vec![reader];
    if let Some(out) = write_las {
        stages.push(json!({
            "type": "writers.las",
            "filename": out.display().to_string(),
        }));
    }
    Ok(Value::Array(stages))
}

/// Builds the retrieval pipeline for a reconciled collection and every part
/// of the location that found it. Multi-part locations crop to the combined
/// extent of all parts, since any one of them may have matched.
///
/// # Errors
/// - `LapisError::MissingEptPath`: the collection has no reconciled path.
/// - `LapisError::UnsupportedCrs`: the EPT CRS can't be projected to.
/// - `LapisError::InvalidLocation`: no location parts were given.
pub fn pipeline_for_collection(
    collection: &Collection,
    parts: &[&LocationShape],
    method: CropMethod,
    write_las: Option<&Path>,
) -> Result<Value> {
    let ept_url = collection.ept.as_deref().ok_or_else(|| {
        LapisError::MissingEptPath(collection.title.clone().unwrap_or_else(|| collection.name.clone()))
    })?;

    let crs = collection.ept_crs.unwrap_or(EPSG_WGS84);
    let location = parts
        .iter()
        .map(|shape| shape.in_crs(crs))
        .collect::<Result<Vec<Polygon>>>()?;
    build_pipeline(ept_url, &location, method, write_las)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
