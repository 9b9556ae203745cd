/// USGS NWIS rating depot client.
///
/// Retrieves stage-discharge rating tables in RDB format:
///   https://waterdata.usgs.gov/nwisweb/get_ratings?site_no={site}&file_type={exsa|base|corr}
///
/// RDB format structure:
/// - Lines starting with '#' are comments (rating metadata header)
/// - First non-comment line: tab-delimited column names
/// - Second non-comment line: tab-delimited format descriptors (e.g., "16N")
/// - Remaining lines: tab-delimited data rows
///
/// Key fields:
/// - INDEP: independent variable, gage height (ft)  -> stage_ft
/// - DEP:   dependent variable, discharge (cfs)     -> flow_cfs
/// - SHIFT: shift applied (exsa only, already folded into DEP)
/// - STOR:  '*' marks stored (non-interpolated) rating points

use std::collections::HashMap;

use reqwest::blocking::Client;

use crate::analysis::flow_stage::RatingCurve;
use crate::error::{LapisError, Result};
use crate::model::RatingPoint;

pub const RATING_FILE_TYPES: &[&str] = &["exsa", "base", "corr"];

/// Builds a rating depot URL for a gage and rating file type.
pub fn build_ratings_url(base_url: &str, site_no: &str, file_type: &str) -> String {
    format!(
        "{}?site_no={}&file_type={}",
        base_url,
        urlencoding::encode(site_no.trim()),
        file_type
    )
}

/// Parses a rating depot RDB document into rating rows.
///
/// Rows whose INDEP or DEP is blank or non-numeric are skipped.
///
/// # Errors
/// - `LapisError::NoDataAvailable`: the depot reported no data, or no row
///   carried both values.
/// - `LapisError::Parse`: missing header/format lines or INDEP/DEP columns.
pub fn parse_rating_rdb(rdb_text: &str) -> Result<Vec<RatingPoint>> {
    if rdb_text.contains("No sites/data found") {
        return Err(LapisError::NoDataAvailable("rating depot has no rating for this site".to_string()));
    }

    // Skip comment lines (start with #)
    let mut data_lines = rdb_text
        .lines()
        .filter(|line| !line.trim().starts_with('#') && !line.trim().is_empty());

    // First non-comment line: column headers
    let header_line = data_lines
        .next()
        .ok_or_else(|| LapisError::Parse("No header line found in RDB data".to_string()))?;
    let col_map: HashMap<&str, usize> = header_line
        .split('\t')
        .enumerate()
        .map(|(idx, header)| (header.trim(), idx))
        .collect();

    // Second non-comment line: format descriptors (skip)
    data_lines
        .next()
        .ok_or_else(|| LapisError::Parse("No format line found in RDB data".to_string()))?;

    let indep_idx = *col_map
        .get("INDEP")
        .ok_or_else(|| LapisError::Parse("Missing INDEP column".to_string()))?;
    let dep_idx = *col_map
        .get("DEP")
        .ok_or_else(|| LapisError::Parse("Missing DEP column".to_string()))?;

    let parse_field = |fields: &[&str], idx: usize| -> Option<f64> {
        fields
            .get(idx)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
    };

    let mut points = Vec::new();
    for line in data_lines {
        let fields: Vec<&str> = line.split('\t').collect();
        match (parse_field(&fields, indep_idx), parse_field(&fields, dep_idx)) {
            (Some(stage_ft), Some(flow_cfs)) => points.push(RatingPoint { stage_ft, flow_cfs }),
            _ => tracing::warn!("skipping rating row without numeric INDEP/DEP: {:?}", line),
        }
    }

    if points.is_empty() {
        return Err(LapisError::NoDataAvailable("rating table has no rows".to_string()));
    }

    Ok(points)
}

/// Fetches and validates the rating curve for a gage.
pub fn fetch_rating_curve(client: &Client, base_url: &str, site_no: &str, file_type: &str) -> Result<RatingCurve> {
    if !RATING_FILE_TYPES.contains(&file_type) {
        return Err(LapisError::Config(format!("unknown rating file type '{}'", file_type)));
    }

    let url = build_ratings_url(base_url, site_no, file_type);
    let body = super::get_text(client, &url)?;
    let points = parse_rating_rdb(&body)?;
    tracing::debug!("parsed {} rating rows for {}", points.len(), site_no);

    RatingCurve::new(site_no, points)
}
