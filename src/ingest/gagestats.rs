/// USGS StreamStats GageStats client: peak-flow (AEP) statistics.
///
///   https://streamstats.usgs.gov/gagestatsservices/statistics?stationIDOrCode={gage}&statisticGroups=2
///
/// Statistic group 2 holds the peak-flow frequency estimates. The response
/// is a JSON array; each entry carries the flow in `value` and the AEP
/// label in a nested `regressionType` object.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{LapisError, Result};
use crate::model::PeakFlowStatistic;

/// StreamStats statistic group for peak-flow statistics.
pub const PEAK_FLOW_STATISTIC_GROUP: u32 = 2;

#[derive(Deserialize)]
struct StatisticEntry {
    value: Option<f64>,
    #[serde(rename = "regressionType")]
    regression_type: Option<RegressionType>,
    #[serde(rename = "unitType")]
    unit_type: Option<UnitType>,
    #[serde(rename = "isPreferred")]
    is_preferred: Option<bool>,
}

#[derive(Deserialize)]
struct RegressionType {
    code: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct UnitType {
    abbreviation: Option<String>,
}

pub fn build_gagestats_url(base_url: &str, gage_id: &str) -> String {
    format!(
        "{}?stationIDOrCode={}&statisticGroups={}",
        base_url,
        urlencoding::encode(gage_id.trim()),
        PEAK_FLOW_STATISTIC_GROUP
    )
}

/// Parses a GageStats statistics response.
///
/// Entries without a flow value or without a regression type are skipped.
///
/// # Errors
/// - `LapisError::Parse`: not a JSON array of statistics.
/// - `LapisError::NoDataAvailable`: no usable statistics.
pub fn parse_gagestats_response(json: &str, gage_id: &str) -> Result<Vec<PeakFlowStatistic>> {
    let entries: Vec<StatisticEntry> = serde_json::from_str(json)
        .map_err(|e| LapisError::Parse(format!("JSON deserialization failed: {}", e)))?;

    let stats: Vec<PeakFlowStatistic> = entries
        .into_iter()
        .filter_map(|entry| {
            let flow = entry.value?;
            let regression = entry.regression_type?;
            Some(PeakFlowStatistic {
                gage_id: gage_id.to_string(),
                pfs_aep_code: regression.code.unwrap_or_default(),
                pfs_aep_name: regression.name.unwrap_or_default(),
                pfs_flow_cfs: flow,
                unit: entry.unit_type.and_then(|u| u.abbreviation),
                is_preferred: entry.is_preferred,
            })
        })
        .collect();

    if stats.is_empty() {
        return Err(LapisError::NoDataAvailable(format!("no peak-flow statistics for gage {}", gage_id)));
    }

    Ok(stats)
}

/// Fetches peak-flow statistics for a gage.
pub fn fetch_peak_flow_statistics(client: &Client, base_url: &str, gage_id: &str) -> Result<Vec<PeakFlowStatistic>> {
    let url = build_gagestats_url(base_url, gage_id);
    let body = super::get_text(client, &url)?;
    parse_gagestats_response(&body, gage_id)
}
