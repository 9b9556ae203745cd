/// Shared data types for the lapis workflow.
///
/// Everything here is transient: recomputed per run, never persisted.
/// Field names on the serialized records follow the column names the
/// research notebooks have always exported (`pfs_flow_cfs`, `rc_stage_ft`,
/// `ept_usiei`, ...), so exported tables stay comparable across runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const EPSG_WGS84: u32 = 4326;
pub const EPSG_WEB_MERCATOR: u32 = 3857;
pub const EPSG_CONUS_ALBERS: u32 = 5070;

/// Cubic feet per cubic metre.
pub const CFS_PER_CMS: f64 = 35.3147;
/// Metres per foot.
pub const M_PER_FT: f64 = 0.3048;

/// Buffer radius applied to point locations that don't specify one.
pub const DEFAULT_BUFFER_M: f64 = 50.0;

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// A user-supplied location descriptor, as read from a locations TOML file:
///
/// ```toml
/// [[location]]
/// name = "peoria_gage"
/// data_type = "coords"
/// value = [-89.5898, 40.6939]
/// buffer = 100.0
/// ```
///
/// All coordinates are geographic WGS84 (lon, lat).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "data_type", rename_all = "lowercase")]
pub enum LocationSpec {
    /// A point buffered by `buffer` metres (default 50 m).
    Coords {
        name: String,
        value: [f64; 2],
        buffer: Option<f64>,
    },
    /// A GeoJSON file containing polygons or multipolygons.
    File { name: String, value: PathBuf },
    /// `[minx, miny, maxx, maxy]`.
    Bbox { name: String, value: [f64; 4] },
}

impl LocationSpec {
    pub fn name(&self) -> &str {
        match self {
            LocationSpec::Coords { name, .. }
            | LocationSpec::File { name, .. }
            | LocationSpec::Bbox { name, .. } => name,
        }
    }
}

// ---------------------------------------------------------------------------
// Lidar collections
// ---------------------------------------------------------------------------

/// A lidar collection found in the inventory for one location, enriched by
/// catalog reconciliation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collection {
    /// Name of the location whose geometry intersected this collection.
    pub name: String,
    pub title: Option<String>,
    /// Inventory record identifier.
    pub inventory_id: Option<String>,
    pub data_type: Option<String>,
    pub collect_start: Option<NaiveDate>,
    pub collect_end: Option<NaiveDate>,
    pub year: Option<i32>,
    /// Raw `Links` JSON document from the inventory.
    pub links: Option<String>,
    /// Digital Coast dataset id parsed from `links`.
    pub noaa_id: Option<String>,
    /// EPT path advertised by the inventory itself.
    pub ept_usiei: Option<String>,
    /// EPT path from the Digital Coast catalog.
    pub ept_noaa: Option<String>,
    /// Reconciled EPT path.
    pub ept: Option<String>,
    /// EPSG code of the EPT resource's native CRS.
    pub ept_crs: Option<u32>,
    /// Query URL of the inventory layer that returned this record.
    pub source_layer: String,
}

// ---------------------------------------------------------------------------
// Hydrology
// ---------------------------------------------------------------------------

/// One row of a stage/discharge rating table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingPoint {
    pub stage_ft: f64,
    pub flow_cfs: f64,
}

/// An annual-exceedance-probability flow estimate for a gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakFlowStatistic {
    pub gage_id: String,
    pub pfs_aep_code: String,
    pub pfs_aep_name: String,
    pub pfs_flow_cfs: f64,
    pub unit: Option<String>,
    pub is_preferred: Option<bool>,
}

/// A peak-flow statistic mapped onto a rating curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowToStageRow {
    #[serde(flatten)]
    pub statistic: PeakFlowStatistic,
    /// Stage read from the rating curve; `None` when the flow is outside it.
    pub rc_stage_ft: Option<f64>,
    /// Rating-curve flow the stage corresponds to: the statistic's own flow
    /// when interpolating, the matched knot's flow for a nearest lookup.
    pub rc_flow_cfs: Option<f64>,
    pub pfs_flow_cms: f64,
    pub rc_flow_cms: Option<f64>,
    pub rc_stage_m: Option<f64>,
}

pub fn cfs_to_cms(cfs: f64) -> f64 {
    cfs / CFS_PER_CMS
}

pub fn ft_to_m(ft: f64) -> f64 {
    ft * M_PER_FT
}
