/// lapis: lidar and rating-curve research workflow for flood mapping.
///
/// # Module structure
///
/// ```text
/// lapis
/// ├── model       — shared data types (LocationSpec, Collection, RatingPoint, …)
/// ├── error       — LapisError and the crate Result alias
/// ├── config      — lapis.toml loader and the locations file reader
/// ├── export      — JSON record exports
/// ├── geometry
/// │   └── projection — WGS84 / Web Mercator / CONUS Albers / UTM transforms
/// ├── ingest
/// │   ├── inventory     — USIEI ArcGIS layer queries + GeoJSON parsing
/// │   ├── digital_coast — NOAA Digital Coast catalog (EPT paths by dataset id)
/// │   ├── ept           — ept.json CRS lookup + PDAL pipeline construction
/// │   ├── ratings       — USGS rating depot RDB client
/// │   ├── gagestats     — StreamStats GageStats peak-flow statistics
/// │   └── fixtures (test only) — representative service payloads
/// └── analysis
///     ├── reconcile  — Links parsing, catalog cross-reference, EPT path reconciliation
///     ├── flow_stage — rating curve interpolation and flow-to-stage mapping
///     └── gps_time   — adjusted GPS time to UTC conversion
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod ingest;
pub mod model;
