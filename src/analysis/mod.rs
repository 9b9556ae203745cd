/// Data analysis for the lapis workflow.
///
/// Submodules:
/// - `reconcile`  — joins inventory collections with the Digital Coast catalog.
/// - `flow_stage` — rating curves and the flow-to-stage mapping.
/// - `gps_time`   — lidar GPS timestamps to UTC, collection start/end.

pub mod flow_stage;
pub mod gps_time;
pub mod reconcile;
