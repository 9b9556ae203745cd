/// Flow-to-stage mapping on a stage-discharge rating curve.
///
/// A rating curve maps gage height to discharge. Given a flow (e.g. the 1%
/// AEP peak flow from StreamStats), we read the curve backwards to find the
/// stage that flow would produce.
///
/// Out-of-range flows are never clamped: a single lookup fails with
/// `OutOfRange`, and the batch mapping leaves the stage empty for that row.

use std::str::FromStr;

use crate::error::{LapisError, Result};
use crate::model::{cfs_to_cms, ft_to_m, FlowToStageRow, PeakFlowStatistic, RatingPoint};

// ---------------------------------------------------------------------------
// Rating curve
// ---------------------------------------------------------------------------

/// A validated rating curve: rows sorted by stage, discharge non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingCurve {
    pub gage_id: String,
    points: Vec<RatingPoint>,
}

impl RatingCurve {
    /// Sorts rows by stage and validates them.
    ///
    /// # Errors
    /// `LapisError::InvalidRatingCurve` for fewer than two rows, non-finite
    /// values, repeated stages, or discharge that decreases as stage rises.
    pub fn new(gage_id: &str, mut points: Vec<RatingPoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(LapisError::InvalidRatingCurve(format!(
                "need at least two rows, got {}",
                points.len()
            )));
        }
        if let Some(bad) = points.iter().find(|p| !p.stage_ft.is_finite() || !p.flow_cfs.is_finite()) {
            return Err(LapisError::InvalidRatingCurve(format!("non-finite row {:?}", bad)));
        }

        points.sort_by(|a, b| a.stage_ft.total_cmp(&b.stage_ft));

        for pair in points.windows(2) {
            if pair[1].stage_ft == pair[0].stage_ft {
                return Err(LapisError::InvalidRatingCurve(format!(
                    "stage {} ft appears twice",
                    pair[0].stage_ft
                )));
            }
            if pair[1].flow_cfs < pair[0].flow_cfs {
                return Err(LapisError::InvalidRatingCurve(format!(
                    "discharge decreases from {} to {} cfs between {} and {} ft",
                    pair[0].flow_cfs, pair[1].flow_cfs, pair[0].stage_ft, pair[1].stage_ft
                )));
            }
        }

        Ok(Self {
            gage_id: gage_id.to_string(),
            points,
        })
    }

    pub fn points(&self) -> &[RatingPoint] {
        &self.points
    }

    pub fn min_flow(&self) -> f64 {
        self.points[0].flow_cfs
    }

    pub fn max_flow(&self) -> f64 {
        self.points[self.points.len() - 1].flow_cfs
    }

    /// Stage for `flow_cfs` by linear interpolation between the two
    /// bracketing rows.
    ///
    /// A flow equal to a row's flow returns that row's stage exactly. Where
    /// several rows share the flow (a flat segment), the lowest stage wins.
    ///
    /// # Errors
    /// `LapisError::OutOfRange` when the flow is outside the curve.
    pub fn interpolate_stage(&self, flow_cfs: f64) -> Result<f64> {
        let (min, max) = (self.min_flow(), self.max_flow());
        if !(flow_cfs >= min && flow_cfs <= max) {
            return Err(LapisError::OutOfRange { flow: flow_cfs, min, max });
        }

        // First row whose flow reaches the target
        let upper = self.points.partition_point(|p| p.flow_cfs < flow_cfs);
        let hi = self.points[upper];
        if hi.flow_cfs == flow_cfs || upper == 0 {
            return Ok(hi.stage_ft);
        }

        let lo = self.points[upper - 1];
        let fraction = (flow_cfs - lo.flow_cfs) / (hi.flow_cfs - lo.flow_cfs);
        Ok(lo.stage_ft + fraction * (hi.stage_ft - lo.stage_ft))
    }

    /// Row whose flow is closest to `flow_cfs`; ties go to the lower stage.
    pub fn nearest_knot(&self, flow_cfs: f64) -> RatingPoint {
        let mut best = self.points[0];
        for p in &self.points[1..] {
            if (p.flow_cfs - flow_cfs).abs() < (best.flow_cfs - flow_cfs).abs() {
                best = *p;
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Batch mapping
// ---------------------------------------------------------------------------

/// How a statistic's flow is read off the rating curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageMethod {
    /// Piecewise-linear interpolation; out-of-range flows get no stage.
    #[default]
    Linear,
    /// Closest rating row; always yields a stage.
    Nearest,
}

impl FromStr for StageMethod {
    type Err = LapisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(StageMethod::Linear),
            "nearest" => Ok(StageMethod::Nearest),
            other => Err(LapisError::Config(format!(
                "unknown stage method '{}', expected 'linear' or 'nearest'",
                other
            ))),
        }
    }
}

/// Maps each peak-flow statistic onto the rating curve and adds metric
/// duplicates of flows and stages.
pub fn flow_to_stage(stats: &[PeakFlowStatistic], curve: &RatingCurve, method: StageMethod) -> Vec<FlowToStageRow> {
    stats
        .iter()
        .map(|stat| {
            let (rc_stage_ft, rc_flow_cfs) = match method {
                StageMethod::Linear => match curve.interpolate_stage(stat.pfs_flow_cfs) {
                    Ok(stage) => (Some(stage), Some(stat.pfs_flow_cfs)),
                    Err(e) => {
                        tracing::warn!("{} ({}): {}", stat.pfs_aep_code, stat.pfs_aep_name, e);
                        (None, None)
                    }
                },
                StageMethod::Nearest => {
                    let knot = curve.nearest_knot(stat.pfs_flow_cfs);
                    (Some(knot.stage_ft), Some(knot.flow_cfs))
                }
            };

            FlowToStageRow {
                statistic: stat.clone(),
                rc_stage_ft,
                rc_flow_cfs,
                pfs_flow_cms: cfs_to_cms(stat.pfs_flow_cfs),
                rc_flow_cms: rc_flow_cfs.map(cfs_to_cms),
                rc_stage_m: rc_stage_ft.map(ft_to_m),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
