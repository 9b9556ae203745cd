/// GPS time conversion for lidar point timestamps.
///
/// LAS point records store "adjusted standard GPS time": seconds since the
/// GPS epoch (1980-01-06 00:00:00 UTC) minus 1e9. GPS time does not observe
/// leap seconds, so converting to UTC subtracts the leap seconds inserted
/// since the GPS epoch.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::{LapisError, Result};

/// Seconds between the Unix epoch and the GPS epoch.
pub const GPS_EPOCH_UNIX_OFFSET: f64 = 315_964_800.0;

/// Offset between adjusted standard GPS time and GPS time.
pub const ADJUSTED_GPS_OFFSET: f64 = 1e9;

/// GPS-time instants at which each leap second since 1980 took effect
/// (1981-07-01 through 2017-01-01).
const LEAP_SECONDS_GPS: [f64; 18] = [
    46_828_800.0,
    78_364_801.0,
    109_900_802.0,
    173_059_203.0,
    252_028_804.0,
    315_187_205.0,
    346_723_206.0,
    393_984_007.0,
    425_520_008.0,
    457_056_009.0,
    504_489_610.0,
    551_750_411.0,
    599_184_012.0,
    820_108_813.0,
    914_803_214.0,
    1_025_136_015.0,
    1_119_744_016.0,
    1_167_264_017.0,
];

/// Number of leap seconds that have taken effect at GPS time `gps_seconds`.
pub fn count_leaps(gps_seconds: f64) -> u32 {
    LEAP_SECONDS_GPS.iter().filter(|&&leap| gps_seconds >= leap).count() as u32
}

/// Converts an adjusted standard GPS time to UTC.
///
/// # Errors
/// `LapisError::Parse` for non-finite or unrepresentable times.
pub fn gps_to_utc(adjusted_gps: f64) -> Result<DateTime<Utc>> {
    if !adjusted_gps.is_finite() {
        return Err(LapisError::Parse(format!("invalid GPS time {}", adjusted_gps)));
    }
    let gps_seconds = adjusted_gps + ADJUSTED_GPS_OFFSET;
    let unix = gps_seconds + GPS_EPOCH_UNIX_OFFSET - f64::from(count_leaps(gps_seconds));

    let secs = unix.floor();
    let nanos = ((unix - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        .ok_or_else(|| LapisError::Parse(format!("GPS time {} is out of range", adjusted_gps)))
}

/// Finite times only; NaN and infinities (a "nan" line in a dump parses as
/// one) are dropped with a warning.
fn finite_times(times: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = times.iter().copied().filter(|t| t.is_finite()).collect();
    if finite.len() < times.len() {
        tracing::warn!("skipping {} non-finite GPS times", times.len() - finite.len());
    }
    finite
}

/// Sorted, de-duplicated timestamps at one-second resolution. Non-finite
/// times are skipped, as in `collection_span`.
pub fn unique_timestamps(times: &[f64]) -> Result<BTreeSet<DateTime<Utc>>> {
    finite_times(times)
        .into_iter()
        .map(|t| {
            let dt = gps_to_utc(t)?;
            DateTime::<Utc>::from_timestamp(dt.timestamp(), 0)
                .ok_or_else(|| LapisError::Parse(format!("GPS time {} is out of range", t)))
        })
        .collect()
}

/// First and last acquisition instants of a set of point times. Non-finite
/// times are skipped.
///
/// # Errors
/// `LapisError::NoDataAvailable` when there are no finite times.
pub fn collection_span(times: &[f64]) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (min, max) = finite_times(times).into_iter().fold((f64::MAX, f64::MIN), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if min > max {
        return Err(LapisError::NoDataAvailable("no GPS times to summarise".to_string()));
    }
    Ok((gps_to_utc(min)?, gps_to_utc(max)?))
}

/// Parses a GPS-time dump: one value per line; blank lines, `#` comments and
/// a non-numeric header line are ignored.
pub fn parse_gps_times(text: &str) -> Vec<f64> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let first = line.split([',', '\t', ' ']).next().unwrap_or(line);
            first.parse::<f64>().ok()
        })
        .collect()
}
