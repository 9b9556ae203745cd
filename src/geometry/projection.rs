/// Pure-Rust coordinate transforms for the handful of CRSs the workflow
/// touches: geographic WGS84 (input locations, inventory output), Web
/// Mercator (inventory queries, most EPT resources), CONUS Albers (metric
/// buffering) and UTM (EPT resources delivered in native UTM zones).
///
/// NAD83 is treated as coincident with WGS84; the sub-metre datum shift is
/// well below what a location buffer or a catalog query can resolve.
///
/// Formulas: Snyder 1987, USGS Professional Paper 1395.

use crate::error::{LapisError, Result};
use crate::model::{EPSG_CONUS_ALBERS, EPSG_WEB_MERCATOR, EPSG_WGS84};

// ---------------------------------------------------------------------------
// Ellipsoid constants
// ---------------------------------------------------------------------------

const A: f64 = 6_378_137.0; // semi-major axis (m), shared by WGS84 and GRS80
const F_WGS84: f64 = 1.0 / 298.257_223_563;
const F_GRS80: f64 = 1.0 / 298.257_222_101;

// UTM
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

// EPSG:5070 NAD83 / Conus Albers
const ALBERS_LAT0: f64 = 23.0;
const ALBERS_LON0: f64 = -96.0;
const ALBERS_LAT1: f64 = 29.5;
const ALBERS_LAT2: f64 = 45.5;

// ---------------------------------------------------------------------------
// CRS registry
// ---------------------------------------------------------------------------

/// A coordinate reference system this crate knows how to transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    Wgs84,
    WebMercator,
    ConusAlbers,
    /// UTM zone on WGS84 (326xx/327xx) or NAD83 (269xx, treated as WGS84).
    Utm { zone: u32, north: bool },
}

impl Crs {
    /// Resolves an EPSG code.
    ///
    /// # Errors
    /// `LapisError::UnsupportedCrs` for anything outside the supported set.
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            EPSG_WGS84 => Ok(Crs::Wgs84),
            EPSG_WEB_MERCATOR | 900913 | 102100 => Ok(Crs::WebMercator),
            EPSG_CONUS_ALBERS => Ok(Crs::ConusAlbers),
            32601..=32660 => Ok(Crs::Utm { zone: code - 32600, north: true }),
            32701..=32760 => Ok(Crs::Utm { zone: code - 32700, north: false }),
            26901..=26923 => Ok(Crs::Utm { zone: code - 26900, north: true }),
            _ => Err(LapisError::UnsupportedCrs(code)),
        }
    }

    /// Projects WGS84 `(lon, lat)` degrees into this CRS.
    pub fn from_wgs84(&self, lon: f64, lat: f64) -> (f64, f64) {
        match *self {
            Crs::Wgs84 => (lon, lat),
            Crs::WebMercator => wgs84_to_mercator(lon, lat),
            Crs::ConusAlbers => wgs84_to_albers(lon, lat),
            Crs::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
        }
    }

    /// Unprojects coordinates in this CRS back to WGS84 `(lon, lat)` degrees.
    pub fn to_wgs84(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Crs::Wgs84 => (x, y),
            Crs::WebMercator => mercator_to_wgs84(x, y),
            Crs::ConusAlbers => albers_to_wgs84(x, y),
            Crs::Utm { zone, north } => utm_to_wgs84(x, y, zone, north),
        }
    }
}

/// Transforms a single coordinate between two CRSs via WGS84.
pub fn transform(from: Crs, to: Crs, x: f64, y: f64) -> (f64, f64) {
    if from == to {
        return (x, y);
    }
    let (lon, lat) = from.to_wgs84(x, y);
    to.from_wgs84(lon, lat)
}

// ---------------------------------------------------------------------------
// Web Mercator (EPSG:3857, spherical)
// ---------------------------------------------------------------------------

fn wgs84_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = A * lon.to_radians();
    let y = A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / A).to_degrees();
    let lat = (2.0 * (y / A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

// ---------------------------------------------------------------------------
// Albers Equal Area Conic (EPSG:5070), Snyder pp. 101-102
// ---------------------------------------------------------------------------

struct AlbersParams {
    e: f64,
    e2: f64,
    n: f64,
    c: f64,
    rho0: f64,
}

fn albers_q(phi: f64, e: f64, e2: f64) -> f64 {
    let s = phi.sin();
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}

fn albers_m(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e2 * s * s).sqrt()
}

fn albers_params() -> AlbersParams {
    let e2 = 2.0 * F_GRS80 - F_GRS80 * F_GRS80;
    let e = e2.sqrt();
    let phi0 = ALBERS_LAT0.to_radians();
    let phi1 = ALBERS_LAT1.to_radians();
    let phi2 = ALBERS_LAT2.to_radians();

    let m1 = albers_m(phi1, e2);
    let m2 = albers_m(phi2, e2);
    let q0 = albers_q(phi0, e, e2);
    let q1 = albers_q(phi1, e, e2);
    let q2 = albers_q(phi2, e, e2);

    let n = (m1 * m1 - m2 * m2) / (q2 - q1);
    let c = m1 * m1 + n * q1;
    let rho0 = A * (c - n * q0).sqrt() / n;

    AlbersParams { e, e2, n, c, rho0 }
}

fn wgs84_to_albers(lon: f64, lat: f64) -> (f64, f64) {
    let p = albers_params();
    let q = albers_q(lat.to_radians(), p.e, p.e2);
    let rho = A * (p.c - p.n * q).sqrt() / p.n;
    let theta = p.n * (lon - ALBERS_LON0).to_radians();
    (rho * theta.sin(), p.rho0 - rho * theta.cos())
}

fn albers_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let p = albers_params();
    let dy = p.rho0 - y;
    let rho = (x * x + dy * dy).sqrt();
    let theta = x.atan2(dy);
    let q = (p.c - rho * rho * p.n * p.n / (A * A)) / p.n;

    // Iterate for latitude (Snyder eq. 3-16)
    let mut phi = (q / 2.0).asin();
    for _ in 0..15 {
        let s = phi.sin();
        let one_minus = 1.0 - p.e2 * s * s;
        let delta = one_minus * one_minus / (2.0 * phi.cos())
            * (q / (1.0 - p.e2) - s / one_minus
                + (1.0 / (2.0 * p.e)) * ((1.0 - p.e * s) / (1.0 + p.e * s)).ln());
        phi += delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }

    let lon = ALBERS_LON0 + (theta / p.n).to_degrees();
    (lon, phi.to_degrees())
}

// ---------------------------------------------------------------------------
// Transverse Mercator / UTM, Snyder pp. 61-64
// ---------------------------------------------------------------------------

fn utm_central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let e2 = 2.0 * F_WGS84 - F_WGS84 * F_WGS84;
    let ep2 = e2 / (1.0 - e2);

    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = utm_central_meridian(zone);

    let (sin_lat, cos_lat, tan_lat) = (lat.sin(), lat.cos(), lat.tan());

    let n = A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = ep2 * cos_lat * cos_lat;
    let a1 = cos_lat * (lon - lon0);
    let m = meridional_arc(lat, e2);

    let a2 = a1 * a1;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0 * n
        * (a1
            + (1.0 - t + c) * a2 * a1 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a4 * a1 / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let e2 = 2.0 * F_WGS84 - F_WGS84 * F_WGS84;
    let ep2 = e2 / (1.0 - e2);
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    let x = easting - FALSE_EASTING;
    let y = if north { northing } else { northing - FALSE_NORTHING_SOUTH };

    // Footpoint latitude (Snyder eqs. 8-18 .. 3-26)
    let m = y / K0;
    let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let sqrt_1me2 = (1.0 - e2).sqrt();
    let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1, tan1) = (phi1.sin(), phi1.cos(), phi1.tan());
    let c1 = ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let n1 = A / (1.0 - e2 * sin1 * sin1).sqrt();
    let r1 = A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon = utm_central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;

    (lon.to_degrees(), lat.to_degrees())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
