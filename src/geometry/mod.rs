/// Location geometry preparation.
///
/// Turns user location descriptors into single-part WGS84 polygons plus their
/// Web Mercator copies (the CRS the inventory is queried in), and renders
/// polygons as Esri JSON and WKT for the downstream services.

pub mod projection;

use std::fs;
use std::path::Path;

use geojson::{GeoJson, Geometry, Value};
use serde_json::json;

use crate::error::{LapisError, Result};
use crate::model::LocationSpec;
use projection::Crs;

/// Vertices used to approximate a buffered point (16 per quadrant).
const BUFFER_SEGMENTS: usize = 64;

pub type Ring = Vec<[f64; 2]>;

// ---------------------------------------------------------------------------
// Polygon
// ---------------------------------------------------------------------------

/// A single-part polygon. Rings are closed (first vertex repeated last).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub interiors: Vec<Ring>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Polygon {
    pub fn new(exterior: Ring, interiors: Vec<Ring>) -> Self {
        Self {
            exterior: close_ring(exterior),
            interiors: interiors.into_iter().map(close_ring).collect(),
        }
    }

    /// Rectangle from `[minx, miny, maxx, maxy]`.
    pub fn rectangle(bbox: [f64; 4]) -> Self {
        let [minx, miny, maxx, maxy] = bbox;
        Polygon::new(
            vec![[minx, miny], [maxx, miny], [maxx, maxy], [minx, maxy]],
            Vec::new(),
        )
    }

    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        };
        for [x, y] in &self.exterior {
            b.min_x = b.min_x.min(*x);
            b.min_y = b.min_y.min(*y);
            b.max_x = b.max_x.max(*x);
            b.max_y = b.max_y.max(*y);
        }
        b
    }

    /// Reprojects every vertex from one CRS to another.
    pub fn transform(&self, from: Crs, to: Crs) -> Polygon {
        let map_ring = |ring: &Ring| -> Ring {
            ring.iter()
                .map(|[x, y]| {
                    let (tx, ty) = projection::transform(from, to, *x, *y);
                    [tx, ty]
                })
                .collect()
        };
        Polygon {
            exterior: map_ring(&self.exterior),
            interiors: self.interiors.iter().map(map_ring).collect(),
        }
    }

    /// Well-Known Text, e.g. `POLYGON ((x y, x y, ...))`.
    pub fn to_wkt(&self) -> String {
        format!("POLYGON {}", self.wkt_rings())
    }

    fn wkt_rings(&self) -> String {
        let ring_wkt = |ring: &Ring| {
            let coords: Vec<String> = ring.iter().map(|[x, y]| format!("{} {}", x, y)).collect();
            format!("({})", coords.join(", "))
        };
        let mut rings = vec![ring_wkt(&self.exterior)];
        rings.extend(self.interiors.iter().map(ring_wkt));
        format!("({})", rings.join(", "))
    }
}

impl Bounds {
    /// Smallest bounds covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Combined bounds of every part of a location. `None` for no parts.
pub fn total_bounds(parts: &[Polygon]) -> Option<Bounds> {
    parts.iter().map(Polygon::bounds).reduce(|acc, b| acc.union(&b))
}

/// WKT for a location made of one or more parts: a `POLYGON` for a single
/// part, a `MULTIPOLYGON` otherwise.
pub fn parts_to_wkt(parts: &[Polygon]) -> String {
    match parts {
        [single] => single.to_wkt(),
        _ => {
            let bodies: Vec<String> = parts.iter().map(Polygon::wkt_rings).collect();
            format!("MULTIPOLYGON ({})", bodies.join(", "))
        }
    }
}

fn close_ring(mut ring: Ring) -> Ring {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

/// Twice the signed area of a ring; positive for counter-clockwise.
fn signed_area2(ring: &Ring) -> f64 {
    ring.windows(2)
        .map(|w| w[0][0] * w[1][1] - w[1][0] * w[0][1])
        .sum()
}

fn oriented(ring: &Ring, clockwise: bool) -> Ring {
    let is_ccw = signed_area2(ring) > 0.0;
    if is_ccw == clockwise {
        ring.iter().rev().copied().collect()
    } else {
        ring.clone()
    }
}

// ---------------------------------------------------------------------------
// Esri geometry
// ---------------------------------------------------------------------------

/// Renders a polygon as Esri JSON geometry (`{"rings": [...]}`).
///
/// Esri expects exterior rings clockwise and holes counter-clockwise, so the
/// rings are re-oriented as needed.
pub fn esri_geometry(polygon: &Polygon) -> String {
    let mut rings = vec![oriented(&polygon.exterior, true)];
    rings.extend(polygon.interiors.iter().map(|r| oriented(r, false)));
    json!({ "rings": rings }).to_string()
}

// ---------------------------------------------------------------------------
// Location shapes
// ---------------------------------------------------------------------------

/// A single-part location polygon ready for catalog queries.
#[derive(Debug, Clone)]
pub struct LocationShape {
    pub name: String,
    pub wgs84: Polygon,
    pub mercator: Polygon,
}

impl LocationShape {
    pub(crate) fn from_wgs84(name: &str, wgs84: Polygon) -> Self {
        let mercator = wgs84.transform(Crs::Wgs84, Crs::WebMercator);
        Self {
            name: name.to_string(),
            wgs84,
            mercator,
        }
    }

    pub fn esri_geometry(&self) -> String {
        esri_geometry(&self.mercator)
    }

    /// The location polygon in another CRS (e.g. an EPT resource's native CRS).
    pub fn in_crs(&self, epsg: u32) -> Result<Polygon> {
        let target = Crs::from_epsg(epsg)?;
        Ok(self.wgs84.transform(Crs::Wgs84, target))
    }
}

/// Builds single-part location polygons from descriptors.
///
/// Multi-part file geometries are exploded: each part becomes its own
/// `LocationShape` carrying the location's name. An empty descriptor list
/// yields an empty result.
pub fn generate_geometries(
    locations: &[LocationSpec],
    default_buffer_m: f64,
) -> Result<Vec<LocationShape>> {
    let mut shapes = Vec::new();

    for location in locations {
        match location {
            LocationSpec::Coords { name, value, buffer } => {
                let radius = buffer.unwrap_or(default_buffer_m);
                if !(radius > 0.0) {
                    return Err(LapisError::InvalidLocation {
                        name: name.clone(),
                        reason: format!("buffer must be positive, got {}", radius),
                    });
                }
                let polygon = buffer_point(value[0], value[1], radius);
                shapes.push(LocationShape::from_wgs84(name, polygon));
            }
            LocationSpec::Bbox { name, value } => {
                let [minx, miny, maxx, maxy] = *value;
                if minx >= maxx || miny >= maxy {
                    return Err(LapisError::InvalidLocation {
                        name: name.clone(),
                        reason: format!("degenerate bbox {:?}", value),
                    });
                }
                shapes.push(LocationShape::from_wgs84(name, Polygon::rectangle(*value)));
            }
            LocationSpec::File { name, value } => {
                let polygons = read_polygon_file(value).map_err(|e| LapisError::InvalidLocation {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
                for polygon in polygons {
                    shapes.push(LocationShape::from_wgs84(name, polygon));
                }
            }
        }
    }

    tracing::debug!("generated {} location shapes from {} descriptors", shapes.len(), locations.len());
    Ok(shapes)
}

/// Buffers a WGS84 point by `radius_m` metres.
///
/// The circle is built in CONUS Albers (an equal-area, metre-based CRS) and
/// projected back to WGS84.
pub fn buffer_point(lon: f64, lat: f64, radius_m: f64) -> Polygon {
    let (cx, cy) = Crs::ConusAlbers.from_wgs84(lon, lat);
    let ring: Ring = (0..BUFFER_SEGMENTS)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / BUFFER_SEGMENTS as f64;
            let (x, y) = (cx + radius_m * angle.cos(), cy + radius_m * angle.sin());
            let (plon, plat) = Crs::ConusAlbers.to_wgs84(x, y);
            [plon, plat]
        })
        .collect();
    Polygon::new(ring, Vec::new())
}

// ---------------------------------------------------------------------------
// GeoJSON input
// ---------------------------------------------------------------------------

/// Reads every polygon in a GeoJSON file (Feature, FeatureCollection or bare
/// Geometry), exploding multipolygons into their parts.
pub fn read_polygon_file(path: &Path) -> Result<Vec<Polygon>> {
    let contents = fs::read_to_string(path)?;
    parse_polygons(&contents)
}

pub fn parse_polygons(geojson_text: &str) -> Result<Vec<Polygon>> {
    let geojson: GeoJson = geojson_text
        .parse()
        .map_err(|e| LapisError::Parse(format!("GeoJSON parse failed: {}", e)))?;

    let geometries: Vec<Geometry> = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().filter_map(|f| f.geometry).collect(),
        GeoJson::Feature(f) => f.geometry.into_iter().collect(),
        GeoJson::Geometry(g) => vec![g],
    };

    let mut polygons = Vec::new();
    for geometry in geometries {
        collect_polygons(&geometry.value, &mut polygons);
    }

    if polygons.is_empty() {
        return Err(LapisError::Parse("GeoJSON contains no polygon geometries".to_string()));
    }
    Ok(polygons)
}

fn collect_polygons(value: &Value, out: &mut Vec<Polygon>) {
    match value {
        Value::Polygon(rings) => {
            if let Some(polygon) = polygon_from_rings(rings) {
                out.push(polygon);
            }
        }
        Value::MultiPolygon(parts) => {
            out.extend(parts.iter().filter_map(|rings| polygon_from_rings(rings)));
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(&g.value, out);
            }
        }
        _ => tracing::warn!("skipping non-polygon geometry in location file"),
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Option<Polygon> {
    let to_ring = |positions: &Vec<Vec<f64>>| -> Ring {
        positions
            .iter()
            .filter(|p| p.len() >= 2)
            .map(|p| [p[0], p[1]])
            .collect()
    };
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(to_ring(exterior), interiors.iter().map(to_ring).collect()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
