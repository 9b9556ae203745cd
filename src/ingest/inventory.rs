/// USIEI (US Interagency Elevation Inventory) lidar catalog search.
///
/// Queries NOAA's USIEIv2 MapServer layers for collections intersecting each
/// location polygon:
///   https://coast.noaa.gov/arcgis/rest/services/USInteragencyElevationInventory/USIEIv2/MapServer/{layer}/query
///
/// The query is a form POST carrying the location as Esri JSON in Web
/// Mercator; the response is requested as GeoJSON. See `fixtures.rs` for the
/// response shape.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use geojson::{GeoJson, JsonObject};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::LapisConfig;
use crate::error::{LapisError, Result};
use crate::geometry::{self, LocationShape};
use crate::model::{Collection, LocationSpec, EPSG_WEB_MERCATOR};

// ---------------------------------------------------------------------------
// Query construction
// ---------------------------------------------------------------------------

/// Form fields for a spatial-intersect query with one location geometry.
pub fn build_query_form(esri_geometry: &str) -> Vec<(&'static str, String)> {
    vec![
        ("outFields", "*".to_string()),
        ("geometry", esri_geometry.to_string()),
        ("geometryType", "esriGeometryPolygon".to_string()),
        ("inSR", EPSG_WEB_MERCATOR.to_string()),
        ("spatialRel", "esriSpatialRelIntersects".to_string()),
        ("returnGeometry", "true".to_string()),
        ("returnIdsOnly", "false".to_string()),
        ("f", "geojson".to_string()),
    ]
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ArcGisErrorEnvelope {
    error: ArcGisError,
}

#[derive(Deserialize)]
struct ArcGisError {
    code: u16,
    #[serde(default)]
    message: String,
}

/// Parses a USIEI GeoJSON query response into `Collection`s tagged with the
/// location name and the layer URL they came from.
///
/// An empty FeatureCollection is not an error here; whether "nothing found"
/// matters is the caller's decision.
///
/// # Errors
/// - `LapisError::Service`: ArcGIS returned an `error` object (it does so
///   with HTTP 200).
/// - `LapisError::Parse`: anything that isn't a FeatureCollection.
pub fn parse_inventory_response(json: &str, location_name: &str, layer_url: &str) -> Result<Vec<Collection>> {
    if let Ok(envelope) = serde_json::from_str::<ArcGisErrorEnvelope>(json) {
        return Err(LapisError::Service {
            url: layer_url.to_string(),
            status: envelope.error.code,
            reason: envelope.error.message,
        });
    }

    let fc = match json.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(fc)) => fc,
        Ok(_) => return Err(LapisError::Parse("inventory response is not a FeatureCollection".to_string())),
        Err(e) => return Err(LapisError::Parse(format!("inventory response parse failed: {}", e))),
    };

    let collections = fc
        .features
        .into_iter()
        .map(|feature| {
            let properties = feature.properties.unwrap_or_default();
            collection_from_properties(&properties, location_name, layer_url)
        })
        .collect();

    Ok(collections)
}

fn collection_from_properties(props: &JsonObject, location_name: &str, layer_url: &str) -> Collection {
    let collect_start = property(props, &["collect_start", "collection_start", "start_date"]).and_then(as_date);
    let collect_end = property(props, &["collect_end", "collection_end", "end_date"]).and_then(as_date);
    let year = property(props, &["year", "collect_year"])
        .and_then(as_i32)
        .or_else(|| collect_start.map(|d| d.year()));

    Collection {
        name: location_name.to_string(),
        title: property(props, &["title", "name", "project_name"]).and_then(as_string),
        inventory_id: property(props, &["id", "objectid"]).and_then(as_string),
        data_type: property(props, &["datatype", "data_type"]).and_then(as_string),
        collect_start,
        collect_end,
        year,
        links: property(props, &["links"]).and_then(as_string),
        source_layer: layer_url.to_string(),
        ..Collection::default()
    }
}

/// First non-null property matching one of `keys`, compared case-insensitively.
/// Field capitalisation differs between USIEI layers.
fn property<'a>(props: &'a JsonObject, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        props
            .iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_null())
            .map(|(_, v)| v)
    })
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Esri date fields arrive as epoch milliseconds; some layers use strings.
fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        Value::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
                .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
                .ok()
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

/// Queries one inventory layer for one location shape.
pub fn query_layer(client: &Client, layer_url: &str, shape: &LocationShape) -> Result<Vec<Collection>> {
    tracing::debug!("POST {} for location '{}'", layer_url, shape.name);

    let response = client
        .post(layer_url)
        .form(&build_query_form(&shape.esri_geometry()))
        .send()?;
    let response = super::check_status(response, layer_url)?;
    let body = response.text()?;

    parse_inventory_response(&body, &shape.name, layer_url)
}

/// Queries every layer for every shape (layers outer, shapes inner) and
/// concatenates the results.
///
/// No shapes means no requests and an empty result.
pub fn search_collections(client: &Client, layers: &[String], shapes: &[LocationShape]) -> Result<Vec<Collection>> {
    let mut collections = Vec::new();
    if shapes.is_empty() {
        return Ok(collections);
    }

    for layer_url in layers {
        for shape in shapes {
            let found = query_layer(client, layer_url, shape)?;
            tracing::debug!("{} collections for '{}' from {}", found.len(), shape.name, layer_url);
            collections.extend(found);
        }
    }

    Ok(collections)
}

/// Builds location geometries and searches the configured inventory layers.
///
/// Returns the shapes alongside the collections, since later steps
/// (reprojection into an EPT CRS) need the location polygon each collection
/// was found for.
pub fn get_lidar_collections(
    client: &Client,
    config: &LapisConfig,
    locations: &[LocationSpec],
) -> Result<(Vec<LocationShape>, Vec<Collection>)> {
    let shapes = geometry::generate_geometries(locations, config.search.default_buffer_m)?;
    let collections = search_collections(client, &config.services.inventory_layers, &shapes)?;
    Ok((shapes, collections))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;

    const LAYER: &str = "https://coast.noaa.gov/arcgis/rest/services/USInteragencyElevationInventory/USIEIv2/MapServer/2/query";

    // --- Query construction -------------------------------------------------

    #[test]
    fn test_query_form_requests_geojson_intersects() {
        let form = build_query_form(r#"{"rings":[]}"#);
        let get = |key: &str| form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());

        assert_eq!(get("f"), Some("geojson"));
        assert_eq!(get("spatialRel"), Some("esriSpatialRelIntersects"));
        assert_eq!(get("geometryType"), Some("esriGeometryPolygon"));
        assert_eq!(get("inSR"), Some("3857"), "geometry is sent in Web Mercator");
        assert_eq!(get("geometry"), Some(r#"{"rings":[]}"#));
        assert_eq!(get("outFields"), Some("*"));
    }

    // --- Parsing: happy path ------------------------------------------------

    #[test]
    fn test_parse_inventory_collections_and_metadata() {
        let collections = parse_inventory_response(fixture_inventory_geojson(), "peoria_gage", LAYER)
            .expect("fixture should parse");
        assert_eq!(collections.len(), 2);

        let peoria = &collections[0];
        assert_eq!(peoria.name, "peoria_gage");
        assert_eq!(peoria.title.as_deref(), Some("IL Peoria County 2020"));
        assert_eq!(peoria.inventory_id.as_deref(), Some("10371"));
        assert_eq!(peoria.data_type.as_deref(), Some("Lidar"));
        assert_eq!(peoria.collect_start, NaiveDate::from_ymd_opt(2020, 4, 1));
        assert_eq!(peoria.collect_end, NaiveDate::from_ymd_opt(2020, 5, 15));
        assert_eq!(peoria.year, Some(2020), "year should fall back to collect_start");
        assert!(peoria.links.as_deref().unwrap_or("").contains("EPT Link"));
        assert_eq!(peoria.source_layer, LAYER);
    }

    #[test]
    fn test_parse_inventory_explicit_year_and_missing_dates() {
        let collections = parse_inventory_response(fixture_inventory_geojson(), "peoria_gage", LAYER).unwrap();
        let tazewell = &collections[1];
        assert_eq!(tazewell.year, Some(2012));
        assert!(tazewell.collect_start.is_none());
        assert!(tazewell.ept.is_none(), "reconciliation fields start empty");
    }

    // --- Parsing: error and edge cases --------------------------------------

    #[test]
    fn test_parse_inventory_empty_collection() {
        let collections = parse_inventory_response(fixture_inventory_empty_geojson(), "x", LAYER).unwrap();
        assert!(collections.is_empty());
    }

    #[test]
    fn test_parse_inventory_arcgis_error_object() {
        let result = parse_inventory_response(fixture_inventory_error_json(), "x", LAYER);
        assert!(
            matches!(result, Err(LapisError::Service { status: 400, .. })),
            "ArcGIS error object should map to a Service error, got {:?}",
            result
        );
    }

    #[test]
    fn test_parse_inventory_malformed_json() {
        let result = parse_inventory_response("{ not json", "x", LAYER);
        assert!(matches!(result, Err(LapisError::Parse(_))));
    }

    #[test]
    fn test_search_with_no_locations_makes_no_requests() {
        // The client points nowhere reachable; an empty location list must
        // short-circuit before any request is attempted.
        let client = Client::new();
        let layers = vec!["http://127.0.0.1:9/unreachable".to_string()];
        let collections = search_collections(&client, &layers, &[]).expect("empty search is not an error");
        assert!(collections.is_empty());
    }

    #[test]
    fn test_get_lidar_collections_with_empty_location_list() {
        let client = Client::new();
        let mut config = LapisConfig::default();
        config.services.inventory_layers = vec!["http://127.0.0.1:9/unreachable".to_string()];

        let (shapes, collections) = get_lidar_collections(&client, &config, &[]).unwrap();
        assert!(shapes.is_empty());
        assert!(collections.is_empty());
    }

    // --- Network failure ----------------------------------------------------

    #[test]
    fn test_query_layer_unreachable_is_http_error() {
        let client = Client::new();
        let shape = geometry::generate_geometries(
            &[LocationSpec::Bbox { name: "reach".into(), value: [-89.62, 40.66, -89.55, 40.72] }],
            50.0,
        )
        .unwrap()
        .remove(0);

        let result = query_layer(&client, "http://127.0.0.1:9/MapServer/2/query", &shape);
        assert!(matches!(result, Err(LapisError::Http(_))), "got {:?}", result);

        let layers = vec!["http://127.0.0.1:9/MapServer/2/query".to_string()];
        let result = search_collections(&client, &layers, std::slice::from_ref(&shape));
        assert!(matches!(result, Err(LapisError::Http(_))), "search should propagate the transport failure");
    }
}
