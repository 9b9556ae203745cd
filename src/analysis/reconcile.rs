/// Cross-references inventory collections with the Digital Coast catalog.
///
/// The inventory's `Links` document sometimes advertises an EPT link
/// directly and sometimes only points at a Digital Coast dataset
/// (`...ID=9176`). Joining on that id recovers the EPT path from the catalog
/// when the inventory doesn't carry one.
///
/// Reconciliation is first-non-null: the inventory's own path wins, the
/// catalog's path fills the gap, and nothing else is attempted.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::geometry::LocationShape;
use crate::ingest::digital_coast::DigitalCoastCatalog;
use crate::ingest::ept;
use crate::model::Collection;

const EPT_LINKTYPE: &str = "EPT Link";
const DIGITAL_COAST_LABEL: &str = "NOAA Digital Coast";
const DATA_ACCESS_LINKTYPE: &str = "Data Access";

#[derive(Deserialize)]
struct LinksDocument {
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Deserialize)]
struct Link {
    label: Option<String>,
    linktype: Option<String>,
    link: Option<String>,
}

fn parse_links(links_json: &str) -> Vec<Link> {
    match serde_json::from_str::<LinksDocument>(links_json) {
        Ok(doc) => doc.links,
        Err(e) => {
            tracing::debug!("unparseable Links document: {}", e);
            Vec::new()
        }
    }
}

/// The first link typed "EPT Link".
pub fn parse_ept_link(links_json: &str) -> Option<String> {
    parse_links(links_json)
        .into_iter()
        .find(|l| l.linktype.as_deref() == Some(EPT_LINKTYPE))
        .and_then(|l| l.link)
}

/// The Digital Coast dataset id: digits following `ID=` in the first
/// "NOAA Digital Coast" / "Data Access" link.
pub fn parse_noaa_id(links_json: &str) -> Option<String> {
    let link = parse_links(links_json)
        .into_iter()
        .find(|l| {
            l.label.as_deref() == Some(DIGITAL_COAST_LABEL)
                && l.linktype.as_deref() == Some(DATA_ACCESS_LINKTYPE)
        })?
        .link?;

    let start = link.find("ID=")? + "ID=".len();
    let digits: String = link[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

/// First non-null of the primary (inventory) and secondary (catalog) paths.
pub fn reconcile_path(primary: Option<&str>, secondary: Option<&str>) -> Option<String> {
    primary.or(secondary).map(str::to_string)
}

/// Fills `ept_usiei`, `noaa_id`, `ept_noaa` and the reconciled `ept` on
/// every collection. A left join: collections without a catalog match keep
/// whatever the inventory gave them.
pub fn cross_reference(collections: &mut [Collection], catalog: &DigitalCoastCatalog) {
    for collection in collections.iter_mut() {
        let links = collection.links.as_deref().unwrap_or("");

        collection.ept_usiei = parse_ept_link(links);
        collection.noaa_id = parse_noaa_id(links);
        collection.ept_noaa = collection
            .noaa_id
            .as_deref()
            .and_then(|id| catalog.ept_for(id))
            .map(str::to_string);
        collection.ept = reconcile_path(collection.ept_usiei.as_deref(), collection.ept_noaa.as_deref());

        if collection.ept.is_none() {
            tracing::debug!(
                "no EPT path for '{}' (noaa_id {:?})",
                collection.title.as_deref().unwrap_or("untitled"),
                collection.noaa_id
            );
        }
    }
}

/// Looks up the native CRS of every collection's reconciled EPT resource.
pub fn resolve_crs(client: &Client, collections: &mut [Collection]) {
    for collection in collections.iter_mut() {
        collection.ept_crs = Some(ept::resolve_ept_crs(client, collection.ept.as_deref()));
    }
}

/// Every part of the location a collection was found for. Exploded
/// multi-part locations share a name, so all of them are returned.
pub fn shapes_for<'a>(collection: &Collection, shapes: &'a [LocationShape]) -> Vec<&'a LocationShape> {
    shapes.iter().filter(|s| s.name == collection.name).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::{fixture_digital_coast_json, fixture_inventory_geojson};
    use crate::geometry::generate_geometries;
    use crate::ingest::inventory::parse_inventory_response;
    use crate::model::LocationSpec;

    const EPT_USIEI: &str = "https://s3-us-west-2.amazonaws.com/usgs-lidar-public/IL_PeoriaCounty_2020/ept.json";

    fn links(entries: &[(&str, &str, &str)]) -> String {
        let items: Vec<serde_json::Value> = entries
            .iter()
            .map(|(label, linktype, link)| serde_json::json!({ "label": label, "linktype": linktype, "link": link }))
            .collect();
        serde_json::json!({ "links": items }).to_string()
    }

    // --- Link parsing -------------------------------------------------------

    #[test]
    fn test_parse_ept_link_first_match() {
        let doc = links(&[
            ("Metadata", "Metadata", "https://example.test/meta.xml"),
            ("USGS Entwine", "EPT Link", "https://a.test/ept.json"),
            ("Mirror", "EPT Link", "https://b.test/ept.json"),
        ]);
        assert_eq!(parse_ept_link(&doc).as_deref(), Some("https://a.test/ept.json"));
    }

    #[test]
    fn test_parse_ept_link_absent_or_invalid() {
        assert_eq!(parse_ept_link(&links(&[("x", "Metadata", "y")])), None);
        assert_eq!(parse_ept_link("not json"), None);
        assert_eq!(parse_ept_link(""), None);
    }

    #[test]
    fn test_parse_noaa_id() {
        let doc = links(&[(
            "NOAA Digital Coast",
            "Data Access",
            "https://coast.noaa.gov/dataviewer/#/lidar/search/where:ID=9176/details/9176",
        )]);
        assert_eq!(parse_noaa_id(&doc).as_deref(), Some("9176"));
    }

    #[test]
    fn test_parse_noaa_id_requires_label_and_linktype() {
        let wrong_type = links(&[("NOAA Digital Coast", "Metadata", "https://x.test/?ID=1")]);
        assert_eq!(parse_noaa_id(&wrong_type), None);

        let no_digits = links(&[("NOAA Digital Coast", "Data Access", "https://x.test/?ID=abc")]);
        assert_eq!(parse_noaa_id(&no_digits), None);
    }

    // --- Reconciliation -----------------------------------------------------

    #[test]
    fn test_reconcile_primary_only() {
        assert_eq!(reconcile_path(Some("p"), None).as_deref(), Some("p"));
    }

    #[test]
    fn test_reconcile_secondary_only() {
        assert_eq!(reconcile_path(None, Some("s")).as_deref(), Some("s"));
    }

    #[test]
    fn test_reconcile_prefers_primary_and_handles_neither() {
        assert_eq!(reconcile_path(Some("p"), Some("s")).as_deref(), Some("p"));
        assert_eq!(reconcile_path(None, None), None);
    }

    #[test]
    fn test_cross_reference_fills_paths_from_both_catalogs() {
        let mut collections = parse_inventory_response(fixture_inventory_geojson(), "peoria_gage", "layer").unwrap();
        let catalog = DigitalCoastCatalog::from_json(fixture_digital_coast_json()).unwrap();

        cross_reference(&mut collections, &catalog);

        // Inventory advertises its own EPT link and a Digital Coast id that
        // also has one: the inventory's path wins.
        let peoria = &collections[0];
        assert_eq!(peoria.ept_usiei.as_deref(), Some(EPT_USIEI));
        assert_eq!(peoria.noaa_id.as_deref(), Some("9176"));
        assert!(peoria.ept_noaa.is_some());
        assert_eq!(peoria.ept.as_deref(), Some(EPT_USIEI));

        // Only a Digital Coast id: the catalog path fills the gap.
        let tazewell = &collections[1];
        assert_eq!(tazewell.ept_usiei, None);
        assert_eq!(tazewell.noaa_id.as_deref(), Some("6312"));
        assert_eq!(tazewell.ept, tazewell.ept_noaa);
        assert!(tazewell.ept.as_deref().unwrap().contains("/6312/"));
    }

    #[test]
    fn test_cross_reference_with_empty_catalog_keeps_primary() {
        let mut collections = parse_inventory_response(fixture_inventory_geojson(), "peoria_gage", "layer").unwrap();
        cross_reference(&mut collections, &DigitalCoastCatalog::default());

        assert_eq!(collections[0].ept.as_deref(), Some(EPT_USIEI));
        assert_eq!(collections[1].ept, None);
    }

    #[test]
    fn test_resolve_crs_without_paths_defaults_to_wgs84() {
        let client = Client::new();
        let mut collections = vec![Collection { name: "a".into(), ..Collection::default() }];
        resolve_crs(&client, &mut collections);
        assert_eq!(collections[0].ept_crs, Some(4326));
    }

    #[test]
    fn test_shapes_for_returns_every_part_of_the_location() {
        let specs = vec![
            LocationSpec::Bbox { name: "levee".into(), value: [-89.60, 40.60, -89.59, 40.61] },
            LocationSpec::Bbox { name: "gage".into(), value: [-89.40, 40.70, -89.39, 40.71] },
            LocationSpec::Bbox { name: "levee".into(), value: [-89.10, 40.90, -89.09, 40.91] },
        ];
        let shapes = generate_geometries(&specs, 50.0).unwrap();
        let collection = Collection { name: "levee".into(), ..Collection::default() };

        let parts = shapes_for(&collection, &shapes);
        assert_eq!(parts.len(), 2, "both levee parts should be found");
        assert!(parts.iter().all(|s| s.name == "levee"));
        assert_eq!(parts[1].wgs84.bounds().max_x, -89.09);

        let stranger = Collection { name: "elsewhere".into(), ..Collection::default() };
        assert!(shapes_for(&stranger, &shapes).is_empty());
    }
}
