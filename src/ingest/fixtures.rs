/// Test fixtures: representative payloads from the services the workflow
/// talks to, truncated to what the parsers need.
///
/// - USIEI MapServer query with `f=geojson`: a FeatureCollection whose
///   feature properties carry the inventory fields, including `Links`, a
///   JSON document *encoded as a string*.
/// - NWIS rating depot: RDB text (`#` comments, header, format line, rows).
/// - StreamStats gagestats: a JSON array of statistic objects with nested
///   `regressionType` and `unitType`.
/// - EPT root `ept.json`: only `srs` matters here.

/// Two collections for the Peoria location: one advertising its own EPT
/// link, one only pointing at a Digital Coast dataset (ID=6312).
#[cfg(test)]
pub(crate) fn fixture_inventory_geojson() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": 1201,
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[-89.9, 40.4], [-89.4, 40.4], [-89.4, 40.9], [-89.9, 40.9], [-89.9, 40.4]]]
          },
          "properties": {
            "OBJECTID": 1201,
            "ID": 10371,
            "Title": "IL Peoria County 2020",
            "DataType": "Lidar",
            "collect_start": 1585699200000,
            "collect_end": "2020-05-15",
            "Links": "{\"links\":[{\"label\":\"USGS Entwine\",\"linktype\":\"EPT Link\",\"link\":\"https://s3-us-west-2.amazonaws.com/usgs-lidar-public/IL_PeoriaCounty_2020/ept.json\"},{\"label\":\"NOAA Digital Coast\",\"linktype\":\"Data Access\",\"link\":\"https://coast.noaa.gov/dataviewer/#/lidar/search/where:ID=9176\"}]}"
          }
        },
        {
          "type": "Feature",
          "id": 884,
          "geometry": null,
          "properties": {
            "OBJECTID": 884,
            "ID": 4410,
            "Title": "2012 ISGS Lidar: Tazewell County",
            "DataType": "Lidar",
            "Year": 2012,
            "Links": "{\"links\":[{\"label\":\"NOAA Digital Coast\",\"linktype\":\"Data Access\",\"link\":\"https://coast.noaa.gov/dataviewer/#/lidar/search/where:ID=6312\"}]}"
          }
        }
      ]
    }"#
}

/// ArcGIS reports query errors with HTTP 200 and an `error` object.
#[cfg(test)]
pub(crate) fn fixture_inventory_error_json() -> &'static str {
    r#"{ "error": { "code": 400, "message": "Unable to complete operation.", "details": ["Invalid geometry"] } }"#
}

#[cfg(test)]
pub(crate) fn fixture_inventory_empty_geojson() -> &'static str {
    r#"{ "type": "FeatureCollection", "features": [] }"#
}

/// Digital Coast export: 9176 carries an EPT path, 6312 does not.
#[cfg(test)]
pub(crate) fn fixture_digital_coast_json() -> &'static str {
    r#"[
      {
        "ID #": "9176",
        "Dataset Name": "2020 USGS Lidar: Illinois Peoria County",
        "Year": "2020",
        "EPT": "https://noaa-nos-coastal-lidar-pds.s3.amazonaws.com/entwine/geoid18/9176/ept.json",
        "Potree": ""
      },
      {
        "ID #": 6312,
        "Dataset Name": "2012 ISGS Lidar: Tazewell County",
        "Year": "2012",
        "EPT": "https://noaa-nos-coastal-lidar-pds.s3.amazonaws.com/entwine/geoid18/6312/ept.json"
      },
      {
        "ID #": "5001",
        "Dataset Name": "2008 FEMA Lidar: Woodford County",
        "Year": "2008",
        "EPT": "None"
      }
    ]"#
}

/// Expanded shift-adjusted rating for Kingston Mines (05568500), thinned.
#[cfg(test)]
pub(crate) fn fixture_rating_rdb() -> &'static str {
    "# //UNITED STATES GEOLOGICAL SURVEY       http://water.usgs.gov/\n\
# //NATIONAL WATER INFORMATION SYSTEM     http://water.usgs.gov/data.html\n\
# //FILE TYPE=\"NWIS RATING\"\n\
# //STATION AGENCY=\"USGS \" NUMBER=\"05568500       \"\n\
# //STATION NAME=\"ILLINOIS RIVER AT KINGSTON MINES, IL\"\n\
# //RATING ID=\"14.0\" TYPE=\"STGQ\" NAME=\"stage-discharge\"\n\
# //RATING_INDEP ROUNDING=\"?????????\" PARAMETER=\"Gage height (ft)\"\n\
# //RATING_DEP ROUNDING=\"?????????\" PARAMETER=\"Discharge (cfs)\"\n\
INDEP\tSHIFT\tDEP\tSTOR\n\
16N\t16N\t16N\t1S\n\
5.00\t0.00\t4000\t*\n\
10.00\t0.00\t15000\t*\n\
15.00\t0.00\t35000\t*\n\
20.00\t0.00\t62000\t*\n\
25.00\t0.00\t95000\t*\n\
30.00\t0.00\t130000\t*\n"
}

#[cfg(test)]
pub(crate) fn fixture_rating_no_data() -> &'static str {
    "# //UNITED STATES GEOLOGICAL SURVEY\n# No sites/data found using the selection criteria specified\n"
}

/// Peak-flow statistics (statistic group 2) for Kingston Mines. The 0.2%
/// AEP flow is deliberately above the fixture rating's top row.
#[cfg(test)]
pub(crate) fn fixture_gagestats_json() -> &'static str {
    r#"[
      {
        "id": 51001, "statisticGroupTypeID": 2, "regressionTypeID": 9, "stationID": 2201,
        "value": 52000, "unitTypeID": 35, "isPreferred": true,
        "regressionType": { "id": 9, "name": "50 Percent AEP flood", "code": "PK50AEP" },
        "unitType": { "id": 35, "name": "cubic feet per second", "abbreviation": "ft^3/s" }
      },
      {
        "id": 51002, "statisticGroupTypeID": 2, "regressionTypeID": 3, "stationID": 2201,
        "value": 78500, "unitTypeID": 35, "isPreferred": true,
        "regressionType": { "id": 3, "name": "10 Percent AEP flood", "code": "PK10AEP" },
        "unitType": { "id": 35, "name": "cubic feet per second", "abbreviation": "ft^3/s" }
      },
      {
        "id": 51003, "statisticGroupTypeID": 2, "regressionTypeID": 1, "stationID": 2201,
        "value": 112500, "unitTypeID": 35, "isPreferred": true,
        "regressionType": { "id": 1, "name": "1 Percent AEP flood", "code": "PK1AEP" },
        "unitType": { "id": 35, "name": "cubic feet per second", "abbreviation": "ft^3/s" }
      },
      {
        "id": 51004, "statisticGroupTypeID": 2, "regressionTypeID": 12, "stationID": 2201,
        "value": 141000, "unitTypeID": 35,
        "regressionType": { "id": 12, "name": "0.2 Percent AEP flood", "code": "PK0_2AEP" }
      }
    ]"#
}

/// Root metadata of an EPT resource; `srs.horizontal` is the EPSG code.
#[cfg(test)]
pub(crate) fn fixture_ept_json() -> &'static str {
    r#"{
      "bounds": [-10018754.17, 4852834.05, -79.0, -9940482.0, 4931106.22, 78191.0],
      "dataType": "laszip",
      "hierarchyType": "json",
      "points": 1843201554,
      "schema": [{ "name": "X", "type": "signed", "size": 4, "scale": 0.01, "offset": -9979618.0 }],
      "span": 256,
      "srs": {
        "authority": "EPSG",
        "horizontal": "3857",
        "vertical": "5703",
        "wkt": "PROJCS[\"WGS 84 / Pseudo-Mercator\"]"
      },
      "version": "1.0.0"
    }"#
}
