//! End-to-end tests: datasets on disk through to the enriched GeoJSON.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use townland_census::config::InputConfig;
use townland_census::{CensusGeo, Error};

fn polygon_feature(properties: Value, ring: Value) -> Value {
    json!({
        "type": "Feature",
        "properties": properties,
        "geometry": { "type": "Polygon", "coordinates": [ring] }
    })
}

fn collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn districts() -> Value {
    collection(vec![
        // Covers the vertex-mean centroid of "Ardagh" (1.6, 1.6) but not its
        // area centroid (2, 2).
        polygon_feature(
            json!({ "geolabel": "Ardagh" }),
            json!([[-10, -10], [1.8, -10], [1.8, 1.8], [-10, 1.8], [-10, -10]]),
        ),
        polygon_feature(
            json!({ "geolabel": "Moydow" }),
            json!([[-10, -10], [20, -10], [20, 20], [-10, 20], [-10, -10]]),
        ),
    ])
}

fn townlands() -> Value {
    let mut fc = collection(vec![
        polygon_feature(
            json!({ "ENG_NAME_VALUE": " Ardagh ", "OBJECTID": 7 }),
            json!([[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]),
        ),
        polygon_feature(
            json!({ "ENG_NAME_VALUE": "Cloonee" }),
            json!([[10, 10], [12, 10], [12, 12], [10, 12], [10, 10]]),
        ),
        polygon_feature(
            json!({ "ENG_NAME_VALUE": "Inchmore Island" }),
            json!([[50, 50], [51, 50], [51, 51], [50, 51], [50, 50]]),
        ),
    ]);
    fc["name"] = json!("Longford_Townlands");
    fc
}

struct Fixture {
    _dir: TempDir,
    input: InputConfig,
}

fn fixture(census: &str, census_file: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let input = InputConfig {
        districts: dir.path().join("ded.geojson"),
        townlands: dir.path().join("townlands.json"),
        census: dir.path().join(census_file),
    };
    write_json(&input.districts, &districts());
    write_json(&input.townlands, &townlands());
    fs::write(&input.census, census).unwrap();
    Fixture { _dir: dir, input }
}

fn json_fixture() -> Fixture {
    let census = json!({
        "results": [
            { "townland": "ARDAGH", "surname": "Farrell" },
            { "townland": "ardagh" },
            { "townland": "  Ardagh" },
            { "townland": "Cloonee" },
            { "townland": "Inchmore Island" },
            { "townland": "Ballinalee" }
        ]
    });
    fixture(&census.to_string(), "census-records.json")
}

fn ring_coords(geometry: &Value) -> Vec<Vec<Vec<f64>>> {
    serde_json::from_value(geometry["coordinates"].clone()).unwrap()
}

fn enriched(input: &InputConfig) -> Value {
    let census = CensusGeo::load(input).unwrap();
    serde_json::from_str(&census.enrich_json().unwrap()).unwrap()
}

#[test]
fn test_enriched_output_has_ded_and_population_count() {
    let fixture = json_fixture();
    let output = enriched(&fixture.input);

    let features = output["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);

    assert_eq!(features[0]["properties"]["ded"], "Ardagh");
    assert_eq!(features[0]["properties"]["population_count"], 3);
    assert_eq!(features[1]["properties"]["ded"], "Moydow");
    assert_eq!(features[1]["properties"]["population_count"], 1);
    assert_eq!(features[2]["properties"]["ded"], "UNKNOWN");
    assert_eq!(features[2]["properties"]["population_count"], 1);
}

#[test]
fn test_output_keeps_input_shape() {
    let fixture = json_fixture();
    let output = enriched(&fixture.input);
    let input = townlands();

    assert_eq!(output["type"], "FeatureCollection");
    assert_eq!(output["name"], "Longford_Townlands");
    for (out, orig) in output["features"]
        .as_array()
        .unwrap()
        .iter()
        .zip(input["features"].as_array().unwrap())
    {
        assert_eq!(out["geometry"]["type"], orig["geometry"]["type"]);
        assert_eq!(ring_coords(&out["geometry"]), ring_coords(&orig["geometry"]));
    }
    assert_eq!(output["features"][0]["properties"]["OBJECTID"], 7);
    assert_eq!(output["features"][0]["properties"]["ENG_NAME_VALUE"], " Ardagh ");
}

#[test]
fn test_repeated_enrichment_is_byte_identical() {
    let fixture = json_fixture();
    let census = CensusGeo::load(&fixture.input).unwrap();

    let first = census.enrich_json().unwrap();
    let second = census.enrich_json().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_counts_are_conserved() {
    let fixture = json_fixture();
    let census = CensusGeo::load(&fixture.input).unwrap();
    let output: Value = serde_json::from_str(&census.enrich_json().unwrap()).unwrap();

    let total: u64 = output["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["population_count"].as_u64().unwrap())
        .sum();
    let stats = census.stats();

    // Ballinalee has no boundary and is left out.
    assert_eq!(total, 5);
    assert_eq!(stats.matched_records, 5);
    assert_eq!(stats.records, 6);
    assert_eq!(stats.unresolved_townlands, 1);
}

#[test]
fn test_csv_census_with_explicit_ded() {
    let fixture = fixture(
        "townland,ded,surname\nArdagh,Ardagh,Farrell\nCLOONEE,Ardagh,Quinn\ncloonee,,Reilly\n",
        "census.csv",
    );
    let output = enriched(&fixture.input);

    // The second record names a district that does not hold Cloonee, so it
    // is counted under a key no feature carries.
    assert_eq!(output["features"][0]["properties"]["population_count"], 1);
    assert_eq!(output["features"][1]["properties"]["population_count"], 1);
}

#[test]
fn test_missing_geolabel_fails_load() {
    let fixture = json_fixture();
    write_json(
        &fixture.input.districts,
        &collection(vec![polygon_feature(
            json!({ "label": "Ardagh" }),
            json!([[0, 0], [1, 0], [1, 1], [0, 0]]),
        )]),
    );

    let err = CensusGeo::load(&fixture.input).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingAttribute {
            attribute: "geolabel",
            ..
        }
    ));
}

#[test]
fn test_empty_townland_ring_fails_load() {
    let fixture = json_fixture();
    let mut layer = townlands();
    layer["features"][1]["geometry"]["coordinates"] = json!([[]]);
    write_json(&fixture.input.townlands, &layer);

    let err = CensusGeo::load(&fixture.input).unwrap_err();
    match err {
        Error::InvalidGeometry { feature, .. } => assert_eq!(feature, "Cloonee"),
        other => panic!("unexpected error: {other}"),
    }
}
