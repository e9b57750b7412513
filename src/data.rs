use crate::config::InputConfig;
use crate::error::{Error, GeometryError, Result};
use crate::processing::trim_field;
use crate::types::{
    CensusRecord, District, Polygon, Townland, TownlandLayer, DISTRICT_LABEL_PROPERTY,
    NAME_PROPERTY,
};
use csv::ReaderBuilder;
use geo::Coord;
use geojson::{Feature, FeatureCollection, GeoJson};
use serde::Deserialize;
use serde_json::Value;
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

const CENSUS_TOWNLAND_FIELD: &str = "townland";
const CENSUS_DED_FIELD: &str = "ded";

/// The three input datasets, validated and converted to typed records.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub districts: Vec<District>,
    pub townlands: TownlandLayer,
    pub census: Vec<CensusRecord>,
}

pub fn load_datasets(input: &InputConfig) -> Result<Datasets> {
    info!("Loading data...");

    let districts = load_districts(&input.districts)?;
    info!("Loaded {} district boundaries", districts.len());

    let townlands = load_townlands(&input.townlands)?;
    info!("Loaded {} townland boundaries", townlands.townlands.len());

    let census = load_census(&input.census)?;
    info!("Loaded {} census records", census.len());

    Ok(Datasets {
        districts,
        townlands,
        census,
    })
}

/// Loads DED boundaries from GeoJSON or a shapefile.
pub fn load_districts(path: &Path) -> Result<Vec<District>> {
    match extension(path).as_str() {
        "json" | "geojson" => {
            let collection = read_feature_collection(path)?;
            collection
                .features
                .iter()
                .enumerate()
                .map(|(index, feature)| -> Result<District> {
                    let label = text_property(feature, DISTRICT_LABEL_PROPERTY)
                        .map(|l| trim_field(&l).to_string())
                        .ok_or(Error::MissingAttribute {
                            dataset: "district",
                            index,
                            attribute: DISTRICT_LABEL_PROPERTY,
                        })?;
                    let polygon = feature_ring(feature).map_err(|e| Error::geometry(&label, e))?;
                    Ok(District { label, polygon })
                })
                .collect()
        }
        "shp" => load_shapefile_districts(path),
        other => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: other.to_string(),
        }),
    }
}

/// Loads townland boundaries, keeping each source feature for output.
pub fn load_townlands(path: &Path) -> Result<TownlandLayer> {
    match extension(path).as_str() {
        "json" | "geojson" => {}
        other => {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: other.to_string(),
            })
        }
    }

    let collection = read_feature_collection(path)?;
    let townlands = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| -> Result<Townland> {
            let name = text_property(&feature, NAME_PROPERTY).ok_or(Error::MissingAttribute {
                dataset: "townland",
                index,
                attribute: NAME_PROPERTY,
            })?;
            let polygon = feature_ring(&feature).map_err(|e| Error::geometry(&name, e))?;
            Ok(Townland {
                name,
                polygon,
                feature,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TownlandLayer {
        townlands,
        bbox: collection.bbox,
        foreign_members: collection.foreign_members,
    })
}

/// Loads census records from a `{"results": [...]}` JSON document or a CSV
/// file with a `townland` column and an optional `ded` column.
pub fn load_census(path: &Path) -> Result<Vec<CensusRecord>> {
    match extension(path).as_str() {
        "json" => load_census_json(path),
        "csv" => load_census_csv(path),
        other => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: other.to_string(),
        }),
    }
}

#[derive(Deserialize)]
struct CensusFile {
    results: Vec<RawCensusRecord>,
}

#[derive(Deserialize)]
struct RawCensusRecord {
    #[serde(default)]
    townland: Option<Value>,
    #[serde(default)]
    ded: Option<Value>,
}

fn load_census_json(path: &Path) -> Result<Vec<CensusRecord>> {
    let file = open(path)?;
    let parsed: CensusFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;

    parsed
        .results
        .into_iter()
        .enumerate()
        .map(|(index, raw)| -> Result<CensusRecord> {
            let townland = raw
                .townland
                .as_ref()
                .and_then(scalar_text)
                .ok_or(Error::MissingAttribute {
                    dataset: "census",
                    index,
                    attribute: CENSUS_TOWNLAND_FIELD,
                })?;
            Ok(CensusRecord::new(townland, raw.ded.as_ref().and_then(scalar_text)))
        })
        .collect()
}

fn load_census_csv(path: &Path) -> Result<Vec<CensusRecord>> {
    let csv_err = |source: csv::Error| Error::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = open(path)?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers().map_err(csv_err)?.clone();

    let townland_idx = headers
        .iter()
        .position(|h| h.trim() == CENSUS_TOWNLAND_FIELD)
        .ok_or(Error::MissingAttribute {
            dataset: "census",
            index: 0,
            attribute: CENSUS_TOWNLAND_FIELD,
        })?;
    let ded_idx = headers.iter().position(|h| h.trim() == CENSUS_DED_FIELD);

    let mut records = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let row = result.map_err(csv_err)?;
        let townland = row.get(townland_idx).ok_or(Error::MissingAttribute {
            dataset: "census",
            index,
            attribute: CENSUS_TOWNLAND_FIELD,
        })?;
        let ded = ded_idx.and_then(|i| row.get(i)).map(str::to_string);
        records.push(CensusRecord::new(townland, ded));
    }

    Ok(records)
}

fn load_shapefile_districts(path: &Path) -> Result<Vec<District>> {
    let shp_err = |source: shapefile::Error| Error::Shapefile {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = shapefile::Reader::from_path(path).map_err(shp_err)?;

    let mut districts = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(shp_err)?;

        let label = match record.get(DISTRICT_LABEL_PROPERTY) {
            Some(FieldValue::Character(Some(s))) => trim_field(s).to_string(),
            Some(FieldValue::Numeric(Some(n))) => n.to_string(),
            _ => {
                return Err(Error::MissingAttribute {
                    dataset: "district",
                    index,
                    attribute: DISTRICT_LABEL_PROPERTY,
                })
            }
        };

        let coords = match &shape {
            Shape::Polygon(polygon) => first_ring(polygon.rings(), |p| Coord { x: p.x, y: p.y }),
            Shape::PolygonM(polygon) => first_ring(polygon.rings(), |p| Coord { x: p.x, y: p.y }),
            Shape::PolygonZ(polygon) => first_ring(polygon.rings(), |p| Coord { x: p.x, y: p.y }),
            other => {
                let kind = format!("{:?}", other.shapetype());
                return Err(Error::geometry(label, GeometryError::UnsupportedType(kind)));
            }
        };

        districts.push(District {
            label,
            polygon: Polygon::new(coords),
        });
    }

    Ok(districts)
}

fn first_ring<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> Vec<Coord<f64>> {
    rings
        .first()
        .map(|ring| ring.points().iter().map(xy).collect())
        .unwrap_or_default()
}

fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    info!("Loading GeoJSON from {:?}...", path);
    let file = open(path)?;

    // Whole collection is held in memory; boundary layers are county-sized.
    let geojson = GeoJson::from_reader(BufReader::new(file)).map_err(|source| Error::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(geojson::Error::MalformedJson(source)),
    })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(Error::NotFeatureCollection(path.to_path_buf())),
    }
}

/// The ring used for a feature: the first ring of a Polygon, or the outer
/// ring of the first member of a MultiPolygon.
fn feature_ring(feature: &Feature) -> std::result::Result<Polygon, GeometryError> {
    use geojson::Value as Geom;

    let geometry = feature.geometry.as_ref().ok_or(GeometryError::MissingGeometry)?;
    let ring = match &geometry.value {
        Geom::Polygon(rings) => rings.first(),
        Geom::MultiPolygon(polygons) => polygons.first().and_then(|rings| rings.first()),
        Geom::Point(_) => return Err(GeometryError::UnsupportedType("Point".into())),
        Geom::MultiPoint(_) => return Err(GeometryError::UnsupportedType("MultiPoint".into())),
        Geom::LineString(_) => return Err(GeometryError::UnsupportedType("LineString".into())),
        Geom::MultiLineString(_) => {
            return Err(GeometryError::UnsupportedType("MultiLineString".into()))
        }
        Geom::GeometryCollection(_) => {
            return Err(GeometryError::UnsupportedType("GeometryCollection".into()))
        }
    };

    match ring {
        Some(positions) => Polygon::from_positions(positions),
        None => Ok(Polygon::new(Vec::new())),
    }
}

fn text_property(feature: &Feature, key: &str) -> Option<String> {
    feature.properties.as_ref()?.get(key).and_then(scalar_text)
}

// Skip anything that is not a string or number
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}
