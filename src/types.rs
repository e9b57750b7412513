use crate::error::GeometryError;
use crate::processing::{trim_field, TownlandKey};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Coord, LineString, Rect};
use geojson::{Bbox, Feature, JsonObject};
use serde_json::Value;

/// Townland name attribute on the townland boundary layer.
pub const NAME_PROPERTY: &str = "ENG_NAME_VALUE";
/// District label attribute on the DED boundary layer.
pub const DISTRICT_LABEL_PROPERTY: &str = "geolabel";
/// Derived attribute holding the assigned district label.
pub const DED_PROPERTY: &str = "ded";
/// Derived attribute holding the number of census records for the townland.
pub const POPULATION_PROPERTY: &str = "population_count";
/// Label assigned when no district contains a townland's centroid.
pub const UNKNOWN_DISTRICT: &str = "UNKNOWN";

/// A single ring of (longitude, latitude) vertices.
///
/// The vertices are kept exactly as listed in the source, including the
/// duplicated closing vertex. Unlike `geo::Polygon` the ring is never closed
/// automatically, since the centroid averages every listed vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon(LineString<f64>);

impl Polygon {
    pub fn new(coords: Vec<Coord<f64>>) -> Self {
        Polygon(LineString::new(coords))
    }

    /// Builds a ring from GeoJSON positions, ignoring any third ordinate.
    pub fn from_positions(positions: &[Vec<f64>]) -> Result<Self, GeometryError> {
        let coords = positions
            .iter()
            .map(|p| match p.as_slice() {
                [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                _ => Err(GeometryError::MalformedPosition),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(coords))
    }

    pub fn coords(&self) -> &[Coord<f64>] {
        self.0 .0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0 .0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }

    /// True when the first and last listed vertices are equal.
    pub fn is_closed(&self) -> bool {
        !self.is_empty() && self.0.is_closed()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.0.bounding_rect()
    }
}

impl From<Vec<(f64, f64)>> for Polygon {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Polygon(LineString::from(points))
    }
}

/// A district (DED) boundary.
#[derive(Debug, Clone)]
pub struct District {
    pub label: String,
    pub polygon: Polygon,
}

/// A townland boundary as loaded, before district assignment.
///
/// `feature` is the source GeoJSON feature, kept so the enriched output has
/// the same shape as the input.
#[derive(Debug, Clone)]
pub struct Townland {
    pub name: String,
    pub polygon: Polygon,
    pub feature: Feature,
}

/// A townland with its resolved district written into the `ded` property.
#[derive(Debug, Clone)]
pub struct AssignedTownland {
    pub townland: Townland,
    pub district: String,
    key: TownlandKey,
}

impl AssignedTownland {
    pub fn new(mut townland: Townland, district: String) -> Self {
        townland
            .feature
            .properties
            .get_or_insert_with(JsonObject::new)
            .insert(DED_PROPERTY.to_string(), Value::String(district.clone()));
        let key = TownlandKey::new(&townland.name, &district);
        AssignedTownland {
            townland,
            district,
            key,
        }
    }

    pub fn key(&self) -> &TownlandKey {
        &self.key
    }

    pub fn feature(&self) -> &Feature {
        &self.townland.feature
    }
}

/// The townland boundary collection plus its collection-level members.
#[derive(Debug, Clone, Default)]
pub struct TownlandLayer {
    pub townlands: Vec<Townland>,
    pub bbox: Option<Bbox>,
    pub foreign_members: Option<JsonObject>,
}

/// One census return. `ded` is absent in revisions of the dataset that carry
/// no district information; those records are placed spatially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusRecord {
    pub townland: String,
    pub ded: Option<String>,
}

impl CensusRecord {
    pub fn new(townland: impl Into<String>, ded: Option<String>) -> Self {
        let ded = ded
            .map(|d| trim_field(&d).to_string())
            .filter(|d| !d.is_empty());
        CensusRecord {
            townland: townland.into(),
            ded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature() -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    #[test]
    fn test_from_positions_drops_altitude() {
        let ring = Polygon::from_positions(&[vec![1.0, 2.0, 30.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(ring.coords(), &[Coord { x: 1.0, y: 2.0 }, Coord { x: 3.0, y: 4.0 }]);
    }

    #[test]
    fn test_from_positions_rejects_short_position() {
        let result = Polygon::from_positions(&[vec![1.0]]);
        assert_eq!(result, Err(GeometryError::MalformedPosition));
    }

    #[test]
    fn test_ring_is_not_closed_automatically() {
        let ring = Polygon::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(ring.len(), 3);
        assert!(!ring.is_closed());

        let empty = Polygon::new(Vec::new());
        assert!(!empty.is_closed());
        assert!(empty.bounding_rect().is_none());
    }

    #[test]
    fn test_assigned_townland_sets_ded_property() {
        let townland = Townland {
            name: " Ardagh ".to_string(),
            polygon: Polygon::from(vec![(0.0, 0.0)]),
            feature: feature(),
        };
        let assigned = AssignedTownland::new(townland, "Ardagh DED".to_string());

        let props = assigned.feature().properties.as_ref().unwrap();
        assert_eq!(props.get(DED_PROPERTY), Some(&Value::from("Ardagh DED")));
        assert_eq!(assigned.key(), &TownlandKey::new("ARDAGH", "Ardagh DED"));
    }

    #[test]
    fn test_census_record_blank_ded_is_absent() {
        assert_eq!(CensusRecord::new("X", Some("  ".to_string())).ded, None);
        assert_eq!(
            CensusRecord::new("X", Some(" Moydow ".to_string())).ded.as_deref(),
            Some("Moydow")
        );
    }
}
