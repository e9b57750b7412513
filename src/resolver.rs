use crate::error::{Error, GeometryError, Result};
use crate::geometry::{centroid, point_in_polygon};
use crate::processing::normalize_name;
use crate::types::{AssignedTownland, District, Townland, UNKNOWN_DISTRICT};
use geo::Point;
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;
use tracing::{debug, info};

// Wrapper for RTree indexing
struct DistrictEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for DistrictEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Finds the first district, in list order, whose ring contains a point.
///
/// Closed rings are pre-filtered by bounding box. For a closed ring the
/// crossing count outside its box is always even, so the filter never drops a
/// match. Open rings are tested on every lookup.
pub struct DistrictIndex<'a> {
    districts: &'a [District],
    tree: RTree<DistrictEnvelope>,
    open_rings: Vec<usize>,
}

impl<'a> DistrictIndex<'a> {
    pub fn new(districts: &'a [District]) -> Self {
        let mut envelopes = Vec::new();
        let mut open_rings = Vec::new();

        for (index, district) in districts.iter().enumerate() {
            if !district.polygon.is_closed() {
                open_rings.push(index);
                continue;
            }
            if let Some(rect) = district.polygon.bounding_rect() {
                envelopes.push(DistrictEnvelope {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                });
            }
        }

        DistrictIndex {
            districts,
            tree: RTree::bulk_load(envelopes),
            open_rings,
        }
    }

    pub fn locate(&self, point: Point<f64>) -> Option<&'a District> {
        let envelope = AABB::from_point([point.x(), point.y()]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .chain(self.open_rings.iter().copied())
            .filter(|&i| point_in_polygon(point, &self.districts[i].polygon))
            .min()
            .map(|i| &self.districts[i])
    }
}

/// Outcome of resolving every townland against the district layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictAssignment {
    /// District label per townland, parallel to the input slice.
    pub labels: Vec<String>,
    /// Normalized townland name to district label. When two townlands share a
    /// name, the later one in input order wins.
    pub district_of: HashMap<String, String>,
}

impl DistrictAssignment {
    pub fn unresolved(&self) -> usize {
        self.labels.iter().filter(|l| *l == UNKNOWN_DISTRICT).count()
    }

    /// Attaches each label to its townland as the `ded` attribute.
    pub fn apply(&self, townlands: Vec<Townland>) -> Vec<AssignedTownland> {
        townlands
            .into_iter()
            .zip(self.labels.iter())
            .map(|(townland, label)| AssignedTownland::new(townland, label.clone()))
            .collect()
    }
}

/// Assigns each townland the label of the first district containing its
/// centroid, or `UNKNOWN` when none does.
///
/// # Errors
///
/// Fails with [`Error::InvalidGeometry`] if any townland ring is empty; no
/// townland is skipped.
pub fn resolve_districts(townlands: &[Townland], districts: &[District]) -> Result<DistrictAssignment> {
    info!(
        "Resolving {} townlands against {} districts...",
        townlands.len(),
        districts.len()
    );
    let index = DistrictIndex::new(districts);

    let labels: Vec<String> = townlands
        .par_iter()
        .map(|townland| {
            let point = centroid(&townland.polygon).map_err(|e| (townland.name.clone(), e))?;
            let label = match index.locate(point) {
                Some(district) => district.label.clone(),
                None => {
                    debug!("No district contains centroid of {}", townland.name);
                    UNKNOWN_DISTRICT.to_string()
                }
            };
            Ok::<_, (String, GeometryError)>(label)
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|(name, e)| Error::geometry(name, e))?;

    let mut district_of = HashMap::with_capacity(townlands.len());
    for (townland, label) in townlands.iter().zip(labels.iter()) {
        district_of.insert(normalize_name(&townland.name), label.clone());
    }

    let assignment = DistrictAssignment { labels, district_of };
    info!(
        "District assignment complete: {} unresolved",
        assignment.unresolved()
    );
    Ok(assignment)
}
