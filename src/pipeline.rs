//! Cached base state and the per-request enrichment pass.
//!
//! [`CensusGeo`] is built once from the loaded datasets: district resolution
//! runs a single time per townland and the result is frozen. Each call to
//! [`CensusGeo::enrich`] counts the census records and merges the counts into
//! fresh copies of the townland features, leaving the cached state untouched.

use crate::config::InputConfig;
use crate::data::{load_datasets, Datasets};
use crate::error::Result;
use crate::processing::{aggregate, merge, CountTable, TownlandKey};
use crate::resolver::resolve_districts;
use crate::types::{AssignedTownland, CensusRecord, UNKNOWN_DISTRICT};
use geojson::{Bbox, FeatureCollection, JsonObject};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CensusGeo {
    townlands: Vec<AssignedTownland>,
    district_of: HashMap<String, String>,
    records: Vec<CensusRecord>,
    bbox: Option<Bbox>,
    foreign_members: Option<JsonObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub features: usize,
    pub records: usize,
    /// Records whose key matches at least one townland feature.
    pub matched_records: u64,
    pub unresolved_townlands: usize,
}

/// Per-district totals for the `summary` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictSummary {
    pub district: String,
    pub townlands: usize,
    pub records: u64,
}

impl CensusGeo {
    pub fn load(input: &InputConfig) -> Result<Self> {
        Self::build(load_datasets(input)?)
    }

    /// Resolves districts for every townland and freezes the result.
    pub fn build(datasets: Datasets) -> Result<Self> {
        let Datasets {
            districts,
            townlands,
            census,
        } = datasets;

        let assignment = resolve_districts(&townlands.townlands, &districts)?;
        let assigned = assignment.apply(townlands.townlands);

        Ok(CensusGeo {
            townlands: assigned,
            district_of: assignment.district_of,
            records: census,
            bbox: townlands.bbox,
            foreign_members: townlands.foreign_members,
        })
    }

    pub fn townlands(&self) -> &[AssignedTownland] {
        &self.townlands
    }

    pub fn counts(&self) -> CountTable {
        aggregate(&self.records, &self.district_of)
    }

    /// Builds the enriched townland collection.
    pub fn enrich(&self) -> FeatureCollection {
        let counts = self.counts();
        let features = merge(&self.townlands, &counts);
        debug!(
            "Merged {} census records into {} townland features",
            counts.total(),
            features.len()
        );

        FeatureCollection {
            bbox: self.bbox.clone(),
            features,
            foreign_members: self.foreign_members.clone(),
        }
    }

    pub fn enrich_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.enrich())?)
    }

    pub fn stats(&self) -> EnrichmentStats {
        let counts = self.counts();
        let keys: HashSet<&TownlandKey> = self.townlands.iter().map(|t| t.key()).collect();
        let matched_records = keys.iter().map(|k| counts.get(k)).sum();

        for (key, count) in counts.iter().filter(|(k, _)| !keys.contains(k)) {
            debug!(
                "{} records for {} / {} match no townland feature",
                count,
                key.name(),
                key.district()
            );
        }

        EnrichmentStats {
            features: self.townlands.len(),
            records: self.records.len(),
            matched_records,
            unresolved_townlands: self
                .townlands
                .iter()
                .filter(|t| t.district == UNKNOWN_DISTRICT)
                .count(),
        }
    }

    /// Townland and record totals per district, sorted by label.
    pub fn district_summary(&self) -> Vec<DistrictSummary> {
        let mut totals: BTreeMap<String, (usize, u64)> = BTreeMap::new();
        for townland in &self.townlands {
            totals.entry(townland.district.clone()).or_default().0 += 1;
        }
        for (district, records) in self.counts().by_district() {
            totals.entry(district).or_default().1 += records;
        }

        totals
            .into_iter()
            .map(|(district, (townlands, records))| DistrictSummary {
                district,
                townlands,
                records,
            })
            .collect()
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            "{} townland features, {} census records ({} matched), {} townlands outside every district",
            stats.features, stats.records, stats.matched_records, stats.unresolved_townlands
        );
    }
}
