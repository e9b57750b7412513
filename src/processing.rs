use crate::types::{AssignedTownland, CensusRecord, POPULATION_PROPERTY, UNKNOWN_DISTRICT};
use geojson::{Feature, JsonObject};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Strips leading and trailing spaces and ASCII control characters.
///
/// Only code points up to U+0020 are removed, so a non-breaking space is
/// part of the value.
pub fn trim_field(raw: &str) -> &str {
    raw.trim_matches(|c: char| c <= ' ')
}

/// Canonical form of a townland name: uppercased and trimmed.
pub fn normalize_name(raw: &str) -> String {
    trim_field(&raw.to_uppercase()).to_string()
}

/// Join key between townland features and census records.
///
/// The name is always normalized on construction, so a key built from a
/// feature and one built from a census record compare equal whenever the
/// names differ only in casing or surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TownlandKey {
    name: String,
    district: String,
}

impl TownlandKey {
    pub fn new(name: &str, district: &str) -> Self {
        TownlandKey {
            name: normalize_name(name),
            district: district.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn district(&self) -> &str {
        &self.district
    }
}

/// Number of census records per townland key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    counts: HashMap<TownlandKey, u64>,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: TownlandKey) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Count for `key`, zero when no record was seen.
    pub fn get(&self, key: &TownlandKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Record totals per district label, sorted by label.
    pub fn by_district(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for (key, count) in &self.counts {
            *totals.entry(key.district.clone()).or_insert(0) += count;
        }
        totals
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TownlandKey, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }
}

/// Counts census records per (townland, district) key.
///
/// A record's district comes from its own `ded` when present, otherwise from
/// `district_of` (keyed by normalized townland name), falling back to
/// `UNKNOWN` for townlands with no boundary.
pub fn aggregate(records: &[CensusRecord], district_of: &HashMap<String, String>) -> CountTable {
    let mut counts = CountTable::new();

    for record in records {
        let name = normalize_name(&record.townland);
        let district = match &record.ded {
            Some(ded) => ded.as_str(),
            None => district_of
                .get(&name)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_DISTRICT),
        };
        counts.increment(TownlandKey::new(&name, district));
    }

    debug!(
        "Aggregated {} records into {} townland keys",
        records.len(),
        counts.len()
    );
    counts
}

/// Returns fresh copies of the townland features with `population_count` set.
///
/// The input is never modified, so merging repeatedly over the same cached
/// townlands always yields the same output.
pub fn merge(townlands: &[AssignedTownland], counts: &CountTable) -> Vec<Feature> {
    townlands
        .iter()
        .map(|townland| {
            let mut feature = townland.feature().clone();
            feature
                .properties
                .get_or_insert_with(JsonObject::new)
                .insert(
                    POPULATION_PROPERTY.to_string(),
                    Value::from(counts.get(townland.key())),
                );
            feature
        })
        .collect()
}
