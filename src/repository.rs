//! District soil repository
//!
//! Handlers depend on the `SoilRepository` trait, never on a concrete store.
//! `InMemorySoilRepository` backs both the regional CSV data and the built-in
//! reference districts; the `source()` flag tells callers which one they got.

use anyhow::Result;
use rustc_hash::FxHashMap;
use std::path::Path;

use crate::data::{self, DistrictSoilRecord, RecordSource};

/// Read access to district soil records
pub trait SoilRepository: Send + Sync {
    /// Case-insensitive substring match on district (and state, if given)
    fn find_district(&self, district: &str, state: Option<&str>) -> Option<DistrictSoilRecord>;

    /// Records filtered like `find_district`, paginated
    fn list(&self, district: Option<&str>, state: Option<&str>, limit: usize, offset: usize) -> Page;

    /// Sorted unique district names, optionally within a state
    fn districts(&self, state: Option<&str>) -> Vec<String>;

    /// First record whose district appears in `location` or vice versa
    fn match_location(&self, location: &str) -> Option<DistrictSoilRecord>;

    fn source(&self) -> RecordSource;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of `list` results
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<DistrictSoilRecord>,
    pub total: usize,
}

/// FxHashMap-backed store, keyed by lower-case district name
#[derive(Debug, Clone)]
pub struct InMemorySoilRepository {
    records: FxHashMap<String, DistrictSoilRecord>,
    /// Keys in district-name order for stable listing
    order: Vec<String>,
    source: RecordSource,
}

impl InMemorySoilRepository {
    pub fn new(records: Vec<DistrictSoilRecord>, source: RecordSource) -> Self {
        let mut map = FxHashMap::default();
        for record in records {
            // Later rows for the same district replace earlier ones
            map.insert(record.district.to_lowercase(), record);
        }

        let mut order: Vec<String> = map.keys().cloned().collect();
        order.sort();

        Self {
            records: map,
            order,
            source,
        }
    }

    /// Built-in reference districts
    pub fn seeded() -> Self {
        Self::new(data::seed_districts(), RecordSource::Mock)
    }

    /// Regional survey data from CSV
    pub fn from_csv(path: &Path) -> Result<Self> {
        let records = data::load_district_csv(path)?;
        if records.is_empty() {
            anyhow::bail!("Soil CSV {:?} contained no usable rows", path);
        }
        Ok(Self::new(records, RecordSource::Regional))
    }

    /// Regional data when loadable, otherwise the flagged reference set
    pub fn from_csv_or_seeded(path: &Path) -> Self {
        match Self::from_csv(path) {
            Ok(repo) => repo,
            Err(e) => {
                tracing::warn!("Falling back to built-in soil data: {:#}", e);
                Self::seeded()
            }
        }
    }

    fn matching<'a>(
        &'a self,
        district: Option<&str>,
        state: Option<&str>,
    ) -> impl Iterator<Item = &'a DistrictSoilRecord> + 'a {
        let district = district.map(str::to_lowercase);
        let state = state.map(str::to_lowercase);

        self.order
            .iter()
            .filter_map(move |key| self.records.get(key))
            .filter(move |r| {
                district
                    .as_ref()
                    .map_or(true, |d| r.district.to_lowercase().contains(d.as_str()))
            })
            .filter(move |r| {
                state
                    .as_ref()
                    .map_or(true, |s| r.state.to_lowercase().contains(s.as_str()))
            })
    }
}

impl SoilRepository for InMemorySoilRepository {
    fn find_district(&self, district: &str, state: Option<&str>) -> Option<DistrictSoilRecord> {
        let key = district.trim().to_lowercase();

        // Exact key first, then substring
        if let Some(record) = self.records.get(&key) {
            let state_ok = state.map_or(true, |s| {
                record.state.to_lowercase().contains(&s.to_lowercase())
            });
            if state_ok {
                return Some(record.clone());
            }
        }

        self.matching(Some(key.as_str()), state).next().cloned()
    }

    fn list(&self, district: Option<&str>, state: Option<&str>, limit: usize, offset: usize) -> Page {
        let all: Vec<&DistrictSoilRecord> = self.matching(district, state).collect();
        let total = all.len();
        let records = all.into_iter().skip(offset).take(limit).cloned().collect();
        Page { records, total }
    }

    fn districts(&self, state: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = self
            .matching(None, state)
            .map(|r| r.district.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn match_location(&self, location: &str) -> Option<DistrictSoilRecord> {
        let location = location.trim().to_lowercase();
        if location.is_empty() {
            return None;
        }

        self.order
            .iter()
            .filter_map(|key| self.records.get(key))
            .find(|r| {
                let district = r.district.to_lowercase();
                district.contains(&location) || location.contains(&district)
            })
            .cloned()
    }

    fn source(&self) -> RecordSource {
        self.source
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_district_case_insensitive() {
        let repo = InMemorySoilRepository::seeded();
        let record = repo.find_district("amritsar", Some("punjab")).unwrap();
        assert_eq!(record.district, "Amritsar");
        assert_eq!(repo.source(), RecordSource::Mock);
    }

    #[test]
    fn test_find_district_substring() {
        let repo = InMemorySoilRepository::seeded();
        assert_eq!(repo.find_district("LUDH", None).unwrap().district, "Ludhiana");
    }

    #[test]
    fn test_find_district_wrong_state() {
        let repo = InMemorySoilRepository::seeded();
        assert!(repo.find_district("amritsar", Some("kerala")).is_none());
    }

    #[test]
    fn test_unknown_district() {
        let repo = InMemorySoilRepository::seeded();
        assert!(repo.find_district("chennai", None).is_none());
    }

    #[test]
    fn test_districts_sorted() {
        let repo = InMemorySoilRepository::seeded();
        assert_eq!(
            repo.districts(None),
            vec!["Amritsar", "Bathinda", "Jalandhar", "Ludhiana", "Patiala"]
        );
        assert!(repo.districts(Some("haryana")).is_empty());
    }

    #[test]
    fn test_list_pagination() {
        let repo = InMemorySoilRepository::seeded();
        let page = repo.list(None, Some("punjab"), 2, 1);
        assert_eq!(page.total, 5);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].district, "Bathinda");
    }

    #[test]
    fn test_match_location_either_direction() {
        let repo = InMemorySoilRepository::seeded();
        assert_eq!(repo.match_location("Patiala, Punjab").unwrap().district, "Patiala");
        assert_eq!(repo.match_location("jalan").unwrap().district, "Jalandhar");
        assert!(repo.match_location("  ").is_none());
    }

    #[test]
    fn test_missing_csv_falls_back_to_seed() {
        let repo = InMemorySoilRepository::from_csv_or_seeded(Path::new("/nonexistent/soil.csv"));
        assert_eq!(repo.source(), RecordSource::Mock);
        assert_eq!(repo.len(), 5);
    }
}
