//! Crop suitability classification
//!
//! Reference data wins when it carries a score for the crop. Otherwise the
//! score is estimated from a band chosen by basic soil thresholds, drawn from
//! a generator seeded by (config seed, crop, measurement). Same inputs, same
//! score.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::config::SuitabilityConfig;
use crate::crop::Crop;
use crate::measurement::SoilMeasurement;

/// Crop entry from district reference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCrop {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitability_score: Option<u8>,
}

impl ReferenceCrop {
    pub fn new(name: &str, season: &str, score: u8) -> Self {
        Self {
            name: name.to_string(),
            season: Some(season.to_string()),
            suitability_score: Some(score),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuitabilitySource {
    Reference,
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropSuitability {
    pub is_suitable: bool,
    pub suitability_score: u8,
    pub source: SuitabilitySource,
}

pub fn classify(
    m: &SoilMeasurement,
    crop: &Crop,
    reference: &[ReferenceCrop],
    config: &SuitabilityConfig,
) -> CropSuitability {
    let reference_score = reference
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(crop.as_str()))
        .and_then(|r| r.suitability_score);

    if let Some(score) = reference_score {
        return CropSuitability {
            is_suitable: score > config.reference_cutoff,
            suitability_score: score.min(100),
            source: SuitabilitySource::Reference,
        };
    }

    let suitable = meets_basic_thresholds(m, config);
    let range = if suitable {
        config.suitable_range
    } else {
        config.unsuitable_range
    };

    let mut rng = StdRng::seed_from_u64(estimate_seed(config.seed, crop, m));
    let score = rng.gen_range(range.low..=range.high);

    CropSuitability {
        is_suitable: suitable,
        suitability_score: score,
        source: SuitabilitySource::Estimated,
    }
}

/// pH within the tolerated range and N/P/K at their minimums
pub fn meets_basic_thresholds(m: &SoilMeasurement, config: &SuitabilityConfig) -> bool {
    m.ph >= config.min_ph
        && m.ph <= config.max_ph
        && m.nitrogen >= config.min_nitrogen
        && m.phosphorus >= config.min_phosphorus
        && m.potassium >= config.min_potassium
}

fn estimate_seed(seed: u64, crop: &Crop, m: &SoilMeasurement) -> u64 {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    crop.as_str().hash(&mut hasher);
    for value in [m.ph, m.nitrogen, m.phosphorus, m.potassium] {
        value.to_bits().hash(&mut hasher);
    }
    m.organic_carbon.map(f64::to_bits).hash(&mut hasher);
    m.conductivity.map(f64::to_bits).hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amritsar_crops() -> Vec<ReferenceCrop> {
        vec![
            ReferenceCrop::new("wheat", "rabi", 90),
            ReferenceCrop::new("rice", "kharif", 85),
            ReferenceCrop::new("maize", "kharif", 70),
        ]
    }

    #[test]
    fn test_reference_score_used_directly() {
        let m = SoilMeasurement::new(7.2, 240.0, 45.0, 180.0);
        let result = classify(&m, &Crop::from("Wheat"), &amritsar_crops(), &SuitabilityConfig::default());
        assert_eq!(result.suitability_score, 90);
        assert!(result.is_suitable);
        assert_eq!(result.source, SuitabilitySource::Reference);
    }

    #[test]
    fn test_reference_cutoff_is_strict() {
        let m = SoilMeasurement::new(7.2, 240.0, 45.0, 180.0);
        let result = classify(&m, &Crop::Maize, &amritsar_crops(), &SuitabilityConfig::default());
        assert_eq!(result.suitability_score, 70);
        assert!(!result.is_suitable);
    }

    #[test]
    fn test_estimate_within_suitable_band() {
        let config = SuitabilityConfig::default();
        let m = SoilMeasurement::new(7.0, 220.0, 40.0, 175.0);
        let result = classify(&m, &Crop::Cotton, &amritsar_crops(), &config);
        assert_eq!(result.source, SuitabilitySource::Estimated);
        assert!(result.is_suitable);
        assert!((75..=95).contains(&result.suitability_score));
    }

    #[test]
    fn test_estimate_within_unsuitable_band() {
        let config = SuitabilityConfig::default();
        let m = SoilMeasurement::new(4.8, 90.0, 8.0, 40.0);
        let result = classify(&m, &Crop::Wheat, &[], &config);
        assert!(!result.is_suitable);
        assert!((45..=75).contains(&result.suitability_score));
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let config = SuitabilityConfig::default();
        let m = SoilMeasurement::new(6.9, 200.0, 35.0, 185.0);
        let first = classify(&m, &Crop::Sugarcane, &[], &config);
        for _ in 0..10 {
            assert_eq!(classify(&m, &Crop::Sugarcane, &[], &config), first);
        }
    }

    #[test]
    fn test_reference_without_score_falls_back_to_estimate() {
        let crops = vec![ReferenceCrop {
            name: "wheat".to_string(),
            season: None,
            suitability_score: None,
        }];
        let m = SoilMeasurement::new(7.0, 220.0, 40.0, 175.0);
        let result = classify(&m, &Crop::Wheat, &crops, &SuitabilityConfig::default());
        assert_eq!(result.source, SuitabilitySource::Estimated);
    }
}
