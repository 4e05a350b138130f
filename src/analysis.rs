//! Soil analysis documents
//!
//! Composes the engine's outputs into the documents the HTTP layer returns:
//! a district + crop analysis, a location/user-input analysis, and parallel batch
//! analysis.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::crop::Crop;
use crate::data::{DistrictSoilRecord, RecordSource, Reliability};
use crate::error::SoilResult;
use crate::measurement::SoilMeasurement;
use crate::scoring::{
    CropSuitability, FertilizerRecommendation, HealthStatus, SoilHealthResult, SoilScoringEngine,
};

/// Suitability verdict plus the health factors behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityReport {
    #[serde(flatten)]
    pub verdict: CropSuitability,
    pub factors: Vec<String>,
}

/// District soil analysis for one crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilAnalysis {
    pub district: String,
    pub state: String,
    pub crop: Crop,
    pub soil_parameters: SoilMeasurement,
    pub total_nutrients: f64,
    pub soil_health: SoilHealthResult,
    pub suitability: SuitabilityReport,
    /// Health recommendations followed by crop-specific advice
    pub recommendations: Vec<String>,
    pub fertilizer_plan: Vec<FertilizerRecommendation>,
    pub soil_type: String,
    pub reliability: Reliability,
    pub source: RecordSource,
}

pub fn analyze_record(
    engine: &SoilScoringEngine,
    record: &DistrictSoilRecord,
    crop: &Crop,
) -> SoilResult<SoilAnalysis> {
    let m = &record.average;

    let soil_health = engine.score_health(m)?;
    let verdict = engine.classify_crop_suitability(m, crop, &record.suitable_crops)?;
    let fertilizer_plan = engine.recommend_fertilizer(m, Some(crop))?;

    let mut recommendations = soil_health.recommendations.clone();
    recommendations.extend(engine.crop_specific_advice(m, crop)?);

    Ok(SoilAnalysis {
        district: record.district.clone(),
        state: record.state.clone(),
        crop: crop.clone(),
        soil_parameters: *m,
        total_nutrients: m.total_nutrients(),
        suitability: SuitabilityReport {
            verdict,
            factors: soil_health.factors.clone(),
        },
        soil_health,
        recommendations,
        fertilizer_plan,
        soil_type: record.soil_type.clone(),
        reliability: record.reliability,
        source: record.source,
    })
}

/// Origin of the measurement behind a location analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    RegionalDatabase,
    UserInput,
    Default,
}

/// Health summary flattened with the measured parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    #[serde(flatten)]
    pub parameters: SoilMeasurement,
    pub score: u8,
    pub health_status: HealthStatus,
    pub total_nutrients: f64,
    pub recommendations: Vec<String>,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAnalysis {
    pub location: String,
    pub soil_health: HealthSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suitable_crops: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crop_advice: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fertilizer_plan: Vec<FertilizerRecommendation>,
    pub data_source: DataSource,
}

/// Typical Punjab averages used when neither a region nor soil data is given
pub fn default_measurement() -> SoilMeasurement {
    SoilMeasurement::new(7.0, 220.0, 40.0, 175.0)
        .with_organic_carbon(0.6)
        .with_conductivity(0.3)
}

pub fn analyze_measurement(
    engine: &SoilScoringEngine,
    location: &str,
    m: &SoilMeasurement,
    suitable_crops: Vec<String>,
    crop: Option<&Crop>,
    data_source: DataSource,
) -> SoilResult<LocationAnalysis> {
    let health = engine.score_health(m)?;

    let (crop_advice, fertilizer_plan) = match crop {
        Some(c) => (engine.crop_specific_advice(m, c)?, engine.recommend_fertilizer(m, Some(c))?),
        None => (Vec::new(), Vec::new()),
    };

    Ok(LocationAnalysis {
        location: location.to_string(),
        soil_health: HealthSummary {
            parameters: *m,
            score: health.score,
            health_status: health.status,
            total_nutrients: m.total_nutrients(),
            recommendations: health.recommendations,
            factors: health.factors,
        },
        suitable_crops,
        crop_advice,
        fertilizer_plan,
        data_source,
    })
}

/// One entry of a batch request, already validated
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSample {
    pub label: String,
    pub measurement: SoilMeasurement,
    pub crop: Option<Crop>,
}

/// Analyze many samples in parallel; output order matches input order
pub fn analyze_batch(
    engine: &SoilScoringEngine,
    samples: &[BatchSample],
) -> Vec<SoilResult<LocationAnalysis>> {
    samples
        .par_iter()
        .map(|s| {
            analyze_measurement(
                engine,
                &s.label,
                &s.measurement,
                Vec::new(),
                s.crop.as_ref(),
                DataSource::UserInput,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::seed_districts;
    use crate::scoring::SuitabilitySource;

    fn amritsar() -> DistrictSoilRecord {
        seed_districts().into_iter().find(|r| r.district == "Amritsar").unwrap()
    }

    #[test]
    fn test_amritsar_wheat() {
        let engine = SoilScoringEngine::default();
        let analysis = analyze_record(&engine, &amritsar(), &Crop::Wheat).unwrap();

        assert_eq!(analysis.soil_health.status, HealthStatus::Excellent);
        assert_eq!(analysis.suitability.verdict.suitability_score, 90);
        assert_eq!(analysis.suitability.verdict.source, SuitabilitySource::Reference);
        assert_eq!(analysis.total_nutrients, 465.0);

        // Adequate message, then wheat's nitrogen note (240 < 250)
        assert_eq!(analysis.recommendations.len(), 2);
        assert!(analysis.recommendations[1].contains("tillering"));

        assert_eq!(analysis.fertilizer_plan.len(), 1);
        assert_eq!(analysis.fertilizer_plan[0].deficit, 10.0);
    }

    #[test]
    fn test_factors_match_health_pass() {
        let engine = SoilScoringEngine::default();
        let mut record = amritsar();
        record.average = SoilMeasurement::new(5.6, 120.0, 22.0, 100.0);

        let analysis = analyze_record(&engine, &record, &Crop::Rice).unwrap();
        assert_eq!(analysis.suitability.factors, analysis.soil_health.factors);
        assert_eq!(analysis.suitability.factors.len(), 4);
        assert_eq!(
            analysis.recommendations.last().map(String::as_str),
            Some("Ensure proper water management for rice cultivation")
        );
    }

    #[test]
    fn test_location_analysis_without_crop() {
        let engine = SoilScoringEngine::default();
        let m = default_measurement();
        let analysis =
            analyze_measurement(&engine, "Custom Location", &m, Vec::new(), None, DataSource::UserInput)
                .unwrap();

        assert_eq!(analysis.soil_health.total_nutrients, 435.0);
        assert!(analysis.crop_advice.is_empty());
        assert!(analysis.fertilizer_plan.is_empty());

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["data_source"], "user_input");
        assert_eq!(json["soil_health"]["ph"], 7.0);
        assert!(json.get("suitable_crops").is_none());
    }

    #[test]
    fn test_batch_preserves_order() {
        let engine = SoilScoringEngine::default();
        let sample = |label: &str, m: SoilMeasurement, crop: Option<Crop>| BatchSample {
            label: label.to_string(),
            measurement: m,
            crop,
        };
        let samples = vec![
            sample("a", SoilMeasurement::new(7.2, 240.0, 45.0, 180.0), None),
            sample("b", SoilMeasurement::new(20.0, 240.0, 45.0, 180.0), None),
            sample("c", SoilMeasurement::new(5.2, 90.0, 8.0, 40.0), Some(Crop::Cotton)),
        ];

        let results = analyze_batch(&engine, &samples);
        assert_eq!(results.len(), 3);

        let first = results[0].as_ref().unwrap();
        assert_eq!(first.location, "a");
        assert_eq!(first.soil_health.score, 100);

        assert!(results[1].is_err());

        let third = results[2].as_ref().unwrap();
        assert_eq!(third.soil_health.score, 24);
        assert_eq!(third.fertilizer_plan.len(), 3);
        assert!(!third.crop_advice.is_empty());
    }
}
