//! Soil Scoring Engine
//!
//! Pure functions over a `SoilMeasurement`:
//! - `score_health`: 0-100 point rubric + status label + prose advice
//! - `recommend_fertilizer`: per-nutrient deficits against crop targets
//! - `classify_crop_suitability`: reference score or seeded estimate
//!
//! The score and the recommendations are two separate passes over the same
//! raw values. Scoring is coarse-bucketed; advice is threshold-triggered.
//! Their thresholds overlap but are not the same.
//!
//! ## Architecture
//! - `advice.rs` - recommendation/factor pass + crop-specific advice
//! - `fertilizer.rs` - nutrient deficit → amendment quantities
//! - `suitability.rs` - crop suitability classification

pub mod advice;
pub mod fertilizer;
pub mod suitability;

use serde::{Deserialize, Serialize};

use crate::config::{ScoringConfig, StatusBands};
use crate::crop::Crop;
use crate::error::SoilResult;
use crate::measurement::SoilMeasurement;

pub use fertilizer::{FertilizerRecommendation, Nutrient};
pub use suitability::{CropSuitability, ReferenceCrop, SuitabilitySource};

/// Discrete soil-health label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl HealthStatus {
    /// Label for a score, lower edges inclusive
    pub fn from_score(score: u8, bands: &StatusBands) -> Self {
        match score {
            s if s >= bands.excellent => HealthStatus::Excellent,
            s if s >= bands.good => HealthStatus::Good,
            s if s >= bands.fair => HealthStatus::Fair,
            s if s >= bands.poor => HealthStatus::Poor,
            _ => HealthStatus::VeryPoor,
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "Excellent",
            HealthStatus::Good => "Good",
            HealthStatus::Fair => "Fair",
            HealthStatus::Poor => "Poor",
            HealthStatus::VeryPoor => "Very Poor",
        }
    }
}

/// Output of `score_health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilHealthResult {
    pub score: u8,
    pub status: HealthStatus,
    /// In check order: pH, N, P, K, organic carbon, conductivity
    pub recommendations: Vec<String>,
    /// Index-aligned with `recommendations`
    pub factors: Vec<String>,
}

/// Points awarded per criterion; `None` for criteria not evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub ph: u32,
    pub nitrogen: u32,
    pub phosphorus: u32,
    pub potassium: u32,
    pub organic_carbon: Option<u32>,
    pub awarded: u32,
    pub possible: u32,
}

impl ScoreBreakdown {
    /// round(100 × awarded / possible)
    pub fn percent(&self) -> u8 {
        if self.possible == 0 {
            return 0;
        }
        let pct = 100.0 * f64::from(self.awarded) / f64::from(self.possible);
        pct.round().clamp(0.0, 100.0) as u8
    }
}

/// Stateless scorer holding its configuration
///
/// Immutable after construction; share with `Arc` across threads.
#[derive(Debug, Clone, Default)]
pub struct SoilScoringEngine {
    config: ScoringConfig,
}

impl SoilScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Points per criterion. Organic carbon only counts toward `possible`
    /// when it was measured.
    pub fn breakdown(&self, m: &SoilMeasurement) -> SoilResult<ScoreBreakdown> {
        m.check_domain()?;
        let rubric = &self.config.rubric;

        let ph = rubric.ph.points(m.ph);
        let nitrogen = rubric.nitrogen.points(m.nitrogen);
        let phosphorus = rubric.phosphorus.points(m.phosphorus);
        let potassium = rubric.potassium.points(m.potassium);
        let organic_carbon = m.organic_carbon.map(|oc| rubric.organic_carbon.points(oc));

        let mut awarded = ph + nitrogen + phosphorus + potassium;
        let mut possible = rubric.ph.max_points()
            + rubric.nitrogen.max_points()
            + rubric.phosphorus.max_points()
            + rubric.potassium.max_points();

        if let Some(points) = organic_carbon {
            awarded += points;
            possible += rubric.organic_carbon.max_points();
        }

        Ok(ScoreBreakdown {
            ph,
            nitrogen,
            phosphorus,
            potassium,
            organic_carbon,
            awarded,
            possible,
        })
    }

    /// Score, label and remediation advice for one measurement
    pub fn score_health(&self, m: &SoilMeasurement) -> SoilResult<SoilHealthResult> {
        let score = self.breakdown(m)?.percent();
        let status = HealthStatus::from_score(score, &self.config.status);
        let advice = advice::health_advice(m, &self.config.advisory);

        Ok(SoilHealthResult {
            score,
            status,
            recommendations: advice.recommendations,
            factors: advice.factors,
        })
    }

    /// Fertilizer plan for N/P/K deficits against the crop's targets
    pub fn recommend_fertilizer(
        &self,
        m: &SoilMeasurement,
        crop: Option<&Crop>,
    ) -> SoilResult<Vec<FertilizerRecommendation>> {
        m.check_domain()?;
        Ok(fertilizer::recommend(m, crop, &self.config.fertilizer))
    }

    /// Reference score when available, otherwise a seeded estimate
    pub fn classify_crop_suitability(
        &self,
        m: &SoilMeasurement,
        crop: &Crop,
        reference: &[ReferenceCrop],
    ) -> SoilResult<CropSuitability> {
        m.check_domain()?;
        Ok(suitability::classify(m, crop, reference, &self.config.suitability))
    }

    /// Crop-specific advisory lines (empty for unrecognised crops)
    pub fn crop_specific_advice(&self, m: &SoilMeasurement, crop: &Crop) -> SoilResult<Vec<String>> {
        m.check_domain()?;
        Ok(advice::crop_specific(m, crop, &self.config))
    }
}
