//! Configuration
//!
//! Two layers:
//! - `ScoringConfig`: every threshold, point band and multiplier the engine
//!   uses. `Default` reproduces the production rubric; a JSON file can
//!   override any part of it.
//! - `ServerConfig`: process settings read from environment variables.
//!
//! None of the scoring constants come from an agronomic model. They are
//! tunable values, kept here so they are never hard-coded at call sites.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{SoilError, SoilResult};
use crate::language::DEFAULT_LANGUAGE_CAPACITY;

// ============================================================================
// Scoring rubric
// ============================================================================

/// Lower-bounded band: value >= `min` earns `points`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub min: f64,
    pub points: u32,
}

/// Closed-range band: `low <= value <= high` earns `points`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBand {
    pub low: f64,
    pub high: f64,
    pub points: u32,
}

/// Bands checked highest-first; `floor_points` if none match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRubric {
    pub bands: Vec<ThresholdBand>,
    pub floor_points: u32,
}

impl ThresholdRubric {
    fn new(bands: &[(f64, u32)], floor_points: u32) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|&(min, points)| ThresholdBand { min, points })
                .collect(),
            floor_points,
        }
    }

    pub fn points(&self, value: f64) -> u32 {
        self.bands
            .iter()
            .find(|band| value >= band.min)
            .map(|band| band.points)
            .unwrap_or(self.floor_points)
    }

    pub fn max_points(&self) -> u32 {
        self.bands
            .iter()
            .map(|band| band.points)
            .chain(std::iter::once(self.floor_points))
            .max()
            .unwrap_or(0)
    }
}

/// Ranges checked narrowest-first; `floor_points` outside all of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRubric {
    pub bands: Vec<RangeBand>,
    pub floor_points: u32,
}

impl RangeRubric {
    pub fn points(&self, value: f64) -> u32 {
        self.bands
            .iter()
            .find(|band| value >= band.low && value <= band.high)
            .map(|band| band.points)
            .unwrap_or(self.floor_points)
    }

    pub fn max_points(&self) -> u32 {
        self.bands
            .iter()
            .map(|band| band.points)
            .chain(std::iter::once(self.floor_points))
            .max()
            .unwrap_or(0)
    }
}

/// Point rubric for the health score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreRubric {
    pub ph: RangeRubric,
    pub nitrogen: ThresholdRubric,
    pub phosphorus: ThresholdRubric,
    pub potassium: ThresholdRubric,
    pub organic_carbon: ThresholdRubric,
}

impl Default for ScoreRubric {
    fn default() -> Self {
        Self {
            ph: RangeRubric {
                bands: vec![
                    RangeBand { low: 6.0, high: 7.5, points: 20 },
                    RangeBand { low: 5.5, high: 8.0, points: 15 },
                ],
                floor_points: 5,
            },
            nitrogen: ThresholdRubric::new(&[(200.0, 25), (150.0, 20), (100.0, 15)], 5),
            phosphorus: ThresholdRubric::new(&[(30.0, 20), (20.0, 15), (10.0, 10)], 5),
            potassium: ThresholdRubric::new(&[(150.0, 20), (100.0, 15), (50.0, 10)], 5),
            organic_carbon: ThresholdRubric::new(&[(0.75, 15), (0.5, 12), (0.25, 8)], 3),
        }
    }
}

/// Inclusive lower edges of the status labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusBands {
    pub excellent: u8,
    pub good: u8,
    pub fair: u8,
    pub poor: u8,
}

impl Default for StatusBands {
    fn default() -> Self {
        Self { excellent: 85, good: 70, fair: 55, poor: 40 }
    }
}

/// Triggers for the prose recommendation pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryThresholds {
    pub ph_low: f64,
    pub ph_high: f64,
    pub nitrogen_low: f64,
    pub phosphorus_low: f64,
    pub potassium_low: f64,
    pub organic_carbon_low: f64,
    pub conductivity_high: f64,
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self {
            ph_low: 6.0,
            ph_high: 8.0,
            nitrogen_low: 150.0,
            phosphorus_low: 25.0,
            potassium_low: 120.0,
            organic_carbon_low: 0.5,
            conductivity_high: 2.0,
        }
    }
}

/// Preferred pH window for a crop; advice fires on the flagged sides only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropPhWindow {
    pub low: f64,
    pub high: f64,
    #[serde(default = "yes")]
    pub warn_below: bool,
    #[serde(default = "yes")]
    pub warn_above: bool,
}

fn yes() -> bool {
    true
}

impl CropPhWindow {
    fn new(low: f64, high: f64, warn_below: bool, warn_above: bool) -> Self {
        Self { low, high, warn_below, warn_above }
    }

    pub fn triggers(&self, ph: f64) -> bool {
        (self.warn_below && ph < self.low) || (self.warn_above && ph > self.high)
    }
}

/// Crop-specific advisory settings. Nutrient notes compare against the
/// crop's fertilizer targets, so only pH windows live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropAdviceConfig {
    /// Keyed by lower-case crop name
    pub ph: HashMap<String, CropPhWindow>,
}

impl Default for CropAdviceConfig {
    fn default() -> Self {
        let ph = [
            ("wheat", CropPhWindow::new(6.5, 7.5, true, false)),
            ("rice", CropPhWindow::new(5.5, 7.0, false, true)),
            ("cotton", CropPhWindow::new(5.8, 8.0, true, true)),
            ("sugarcane", CropPhWindow::new(6.0, 7.5, true, true)),
        ]
        .into_iter()
        .map(|(crop, window)| (crop.to_string(), window))
        .collect();

        Self { ph }
    }
}

impl CropAdviceConfig {
    pub fn ph_window(&self, crop: &str) -> Option<&CropPhWindow> {
        self.ph.get(&crop.to_lowercase())
    }
}

/// Target N/P/K levels for a crop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientTargets {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

/// Amendment name and deficit multiplier for one nutrient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amendment {
    pub fertilizer: String,
    /// kg of product per unit of deficit
    pub multiplier: f64,
}

impl Amendment {
    fn new(fertilizer: &str, nutrient_fraction: f64) -> Self {
        Self {
            fertilizer: fertilizer.to_string(),
            multiplier: 1.0 / nutrient_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FertilizerConfig {
    pub generic_targets: NutrientTargets,
    /// Keyed by lower-case crop name
    pub crop_targets: HashMap<String, NutrientTargets>,
    pub nitrogen: Amendment,
    pub phosphorus: Amendment,
    pub potassium: Amendment,
    pub unit: String,
}

impl Default for FertilizerConfig {
    fn default() -> Self {
        let generic = NutrientTargets {
            nitrogen: 200.0,
            phosphorus: 30.0,
            potassium: 150.0,
        };

        let mut crop_targets = HashMap::new();
        crop_targets.insert("wheat".to_string(), NutrientTargets { nitrogen: 250.0, ..generic });
        crop_targets.insert("cotton".to_string(), NutrientTargets { potassium: 250.0, ..generic });

        Self {
            generic_targets: generic,
            crop_targets,
            // Urea 46% N, SSP 16% P2O5, MOP 60% K2O
            nitrogen: Amendment::new("Urea", 0.46),
            phosphorus: Amendment::new("DAP/SSP", 0.16),
            potassium: Amendment::new("MOP", 0.60),
            unit: "kg/ha".to_string(),
        }
    }
}

impl FertilizerConfig {
    pub fn targets_for(&self, crop: &str) -> NutrientTargets {
        self.crop_targets
            .get(&crop.to_lowercase())
            .copied()
            .unwrap_or(self.generic_targets)
    }
}

/// Inclusive score band for estimated suitability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: u8,
    pub high: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityConfig {
    /// Seed for estimated scores; mixed with crop and measurement per call
    pub seed: u64,
    /// Reference scores strictly above this are suitable
    pub reference_cutoff: u8,
    pub suitable_range: ScoreRange,
    pub unsuitable_range: ScoreRange,
    pub min_ph: f64,
    pub max_ph: f64,
    pub min_nitrogen: f64,
    pub min_phosphorus: f64,
    pub min_potassium: f64,
}

impl Default for SuitabilityConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            reference_cutoff: 70,
            suitable_range: ScoreRange { low: 75, high: 95 },
            unsuitable_range: ScoreRange { low: 45, high: 75 },
            min_ph: 5.5,
            max_ph: 8.0,
            min_nitrogen: 150.0,
            min_phosphorus: 20.0,
            min_potassium: 100.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub rubric: ScoreRubric,
    pub status: StatusBands,
    pub advisory: AdvisoryThresholds,
    pub crop_advice: CropAdviceConfig,
    pub fertilizer: FertilizerConfig,
    pub suitability: SuitabilityConfig,
}

impl ScoringConfig {
    /// Load from a JSON file; missing sections keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring config: {:?}", path))?;

        let config: ScoringConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse scoring config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SoilResult<()> {
        let s = &self.status;
        if !(s.excellent > s.good && s.good > s.fair && s.fair > s.poor) {
            return Err(SoilError::Config(
                "status bands must be strictly descending".to_string(),
            ));
        }

        for (name, rubric) in [
            ("nitrogen", &self.rubric.nitrogen),
            ("phosphorus", &self.rubric.phosphorus),
            ("potassium", &self.rubric.potassium),
            ("organic_carbon", &self.rubric.organic_carbon),
        ] {
            if rubric.bands.windows(2).any(|w| w[0].min <= w[1].min) {
                return Err(SoilError::Config(format!(
                    "{} bands must be ordered by descending minimum",
                    name
                )));
            }
        }

        let ph = &self.rubric.ph;
        if ph.bands.iter().any(|b| !(b.low <= b.high)) {
            return Err(SoilError::Config("ph band low exceeds high".to_string()));
        }
        if ph
            .bands
            .windows(2)
            .any(|w| w[0].low < w[1].low || w[0].high > w[1].high)
        {
            return Err(SoilError::Config(
                "ph bands must be nested narrowest-first".to_string(),
            ));
        }

        if ph.max_points() == 0 {
            return Err(SoilError::Config("ph rubric awards no points".to_string()));
        }

        let f = &self.fertilizer;
        for amendment in [&f.nitrogen, &f.phosphorus, &f.potassium] {
            if !(amendment.multiplier.is_finite() && amendment.multiplier > 0.0) {
                return Err(SoilError::Config(format!(
                    "{} multiplier must be positive",
                    amendment.fertilizer
                )));
            }
        }

        for (crop, window) in &self.crop_advice.ph {
            if !(window.low <= window.high) {
                return Err(SoilError::Config(format!("invalid {} pH window", crop)));
            }
        }

        for range in [self.suitability.suitable_range, self.suitability.unsuitable_range] {
            if range.low > range.high || range.high > 100 {
                return Err(SoilError::Config(format!(
                    "invalid suitability range {}-{}",
                    range.low, range.high
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Server settings
// ============================================================================

/// Process configuration from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub soil_csv: PathBuf,
    pub scoring_config: Option<PathBuf>,
    /// Overrides the config file's seed only when set
    pub suitability_seed: Option<u64>,
    pub cache_ttl_secs: u64,
    /// Session language preferences kept in memory
    pub language_capacity: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let data_dir = PathBuf::from(var_or("DATA_DIR", "data"));
        let soil_csv = std::env::var("SOIL_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("soil_data_punjab.csv"));

        Ok(Self {
            port: parse_or("PORT", 3000)?,
            soil_csv,
            data_dir,
            scoring_config: std::env::var("SCORING_CONFIG").ok().map(PathBuf::from),
            suitability_seed: parse_opt("SUITABILITY_SEED")?,
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", 300)?,
            language_capacity: parse_or("LANGUAGE_CAPACITY", DEFAULT_LANGUAGE_CAPACITY)?,
        })
    }

    /// Scoring config from `SCORING_CONFIG` (or defaults); `SUITABILITY_SEED`
    /// wins over the file when present
    pub fn scoring(&self) -> Result<ScoringConfig> {
        let mut config = match &self.scoring_config {
            Some(path) => ScoringConfig::load(path)?,
            None => ScoringConfig::default(),
        };
        if let Some(seed) = self.suitability_seed {
            config.suitability.seed = seed;
        }
        Ok(config)
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        Err(_) => {
            tracing::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .ok()
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("Invalid {key} value: {raw}"))
        })
        .transpose()
}
