//! District soil data
//!
//! Handles loading regional soil averages from CSV using Polars, plus the
//! built-in reference districts served when no regional file is available.
//!
//! CSV columns: `district, ph, nitrogen, phosphorus, potassium` (required),
//! `state, soil_type, organic_carbon, conductivity, suitable_crops,
//! reliability` (optional). `suitable_crops` is `;`-separated
//! `name[:season[:score]]` entries, e.g. `wheat:rabi:90;rice:kharif:85`.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::measurement::SoilMeasurement;
use crate::scoring::ReferenceCrop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    High,
    Medium,
    Low,
}

impl Reliability {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" => Reliability::High,
            "low" => Reliability::Low,
            _ => Reliability::Medium,
        }
    }
}

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Regional CSV survey data
    Regional,
    /// Built-in reference values (fallback)
    Mock,
}

/// Average soil test for one district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSoilRecord {
    pub district: String,
    pub state: String,
    pub soil_type: String,
    pub average: SoilMeasurement,
    pub suitable_crops: Vec<ReferenceCrop>,
    pub reliability: Reliability,
    pub source: RecordSource,
}

/// Load district records from a CSV file
pub fn load_district_csv(path: &Path) -> Result<Vec<DistrictSoilRecord>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
        .finish()
        .with_context(|| format!("Failed to load soil CSV: {:?}", path))?;

    let records = records_from_dataframe(&df)?;
    tracing::info!("Loaded {} district records from {:?}", records.len(), path);
    Ok(records)
}

/// Convert a loaded DataFrame into typed records.
///
/// Rows missing a required value are skipped with a warning.
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<DistrictSoilRecord>> {
    let district = str_column(df, "district")?.context("Soil CSV has no 'district' column")?;
    let ph = f64_column(df, "ph")?.context("Soil CSV has no 'ph' column")?;
    let nitrogen = f64_column(df, "nitrogen")?.context("Soil CSV has no 'nitrogen' column")?;
    let phosphorus = f64_column(df, "phosphorus")?.context("Soil CSV has no 'phosphorus' column")?;
    let potassium = f64_column(df, "potassium")?.context("Soil CSV has no 'potassium' column")?;

    let state = str_column(df, "state")?;
    let soil_type = str_column(df, "soil_type")?;
    let organic_carbon = f64_column(df, "organic_carbon")?;
    let conductivity = f64_column(df, "conductivity")?;
    let suitable_crops = str_column(df, "suitable_crops")?;
    let reliability = str_column(df, "reliability")?;

    let mut records = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let required = (
            district.get(i),
            ph.get(i),
            nitrogen.get(i),
            phosphorus.get(i),
            potassium.get(i),
        );

        let (Some(name), Some(ph), Some(n), Some(p), Some(k)) = required else {
            tracing::warn!("Skipping soil CSV row {}: missing required value", i + 1);
            continue;
        };

        let average = SoilMeasurement {
            ph,
            nitrogen: n,
            phosphorus: p,
            potassium: k,
            organic_carbon: organic_carbon.as_ref().and_then(|c| c.get(i)),
            conductivity: conductivity.as_ref().and_then(|c| c.get(i)),
        };

        if let Err(e) = average.check_domain() {
            tracing::warn!("Skipping soil CSV row {} ({}): {}", i + 1, name, e);
            continue;
        }

        let text = |col: &Option<StringChunked>, default: &str| {
            col.as_ref()
                .and_then(|c| c.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        records.push(DistrictSoilRecord {
            district: name.trim().to_string(),
            state: text(&state, "Punjab"),
            soil_type: text(&soil_type, "alluvial"),
            average,
            suitable_crops: parse_crop_list(&text(&suitable_crops, "")),
            reliability: Reliability::parse(&text(&reliability, "medium")),
            source: RecordSource::Regional,
        });
    }

    Ok(records)
}

/// Parse `wheat:rabi:90;rice:kharif` style crop lists
pub fn parse_crop_list(raw: &str) -> Vec<ReferenceCrop> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.split(':').map(str::trim);
            let name = parts.next().unwrap_or_default().to_lowercase();
            let season = parts.next().filter(|s| !s.is_empty()).map(str::to_lowercase);
            let suitability_score = parts.next().and_then(|s| s.parse::<u8>().ok()).map(|s| s.min(100));
            ReferenceCrop {
                name,
                season,
                suitability_score,
            }
        })
        .collect()
}

/// Owned Float64 view of a column (integers are cast), `None` if absent
fn f64_column(df: &DataFrame, name: &str) -> Result<Option<Float64Chunked>> {
    let Ok(col) = df.column(name) else {
        return Ok(None);
    };
    let cast = col
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;
    Ok(Some(cast.f64()?.clone()))
}

fn str_column(df: &DataFrame, name: &str) -> Result<Option<StringChunked>> {
    let Ok(col) = df.column(name) else {
        return Ok(None);
    };
    let cast = col
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' is not text", name))?;
    Ok(Some(cast.str()?.clone()))
}

// ============================================================================
// Built-in reference districts
// ============================================================================

struct SeedDistrict {
    district: &'static str,
    ph: f64,
    nitrogen: f64,
    phosphorus: f64,
    potassium: f64,
    organic_carbon: f64,
    conductivity: f64,
    crops: &'static [(&'static str, &'static str, u8)],
}

const SEED_DISTRICTS: &[SeedDistrict] = &[
    SeedDistrict {
        district: "Amritsar",
        ph: 7.2,
        nitrogen: 240.0,
        phosphorus: 45.0,
        potassium: 180.0,
        organic_carbon: 0.65,
        conductivity: 0.28,
        crops: &[("wheat", "rabi", 90), ("rice", "kharif", 85), ("maize", "kharif", 80)],
    },
    SeedDistrict {
        district: "Ludhiana",
        ph: 6.8,
        nitrogen: 220.0,
        phosphorus: 38.0,
        potassium: 195.0,
        organic_carbon: 0.58,
        conductivity: 0.31,
        crops: &[("wheat", "rabi", 88), ("rice", "kharif", 87), ("sugarcane", "all", 82)],
    },
    SeedDistrict {
        district: "Jalandhar",
        ph: 7.0,
        nitrogen: 235.0,
        phosphorus: 42.0,
        potassium: 175.0,
        organic_carbon: 0.65,
        conductivity: 0.28,
        crops: &[("wheat", "rabi", 89), ("rice", "kharif", 84), ("cotton", "kharif", 78)],
    },
    SeedDistrict {
        district: "Patiala",
        ph: 7.1,
        nitrogen: 210.0,
        phosphorus: 40.0,
        potassium: 160.0,
        organic_carbon: 0.65,
        conductivity: 0.28,
        crops: &[("wheat", "rabi", 87), ("rice", "kharif", 86), ("barley", "rabi", 75)],
    },
    SeedDistrict {
        district: "Bathinda",
        ph: 6.9,
        nitrogen: 200.0,
        phosphorus: 35.0,
        potassium: 185.0,
        organic_carbon: 0.65,
        conductivity: 0.28,
        crops: &[("wheat", "rabi", 85), ("cotton", "kharif", 88), ("mustard", "rabi", 76)],
    },
];

/// Reference districts used when regional data is unavailable
pub fn seed_districts() -> Vec<DistrictSoilRecord> {
    SEED_DISTRICTS
        .iter()
        .map(|seed| DistrictSoilRecord {
            district: seed.district.to_string(),
            state: "Punjab".to_string(),
            soil_type: "alluvial".to_string(),
            average: SoilMeasurement::new(seed.ph, seed.nitrogen, seed.phosphorus, seed.potassium)
                .with_organic_carbon(seed.organic_carbon)
                .with_conductivity(seed.conductivity),
            suitable_crops: seed
                .crops
                .iter()
                .map(|&(name, season, score)| ReferenceCrop::new(name, season, score))
                .collect(),
            reliability: Reliability::Medium,
            source: RecordSource::Mock,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crop_list() {
        let crops = parse_crop_list("Wheat:rabi:90; rice:kharif ;maize");
        assert_eq!(crops.len(), 3);
        assert_eq!(crops[0], ReferenceCrop::new("wheat", "rabi", 90));
        assert_eq!(crops[1].season.as_deref(), Some("kharif"));
        assert_eq!(crops[1].suitability_score, None);
        assert_eq!(crops[2].season, None);
    }

    #[test]
    fn test_parse_empty_crop_list() {
        assert!(parse_crop_list("").is_empty());
        assert!(parse_crop_list(" ; ").is_empty());
    }

    #[test]
    fn test_records_from_dataframe() {
        let df = df! {
            "district" => &["Amritsar", "Ludhiana"],
            "ph" => &[7.2, 6.8],
            "nitrogen" => &[240i64, 220],
            "phosphorus" => &[45i64, 38],
            "potassium" => &[180i64, 195],
            "organic_carbon" => &[Some(0.65), None],
            "suitable_crops" => &["wheat:rabi:90;rice:kharif:85", ""]
        }
        .unwrap();

        let records = records_from_dataframe(&df).unwrap();
        assert_eq!(records.len(), 2);

        let amritsar = &records[0];
        assert_eq!(amritsar.average.nitrogen, 240.0);
        assert_eq!(amritsar.average.organic_carbon, Some(0.65));
        assert_eq!(amritsar.average.conductivity, None);
        assert_eq!(amritsar.suitable_crops.len(), 2);
        assert_eq!(amritsar.state, "Punjab");
        assert_eq!(amritsar.source, RecordSource::Regional);

        assert_eq!(records[1].average.organic_carbon, None);
        assert!(records[1].suitable_crops.is_empty());
    }

    #[test]
    fn test_rows_with_missing_or_invalid_values_skipped() {
        let df = df! {
            "district" => &["Good", "Missing", "Acidic"],
            "ph" => &[Some(7.0), None, Some(15.0)],
            "nitrogen" => &[200.0, 200.0, 200.0],
            "phosphorus" => &[30.0, 30.0, 30.0],
            "potassium" => &[150.0, 150.0, 150.0]
        }
        .unwrap();

        let records = records_from_dataframe(&df).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].district, "Good");
    }

    #[test]
    fn test_missing_required_column_errors() {
        let df = df! {
            "district" => &["Amritsar"],
            "ph" => &[7.2]
        }
        .unwrap();
        assert!(records_from_dataframe(&df).is_err());
    }

    #[test]
    fn test_load_csv_file() {
        let path = std::env::temp_dir().join(format!("kisaan_soil_{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "district,state,ph,nitrogen,phosphorus,potassium,organic_carbon,conductivity,suitable_crops,reliability\n\
             Patiala,Punjab,7.1,210,40,160,0.62,0.3,wheat:rabi:87;rice:kharif:86,high\n",
        )
        .unwrap();

        let records = load_district_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].district, "Patiala");
        assert_eq!(records[0].reliability, Reliability::High);
        assert_eq!(records[0].average.conductivity, Some(0.3));
    }

    #[test]
    fn test_seed_districts_valid() {
        let seeds = seed_districts();
        assert_eq!(seeds.len(), 5);
        for record in &seeds {
            assert!(record.average.check_domain().is_ok());
            assert_eq!(record.source, RecordSource::Mock);
            assert_eq!(record.suitable_crops.len(), 3);
        }
    }
}
