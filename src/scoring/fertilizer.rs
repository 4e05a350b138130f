//! Fertilizer recommendations
//!
//! One recommendation per N/P/K nutrient below the crop's target level.
//! Organic carbon and conductivity never produce a fertilizer line.

use serde::{Deserialize, Serialize};

use crate::config::{Amendment, FertilizerConfig};
use crate::crop::Crop;
use crate::measurement::SoilMeasurement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerRecommendation {
    pub nutrient: Nutrient,
    /// target - current, always > 0
    pub deficit: f64,
    pub fertilizer: String,
    pub quantity: f64,
    pub unit: String,
}

/// Deficits in N, P, K order. Empty when every nutrient meets its target.
pub fn recommend(
    m: &SoilMeasurement,
    crop: Option<&Crop>,
    config: &FertilizerConfig,
) -> Vec<FertilizerRecommendation> {
    let targets = match crop {
        Some(c) => config.targets_for(c.as_str()),
        None => config.generic_targets,
    };

    [
        (Nutrient::Nitrogen, m.nitrogen, targets.nitrogen, &config.nitrogen),
        (Nutrient::Phosphorus, m.phosphorus, targets.phosphorus, &config.phosphorus),
        (Nutrient::Potassium, m.potassium, targets.potassium, &config.potassium),
    ]
    .into_iter()
    .filter_map(|(nutrient, current, target, amendment)| {
        deficit_line(nutrient, current, target, amendment, &config.unit)
    })
    .collect()
}

fn deficit_line(
    nutrient: Nutrient,
    current: f64,
    target: f64,
    amendment: &Amendment,
    unit: &str,
) -> Option<FertilizerRecommendation> {
    if current >= target {
        return None;
    }
    let deficit = target - current;

    Some(FertilizerRecommendation {
        nutrient,
        deficit,
        fertilizer: amendment.fertilizer.clone(),
        quantity: deficit * amendment.multiplier,
        unit: unit.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wheat_nitrogen_deficit() {
        let config = FertilizerConfig::default();
        let m = SoilMeasurement::new(7.0, 100.0, 30.0, 150.0);

        let recs = recommend(&m, Some(&Crop::Wheat), &config);

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.nutrient, Nutrient::Nitrogen);
        assert_relative_eq!(rec.deficit, 150.0);
        assert_eq!(rec.fertilizer, "Urea");
        assert_relative_eq!(rec.quantity, 150.0 * config.nitrogen.multiplier);
        assert_eq!(rec.unit, "kg/ha");
    }

    #[test]
    fn test_no_deficits() {
        let m = SoilMeasurement::new(7.0, 300.0, 50.0, 300.0);
        assert!(recommend(&m, Some(&Crop::Cotton), &FertilizerConfig::default()).is_empty());
    }

    #[test]
    fn test_generic_targets_without_crop() {
        let m = SoilMeasurement::new(7.0, 180.0, 20.0, 140.0);
        let recs = recommend(&m, None, &FertilizerConfig::default());

        let nutrients: Vec<Nutrient> = recs.iter().map(|r| r.nutrient).collect();
        assert_eq!(nutrients, vec![Nutrient::Nitrogen, Nutrient::Phosphorus, Nutrient::Potassium]);
        assert_relative_eq!(recs[0].deficit, 20.0);
        assert_relative_eq!(recs[1].deficit, 10.0);
        assert_relative_eq!(recs[2].deficit, 10.0);
        assert_eq!(recs[1].fertilizer, "DAP/SSP");
        assert_eq!(recs[2].fertilizer, "MOP");
    }

    #[test]
    fn test_unknown_crop_uses_generic() {
        let m = SoilMeasurement::new(7.0, 220.0, 40.0, 175.0);
        assert!(recommend(&m, Some(&Crop::from("bajra")), &FertilizerConfig::default()).is_empty());
        // Wheat's higher N target still flags 220
        assert_eq!(recommend(&m, Some(&Crop::Wheat), &FertilizerConfig::default()).len(), 1);
    }

    #[test]
    fn test_at_target_is_not_a_deficit() {
        let m = SoilMeasurement::new(7.0, 200.0, 30.0, 150.0);
        assert!(recommend(&m, None, &FertilizerConfig::default()).is_empty());
    }
}
