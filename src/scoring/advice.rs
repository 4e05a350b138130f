//! Recommendation pass
//!
//! Threshold-triggered prose, evaluated in a fixed order. Every triggered
//! check contributes exactly one recommendation and one factor, so the two
//! lists stay index-aligned.

use crate::config::{AdvisoryThresholds, ScoringConfig};
use crate::crop::Crop;
use crate::measurement::SoilMeasurement;

/// Sole recommendation when every check passes
pub const ADEQUATE: &str = "Soil health is good - maintain current practices";
const ADEQUATE_FACTOR: &str = "All major soil parameters are within suitable ranges";

/// Recommendations with their parallel factors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Advice {
    pub recommendations: Vec<String>,
    pub factors: Vec<String>,
}

impl Advice {
    fn push(&mut self, recommendation: &str, factor: &str) {
        self.recommendations.push(recommendation.to_string());
        self.factors.push(factor.to_string());
    }

    pub fn is_adequate(&self) -> bool {
        self.recommendations.len() == 1 && self.recommendations[0] == ADEQUATE
    }
}

/// General soil-health advice (pH, N, P, K, organic carbon, conductivity)
pub fn health_advice(m: &SoilMeasurement, t: &AdvisoryThresholds) -> Advice {
    let mut advice = Advice::default();

    if m.ph < t.ph_low {
        advice.push(
            "Apply lime to increase soil pH for better nutrient availability",
            "Low pH may limit nutrient uptake",
        );
    } else if m.ph > t.ph_high {
        advice.push(
            "Apply gypsum or organic matter to reduce soil pH",
            "High pH may cause nutrient deficiencies",
        );
    }

    if m.nitrogen < t.nitrogen_low {
        advice.push(
            "Apply nitrogen-rich fertilizers or compost",
            "Nitrogen levels below optimal range",
        );
    }

    if m.phosphorus < t.phosphorus_low {
        advice.push(
            "Add phosphorus fertilizers for better root development",
            "Low phosphorus may affect root growth",
        );
    }

    if m.potassium < t.potassium_low {
        advice.push(
            "Apply potassium fertilizers to improve plant health",
            "Potassium levels below recommended range",
        );
    }

    if let Some(oc) = m.organic_carbon {
        if oc < t.organic_carbon_low {
            advice.push(
                "Increase organic matter through composting and crop residue",
                "Low organic carbon affects soil structure and fertility",
            );
        }
    }

    if let Some(ec) = m.conductivity {
        if ec > t.conductivity_high {
            advice.push(
                "Improve drainage and consider salt-tolerant varieties to reduce salinity",
                "High electrical conductivity indicates salinity issues",
            );
        }
    }

    if advice.recommendations.is_empty() {
        advice.push(ADEQUATE, ADEQUATE_FACTOR);
    }

    advice
}

/// Extra advice for crops with known preferences. pH windows come from
/// `crop_advice`; nutrient notes fire exactly when the fertilizer plan would
/// show a deficit for that crop.
pub fn crop_specific(m: &SoilMeasurement, crop: &Crop, config: &ScoringConfig) -> Vec<String> {
    let mut out = Vec::new();
    let targets = config.fertilizer.targets_for(crop.as_str());

    if let Some(w) = config.crop_advice.ph_window(crop.as_str()) {
        if w.triggers(m.ph) {
            let line = match crop {
                Crop::Wheat => format!(
                    "Wheat prefers slightly alkaline soil (pH {:.1}-{:.1})",
                    w.low, w.high
                ),
                Crop::Rice => format!(
                    "Rice grows best in slightly acidic to neutral soil (pH {:.1}-{:.1})",
                    w.low, w.high
                ),
                Crop::Cotton => format!("Cotton prefers pH between {:.1}-{:.1}", w.low, w.high),
                Crop::Sugarcane => format!("Sugarcane grows best in pH {:.1}-{:.1}", w.low, w.high),
                other => format!("{} grows best in pH {:.1}-{:.1}", other, w.low, w.high),
            };
            out.push(line);
        }
    }

    match crop {
        Crop::Wheat => {
            if m.nitrogen < targets.nitrogen {
                out.push("Wheat has high nitrogen requirements, especially during tillering".to_string());
            }
        }
        Crop::Rice => {
            out.push("Ensure proper water management for rice cultivation".to_string());
        }
        Crop::Cotton => {
            if m.potassium < targets.potassium {
                out.push("Cotton has high potassium requirements for fiber quality".to_string());
            }
        }
        Crop::Sugarcane => {
            out.push("Ensure adequate organic matter for sustained sugarcane production".to_string());
        }
        Crop::Maize | Crop::Other(_) => {}
    }

    out
}
