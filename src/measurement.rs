//! Soil test measurements
//!
//! A `SoilMeasurement` is the raw input to every scoring operation. Units are a
//! display concern (see [`UNITS`]); only the numeric thresholds matter here.

use serde::{Deserialize, Serialize};

use crate::error::{SoilError, SoilResult};

/// Display units reported alongside soil parameters
pub const UNITS: [(&str, &str); 6] = [
    ("ph", "pH scale (0-14)"),
    ("nitrogen", "mg/kg"),
    ("phosphorus", "mg/kg"),
    ("potassium", "mg/kg"),
    ("organic_carbon", "%"),
    ("conductivity", "dS/m"),
];

/// One soil test (or district average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilMeasurement {
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "organicCarbon")]
    pub organic_carbon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductivity: Option<f64>,
}

impl SoilMeasurement {
    /// Measurement with only the four required parameters
    pub fn new(ph: f64, nitrogen: f64, phosphorus: f64, potassium: f64) -> Self {
        Self {
            ph,
            nitrogen,
            phosphorus,
            potassium,
            organic_carbon: None,
            conductivity: None,
        }
    }

    pub fn with_organic_carbon(mut self, organic_carbon: f64) -> Self {
        self.organic_carbon = Some(organic_carbon);
        self
    }

    pub fn with_conductivity(mut self, conductivity: f64) -> Self {
        self.conductivity = Some(conductivity);
        self
    }

    /// N + P + K
    pub fn total_nutrients(&self) -> f64 {
        self.nitrogen + self.phosphorus + self.potassium
    }

    /// Reject values outside the physical domain of each parameter.
    ///
    /// This is the engine's contract (pH within [0,14], everything else
    /// non-negative and finite). The tighter request limits live in
    /// `validation`.
    pub fn check_domain(&self) -> SoilResult<()> {
        check_finite("ph", self.ph)?;
        if !(0.0..=14.0).contains(&self.ph) {
            return Err(SoilError::invalid("ph", self.ph, "must be between 0 and 14"));
        }

        check_non_negative("nitrogen", self.nitrogen)?;
        check_non_negative("phosphorus", self.phosphorus)?;
        check_non_negative("potassium", self.potassium)?;

        if let Some(oc) = self.organic_carbon {
            check_non_negative("organic_carbon", oc)?;
        }
        if let Some(ec) = self.conductivity {
            check_non_negative("conductivity", ec)?;
        }

        Ok(())
    }
}

fn check_finite(field: &'static str, value: f64) -> SoilResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SoilError::invalid(field, value, "must be a finite number"))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> SoilResult<()> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(SoilError::invalid(field, value, "must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_nutrients() {
        let m = SoilMeasurement::new(7.0, 220.0, 40.0, 175.0);
        assert_eq!(m.total_nutrients(), 435.0);
    }

    #[test]
    fn test_ph_out_of_range_rejected() {
        let err = SoilMeasurement::new(14.5, 200.0, 30.0, 150.0)
            .check_domain()
            .unwrap_err();
        assert!(matches!(err, SoilError::InvalidInput { field: "ph", .. }));
    }

    #[test]
    fn test_ph_edges_accepted() {
        assert!(SoilMeasurement::new(0.0, 0.0, 0.0, 0.0).check_domain().is_ok());
        assert!(SoilMeasurement::new(14.0, 0.0, 0.0, 0.0).check_domain().is_ok());
    }

    #[test]
    fn test_negative_optional_rejected() {
        let err = SoilMeasurement::new(7.0, 200.0, 30.0, 150.0)
            .with_conductivity(-0.1)
            .check_domain()
            .unwrap_err();
        assert!(matches!(err, SoilError::InvalidInput { field: "conductivity", .. }));
    }

    #[test]
    fn test_nan_rejected() {
        let err = SoilMeasurement::new(7.0, f64::NAN, 30.0, 150.0)
            .check_domain()
            .unwrap_err();
        assert!(matches!(err, SoilError::InvalidInput { field: "nitrogen", .. }));
    }

    #[test]
    fn test_camel_case_alias() {
        let m: SoilMeasurement = serde_json::from_str(
            r#"{"ph": 6.8, "nitrogen": 220, "phosphorus": 38, "potassium": 195, "organicCarbon": 0.58}"#,
        )
        .unwrap();
        assert_eq!(m.organic_carbon, Some(0.58));
        assert_eq!(m.conductivity, None);
    }
}
