//! Request validation
//!
//! Soil payloads arrive with every field optional so that a missing value is
//! reported alongside out-of-range ones. All violations are collected; the
//! first one does not stop the check. Numeric fields also accept numeric
//! strings (`"6.5"`); anything else is kept and reported as not a number.

use serde::{Deserialize, Serialize};

use crate::measurement::SoilMeasurement;

/// One rejected request field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Inclusive bounds for one numeric soil field
#[derive(Debug, Clone, Copy)]
struct Bounds {
    field: &'static str,
    min: f64,
    max: f64,
    required: bool,
}

const PH: Bounds = Bounds { field: "ph", min: 0.0, max: 14.0, required: true };
const NITROGEN: Bounds = Bounds { field: "nitrogen", min: 0.0, max: 500.0, required: true };
const PHOSPHORUS: Bounds = Bounds { field: "phosphorus", min: 0.0, max: 200.0, required: true };
const POTASSIUM: Bounds = Bounds { field: "potassium", min: 0.0, max: 1000.0, required: true };
const ORGANIC_CARBON: Bounds = Bounds { field: "organic_carbon", min: 0.0, max: 10.0, required: false };
const CONDUCTIVITY: Bounds = Bounds { field: "conductivity", min: 0.0, max: 20.0, required: false };

/// A posted numeric value, before coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Raw(serde_json::Value),
}

impl NumberInput {
    /// Numbers pass through; numeric strings are parsed
    pub fn as_number(&self) -> Option<f64> {
        match self {
            NumberInput::Number(v) => Some(*v),
            NumberInput::Raw(serde_json::Value::String(s)) => s.trim().parse().ok(),
            NumberInput::Raw(_) => None,
        }
    }

    fn raw(&self) -> serde_json::Value {
        match self {
            NumberInput::Number(v) => serde_json::Value::from(*v),
            NumberInput::Raw(v) => v.clone(),
        }
    }
}

impl From<f64> for NumberInput {
    fn from(v: f64) -> Self {
        NumberInput::Number(v)
    }
}

/// Soil test values as posted by clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilDataInput {
    #[serde(default, alias = "pH")]
    pub ph: Option<NumberInput>,
    #[serde(default)]
    pub nitrogen: Option<NumberInput>,
    #[serde(default)]
    pub phosphorus: Option<NumberInput>,
    #[serde(default)]
    pub potassium: Option<NumberInput>,
    #[serde(default, alias = "organicCarbon")]
    pub organic_carbon: Option<NumberInput>,
    #[serde(default)]
    pub conductivity: Option<NumberInput>,
}

impl SoilDataInput {
    /// Check request limits and build a measurement.
    ///
    /// `prefix` is prepended to field paths (`soil_data.ph`).
    pub fn validate(&self, prefix: &str) -> Result<SoilMeasurement, Vec<FieldError>> {
        let mut errors = Vec::new();

        let ph = check(prefix, PH, self.ph.as_ref(), &mut errors);
        let nitrogen = check(prefix, NITROGEN, self.nitrogen.as_ref(), &mut errors);
        let phosphorus = check(prefix, PHOSPHORUS, self.phosphorus.as_ref(), &mut errors);
        let potassium = check(prefix, POTASSIUM, self.potassium.as_ref(), &mut errors);
        let organic_carbon = check(prefix, ORGANIC_CARBON, self.organic_carbon.as_ref(), &mut errors);
        let conductivity = check(prefix, CONDUCTIVITY, self.conductivity.as_ref(), &mut errors);

        match (ph, nitrogen, phosphorus, potassium) {
            (Some(ph), Some(n), Some(p), Some(k)) if errors.is_empty() => Ok(SoilMeasurement {
                ph,
                nitrogen: n,
                phosphorus: p,
                potassium: k,
                organic_carbon,
                conductivity,
            }),
            _ => Err(errors),
        }
    }
}

impl From<SoilMeasurement> for SoilDataInput {
    fn from(m: SoilMeasurement) -> Self {
        Self {
            ph: Some(m.ph.into()),
            nitrogen: Some(m.nitrogen.into()),
            phosphorus: Some(m.phosphorus.into()),
            potassium: Some(m.potassium.into()),
            organic_carbon: m.organic_carbon.map(Into::into),
            conductivity: m.conductivity.map(Into::into),
        }
    }
}

fn path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn check(
    prefix: &str,
    bounds: Bounds,
    value: Option<&NumberInput>,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let field = path(prefix, bounds.field);

    let Some(input) = value else {
        if bounds.required {
            errors.push(FieldError::new(&field, format!("\"{field}\" is required")));
        }
        return None;
    };

    let Some(v) = input.as_number().filter(|v| v.is_finite()) else {
        errors.push(
            FieldError::new(&field, format!("\"{field}\" must be a number")).with_value(input.raw()),
        );
        return None;
    };

    if v < bounds.min {
        errors.push(
            FieldError::new(&field, format!("\"{field}\" must be greater than or equal to {}", bounds.min))
                .with_value(v),
        );
    } else if v > bounds.max {
        errors.push(
            FieldError::new(&field, format!("\"{field}\" must be less than or equal to {}", bounds.max))
                .with_value(v),
        );
    }

    Some(v)
}

/// Page size bounds for list queries
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 20;

pub fn validate_limit(limit: Option<usize>, errors: &mut Vec<FieldError>) -> usize {
    match limit {
        None => DEFAULT_PAGE_SIZE,
        Some(n) if (1..=MAX_PAGE_SIZE).contains(&n) => n,
        Some(n) => {
            errors.push(
                FieldError::new("limit", format!("\"limit\" must be between 1 and {MAX_PAGE_SIZE}"))
                    .with_value(n),
            );
            DEFAULT_PAGE_SIZE
        }
    }
}

/// District and crop names: 2-100 chars of letters, spaces and hyphens
pub fn validate_name(field: &str, value: Option<&str>, required: bool, errors: &mut Vec<FieldError>) {
    let Some(raw) = value else {
        if required {
            errors.push(FieldError::new(field, format!("\"{field}\" is required")));
        }
        return;
    };

    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(2..=100).contains(&len) {
        errors.push(
            FieldError::new(field, format!("\"{field}\" length must be between 2 and 100 characters"))
                .with_value(raw),
        );
    } else if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '-')
    {
        errors.push(
            FieldError::new(field, format!("\"{field}\" may only contain letters, spaces and hyphens"))
                .with_value(raw),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_input() -> SoilDataInput {
        SoilDataInput {
            ph: Some(7.2.into()),
            nitrogen: Some(240.0.into()),
            phosphorus: Some(45.0.into()),
            potassium: Some(180.0.into()),
            organic_carbon: Some(0.65.into()),
            conductivity: None,
        }
    }

    #[test]
    fn test_valid_input() {
        let m = full_input().validate("").unwrap();
        assert_eq!(m.ph, 7.2);
        assert_eq!(m.organic_carbon, Some(0.65));
        assert_eq!(m.conductivity, None);
    }

    #[test]
    fn test_all_violations_reported() {
        let input = SoilDataInput {
            ph: Some(15.0.into()),
            nitrogen: None,
            phosphorus: Some((-1.0).into()),
            potassium: Some(180.0.into()),
            organic_carbon: Some(11.0.into()),
            conductivity: None,
        };

        let errors = input.validate("soil_data").unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["soil_data.ph", "soil_data.nitrogen", "soil_data.phosphorus", "soil_data.organic_carbon"]
        );
        assert_eq!(errors[0].value, Some(serde_json::json!(15.0)));
        assert!(errors[1].message.contains("is required"));
        assert!(errors[1].value.is_none());
    }

    #[test]
    fn test_upper_bounds_inclusive() {
        let input = SoilDataInput {
            ph: Some(14.0.into()),
            nitrogen: Some(500.0.into()),
            phosphorus: Some(200.0.into()),
            potassium: Some(1000.0.into()),
            organic_carbon: Some(10.0.into()),
            conductivity: Some(20.0.into()),
        };
        assert!(input.validate("").is_ok());
    }

    #[test]
    fn test_camel_case_alias() {
        let input: SoilDataInput = serde_json::from_str(
            r#"{"ph": 6.5, "nitrogen": 200, "phosphorus": 30, "potassium": 150, "organicCarbon": 0.4}"#,
        )
        .unwrap();
        assert_eq!(input.organic_carbon.and_then(|v| v.as_number()), Some(0.4));
    }

    #[test]
    fn test_limit() {
        let mut errors = Vec::new();
        assert_eq!(validate_limit(None, &mut errors), 20);
        assert_eq!(validate_limit(Some(5), &mut errors), 5);
        assert!(errors.is_empty());

        validate_limit(Some(0), &mut errors);
        validate_limit(Some(101), &mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_names() {
        let mut errors = Vec::new();
        validate_name("district", Some("Sri Muktsar-Sahib"), true, &mut errors);
        validate_name("state", None, false, &mut errors);
        assert!(errors.is_empty());

        validate_name("district", None, true, &mut errors);
        validate_name("crop", Some("w"), true, &mut errors);
        validate_name("crop", Some("wheat42"), true, &mut errors);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[2].field, "crop");
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let input: SoilDataInput = serde_json::from_str(
            r#"{"ph": "6.5", "nitrogen": " 200 ", "phosphorus": 30, "potassium": 150}"#,
        )
        .unwrap();
        let m = input.validate("").unwrap();
        assert_eq!(m.ph, 6.5);
        assert_eq!(m.nitrogen, 200.0);
    }

    #[test]
    fn test_non_numeric_reported_with_value() {
        let input: SoilDataInput = serde_json::from_str(
            r#"{"ph": "abc", "nitrogen": true, "phosphorus": "NaN", "potassium": 150}"#,
        )
        .unwrap();
        let errors = input.validate("soil_data").unwrap_err();

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["soil_data.ph", "soil_data.nitrogen", "soil_data.phosphorus"]);
        assert!(errors.iter().all(|e| e.message.ends_with("must be a number")));
        assert_eq!(errors[0].value, Some(serde_json::json!("abc")));
        assert_eq!(errors[1].value, Some(serde_json::json!(true)));
    }
}
