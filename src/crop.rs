//! Crop identifiers
//!
//! Crops only select threshold overrides. Anything unrecognised parses to
//! `Crop::Other` and gets the generic thresholds.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crop {
    Wheat,
    Rice,
    Maize,
    Cotton,
    Sugarcane,
    Other(String),
}

impl Crop {
    pub fn as_str(&self) -> &str {
        match self {
            Crop::Wheat => "wheat",
            Crop::Rice => "rice",
            Crop::Maize => "maize",
            Crop::Cotton => "cotton",
            Crop::Sugarcane => "sugarcane",
            Crop::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Crop::Other(_))
    }
}

impl From<&str> for Crop {
    fn from(s: &str) -> Self {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "wheat" => Crop::Wheat,
            "rice" | "paddy" => Crop::Rice,
            "maize" | "corn" => Crop::Maize,
            "cotton" => Crop::Cotton,
            "sugarcane" => Crop::Sugarcane,
            _ => Crop::Other(name),
        }
    }
}

impl FromStr for Crop {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Crop::from(s))
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Crop {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Crop {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Crop::from(raw.as_str()))
    }
}
