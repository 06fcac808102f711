use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

//direct solar radiation on a horizontal plane
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WattPerSquareMeter(pub f64);

impl Display for WattPerSquareMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} W/m²", self.0)
    }
}

impl From<&WattPerSquareMeter> for f64 {
    fn from(value: &WattPerSquareMeter) -> Self {
        value.0
    }
}

impl From<f64> for WattPerSquareMeter {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
