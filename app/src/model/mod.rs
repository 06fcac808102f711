mod ambient;
mod predictor;

use serde::{Deserialize, Serialize};

pub use ambient::adjusted_ambient;
pub use predictor::{PredictionRow, PredictionTable, predict};

#[cfg(test)]
pub use predictor::tests as fixtures;

use crate::core::{time::Duration, unit::Watt};
use crate::t;

#[derive(Debug, Clone, Deserialize)]
pub struct HomeConfig {
    //mean power drawn by the heater while switched on
    pub heater_power: Watt,
    #[serde(default = "default_consider_neighbors")]
    pub consider_neighbors: bool,
    #[serde(default = "default_sample_interval")]
    pub sample_interval: Duration,
}

fn default_consider_neighbors() -> bool {
    true
}

fn default_sample_interval() -> Duration {
    t!(5 minutes)
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            heater_power: Watt(2500.0),
            consider_neighbors: default_consider_neighbors(),
            sample_interval: default_sample_interval(),
        }
    }
}

//r in K/W and c in J/K, time_shift in whole samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    pub r: f64,
    pub c: f64,
    pub alpha: f64,
    pub p_neighbor: f64,
    pub time_shift: i32,
}

impl ParameterVector {
    pub const LEN: usize = 5;

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [self.r, self.c, self.alpha, self.p_neighbor, self.time_shift as f64]
    }

    //optimizers search a continuous space, the lag is rounded to whole samples
    pub fn from_slice(values: &[f64]) -> anyhow::Result<Self> {
        let [r, c, alpha, p_neighbor, time_shift] = <[f64; Self::LEN]>::try_from(values)
            .map_err(|_| anyhow::anyhow!("Expected {} parameters, got {}", Self::LEN, values.len()))?;

        Ok(Self {
            r,
            c,
            alpha,
            p_neighbor,
            time_shift: time_shift.round() as i32,
        })
    }

    pub fn time_constant(&self) -> Duration {
        Duration::from_hours_f64(self.r * self.c / 3600.0)
    }
}

impl std::fmt::Display for ParameterVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "R={:.2e}, C={:.2e}, alpha={:.2e}, P_neighbor={:.2e}, time_shift={}",
            self.r, self.c, self.alpha, self.p_neighbor, self.time_shift
        )
    }
}

//tau in hours, capacitance in Wh/K
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalParameters {
    pub tau_hours: f64,
    pub capacitance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loss {
    #[default]
    Rmse,
    Mae,
}

impl std::fmt::Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loss::Rmse => write!(f, "RMSE"),
            Loss::Mae => write!(f, "MAE"),
        }
    }
}
