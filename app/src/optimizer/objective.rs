use serde::{Deserialize, Serialize};

use crate::core::{Range, time::DateTimeRange};
use crate::features::FeaturesTable;
use crate::model::{HomeConfig, Loss, ParameterVector, PredictionTable, predict};

use super::{Objective, SearchSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    #[display("R")]
    R,
    #[display("C")]
    C,
    #[display("alpha")]
    Alpha,
    #[display("P_neighbor")]
    PNeighbor,
    #[display("time_shift")]
    TimeShift,
}

impl Parameter {
    pub const ALL: [Parameter; ParameterVector::LEN] = [
        Parameter::R,
        Parameter::C,
        Parameter::Alpha,
        Parameter::PNeighbor,
        Parameter::TimeShift,
    ];

    //position in ParameterVector::to_array
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParameterBounds {
    pub r: Range<f64>,
    pub c: Range<f64>,
    pub alpha: Range<f64>,
    pub p_neighbor: Range<f64>,
    pub time_shift: Range<f64>,
}

impl ParameterBounds {
    fn get(&self, parameter: Parameter) -> Range<f64> {
        match parameter {
            Parameter::R => self.r,
            Parameter::C => self.c,
            Parameter::Alpha => self.alpha,
            Parameter::PNeighbor => self.p_neighbor,
            Parameter::TimeShift => self.time_shift,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMask {
    base: ParameterVector,
    free: Vec<Parameter>,
}

impl ParameterMask {
    pub fn new(base: ParameterVector, free: &[Parameter]) -> Self {
        let free = Parameter::ALL.into_iter().filter(|p| free.contains(p)).collect();
        Self { base, free }
    }

    pub fn all(base: ParameterVector) -> Self {
        Self::new(base, &Parameter::ALL)
    }

    pub fn free(&self) -> &[Parameter] {
        &self.free
    }

    pub fn initial(&self) -> Vec<f64> {
        let all = self.base.to_array();
        self.free.iter().map(|p| all[p.index()]).collect()
    }

    pub fn expand(&self, values: &[f64]) -> anyhow::Result<ParameterVector> {
        anyhow::ensure!(
            values.len() == self.free.len(),
            "Expected {} free parameters, got {}",
            self.free.len(),
            values.len()
        );

        let mut all = self.base.to_array();
        for (parameter, value) in self.free.iter().zip(values) {
            all[parameter.index()] = *value;
        }

        ParameterVector::from_slice(&all)
    }

    pub fn search_space(&self, bounds: Option<&ParameterBounds>) -> anyhow::Result<SearchSpace> {
        let bounds = bounds.map(|b| self.free.iter().map(|p| b.get(*p)).collect());
        SearchSpace::new(self.initial(), bounds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, derive_more::Display, derive_more::Error)]
#[display("{selection} selects no rows, falling back to all {available} rows")]
pub struct InsufficientData {
    pub selection: String,
    pub available: usize,
}

//the band only filters scored rows, the recurrence still runs over every row
#[derive(Debug, Clone)]
pub struct FitObjective {
    features: FeaturesTable,
    home: HomeConfig,
    mask: ParameterMask,
    loss: Loss,
    band: Option<Range<f64>>,
    warnings: Vec<InsufficientData>,
}

impl FitObjective {
    pub fn new(features: FeaturesTable, home: HomeConfig, mask: ParameterMask, loss: Loss) -> anyhow::Result<Self> {
        anyhow::ensure!(!features.is_empty(), "Cannot fit parameters on an empty feature table");

        Ok(Self {
            features,
            home,
            mask,
            loss,
            band: None,
            warnings: vec![],
        })
    }

    pub fn with_window(mut self, window: &DateTimeRange) -> Self {
        let restricted = self.features.restrict(window);

        if restricted.is_empty() {
            self.fall_back(format!("Time window {window}"));
        } else {
            tracing::info!("Fitting on {} of {} rows", restricted.len(), self.features.len());
            self.features = restricted;
        }

        self
    }

    pub fn with_band(mut self, band: Range<f64>) -> Self {
        let selected = self
            .features
            .rows()
            .iter()
            .filter(|row| band.contains(&row.interior_temperature.0))
            .count();

        if selected == 0 {
            self.fall_back(format!("Interior temperature band {} to {} °C", band.from(), band.to()));
        } else {
            tracing::info!("Scoring {} of {} rows inside the temperature band", selected, self.features.len());
            self.band = Some(band);
        }

        self
    }

    fn fall_back(&mut self, selection: String) {
        let warning = InsufficientData {
            selection,
            available: self.features.len(),
        };
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn features(&self) -> &FeaturesTable {
        &self.features
    }

    pub fn home(&self) -> &HomeConfig {
        &self.home
    }

    pub fn mask(&self) -> &ParameterMask {
        &self.mask
    }

    pub fn loss_function(&self) -> Loss {
        self.loss
    }

    pub fn warnings(&self) -> &[InsufficientData] {
        &self.warnings
    }

    pub fn parameters(&self, free: &[f64]) -> anyhow::Result<ParameterVector> {
        self.mask.expand(free)
    }

    pub fn predict(&self, params: &ParameterVector) -> PredictionTable {
        predict(&self.features, params, &self.home)
    }

    pub fn score(&self, params: &ParameterVector) -> Option<f64> {
        self.predict(params).loss(self.loss, |row| {
            self.band
                .is_none_or(|band| band.contains(&row.features.interior_temperature.0))
        })
    }
}

impl Objective for FitObjective {
    fn loss(&self, x: &[f64]) -> f64 {
        self.parameters(x)
            .ok()
            .and_then(|params| self.score(&params))
            .unwrap_or(f64::INFINITY)
    }
}
