use serde::Serialize;

use crate::core::{math, unit::DegreeCelsius};
use crate::features::{FeatureRow, FeaturesTable};

use super::{HomeConfig, Loss, ParameterVector};

//exterior temperature at which the neighbour coupling term vanishes
const NEIGHBOR_REFERENCE: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub features: FeatureRow,
    pub is_heating: bool,
    pub t_limit: DegreeCelsius,
    pub t_predicted: DegreeCelsius,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    rows: Vec<PredictionRow>,
}

/// Predicts the interior temperature day by day, each day seeded with the observed value.
pub fn predict(features: &FeaturesTable, params: &ParameterVector, home: &HomeConfig) -> PredictionTable {
    let rows = features.rows();
    let heating = shifted_heating(rows, params.time_shift);

    let step_secs = home.sample_interval.as_secs_f64();
    let rc = params.r * params.c;
    let decay = if rc > 0.0 {
        (-step_secs / rc).exp()
    } else {
        tracing::warn!(r = params.r, c = params.c, "Non-positive time constant, predictions will be NaN");
        f64::NAN
    };

    let heater_power = home.heater_power.0;
    let mut predictions = Vec::with_capacity(rows.len());
    let mut index = 0;

    for day in features.days() {
        let mut previous: Option<f64> = None;

        for row in day {
            let is_heating = heating[index];
            index += 1;

            let t_ext = row.exterior_temperature.0;
            let forcing = heater_power * if is_heating { 1.0 } else { 0.0 }
                + params.alpha * row.direct_radiation.0
                + params.p_neighbor * (NEIGHBOR_REFERENCE - t_ext);
            let t_limit = t_ext + params.r * forcing;

            let t_predicted = match previous {
                None => row.interior_temperature.0,
                Some(prev) => t_limit + (prev - t_limit) * decay,
            };
            previous = Some(t_predicted);

            predictions.push(PredictionRow {
                features: row.clone(),
                is_heating,
                t_limit: DegreeCelsius(t_limit),
                t_predicted: DegreeCelsius(t_predicted),
            });
        }
    }

    PredictionTable { rows: predictions }
}

//heating[i] = switch[i - shift], positions outside the table count as off
fn shifted_heating(rows: &[FeatureRow], time_shift: i32) -> Vec<bool> {
    let shift = time_shift as isize;

    (0..rows.len() as isize)
        .map(|i| {
            let source = i - shift;
            source >= 0 && (source as usize) < rows.len() && rows[source as usize].switch_state.is_on()
        })
        .collect()
}

impl PredictionTable {
    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rmse(&self) -> Option<f64> {
        self.loss(Loss::Rmse, |_| true)
    }

    pub fn mae(&self) -> Option<f64> {
        self.loss(Loss::Mae, |_| true)
    }

    //only rows accepted by the filter are scored, the recurrence itself always runs on all rows
    pub fn loss(&self, loss: Loss, include: impl Fn(&PredictionRow) -> bool) -> Option<f64> {
        let (predicted, observed): (Vec<f64>, Vec<f64>) = self
            .rows
            .iter()
            .filter(|row| include(row))
            .map(|row| (row.t_predicted.0, row.features.interior_temperature.0))
            .unzip();

        match loss {
            Loss::Rmse => math::rmse(&predicted, &observed),
            Loss::Mae => math::mae(&predicted, &observed),
        }
    }
}
