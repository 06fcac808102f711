use serde::Serialize;

use crate::events::{SwitchEventSource, TransitionKind};

use super::{DataQualityIssue, Extremum, Summary, TransientEstimator, collect};

#[derive(Debug, Clone, Default, Serialize)]
pub struct CapacitanceEstimate {
    //Wh/K
    pub summary: Option<Summary>,
    pub values: Vec<f64>,
    pub valid_periods: usize,
    pub total_periods: usize,
    pub issues: Vec<DataQualityIssue>,
}

impl TransientEstimator<'_> {
    pub fn capacitance(&self, source: &impl SwitchEventSource, tau_hours: f64) -> CapacitanceEstimate {
        let events = source.qualifying(TransitionKind::SwitchOn);
        let windows = &self.config.windows;
        let heater_power = self.home.heater_power.0;

        let (values, issues) = collect(&events, |event| {
            let transient = self.transient(event, windows.heating, windows.capacitance_offset, Extremum::Min)?;

            let t0 = transient.start.value.0;
            let t1 = transient.end.value.0;
            let warming = (t1 - t0) / transient.hours();
            let loss = (t0 - transient.ambient.0) / tau_hours;
            let denominator = warming + loss;

            if !denominator.is_finite() || denominator <= 0.0 {
                return Err(DataQualityIssue::new(
                    event,
                    format!("non-positive energy balance {denominator:.4} K/h (warming {warming:.4}, loss {loss:.4})"),
                ));
            }

            let capacitance = heater_power / denominator;
            if !capacitance.is_finite() || capacitance <= 0.0 {
                return Err(DataQualityIssue::new(event, format!("capacitance is {capacitance:.1} Wh/K")));
            }

            tracing::debug!("Capacitance of heating period starting {}: {:.1} Wh/K", event.timestamp, capacitance);
            Ok(capacitance)
        });

        let estimate = CapacitanceEstimate {
            summary: Summary::of(&values),
            valid_periods: values.len(),
            total_periods: events.len(),
            values,
            issues,
        };

        match estimate.summary {
            Some(s) => tracing::info!(
                "Capacitance estimated from {}/{} heating periods: {:.1} Wh/K ± {:.1}",
                estimate.valid_periods,
                estimate.total_periods,
                s.mean,
                s.std_dev
            ),
            None => tracing::warn!("No valid heating period among {} candidates", estimate.total_periods),
        }

        estimate
    }
}
