use serde::Serialize;

use crate::events::{SwitchEventSource, TransitionKind};

use super::{DataQualityIssue, Extremum, Summary, TauFormula, Transient, TransientEstimator, collect};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TauEstimate {
    //hours
    pub summary: Option<Summary>,
    pub values: Vec<f64>,
    pub valid_periods: usize,
    pub total_periods: usize,
    pub issues: Vec<DataQualityIssue>,
}

impl TransientEstimator<'_> {
    pub fn tau(&self, source: &impl SwitchEventSource) -> TauEstimate {
        let events = source.qualifying(TransitionKind::SwitchOff);
        let windows = &self.config.windows;

        let (values, issues) = collect(&events, |event| {
            let transient = self.transient(event, windows.cooling, windows.tau_offset, Extremum::Max)?;
            let tau = tau_of(&transient, self.config.tau_formula);

            if !tau.is_finite() || tau <= 0.0 {
                return Err(DataQualityIssue::new(
                    event,
                    format!(
                        "tau is {tau:.3} h (T0={}, T1={}, ambient={})",
                        transient.start.value, transient.end.value, transient.ambient
                    ),
                ));
            }

            tracing::debug!("Tau of cooling period starting {}: {:.2} h", event.timestamp, tau);
            Ok(tau)
        });

        let estimate = TauEstimate {
            summary: Summary::of(&values),
            valid_periods: values.len(),
            total_periods: events.len(),
            values,
            issues,
        };

        match estimate.summary {
            Some(s) => tracing::info!(
                "Tau estimated from {}/{} cooling periods: {:.2} h ± {:.2} h",
                estimate.valid_periods,
                estimate.total_periods,
                s.mean,
                s.std_dev
            ),
            None => tracing::warn!("No valid cooling period among {} candidates", estimate.total_periods),
        }

        estimate
    }
}

fn tau_of(transient: &Transient, formula: TauFormula) -> f64 {
    let t0 = transient.start.value.0;
    let t1 = transient.end.value.0;
    let ambient = transient.ambient.0;
    let hours = transient.hours();

    match formula {
        TauFormula::Linear => (t0 - ambient) * hours / (t0 - t1),
        TauFormula::Logarithmic => hours / ((t0 - ambient) / (t1 - ambient)).ln(),
    }
}
