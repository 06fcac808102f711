mod capacitance;
mod tau;

use serde::{Deserialize, Serialize};

pub use capacitance::CapacitanceEstimate;
pub use tau::TauEstimate;

use crate::core::{
    math,
    time::{DateTime, DateTimeRange, Duration},
    timeseries::{DataFrame, DataPoint},
    unit::DegreeCelsius,
};
use crate::events::{QualificationCriteria, SwitchEvent, SwitchEventSource, TransitionKind};
use crate::model::{HomeConfig, ThermalParameters, adjusted_ambient};
use crate::t;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimationConfig {
    #[serde(default)]
    pub criteria: QualificationCriteria,
    #[serde(default)]
    pub windows: TransientWindows,
    #[serde(default)]
    pub tau_formula: TauFormula,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransientWindows {
    pub cooling: Duration,
    pub heating: Duration,
    //distance between the extremum and the second reading
    pub tau_offset: Duration,
    pub capacitance_offset: Duration,
    //exterior temperature is averaged this far around the transient
    pub ambient_margin: Duration,
}

impl Default for TransientWindows {
    fn default() -> Self {
        Self {
            cooling: t!(5 hours),
            heating: t!(2 hours),
            tau_offset: t!(1 hours),
            capacitance_offset: t!(30 minutes),
            ambient_margin: t!(5 hours),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TauFormula {
    //(T0 - Ta) * Δt / (T0 - T1)
    #[default]
    Linear,
    //Δt / ln((T0 - Ta) / (T1 - Ta))
    Logarithmic,
}

#[derive(Debug, Clone, PartialEq, Serialize, derive_more::Display, derive_more::Error)]
#[display("{kind} at {timestamp}: {reason}")]
pub struct DataQualityIssue {
    pub timestamp: DateTime,
    pub kind: TransitionKind,
    pub reason: String,
}

impl DataQualityIssue {
    fn new(event: &SwitchEvent, reason: impl Into<String>) -> Self {
        Self {
            timestamp: event.timestamp,
            kind: event.kind(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
}

impl Summary {
    fn of(values: &[f64]) -> Option<Self> {
        Some(Self {
            mean: math::mean(values)?,
            std_dev: math::std_dev(values)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Extremum {
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq)]
struct Transient {
    start: DataPoint<DegreeCelsius>,
    end: DataPoint<DegreeCelsius>,
    ambient: DegreeCelsius,
}

impl Transient {
    fn hours(&self) -> f64 {
        self.end.timestamp.elapsed_since(self.start.timestamp).as_hours_f64()
    }
}

pub struct TransientEstimator<'a> {
    interior: &'a DataFrame<DegreeCelsius>,
    exterior: &'a DataFrame<DegreeCelsius>,
    config: &'a EstimationConfig,
    home: &'a HomeConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransientEstimate {
    pub tau: TauEstimate,
    pub capacitance: CapacitanceEstimate,
}

impl TransientEstimate {
    pub fn parameters(&self) -> Option<ThermalParameters> {
        Some(ThermalParameters {
            tau_hours: self.tau.summary?.mean,
            capacitance: self.capacitance.summary?.mean,
        })
    }

    pub fn issues(&self) -> impl Iterator<Item = &DataQualityIssue> {
        self.tau.issues.iter().chain(self.capacitance.issues.iter())
    }
}

impl<'a> TransientEstimator<'a> {
    pub fn new(
        interior: &'a DataFrame<DegreeCelsius>,
        exterior: &'a DataFrame<DegreeCelsius>,
        config: &'a EstimationConfig,
        home: &'a HomeConfig,
    ) -> Self {
        Self {
            interior,
            exterior,
            config,
            home,
        }
    }

    //capacitance depends on tau, so both run in sequence on the same event source
    pub fn estimate(&self, source: &impl SwitchEventSource) -> TransientEstimate {
        let tau = self.tau(source);
        let capacitance = match tau.summary {
            Some(summary) => self.capacitance(source, summary.mean),
            None => {
                tracing::warn!("No valid tau, skipping capacitance estimation");
                CapacitanceEstimate::default()
            }
        };

        TransientEstimate { tau, capacitance }
    }

    //segment [event, event + window], second reading `offset` after the extremum
    fn transient(
        &self,
        event: &SwitchEvent,
        window: Duration,
        offset: Duration,
        extremum: Extremum,
    ) -> Result<Transient, DataQualityIssue> {
        let segment_end = event.timestamp + window;
        let segment = DateTimeRange::new(event.timestamp, segment_end);

        let start = match extremum {
            Extremum::Max => self.interior.max_in(&segment),
            Extremum::Min => self.interior.min_in(&segment),
        };
        let start = start
            .ok_or_else(|| DataQualityIssue::new(event, "no interior temperature within the transient window"))?
            .clone();

        //a late extremum leaves no room for the second reading inside the segment
        let earliest_end = start.timestamp + offset;
        if earliest_end > segment_end {
            return Err(DataQualityIssue::new(
                event,
                format!(
                    "extremum at {} is less than {} before the end of the transient window",
                    start.timestamp, offset
                ),
            ));
        }

        let end = self
            .interior
            .in_range(&DateTimeRange::new(earliest_end, segment_end))
            .next()
            .ok_or_else(|| {
                DataQualityIssue::new(
                    event,
                    format!("no interior temperature {} after the extremum at {}", offset, start.timestamp),
                )
            })?
            .clone();

        let margin = self.config.windows.ambient_margin;
        let ambient_range = DateTimeRange::new(start.timestamp - margin, end.timestamp + margin);
        let ambient = self
            .exterior
            .mean_in(&ambient_range)
            .ok_or_else(|| DataQualityIssue::new(event, "no exterior temperature around the transient"))?;

        Ok(Transient {
            start,
            end,
            ambient: adjusted_ambient(DegreeCelsius(ambient), self.home.consider_neighbors),
        })
    }
}

//shared bookkeeping of per-event results
fn collect<T>(
    events: &[SwitchEvent],
    compute: impl Fn(&SwitchEvent) -> Result<T, DataQualityIssue>,
) -> (Vec<T>, Vec<DataQualityIssue>) {
    let mut values = vec![];
    let mut issues = vec![];

    for event in events {
        match compute(event) {
            Ok(value) => values.push(value),
            Err(issue) => {
                tracing::warn!("Degenerate transient, {}", issue);
                issues.push(issue);
            }
        }
    }

    (values, issues)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::unit::SwitchState;
    use crate::events::{CuratedEvents, DetectedEvents, tests::switch_frame};

    //two winter days, heater on 06-08 and 18-22, exterior constant
    pub fn events() -> DetectedEvents {
        DetectedEvents::new(
            SwitchEvent::from_frame(&switch_frame(&[
                ("2025-01-05T06:00:00Z", SwitchState::On),
                ("2025-01-05T08:00:00Z", SwitchState::Off),
                ("2025-01-05T18:00:00Z", SwitchState::On),
                ("2025-01-05T22:00:00Z", SwitchState::Off),
                ("2025-01-06T06:00:00Z", SwitchState::On),
                ("2025-01-06T08:00:00Z", SwitchState::Off),
                ("2025-01-06T18:00:00Z", SwitchState::On),
                ("2025-01-06T22:00:00Z", SwitchState::Off),
                ("2025-01-07T06:00:00Z", SwitchState::On),
            ])),
            QualificationCriteria::default(),
        )
    }

    pub fn constant(value: f64) -> DataFrame<DegreeCelsius> {
        let start = DateTime::from_iso("2025-01-04T00:00:00Z").unwrap();
        DataFrame::new((0..4 * 24).map(|h| DataPoint::new(DegreeCelsius(value), start + Duration::hours(h)))).unwrap()
    }

    //exponential cooling after each switch-off, heating after each switch-on
    pub fn ideal_room(ambient: f64, tau_hours: f64, capacitance: f64, heater_power: f64) -> DataFrame<DegreeCelsius> {
        let heated_limit = ambient + tau_hours * heater_power / capacitance;
        let start = DateTime::from_iso("2025-01-05T00:00:00Z").unwrap();
        let mut temperature = 17.0;
        let mut points = vec![];

        for i in 0..2 * 288 {
            let timestamp = start + Duration::minutes(5 * i);
            points.push(DataPoint::new(DegreeCelsius(temperature), timestamp));

            let hour = timestamp.hour_of_day();
            let heating = (6.0..8.0).contains(&hour) || (18.0..22.0).contains(&hour);
            let limit = if heating { heated_limit } else { ambient };
            temperature = limit + (temperature - limit) * (-5.0 / 60.0 / tau_hours).exp();
        }

        DataFrame::new(points).unwrap()
    }

    #[test]
    fn test_sequential_estimate() {
        let interior = ideal_room(12.0, 10.0, 800.0, 2500.0);
        let exterior = constant(12.0);
        let config = EstimationConfig {
            tau_formula: TauFormula::Logarithmic,
            ..EstimationConfig::default()
        };
        let home = HomeConfig::default();

        let estimate = TransientEstimator::new(&interior, &exterior, &config, &home).estimate(&events());
        let parameters = estimate.parameters().unwrap();

        assert!((parameters.tau_hours - 10.0).abs() < 1e-6);
        assert!((parameters.capacitance - 800.0).abs() / 800.0 < 0.05);
        assert_eq!(estimate.issues().count(), 0);
    }

    #[test]
    fn test_curated_source_gives_same_result() {
        let interior = ideal_room(12.0, 10.0, 800.0, 2500.0);
        let exterior = constant(12.0);
        let config = EstimationConfig::default();
        let home = HomeConfig::default();
        let estimator = TransientEstimator::new(&interior, &exterior, &config, &home);

        let detected = events();
        let curated = CuratedEvents::from_review(&detected, &Default::default());

        assert_eq!(
            estimator.estimate(&detected).parameters(),
            estimator.estimate(&curated).parameters()
        );
    }

    #[test]
    fn test_no_events_yields_no_parameters() {
        let interior = ideal_room(12.0, 10.0, 800.0, 2500.0);
        let exterior = constant(12.0);
        let config = EstimationConfig::default();
        let home = HomeConfig::default();

        let estimate = TransientEstimator::new(&interior, &exterior, &config, &home).estimate(&CuratedEvents::default());

        assert_eq!(estimate.parameters(), None);
        assert_eq!(estimate.tau.total_periods, 0);
    }

    #[test]
    fn test_late_maximum_is_reported() {
        let start = DateTime::from_iso("2025-01-05T08:00:00Z").unwrap();
        let readings = [18.0, 18.5, 19.0, 19.4, 19.7, 19.9, 20.0, 20.1, 20.2, 20.3, 20.4, 19.0, 18.8];
        let interior = DataFrame::new(
            readings
                .iter()
                .enumerate()
                .map(|(i, t)| DataPoint::new(DegreeCelsius(*t), start + Duration::minutes(30 * i as i64))),
        )
        .unwrap();
        let exterior = constant(12.0);
        let config = EstimationConfig::default();
        let home = HomeConfig::default();
        let estimator = TransientEstimator::new(&interior, &exterior, &config, &home);
        let detected = events();

        let transient = estimator.transient(&detected.all()[1], t!(5 hours), t!(1 hours), Extremum::Max);

        let issue = transient.unwrap_err();
        assert_eq!(issue.timestamp, start);
        assert!(issue.reason.contains("before the end of the transient window"));
    }

    #[test]
    fn test_second_reading_respects_offset() {
        let interior = ideal_room(12.0, 10.0, 800.0, 2500.0);
        let exterior = constant(12.0);
        let config = EstimationConfig::default();
        let home = HomeConfig::default();
        let estimator = TransientEstimator::new(&interior, &exterior, &config, &home);
        let detected = events();

        let transient = estimator
            .transient(&detected.all()[1], t!(5 hours), t!(1 hours), Extremum::Max)
            .unwrap();

        assert!(transient.end.timestamp.elapsed_since(transient.start.timestamp) >= t!(1 hours));
        assert!((transient.hours() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_issue_display() {
        let detected = events();
        let event = &detected.all()[1];

        let issue = DataQualityIssue::new(event, "tau is not positive");

        assert_eq!(issue.to_string(), "switch-off at 2025-01-05 08:00:00 +00:00: tau is not positive");
    }
}
