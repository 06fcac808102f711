use chrono::NaiveDate;
use serde::Serialize;

use crate::core::{math, unit::{DegreeCelsius, Watt}};
use crate::events::ConsumptionRecord;
use crate::features::FeatureRow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracePoint {
    pub time_hours: f64,
    pub temperature: DegreeCelsius,
    //mode used on the step that ended at this point
    pub is_heating: bool,
}

//first point is the initial state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimulationTrace {
    points: Vec<TracePoint>,
}

impl SimulationTrace {
    pub(super) fn new(points: Vec<TracePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn uptime_hours(&self) -> f64 {
        self.points
            .windows(2)
            .filter(|pair| pair[1].is_heating)
            .map(|pair| pair[1].time_hours - pair[0].time_hours)
            .sum()
    }

    pub fn consumption(&self, day: NaiveDate, heater_power: Watt) -> ConsumptionRecord {
        ConsumptionRecord::new(day, self.uptime_hours(), heater_power)
    }

    //linear between neighbouring points
    pub fn temperature_at(&self, hour: f64) -> Option<DegreeCelsius> {
        self.points.windows(2).find_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            if hour < a.time_hours || hour > b.time_hours {
                return None;
            }

            let share = (hour - a.time_hours) / (b.time_hours - a.time_hours);
            Some(a.temperature + (b.temperature - a.temperature) * share)
        })
    }

    pub fn rmse_against(&self, observed: &[FeatureRow]) -> Option<f64> {
        let (simulated, measured): (Vec<f64>, Vec<f64>) = observed
            .iter()
            .filter_map(|row| {
                self.temperature_at(row.timestamp.hour_of_day())
                    .map(|t| (t.0, row.interior_temperature.0))
            })
            .unzip();

        math::rmse(&simulated, &measured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::row;

    fn point(time_hours: f64, temperature: f64, is_heating: bool) -> TracePoint {
        TracePoint {
            time_hours,
            temperature: DegreeCelsius(temperature),
            is_heating,
        }
    }

    fn trace() -> SimulationTrace {
        SimulationTrace::new(vec![
            point(0.0, 18.0, true),
            point(0.5, 19.0, true),
            point(1.0, 20.0, false),
            point(1.25, 19.5, true),
        ])
    }

    #[test]
    fn test_initial_point_is_not_counted() {
        assert_eq!(trace().uptime_hours(), 0.75);
    }

    #[test]
    fn test_consumption() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

        let record = trace().consumption(day, Watt(2000.0));

        assert_eq!(record.uptime_hours, 0.75);
        assert_eq!(record.energy.0, 1.5);
    }

    #[test]
    fn test_more_heating_never_lowers_energy() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let mut points = trace().points().to_vec();
        let mut previous = trace().consumption(day, Watt(2000.0)).energy.0;

        for i in 1..points.len() {
            points[i].is_heating = true;
            let energy = SimulationTrace::new(points.clone()).consumption(day, Watt(2000.0)).energy.0;
            assert!(energy >= previous);
            previous = energy;
        }
    }

    #[test]
    fn test_temperature_at() {
        let trace = trace();

        assert_eq!(trace.temperature_at(0.25), Some(DegreeCelsius(18.5)));
        assert_eq!(trace.temperature_at(1.0), Some(DegreeCelsius(20.0)));
        assert_eq!(trace.temperature_at(2.0), None);
    }

    #[test]
    fn test_rmse_against_observed() {
        let observed = vec![
            row("2025-01-05T00:00:00Z", 5.0, 18.0, false, 0.0),
            row("2025-01-05T00:30:00Z", 5.0, 20.0, false, 0.0),
            row("2025-01-05T05:00:00Z", 5.0, 30.0, false, 0.0),
        ];

        //the last row lies outside the trace
        assert_eq!(trace().rmse_against(&observed), Some((0.5_f64).sqrt()));
    }
}
