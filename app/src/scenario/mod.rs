mod policy;
mod trace;

use anyhow::ensure;
use serde::Deserialize;

pub use policy::{Control, ScenarioPolicy, ScheduleRule};
pub use trace::{SimulationTrace, TracePoint};

use crate::core::unit::DegreeCelsius;
use crate::model::{HomeConfig, ThermalParameters, adjusted_ambient};

const DAY_HOURS: f64 = 24.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    //step in hours
    pub granularity: f64,
    pub hysteresis: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            granularity: 0.25,
            hysteresis: 0.4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSetup {
    pub initial_temperature: DegreeCelsius,
    pub exterior: DegreeCelsius,
    pub target: DegreeCelsius,
    pub thermal: ThermalParameters,
    #[serde(default)]
    pub initial_heating: bool,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum InvalidScenario {
    #[display("target {target} is not below the heating limit {limit}")]
    TargetAboveLimit { target: DegreeCelsius, limit: DegreeCelsius },
    #[display("a gap of {gap} to target {target} starts above the heating limit {limit}")]
    StartAboveLimit {
        gap: DegreeCelsius,
        target: DegreeCelsius,
        limit: DegreeCelsius,
    },
}

pub struct ScenarioEngine {
    config: ScenarioConfig,
    home: HomeConfig,
}

impl ScenarioEngine {
    pub fn new(config: ScenarioConfig, home: HomeConfig) -> Self {
        Self { config, home }
    }

    pub fn simulate(&self, setup: &ScenarioSetup, policy: &ScenarioPolicy) -> anyhow::Result<SimulationTrace> {
        let granularity = self.config.granularity;
        ensure!(
            granularity.is_finite() && granularity > 0.0,
            "Simulation granularity must be positive, got {granularity} h"
        );
        ensure!(
            setup.thermal.tau_hours > 0.0 && setup.thermal.capacitance > 0.0,
            "Thermal parameters must be positive, got tau {} h and C {} Wh/K",
            setup.thermal.tau_hours,
            setup.thermal.capacitance
        );

        let ambient = self.ambient(setup);
        let heating_limit = self.heating_limit(setup);
        let target = setup.target.0;
        let hysteresis = self.config.hysteresis;

        let mut heating = policy.initial_heating().unwrap_or(setup.initial_heating);
        let mut temperature = setup.initial_temperature.0;
        let mut time = 0.0;
        let mut points = vec![TracePoint {
            time_hours: time,
            temperature: setup.initial_temperature,
            is_heating: heating,
        }];

        let steps = (DAY_HOURS / granularity - 1e-9).ceil() as usize;
        for k in 1..=steps {
            heating = match policy.control_at(time) {
                Control::Cooling => false,
                Control::Heating => true,
                Control::Thermostat if temperature < target - hysteresis => true,
                Control::Thermostat if temperature >= target + hysteresis => false,
                Control::Thermostat => heating,
            };

            let next_time = (k as f64 * granularity).min(DAY_HOURS);
            let limit = if heating { heating_limit.0 } else { ambient.0 };
            temperature = limit + (temperature - limit) * (-(next_time - time) / setup.thermal.tau_hours).exp();
            time = next_time;

            points.push(TracePoint {
                time_hours: time,
                temperature: DegreeCelsius(temperature),
                is_heating: heating,
            });
        }

        let trace = SimulationTrace::new(points);
        tracing::info!(
            "Simulated {} with {} points, {:.2} h of heating",
            policy,
            trace.len(),
            trace.uptime_hours()
        );

        Ok(trace)
    }

    /// Minutes of continuous heating needed to close `gap` below the target.
    pub fn time_to_target(&self, setup: &ScenarioSetup, gap: DegreeCelsius) -> Result<f64, InvalidScenario> {
        let limit = self.heating_limit(setup);
        let target = setup.target;

        if target >= limit {
            return Err(InvalidScenario::TargetAboveLimit { target, limit });
        }

        let ratio = (target - limit) / (target - gap - limit);
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(InvalidScenario::StartAboveLimit { gap, target, limit });
        }

        let hours = -setup.thermal.tau_hours * ratio.ln();
        Ok((hours * 60.0).max(0.0))
    }

    fn ambient(&self, setup: &ScenarioSetup) -> DegreeCelsius {
        adjusted_ambient(setup.exterior, self.home.consider_neighbors)
    }

    fn heating_limit(&self, setup: &ScenarioSetup) -> DegreeCelsius {
        let thermal = &setup.thermal;
        self.ambient(setup) + DegreeCelsius(thermal.tau_hours * self.home.heater_power.0 / thermal.capacitance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::{SwitchState, Watt};
    use crate::events::{SwitchEvent, tests::switch_frame};

    fn setup() -> ScenarioSetup {
        ScenarioSetup {
            initial_temperature: DegreeCelsius(20.0),
            exterior: DegreeCelsius(5.0),
            target: DegreeCelsius(20.0),
            thermal: ThermalParameters {
                tau_hours: 10.0,
                capacitance: 800.0,
            },
            initial_heating: false,
        }
    }

    fn engine() -> ScenarioEngine {
        ScenarioEngine::new(ScenarioConfig::default(), HomeConfig::default())
    }

    #[test]
    fn test_morning_evening_day() {
        let trace = engine().simulate(&setup(), &ScenarioPolicy::MorningEvening).unwrap();
        let points = trace.points();

        assert_eq!(points.len(), 97);
        assert_eq!(points[0].time_hours, 0.0);
        assert_eq!(points[96].time_hours, 24.0);

        for point in points {
            let in_window = (point.time_hours > 7.0 && point.time_hours <= 9.0) || point.time_hours > 17.0;
            if !in_window {
                assert!(!point.is_heating, "heating at {} h", point.time_hours);
            }
        }

        assert!(points.iter().any(|p| p.is_heating));
        assert!(trace.uptime_hours() < 17.0);
    }

    #[test]
    fn test_hysteresis_prevents_chattering() {
        let setup = setup();
        let hysteresis = ScenarioConfig::default().hysteresis;

        let trace = engine().simulate(&setup, &ScenarioPolicy::AlwaysThermostat).unwrap();

        let mut switches = 0;
        for pair in trace.points().windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            if after.is_heating && !before.is_heating {
                assert!(before.temperature.0 < setup.target.0 - hysteresis);
                switches += 1;
            } else if !after.is_heating && before.is_heating {
                assert!(before.temperature.0 >= setup.target.0 + hysteresis);
                switches += 1;
            }
        }

        assert!(switches > 2);
        assert!(trace.points().iter().skip(1).all(|p| p.temperature.0 > 19.0 && p.temperature.0 < 21.5));
    }

    #[test]
    fn test_cooling_relaxes_towards_ambient() {
        let policy = ScenarioPolicy::Custom { rules: vec![] };

        let trace = engine().simulate(&setup(), &policy).unwrap();

        //adjusted ambient is 10 °C, 24 h is 2.4 time constants
        let expected = 10.0 + 10.0 * (-2.4_f64).exp();
        assert!((trace.points()[96].temperature.0 - expected).abs() < 1e-9);
        assert_eq!(trace.uptime_hours(), 0.0);
    }

    #[test]
    fn test_last_step_is_clipped() {
        let engine = ScenarioEngine::new(
            ScenarioConfig {
                granularity: 5.0,
                ..ScenarioConfig::default()
            },
            HomeConfig::default(),
        );

        let trace = engine.simulate(&setup(), &ScenarioPolicy::AlwaysThermostat).unwrap();

        let times: Vec<f64> = trace.points().iter().map(|p| p.time_hours).collect();
        assert_eq!(times, vec![0.0, 5.0, 10.0, 15.0, 20.0, 24.0]);
    }

    #[test]
    fn test_non_positive_granularity_is_rejected() {
        let engine = ScenarioEngine::new(
            ScenarioConfig {
                granularity: -0.25,
                ..ScenarioConfig::default()
            },
            HomeConfig::default(),
        );

        assert!(engine.simulate(&setup(), &ScenarioPolicy::MorningEvening).is_err());
    }

    #[test]
    fn test_replay_follows_switch_events() {
        let events = SwitchEvent::from_frame(&switch_frame(&[
            ("2025-01-05T06:00:00Z", SwitchState::On),
            ("2025-01-05T08:00:00Z", SwitchState::Off),
        ]));
        let policy = ScenarioPolicy::replay_day(&events, events[0].timestamp.date());

        let trace = engine().simulate(&setup(), &policy).unwrap();

        assert_eq!(trace.uptime_hours(), 2.0);
        let heating: Vec<f64> = trace
            .points()
            .iter()
            .filter(|p| p.is_heating)
            .map(|p| p.time_hours)
            .collect();
        assert_eq!(heating.first(), Some(&6.25));
        assert_eq!(heating.last(), Some(&8.0));
    }

    #[test]
    fn test_consumption_of_trace() {
        let trace = engine().simulate(&setup(), &ScenarioPolicy::MorningEvening).unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

        let record = trace.consumption(day, Watt(2500.0));

        assert!((record.energy.0 - trace.uptime_hours() * 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_time_to_target() {
        let engine = engine();
        let setup = setup();

        assert_eq!(engine.time_to_target(&setup, DegreeCelsius(0.0)), Ok(0.0));

        //limit is 41.25 °C, closing 1 K below 20 °C takes -tau * ln(21.25 / 22.25)
        let minutes = engine.time_to_target(&setup, DegreeCelsius(1.0)).unwrap();
        assert!((minutes - 600.0 * (22.25_f64 / 21.25).ln()).abs() < 1e-9);

        assert_eq!(engine.time_to_target(&setup, DegreeCelsius(-1.0)), Ok(0.0));
    }

    #[test]
    fn test_unreachable_target() {
        let mut setup = setup();
        setup.target = DegreeCelsius(45.0);

        let error = engine().time_to_target(&setup, DegreeCelsius(1.0)).unwrap_err();

        assert!(matches!(error, InvalidScenario::TargetAboveLimit { .. }));
        assert_eq!(error.to_string(), "target 45.00 °C is not below the heating limit 41.25 °C");
    }

    #[test]
    fn test_start_above_limit() {
        let error = engine().time_to_target(&setup(), DegreeCelsius(-30.0)).unwrap_err();

        assert!(matches!(error, InvalidScenario::StartAboveLimit { .. }));
    }
}
