use chrono::NaiveDate;
use serde::Deserialize;

use crate::core::unit::SwitchState;
use crate::events::SwitchEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Cooling,
    Heating,
    Thermostat,
}

//control applied for hours in [start, end)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleRule {
    pub start: f64,
    pub end: f64,
    pub control: Control,
}

impl ScheduleRule {
    pub fn new(start: f64, end: f64, control: Control) -> Self {
        Self { start, end, control }
    }

    fn covers(&self, hour: f64) -> bool {
        hour >= self.start && hour < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, derive_more::Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioPolicy {
    #[display("always_thermostat")]
    AlwaysThermostat,
    #[display("morning_evening")]
    MorningEvening,
    #[display("custom")]
    Custom { rules: Vec<ScheduleRule> },
    #[display("replay")]
    #[serde(skip_deserializing)]
    Replay {
        events: Vec<SwitchEvent>,
        initial_state: SwitchState,
    },
}

impl ScenarioPolicy {
    //initial state comes from the last event of an earlier day
    pub fn replay_day(events: &[SwitchEvent], day: NaiveDate) -> Self {
        let initial_state = events
            .iter()
            .rfind(|e| e.timestamp.date() < day)
            .map(|e| e.new_state)
            .unwrap_or(SwitchState::Off);

        ScenarioPolicy::Replay {
            events: events.iter().filter(|e| e.timestamp.date() == day).cloned().collect(),
            initial_state,
        }
    }

    pub(super) fn control_at(&self, hour: f64) -> Control {
        match self {
            ScenarioPolicy::AlwaysThermostat => Control::Thermostat,
            ScenarioPolicy::MorningEvening => {
                if (7.0..9.0).contains(&hour) || (17.0..24.0).contains(&hour) {
                    Control::Thermostat
                } else {
                    Control::Cooling
                }
            }
            ScenarioPolicy::Custom { rules } => rules
                .iter()
                .find(|rule| rule.covers(hour))
                .map(|rule| rule.control)
                .unwrap_or(Control::Cooling),
            ScenarioPolicy::Replay { events, initial_state } => {
                let state = events
                    .iter()
                    .take_while(|e| e.timestamp.hour_of_day() <= hour)
                    .last()
                    .map(|e| e.new_state)
                    .unwrap_or(*initial_state);

                if state.is_on() { Control::Heating } else { Control::Cooling }
            }
        }
    }

    pub(super) fn initial_heating(&self) -> Option<bool> {
        match self {
            ScenarioPolicy::Replay { initial_state, .. } => Some(initial_state.is_on()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::tests::switch_frame;

    #[test]
    fn test_morning_evening_windows() {
        let policy = ScenarioPolicy::MorningEvening;

        assert_eq!(policy.control_at(6.75), Control::Cooling);
        assert_eq!(policy.control_at(7.0), Control::Thermostat);
        assert_eq!(policy.control_at(9.0), Control::Cooling);
        assert_eq!(policy.control_at(23.75), Control::Thermostat);
    }

    #[test]
    fn test_custom_rules_first_match_wins() {
        let policy = ScenarioPolicy::Custom {
            rules: vec![
                ScheduleRule::new(6.0, 8.0, Control::Heating),
                ScheduleRule::new(6.0, 22.0, Control::Thermostat),
            ],
        };

        assert_eq!(policy.control_at(5.0), Control::Cooling);
        assert_eq!(policy.control_at(7.0), Control::Heating);
        assert_eq!(policy.control_at(8.0), Control::Thermostat);
        assert_eq!(policy.control_at(22.0), Control::Cooling);
    }

    #[test]
    fn test_replay_day_takes_state_from_previous_day() {
        let events = SwitchEvent::from_frame(&switch_frame(&[
            ("2025-01-04T22:00:00Z", SwitchState::On),
            ("2025-01-05T06:00:00Z", SwitchState::Off),
            ("2025-01-05T18:00:00Z", SwitchState::On),
            ("2025-01-06T01:00:00Z", SwitchState::Off),
        ]));

        let policy = ScenarioPolicy::replay_day(&events, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());

        assert_eq!(policy.initial_heating(), Some(true));
        assert_eq!(policy.control_at(5.75), Control::Heating);
        assert_eq!(policy.control_at(6.0), Control::Cooling);
        assert_eq!(policy.control_at(17.75), Control::Cooling);
        assert_eq!(policy.control_at(18.0), Control::Heating);
        assert_eq!(policy.control_at(23.75), Control::Heating);
    }

    #[test]
    fn test_deserialize_custom() {
        let policy: ScenarioPolicy = serde_json::from_str(
            r#"{"kind": "custom", "rules": [{"start": 6.0, "end": 9.0, "control": "thermostat"}]}"#,
        )
        .unwrap();

        assert_eq!(
            policy,
            ScenarioPolicy::Custom {
                rules: vec![ScheduleRule::new(6.0, 9.0, Control::Thermostat)]
            }
        );
    }
}
