use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::unit::{KiloWattHours, SwitchState, Watt};

use super::SwitchEvent;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionRecord {
    pub day: NaiveDate,
    pub uptime_hours: f64,
    pub energy: KiloWattHours,
}

impl ConsumptionRecord {
    pub fn new(day: NaiveDate, uptime_hours: f64, heater_power: Watt) -> Self {
        Self {
            day,
            uptime_hours,
            energy: heater_power * uptime_hours,
        }
    }
}

//on-periods count towards the day they started
pub fn daily_consumption(events: &[SwitchEvent], heater_power: Watt) -> Vec<ConsumptionRecord> {
    let mut uptime_per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for event in events.iter().filter(|e| e.new_state == SwitchState::On) {
        let uptime = event
            .time_until_next_transition
            .map(|d| d.as_hours_f64())
            .unwrap_or(0.0);

        *uptime_per_day.entry(event.timestamp.date()).or_default() += uptime;
    }

    uptime_per_day
        .into_iter()
        .map(|(day, uptime)| ConsumptionRecord::new(day, uptime, heater_power))
        .collect()
}
