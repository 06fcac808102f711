use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::{math, timeseries::DataFrame, unit::DegreeCelsius};
use crate::events::ConsumptionRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub day: NaiveDate,
    pub t_min: DegreeCelsius,
    pub t_max: DegreeCelsius,
    pub t_mean: DegreeCelsius,
    pub uptime_hours: f64,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UptimeCorrelation {
    pub t_min: Option<f64>,
    pub t_max: Option<f64>,
    pub t_mean: Option<f64>,
}

//only days present in both inputs are kept
pub fn daily_summary(exterior: &DataFrame<DegreeCelsius>, consumption: &[ConsumptionRecord]) -> Vec<DailySummary> {
    let mut per_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for dp in exterior.iter() {
        per_day.entry(dp.timestamp.date()).or_default().push(dp.value.0);
    }

    consumption
        .iter()
        .filter_map(|record| {
            let temperatures = per_day.get(&record.day)?;

            Some(DailySummary {
                day: record.day,
                t_min: DegreeCelsius(temperatures.iter().copied().fold(f64::INFINITY, f64::min)),
                t_max: DegreeCelsius(temperatures.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
                t_mean: DegreeCelsius(math::mean(temperatures)?),
                uptime_hours: record.uptime_hours,
                energy_kwh: record.energy.0,
            })
        })
        .collect()
}

pub fn uptime_correlation(summaries: &[DailySummary]) -> UptimeCorrelation {
    let uptime: Vec<f64> = summaries.iter().map(|s| s.uptime_hours).collect();
    let column = |f: fn(&DailySummary) -> f64| -> Vec<f64> { summaries.iter().map(f).collect() };

    UptimeCorrelation {
        t_min: math::pearson(&column(|s| s.t_min.0), &uptime),
        t_max: math::pearson(&column(|s| s.t_max.0), &uptime),
        t_mean: math::pearson(&column(|s| s.t_mean.0), &uptime),
    }
}
