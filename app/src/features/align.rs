use anyhow::ensure;

use crate::core::{
    time::{DateTimeRange, Duration},
    timeseries::{Interpolator, LastSeenInterpolator, LinearInterpolator},
};

use super::{FeatureRow, FeaturesTable, RawSignals};

pub fn align(signals: &RawSignals, interval: Duration) -> anyhow::Result<FeaturesTable> {
    ensure!(interval > Duration::zero(), "Resampling interval must be positive, got {}", interval);

    let start = [
        signals.interior.first().timestamp,
        signals.exterior.first().timestamp,
        signals.switch.first().timestamp,
        signals.radiation.first().timestamp,
    ]
    .into_iter()
    .min()
    .unwrap_or(signals.interior.first().timestamp);

    let end = [
        signals.interior.last().timestamp,
        signals.exterior.last().timestamp,
        signals.switch.last().timestamp,
        signals.radiation.last().timestamp,
    ]
    .into_iter()
    .max()
    .unwrap_or(signals.interior.last().timestamp);

    let grid_start = start.floor_to(&interval);
    let grid_end = end.floor_to(&interval);

    let mut rows = vec![];
    let mut dropped = 0;

    let mut at = grid_start;
    while at <= grid_end {
        let interior = LinearInterpolator.interpolate_df(at, &signals.interior)?;
        let exterior = LinearInterpolator.interpolate_df(at, &signals.exterior)?;
        let switch = LastSeenInterpolator.interpolate_df(at, &signals.switch)?;
        let radiation = LastSeenInterpolator.interpolate_df(at, &signals.radiation)?;

        match (exterior, interior, switch, radiation) {
            (Some(exterior), Some(interior), Some(switch), Some(radiation)) => {
                rows.push(FeatureRow::new(at, exterior, interior, switch, radiation))
            }
            _ => dropped += 1,
        }

        at = at + interval;
    }

    ensure!(
        !rows.is_empty(),
        "No grid point in {} carries all signals",
        DateTimeRange::new(grid_start, grid_end)
    );

    tracing::debug!(rows = rows.len(), dropped, "Aligned features on {} grid", interval);

    FeaturesTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        time::DateTime,
        timeseries::{DataFrame, DataPoint},
        unit::{DegreeCelsius, SwitchState, WattPerSquareMeter},
    };
    use crate::t;

    #[test]
    fn test_align_on_five_minute_grid() {
        let table = align(&signals(), t!(5 minutes)).unwrap();

        let first = &table.rows()[0];
        assert_eq!(first.timestamp, at("10:00"));
        assert_eq!(first.interior_temperature, DegreeCelsius(20.0));
        assert_eq!(first.switch_state, SwitchState::Off);

        //10:00 -> 10:30 rises by 3 degrees, so 10:05 is half a degree higher
        assert_eq!(table.rows()[1].interior_temperature, DegreeCelsius(20.5));
    }

    #[test]
    fn test_forward_fills_step_signals() {
        let table = align(&signals(), t!(5 minutes)).unwrap();

        let at_1015 = table.rows().iter().find(|r| r.timestamp == at("10:15")).unwrap();
        assert_eq!(at_1015.switch_state, SwitchState::On);
        assert_eq!(at_1015.direct_radiation, WattPerSquareMeter(100.0));

        let at_1025 = table.rows().iter().find(|r| r.timestamp == at("10:25")).unwrap();
        assert_eq!(at_1025.switch_state, SwitchState::On);
    }

    #[test]
    fn test_drops_rows_before_all_signals_start() {
        let mut signals = signals();
        signals.exterior = DataFrame::new(vec![
            DataPoint::new(DegreeCelsius(4.0), at("10:10")),
            DataPoint::new(DegreeCelsius(6.0), at("10:30")),
        ])
        .unwrap();

        let table = align(&signals, t!(5 minutes)).unwrap();

        assert_eq!(table.rows()[0].timestamp, at("10:10"));
    }

    #[test]
    fn test_holds_last_value_after_final_sample() {
        let mut signals = signals();
        signals.switch = DataFrame::new(vec![
            DataPoint::new(SwitchState::Off, at("10:00")),
            DataPoint::new(SwitchState::On, at("10:45")),
        ])
        .unwrap();

        let table = align(&signals, t!(5 minutes)).unwrap();
        let last = table.rows().last().unwrap();

        assert_eq!(last.timestamp, at("10:45"));
        assert_eq!(last.interior_temperature, DegreeCelsius(23.0));
        assert_eq!(last.switch_state, SwitchState::On);
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(align(&signals(), Duration::zero()).is_err());
    }

    fn at(time: &str) -> DateTime {
        DateTime::from_iso(&format!("2025-01-05T{time}:00Z")).unwrap()
    }

    fn signals() -> RawSignals {
        RawSignals {
            interior: DataFrame::new(vec![
                DataPoint::new(DegreeCelsius(20.0), at("10:00")),
                DataPoint::new(DegreeCelsius(23.0), at("10:30")),
            ])
            .unwrap(),
            exterior: DataFrame::new(vec![
                DataPoint::new(DegreeCelsius(4.0), at("10:00")),
                DataPoint::new(DegreeCelsius(6.0), at("10:30")),
            ])
            .unwrap(),
            switch: DataFrame::new(vec![
                DataPoint::new(SwitchState::Off, at("10:00")),
                DataPoint::new(SwitchState::On, at("10:12")),
            ])
            .unwrap(),
            radiation: DataFrame::new(vec![
                DataPoint::new(WattPerSquareMeter(0.0), at("10:00")),
                DataPoint::new(WattPerSquareMeter(100.0), at("10:15")),
            ])
            .unwrap(),
        }
    }
}
