mod align;
pub mod daily;

use anyhow::ensure;
use chrono::NaiveDate;
use serde::Serialize;

pub use align::align;

use crate::core::{
    time::{DateTime, DateTimeRange},
    timeseries::DataFrame,
    unit::{DegreeCelsius, SwitchState, WattPerSquareMeter},
};

//Raw signals as delivered by the ingestion side, one frame per sensor
#[derive(Debug, Clone)]
pub struct RawSignals {
    pub interior: DataFrame<DegreeCelsius>,
    pub exterior: DataFrame<DegreeCelsius>,
    pub switch: DataFrame<SwitchState>,
    pub radiation: DataFrame<WattPerSquareMeter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub timestamp: DateTime,
    pub day: NaiveDate,
    pub exterior_temperature: DegreeCelsius,
    pub interior_temperature: DegreeCelsius,
    pub switch_state: SwitchState,
    pub direct_radiation: WattPerSquareMeter,
}

impl FeatureRow {
    pub fn new(
        timestamp: DateTime,
        exterior_temperature: DegreeCelsius,
        interior_temperature: DegreeCelsius,
        switch_state: SwitchState,
        direct_radiation: WattPerSquareMeter,
    ) -> Self {
        Self {
            timestamp,
            day: timestamp.date(),
            exterior_temperature,
            interior_temperature,
            switch_state,
            direct_radiation,
        }
    }
}

//rows of one day are contiguous
#[derive(Debug, Clone, Default)]
pub struct FeaturesTable {
    rows: Vec<FeatureRow>,
}

impl FeaturesTable {
    pub fn new(rows: Vec<FeatureRow>) -> anyhow::Result<Self> {
        for (index, pair) in rows.windows(2).enumerate() {
            ensure!(
                pair[0].timestamp < pair[1].timestamp,
                "Feature rows must have strictly increasing timestamps, violated at row {} ({} >= {})",
                index + 1,
                pair[0].timestamp,
                pair[1].timestamp
            );
        }

        for row in rows.iter() {
            ensure!(
                row.day == row.timestamp.date(),
                "Feature row at {} is tagged with day {} instead of {}",
                row.timestamp,
                row.day,
                row.timestamp.date()
            );
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = &[FeatureRow]> {
        self.rows.chunk_by(|a, b| a.day == b.day)
    }

    pub fn day(&self, day: NaiveDate) -> Option<&[FeatureRow]> {
        self.days().find(|rows| rows[0].day == day)
    }

    pub fn range(&self) -> Option<DateTimeRange> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some(DateTimeRange::new(first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    pub fn restrict(&self, range: &DateTimeRange) -> FeaturesTable {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| range.contains(row.timestamp))
                .cloned()
                .collect(),
        }
    }
}
