use std::{
    fmt::Display,
    ops::{Add, Sub},
};

use anyhow::Context;
use chrono::Timelike;

use super::Duration;

const NAIVE_WITH_OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DateTime {
    delegate: chrono::DateTime<chrono::FixedOffset>,
}

impl DateTime {
    fn new(delegate: chrono::DateTime<chrono::FixedOffset>) -> Self {
        Self { delegate }
    }

    pub fn now() -> Self {
        chrono::Utc::now().into()
    }

    pub fn from_iso(iso8601: &str) -> anyhow::Result<Self> {
        Ok(chrono::DateTime::parse_from_rfc3339(iso8601)?.into())
    }

    //accepts RFC 3339 as well as the space-separated variant written by spreadsheet tools
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        let value = value.trim();

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
            return Ok(dt.into());
        }

        NAIVE_WITH_OFFSET_FORMATS
            .iter()
            .find_map(|format| chrono::DateTime::parse_from_str(value, format).ok())
            .map(Into::into)
            .with_context(|| format!("Error parsing date-time {value}"))
    }

    //calendar day in the offset the timestamp was recorded in
    pub fn date(&self) -> chrono::NaiveDate {
        self.delegate.date_naive()
    }

    pub fn hour_of_day(&self) -> f64 {
        let time = self.delegate.time();
        time.num_seconds_from_midnight() as f64 / 3600.0 + time.nanosecond() as f64 / 3_600_000_000_000.0
    }

    pub fn start_of_day(&self) -> Self {
        let midnight = self.date().and_time(chrono::NaiveTime::MIN);
        //fixed offsets have no gaps, so midnight always exists
        Self::new(
            midnight
                .and_local_timezone(*self.delegate.offset())
                .single()
                .unwrap_or(self.delegate),
        )
    }

    pub fn floor_to(&self, interval: &Duration) -> Self {
        let step = interval.as_millis();
        if step <= 0 {
            return *self;
        }

        let millis = self.delegate.timestamp_millis();
        let floored = millis - millis.rem_euclid(step);

        *self - Duration::millis(millis - floored)
    }

    pub fn elapsed_since(&self, since: Self) -> Duration {
        Duration::new(self.delegate - since.delegate)
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.delegate)
    }
}

impl Add<Duration> for DateTime {
    type Output = DateTime;

    fn add(self, rhs: Duration) -> Self::Output {
        Self::new(self.delegate + rhs.delegate)
    }
}

impl Sub<Duration> for DateTime {
    type Output = DateTime;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self::new(self.delegate - rhs.delegate)
    }
}

impl From<DateTime> for f64 {
    fn from(val: DateTime) -> Self {
        (val.delegate.timestamp_millis() as f64) / 1000.0
    }
}

impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for DateTime {
    fn from(val: chrono::DateTime<T>) -> Self {
        DateTime::new(val.fixed_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::t;

    #[test]
    fn test_parse_rfc3339() {
        let dt = DateTime::parse("2025-01-05T21:05:00.584641+00:00").unwrap();

        assert_eq!(dt, DateTime::from_iso("2025-01-05T21:05:00.584641Z").unwrap());
    }

    #[test]
    fn test_parse_space_separated() {
        let dt = DateTime::parse("2025-01-05 21:00:00+00:00").unwrap();

        assert_eq!(dt, DateTime::from_iso("2025-01-05T21:00:00Z").unwrap());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(DateTime::parse("unavailable").is_err());
    }

    #[test]
    fn test_date_uses_recorded_offset() {
        let dt = DateTime::from_iso("2025-01-05T23:30:00-02:00").unwrap();

        assert_eq!(dt.date(), chrono::NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    }

    #[test]
    fn test_hour_of_day() {
        let dt = DateTime::from_iso("2025-01-05T17:45:00+01:00").unwrap();

        assert_eq!(dt.hour_of_day(), 17.75);
    }

    #[test]
    fn test_start_of_day() {
        let dt = DateTime::from_iso("2025-01-05T17:45:00+01:00").unwrap();

        assert_eq!(dt.start_of_day(), DateTime::from_iso("2025-01-05T00:00:00+01:00").unwrap());
    }

    #[test]
    fn test_floor_to() {
        let dt = DateTime::from_iso("2025-01-05T17:47:12Z").unwrap();

        assert_eq!(dt.floor_to(&t!(5 minutes)), DateTime::from_iso("2025-01-05T17:45:00Z").unwrap());
    }
}
