use std::collections::BTreeMap;

use crate::core::time::{DateTime, DateTimeRange, Duration};
use anyhow::ensure;

use super::DataPoint;

#[derive(Debug, Clone)]
pub struct DataFrame<T> {
    data: BTreeMap<DateTime, DataPoint<T>>,
}

impl<T> DataFrame<T> {
    pub fn new(values: impl IntoIterator<Item = DataPoint<T>>) -> anyhow::Result<Self> {
        let mut data: BTreeMap<DateTime, DataPoint<T>> = BTreeMap::new();
        for dp in values {
            data.insert(dp.timestamp, dp);
        }

        ensure!(!data.is_empty(), "data frames must not be empty");

        Ok(Self { data })
    }

    pub fn in_range<'a>(&'a self, range: &DateTimeRange) -> impl Iterator<Item = &'a DataPoint<T>> + use<'a, T> {
        self.data.range(*range.start()..=*range.end()).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn range(&self) -> DateTimeRange {
        DateTimeRange::new(self.first().timestamp, self.last().timestamp)
    }

    pub fn first(&self) -> &DataPoint<T> {
        self.data
            .values()
            .next()
            .expect("Internal error: data frames are never empty")
    }

    pub fn last(&self) -> &DataPoint<T> {
        self.data
            .values()
            .next_back()
            .expect("Internal error: data frames are never empty")
    }

    pub fn prev_or_at(&self, at: DateTime) -> Option<&DataPoint<T>> {
        self.data.range(..=at).next_back().map(|(_, v)| v)
    }

    pub fn next(&self, at: DateTime) -> Option<&DataPoint<T>> {
        self.data.range(at..).next().map(|(_, v)| v)
    }

    //first occurrence wins on ties
    pub fn max_in(&self, range: &DateTimeRange) -> Option<&DataPoint<T>>
    where
        T: PartialOrd,
    {
        self.in_range(range).fold(None, |best: Option<&DataPoint<T>>, dp| match best {
            Some(b) if dp.value <= b.value => Some(b),
            _ => Some(dp),
        })
    }

    //first occurrence wins on ties
    pub fn min_in(&self, range: &DateTimeRange) -> Option<&DataPoint<T>>
    where
        T: PartialOrd,
    {
        self.in_range(range).fold(None, |best: Option<&DataPoint<T>>, dp| match best {
            Some(b) if dp.value >= b.value => Some(b),
            _ => Some(dp),
        })
    }

    //plain arithmetic mean of the samples, not weighted by duration
    pub fn mean_in(&self, range: &DateTimeRange) -> Option<f64>
    where
        for<'a> &'a T: Into<f64>,
    {
        let (sum, count) = self
            .in_range(range)
            .fold((0.0, 0usize), |(sum, count), dp| (sum + (&dp.value).into(), count + 1));

        if count == 0 { None } else { Some(sum / count as f64) }
    }

    pub fn with_duration_until_next_dp(&self) -> Vec<DataPoint<(T, Option<Duration>)>>
    where
        T: Clone,
    {
        self.current_and_next()
            .into_iter()
            .map(|(current, next)| {
                current.map_value(|value| (value.clone(), next.map(|n| n.timestamp.elapsed_since(current.timestamp))))
            })
            .collect::<Vec<_>>()
    }

    pub fn current_and_next(&self) -> Vec<(&DataPoint<T>, Option<&DataPoint<T>>)> {
        let mut result = vec![];
        let mut iter = self.data.iter().peekable();

        while let Some((_, value)) = iter.next() {
            let next = iter.peek().map(|(_, v)| *v);
            result.push((value, next));
        }

        result
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataPoint<T>> {
        self.data.values()
    }
}
