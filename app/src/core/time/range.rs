use std::fmt::Display;

use super::{DateTime, Duration};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DateTimeRange {
    start: DateTime,
    end: DateTime,
}

impl Display for DateTimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl DateTimeRange {
    pub fn new(start: DateTime, end: DateTime) -> Self {
        if start > end {
            return Self { start: end, end: start };
        }

        Self { start, end }
    }

    pub fn around(start: DateTime, end: DateTime, margin: Duration) -> Self {
        Self::new(start - margin, end + margin)
    }

    pub fn step_by(&self, step: Duration) -> DateTimeIterator {
        DateTimeIterator::new(self, &step)
    }

    pub fn start(&self) -> &DateTime {
        &self.start
    }

    pub fn end(&self) -> &DateTime {
        &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end.elapsed_since(self.start)
    }

    pub fn contains(&self, datetime: DateTime) -> bool {
        datetime >= self.start && datetime <= self.end
    }
}

pub struct DateTimeIterator {
    next: DateTime,
    end: DateTime,
    step: Duration,
}

impl DateTimeIterator {
    pub fn new(range: &DateTimeRange, step: &Duration) -> Self {
        Self {
            next: *range.start(),
            end: *range.end(),
            step: *step,
        }
    }
}

impl Iterator for DateTimeIterator {
    type Item = DateTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end || self.step <= Duration::zero() {
            return None;
        }

        let current = self.next;
        let next = current + self.step;

        //iterator should contain the end exactly
        self.next = if current < self.end && next > self.end {
            self.end
        } else {
            next
        };

        Some(current)
    }
}
