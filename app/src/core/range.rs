#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Range<T> {
    from: T,
    to: T,
}

impl<T: PartialOrd> Range<T> {
    pub fn new(min: T, max: T) -> Self {
        if min > max {
            return Self { from: max, to: min };
        }

        Self { from: min, to: max }
    }

    pub fn from(&self) -> &T {
        &self.from
    }

    pub fn to(&self) -> &T {
        &self.to
    }

    pub fn contains(&self, value: &T) -> bool {
        value >= &self.from && value <= &self.to
    }
}

impl<T: PartialOrd + Copy> Range<T> {
    pub fn clamp(&self, value: T) -> T {
        if value < self.from {
            self.from
        } else if value > self.to {
            self.to
        } else {
            value
        }
    }
}

impl<T: PartialEq + PartialOrd> PartialEq for Range<T> {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl<T> std::fmt::Display for Range<T>
where
    T: std::fmt::Display + PartialOrd,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.from, self.to)
    }
}

impl<T> From<Range<T>> for (T, T) {
    fn from(val: Range<T>) -> Self {
        (val.from, val.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_orders_bounds() {
        let range = Range::new(5.0, 1.0);

        assert_eq!(range.from(), &1.0);
        assert_eq!(range.to(), &5.0);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = Range::new(1.0, 5.0);

        assert!(range.contains(&1.0));
        assert!(range.contains(&5.0));
        assert!(!range.contains(&5.1));
    }

    #[test]
    fn test_clamp() {
        let range = Range::new(1.0, 5.0);

        assert_eq!(range.clamp(0.0), 1.0);
        assert_eq!(range.clamp(3.0), 3.0);
        assert_eq!(range.clamp(7.0), 5.0);
    }
}
