//! CP variable types.

use std::ops::RangeInclusive;

/// A time variable with domain `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeVar {
    /// Minimum time.
    pub min: i64,
    /// Maximum time.
    pub max: i64,
    /// Fixed value, if any.
    pub fixed: Option<i64>,
}

impl TimeVar {
    /// Creates a new time variable.
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min,
            max,
            fixed: None,
        }
    }

    /// Creates a fixed time variable.
    pub fn fixed(value: i64) -> Self {
        Self {
            min: value,
            max: value,
            fixed: Some(value),
        }
    }

    /// Whether this variable is fixed.
    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }
}

/// A fixed-duration activity occupying `[start, start + duration)`.
///
/// `weight` and `due` feed the weighted objectives; an interval without a
/// due time is never tardy.
///
/// # Examples
///
/// ```
/// use u_capital::cp::IntervalVar;
///
/// // start in [1, 10], lasts 3, must end by 12
/// let iv = IntervalVar::new("pipe", 1, 10, 3, 12).with_weight(2.0).with_due(8);
/// assert_eq!(iv.start_range(), 1..=9);
/// assert_eq!(iv.end.min, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalVar {
    /// Variable name.
    pub name: String,
    /// Start time variable.
    pub start: TimeVar,
    /// End time variable (exclusive end).
    pub end: TimeVar,
    /// Fixed duration.
    pub duration: i64,
    /// Objective weight, non-negative.
    pub weight: f64,
    /// Due time for tardiness, compared against the exclusive end.
    pub due: Option<i64>,
}

impl IntervalVar {
    /// Creates a fixed-duration interval variable.
    ///
    /// # Arguments
    /// * `name` - Unique name
    /// * `start_min` - Earliest start time
    /// * `start_max` - Latest start time
    /// * `duration` - Fixed duration
    /// * `end_max` - Latest end time
    pub fn new(
        name: impl Into<String>,
        start_min: i64,
        start_max: i64,
        duration: i64,
        end_max: i64,
    ) -> Self {
        Self {
            name: name.into(),
            start: TimeVar::new(start_min, start_max),
            end: TimeVar::new(start_min + duration, end_max),
            duration,
            weight: 1.0,
            due: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_due(mut self, due: i64) -> Self {
        self.due = Some(due);
        self
    }

    /// Start values consistent with both the start and end bounds.
    pub fn start_range(&self) -> RangeInclusive<i64> {
        let lo = self.start.min.max(self.end.min - self.duration);
        let hi = self.start.max.min(self.end.max - self.duration);
        lo..=hi
    }

    /// Whether no start value is feasible.
    pub fn is_empty(&self) -> bool {
        self.start_range().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_var() {
        let t = TimeVar::new(0, 10);
        assert!(!t.is_fixed());
        let f = TimeVar::fixed(4);
        assert!(f.is_fixed());
        assert_eq!((f.min, f.max), (4, 4));
    }

    #[test]
    fn test_interval_var() {
        let iv = IntervalVar::new("op1", 0, 100, 50, 200);
        assert_eq!(iv.name, "op1");
        assert_eq!(iv.start.min, 0);
        assert_eq!(iv.start.max, 100);
        assert_eq!(iv.duration, 50);
        assert_eq!(iv.end.min, 50);
        assert_eq!(iv.end.max, 200);
        assert!((iv.weight - 1.0).abs() < 1e-12);
        assert!(iv.due.is_none());
    }

    #[test]
    fn test_start_range_respects_end_bound() {
        let iv = IntervalVar::new("a", 1, 12, 4, 9);
        assert_eq!(iv.start_range(), 1..=5);
        assert!(!iv.is_empty());

        let tight = IntervalVar::new("b", 1, 12, 4, 4);
        assert!(tight.is_empty());
    }
}
