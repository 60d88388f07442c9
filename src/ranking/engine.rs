//! Rule composition engine.

use std::cmp::Ordering;

use super::types::PriorityRule;

/// Scores closer than this compare equal.
const EPSILON: f64 = 1e-9;

/// Strategy for breaking ties when all rules produce equal scores.
pub enum TieBreaker<T> {
    /// Keep the original order (stable sort).
    PreserveOrder,

    /// Break ties by an integer key, lower first.
    ByKey(fn(&T) -> u64),
}

impl<T> Clone for TieBreaker<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TieBreaker<T> {}

impl<T> std::fmt::Debug for TieBreaker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreserveOrder => f.write_str("PreserveOrder"),
            Self::ByKey(_) => f.write_str("ByKey"),
        }
    }
}

/// Engine for composing and applying multiple priority rules.
///
/// # Examples
///
/// ```
/// use u_capital::ranking::{PriorityRule, RuleEngine, TieBreaker};
///
/// struct Job { id: u64, value: f64 }
///
/// struct HighestValue;
/// impl PriorityRule<Job, ()> for HighestValue {
///     fn name(&self) -> &str { "HighestValue" }
///     fn score(&self, job: &Job, _: &()) -> f64 { -job.value }
/// }
///
/// let engine = RuleEngine::new()
///     .with_rule(HighestValue)
///     .with_tie_breaker(TieBreaker::ByKey(|j: &Job| j.id));
///
/// let jobs = vec![
///     Job { id: 9, value: 1.0 },
///     Job { id: 4, value: 2.0 },
///     Job { id: 2, value: 1.0 },
/// ];
/// assert_eq!(engine.sort_indices(&jobs, &()), vec![1, 2, 0]);
/// ```
pub struct RuleEngine<T, C> {
    rules: Vec<Box<dyn PriorityRule<T, C>>>,
    tie_breaker: TieBreaker<T>,
}

impl<T, C> RuleEngine<T, C> {
    /// Creates an engine with no rules that preserves input order.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            tie_breaker: TieBreaker::PreserveOrder,
        }
    }

    /// Sets the tie-breaking strategy.
    pub fn with_tie_breaker(mut self, tb: TieBreaker<T>) -> Self {
        self.tie_breaker = tb;
        self
    }

    /// Appends a rule.
    pub fn with_rule<R: PriorityRule<T, C> + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Sorts items by priority (lowest score first = highest priority).
    ///
    /// Returns indices into the original slice, sorted by priority.
    pub fn sort_indices(&self, items: &[T], context: &C) -> Vec<usize> {
        let scores: Vec<Vec<f64>> = items
            .iter()
            .map(|item| self.rules.iter().map(|r| r.score(item, context)).collect())
            .collect();

        let mut indices: Vec<usize> = (0..items.len()).collect();

        indices.sort_by(|&a, &b| {
            for (va, vb) in scores[a].iter().zip(scores[b].iter()) {
                if (va - vb).abs() > EPSILON {
                    return va.partial_cmp(vb).unwrap_or(Ordering::Equal);
                }
            }

            match self.tie_breaker {
                TieBreaker::PreserveOrder => Ordering::Equal,
                TieBreaker::ByKey(key) => key(&items[a]).cmp(&key(&items[b])),
            }
        });

        indices
    }
}

impl<T, C> Default for RuleEngine<T, C> {
    fn default() -> Self {
        Self::new()
    }
}
