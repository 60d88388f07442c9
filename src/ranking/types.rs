//! Core trait for priority rules.

/// A scoring rule that assigns a priority value to an item.
///
/// Rules return `f64` scores where **lower is higher priority**. Rules that
/// rank "bigger is better" quantities negate them.
///
/// # Examples
///
/// ```
/// use u_capital::ranking::PriorityRule;
///
/// struct LargestFirst;
///
/// impl PriorityRule<f64, ()> for LargestFirst {
///     fn name(&self) -> &str { "LargestFirst" }
///     fn score(&self, item: &f64, _ctx: &()) -> f64 { -item }
/// }
///
/// assert_eq!(LargestFirst.score(&3.0, &()), -3.0);
/// ```
pub trait PriorityRule<T, C>: Send + Sync {
    /// Returns the name of this rule.
    fn name(&self) -> &str;

    /// Computes a priority score for the given item.
    ///
    /// Lower scores indicate higher priority.
    fn score(&self, item: &T, context: &C) -> f64;
}
