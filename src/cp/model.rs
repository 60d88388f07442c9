//! CP model definition.

use std::collections::{BTreeMap, BTreeSet};

use super::variables::IntervalVar;

/// Capacity available at each time step, starting at `origin`.
///
/// Time steps outside the profile have zero capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityProfile {
    /// Time of `levels[0]`.
    pub origin: i64,
    /// Capacity per time step.
    pub levels: Vec<i64>,
}

impl CapacityProfile {
    pub fn new(origin: i64, levels: Vec<i64>) -> Self {
        Self { origin, levels }
    }

    /// Same capacity over `[origin, origin + len)`.
    pub fn constant(origin: i64, len: usize, capacity: i64) -> Self {
        Self::new(origin, vec![capacity; len])
    }

    /// Capacity at time `t`.
    pub fn level_at(&self, t: i64) -> i64 {
        usize::try_from(t - self.origin)
            .ok()
            .and_then(|i| self.levels.get(i).copied())
            .unwrap_or(0)
    }

    /// Highest capacity anywhere in the profile.
    pub fn peak(&self) -> i64 {
        self.levels.iter().copied().max().unwrap_or(0)
    }
}

/// A constraint in the CP model.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Cumulative resource constraint.
    ///
    /// At every time step, the summed demand of active intervals must not
    /// exceed the profile's capacity at that step.
    Cumulative {
        /// Names of interval variables.
        intervals: Vec<String>,
        /// Demand of each interval (parallel to `intervals`).
        demands: Vec<i64>,
        /// Capacity over time.
        capacity: CapacityProfile,
    },
}

/// Objective function for the CP model. All objectives are minimized.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Sum of `weight · max(0, end - due)`.
    WeightedTardiness,

    /// Sum of `weight · end`.
    WeightedCompletion,

    /// Hierarchical (lexicographic) multi-objective.
    Hierarchical { objectives: Vec<Objective> },
}

impl Objective {
    /// The objective as an ordered list of scalar terms.
    pub fn terms(&self) -> Vec<Objective> {
        match self {
            Objective::Hierarchical { objectives } => {
                objectives.iter().flat_map(Objective::terms).collect()
            }
            other => vec![other.clone()],
        }
    }

    /// Value of a scalar term for one interval ending at `end`.
    pub fn interval_cost(&self, interval: &IntervalVar, end: i64) -> f64 {
        match self {
            Objective::WeightedTardiness => interval
                .due
                .map_or(0.0, |due| interval.weight * (end - due).max(0) as f64),
            Objective::WeightedCompletion => interval.weight * end as f64,
            Objective::Hierarchical { objectives } => objectives
                .first()
                .map_or(0.0, |o| o.interval_cost(interval, end)),
        }
    }
}

/// A constraint programming model.
///
/// # Examples
///
/// ```
/// use u_capital::cp::{CapacityProfile, CpModel, IntervalVar, Objective};
///
/// let mut model = CpModel::new("crews", 12);
/// model.add_interval(IntervalVar::new("a", 1, 12, 3, 13));
/// model.add_interval(IntervalVar::new("b", 1, 12, 2, 13));
/// model.add_cumulative(
///     vec!["a".into(), "b".into()],
///     vec![2, 1],
///     CapacityProfile::constant(1, 12, 2),
/// );
/// model.set_objective(Objective::Hierarchical {
///     objectives: vec![Objective::WeightedTardiness, Objective::WeightedCompletion],
/// });
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Interval variables by name.
    pub intervals: BTreeMap<String, IntervalVar>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
    /// Planning horizon (maximum time).
    pub horizon: i64,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            intervals: BTreeMap::new(),
            constraints: Vec::new(),
            objective: None,
            horizon,
        }
    }

    /// Adds an interval variable.
    pub fn add_interval(&mut self, var: IntervalVar) {
        self.intervals.insert(var.name.clone(), var);
    }

    /// Adds a cumulative constraint: at every time point the summed demand
    /// of the running `intervals` stays within `capacity`.
    pub fn add_cumulative(
        &mut self,
        intervals: Vec<String>,
        demands: Vec<i64>,
        capacity: CapacityProfile,
    ) {
        self.constraints.push(Constraint::Cumulative {
            intervals,
            demands,
            capacity,
        });
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Validates the model for consistency.
    ///
    /// Checks that referenced intervals exist, that each interval belongs to
    /// at most one cumulative constraint, and that durations, demands and
    /// weights are usable.
    pub fn validate(&self) -> Result<(), String> {
        for iv in self.intervals.values() {
            if iv.duration <= 0 {
                return Err(format!("interval {}: duration must be positive", iv.name));
            }
            if !(iv.weight >= 0.0 && iv.weight.is_finite()) {
                return Err(format!("interval {}: weight must be non-negative", iv.name));
            }
        }

        let mut seen = BTreeSet::new();
        for constraint in &self.constraints {
            match constraint {
                Constraint::Cumulative {
                    intervals, demands, ..
                } => {
                    if intervals.len() != demands.len() {
                        return Err("cumulative: intervals and demands length mismatch".into());
                    }
                    if demands.iter().any(|d| *d < 0) {
                        return Err("cumulative: negative demand".into());
                    }
                    for name in intervals {
                        if !self.intervals.contains_key(name) {
                            return Err(format!("undefined interval: {name}"));
                        }
                        if !seen.insert(name.as_str()) {
                            return Err(format!("interval {name} in more than one cumulative"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the number of interval variables.
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
