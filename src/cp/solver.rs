//! CP solver interface and a branch-and-bound implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::model::{CapacityProfile, Constraint, CpModel, Objective};
use super::variables::IntervalVar;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Solver exceeded time limit without a solution.
    Timeout,
    /// No solution found for unknown reasons.
    Unknown,
}

/// Solution for an interval variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSolution {
    /// Assigned start time.
    pub start: i64,
    /// Assigned end time (exclusive).
    pub end: i64,
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Value of each objective term, in hierarchy order.
    pub objective_values: Vec<f64>,
    /// Interval variable assignments.
    pub intervals: BTreeMap<String, IntervalSolution>,
    /// Solve time in milliseconds.
    pub solve_time_ms: u64,
    /// Search nodes explored.
    pub nodes: u64,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_values: Vec::new(),
            intervals: BTreeMap::new(),
            solve_time_ms: 0,
            nodes: 0,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds.
    pub time_limit_ms: u64,
    /// Cooperative cancellation flag, polled during search.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 2_000,
            cancel: None,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

/// Trait for CP solver implementations.
///
/// Implementors provide the actual constraint solving logic. This can wrap
/// an external solver or provide a custom search.
pub trait CpSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

/// Depth-first branch and bound over interval start times.
///
/// Each cumulative constraint is searched independently since no interval
/// belongs to two of them. Intervals outside every cumulative are placed at
/// their earliest start. Within a group, intervals are branched in
/// descending weight order and starts are tried in ascending order; both
/// objective kinds are non-decreasing in the start time, so a branch whose
/// lower bound cannot beat the incumbent ends the loop over starts.
///
/// The search proves optimality when it completes within the time limit.
/// When interrupted it reports the incumbent as `Feasible`, or `Timeout`
/// if none exists yet.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

const CHECK_INTERVAL: u64 = 1024;
const LEX_EPS: f64 = 1e-9;

fn lex_less(a: &[f64], b: &[f64]) -> bool {
    for (x, y) in a.iter().zip(b) {
        if *x < *y - LEX_EPS {
            return true;
        }
        if *x > *y + LEX_EPS {
            return false;
        }
    }
    false
}

fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

fn term_costs(terms: &[Objective], iv: &IntervalVar, start: i64) -> Vec<f64> {
    let end = start + iv.duration;
    terms.iter().map(|t| t.interval_cost(iv, end)).collect()
}

struct Item<'a> {
    iv: &'a IntervalVar,
    demand: i64,
    starts: Vec<i64>,
}

struct GroupOutcome {
    status: SolverStatus,
    starts: Vec<(String, IntervalSolution)>,
    costs: Vec<f64>,
    nodes: u64,
}

struct Search<'a> {
    items: Vec<Item<'a>>,
    capacity: &'a CapacityProfile,
    terms: &'a [Objective],
    base: i64,
    usage: Vec<i64>,
    suffix_lb: Vec<Vec<f64>>,
    chosen: Vec<i64>,
    best: Option<(Vec<f64>, Vec<i64>)>,
    nodes: u64,
    deadline: Instant,
    cancel: Option<&'a AtomicBool>,
    aborted: bool,
}

impl<'a> Search<'a> {
    fn new(
        items: Vec<Item<'a>>,
        capacity: &'a CapacityProfile,
        terms: &'a [Objective],
        deadline: Instant,
        cancel: Option<&'a AtomicBool>,
    ) -> Self {
        let base = items
            .iter()
            .filter_map(|it| it.starts.first().copied())
            .min()
            .unwrap_or(0);
        let top = items
            .iter()
            .filter_map(|it| it.starts.last().map(|s| s + it.iv.duration))
            .max()
            .unwrap_or(base);
        let len = usize::try_from(top - base).unwrap_or(0);

        let zero = vec![0.0; terms.len()];
        let mut suffix_lb = vec![zero.clone(); items.len() + 1];
        for i in (0..items.len()).rev() {
            let earliest = items[i]
                .starts
                .first()
                .map_or_else(|| zero.clone(), |s| term_costs(terms, items[i].iv, *s));
            suffix_lb[i] = add(&suffix_lb[i + 1], &earliest);
        }

        let n = items.len();
        Self {
            items,
            capacity,
            terms,
            base,
            usage: vec![0; len],
            suffix_lb,
            chosen: vec![0; n],
            best: None,
            nodes: 0,
            deadline,
            cancel,
            aborted: false,
        }
    }

    fn should_stop(&self) -> bool {
        Instant::now() >= self.deadline
            || self.cancel.is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn slot(&self, t: i64) -> usize {
        (t - self.base) as usize
    }

    fn fits(&self, i: usize, start: i64) -> bool {
        let item = &self.items[i];
        (start..start + item.iv.duration)
            .all(|t| self.usage[self.slot(t)] + item.demand <= self.capacity.level_at(t))
    }

    fn occupy(&mut self, i: usize, start: i64, sign: i64) {
        let (duration, demand) = (self.items[i].iv.duration, self.items[i].demand);
        for t in start..start + duration {
            let k = self.slot(t);
            self.usage[k] += sign * demand;
        }
    }

    /// List-schedules every item at its first fitting start.
    fn seed_incumbent(&mut self) {
        let mut placed = Vec::with_capacity(self.items.len());
        for i in 0..self.items.len() {
            let found = self.items[i]
                .starts
                .iter()
                .copied()
                .find(|s| self.fits(i, *s));
            match found {
                Some(s) => {
                    self.occupy(i, s, 1);
                    placed.push(s);
                }
                None => break,
            }
        }
        for (i, s) in placed.iter().enumerate() {
            self.occupy(i, *s, -1);
        }
        if placed.len() == self.items.len() {
            let mut cost = vec![0.0; self.terms.len()];
            for (i, s) in placed.iter().enumerate() {
                cost = add(&cost, &term_costs(self.terms, self.items[i].iv, *s));
            }
            self.best = Some((cost, placed));
        }
    }

    fn dfs(&mut self, depth: usize, acc: &[f64]) {
        if self.aborted {
            return;
        }
        if self.nodes % CHECK_INTERVAL == 0 && self.should_stop() {
            self.aborted = true;
            return;
        }
        self.nodes += 1;

        if depth == self.items.len() {
            let improves = match &self.best {
                Some((best, _)) => lex_less(acc, best),
                None => true,
            };
            if improves {
                self.best = Some((acc.to_vec(), self.chosen.clone()));
            }
            return;
        }

        for k in 0..self.items[depth].starts.len() {
            let start = self.items[depth].starts[k];
            let next = add(acc, &term_costs(self.terms, self.items[depth].iv, start));
            if let Some((best, _)) = &self.best {
                let bound = add(&next, &self.suffix_lb[depth + 1]);
                if !lex_less(&bound, best) {
                    break;
                }
            }
            if !self.fits(depth, start) {
                continue;
            }
            self.occupy(depth, start, 1);
            self.chosen[depth] = start;
            self.dfs(depth + 1, &next);
            self.occupy(depth, start, -1);
            if self.aborted {
                return;
            }
        }
    }

    fn run(mut self) -> GroupOutcome {
        self.seed_incumbent();
        let root = vec![0.0; self.terms.len()];
        self.dfs(0, &root);

        let status = match (&self.best, self.aborted) {
            (Some(_), false) => SolverStatus::Optimal,
            (Some(_), true) => SolverStatus::Feasible,
            (None, false) => SolverStatus::Infeasible,
            (None, true) => SolverStatus::Timeout,
        };
        let (costs, starts) = match self.best {
            Some((costs, chosen)) => {
                let starts = self
                    .items
                    .iter()
                    .zip(chosen)
                    .map(|(it, s)| {
                        (
                            it.iv.name.clone(),
                            IntervalSolution {
                                start: s,
                                end: s + it.iv.duration,
                            },
                        )
                    })
                    .collect();
                (costs, starts)
            }
            None => (vec![0.0; self.terms.len()], Vec::new()),
        };
        GroupOutcome {
            status,
            starts,
            costs,
            nodes: self.nodes,
        }
    }
}

fn combine(a: SolverStatus, b: SolverStatus) -> SolverStatus {
    use SolverStatus::*;
    match (a, b) {
        (Infeasible, _) | (_, Infeasible) => Infeasible,
        (Timeout, _) | (_, Timeout) => Timeout,
        (Feasible, _) | (_, Feasible) => Feasible,
        _ => Optimal,
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        if let Err(reason) = model.validate() {
            tracing::warn!(model = %model.name, %reason, "invalid CP model");
            return CpSolution::empty(SolverStatus::ModelInvalid);
        }

        let deadline = started + Duration::from_millis(config.time_limit_ms);
        let cancel = config.cancel.as_deref();
        let terms = model.objective.as_ref().map(Objective::terms).unwrap_or_default();

        let mut solution = CpSolution::empty(SolverStatus::Optimal);
        solution.objective_values = vec![0.0; terms.len()];

        let mut grouped = BTreeSet::new();
        for constraint in &model.constraints {
            let Constraint::Cumulative {
                intervals,
                demands,
                capacity,
            } = constraint;

            let mut items = Vec::with_capacity(intervals.len());
            for (name, demand) in intervals.iter().zip(demands) {
                let Some(iv) = model.intervals.get(name) else {
                    continue;
                };
                grouped.insert(name.as_str());
                items.push(Item {
                    iv,
                    demand: *demand,
                    starts: iv.start_range().collect(),
                });
            }

            if items
                .iter()
                .any(|it| it.starts.is_empty() || (it.demand > 0 && it.demand > capacity.peak()))
            {
                solution.status = SolverStatus::Infeasible;
                solution.intervals.clear();
                break;
            }

            items.sort_by(|a, b| {
                b.iv.weight
                    .total_cmp(&a.iv.weight)
                    .then_with(|| a.iv.name.cmp(&b.iv.name))
            });

            let outcome = Search::new(items, capacity, &terms, deadline, cancel).run();
            solution.nodes += outcome.nodes;
            solution.status = combine(solution.status, outcome.status);
            solution.objective_values = add(&solution.objective_values, &outcome.costs);
            solution.intervals.extend(outcome.starts);
            if solution.status == SolverStatus::Infeasible {
                solution.intervals.clear();
                break;
            }
        }

        if solution.status != SolverStatus::Infeasible {
            for (name, iv) in &model.intervals {
                if grouped.contains(name.as_str()) {
                    continue;
                }
                let range = iv.start_range();
                if range.is_empty() {
                    solution.status = SolverStatus::Infeasible;
                    solution.intervals.clear();
                    break;
                }
                let start = *range.start();
                solution.objective_values =
                    add(&solution.objective_values, &term_costs(&terms, iv, start));
                solution.intervals.insert(
                    name.clone(),
                    IntervalSolution {
                        start,
                        end: start + iv.duration,
                    },
                );
            }
        }

        if !solution.is_solution_found() {
            solution.intervals.clear();
        }
        solution.solve_time_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            model = %model.name,
            status = ?solution.status,
            nodes = solution.nodes,
            ms = solution.solve_time_ms,
            "CP solve finished"
        );
        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hierarchical() -> Objective {
        Objective::Hierarchical {
            objectives: vec![Objective::WeightedTardiness, Objective::WeightedCompletion],
        }
    }

    #[test]
    fn test_single_resource_orders_by_weight() {
        let mut model = CpModel::new("t", 12);
        model.add_interval(IntervalVar::new("a", 1, 12, 3, 13).with_weight(1.0).with_due(4));
        model.add_interval(IntervalVar::new("b", 1, 12, 2, 13).with_weight(5.0).with_due(3));
        model.add_cumulative(
            vec!["a".into(), "b".into()],
            vec![1, 1],
            CapacityProfile::constant(1, 12, 1),
        );
        model.set_objective(hierarchical());

        let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.intervals["b"], IntervalSolution { start: 1, end: 3 });
        assert_eq!(sol.intervals["a"], IntervalSolution { start: 3, end: 6 });
        // a is 2 late with weight 1
        assert!((sol.objective_values[0] - 2.0).abs() < 1e-9);
        assert!((sol.objective_values[1] - (6.0 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_when_capacity_allows() {
        let mut model = CpModel::new("t", 12);
        model.add_interval(IntervalVar::new("a", 1, 12, 3, 13));
        model.add_interval(IntervalVar::new("b", 1, 12, 3, 13));
        model.add_cumulative(
            vec!["a".into(), "b".into()],
            vec![2, 1],
            CapacityProfile::constant(1, 12, 3),
        );
        model.set_objective(Objective::WeightedCompletion);

        let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.intervals["a"].start, 1);
        assert_eq!(sol.intervals["b"].start, 1);
    }

    #[test]
    fn test_profile_gap_pushes_start() {
        let mut model = CpModel::new("t", 6);
        model.add_interval(IntervalVar::new("a", 1, 6, 2, 7));
        model.add_cumulative(
            vec!["a".into()],
            vec![2],
            CapacityProfile::new(1, vec![2, 0, 2, 2, 2, 2]),
        );
        model.set_objective(Objective::WeightedCompletion);

        let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.intervals["a"], IntervalSolution { start: 3, end: 5 });
    }

    #[test]
    fn test_demand_above_peak_is_infeasible() {
        let mut model = CpModel::new("t", 12);
        model.add_interval(IntervalVar::new("a", 1, 12, 1, 13));
        model.add_cumulative(vec!["a".into()], vec![3], CapacityProfile::constant(1, 12, 2));
        let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Infeasible);
        assert!(sol.intervals.is_empty());
    }

    #[test]
    fn test_no_room_is_infeasible() {
        let mut model = CpModel::new("t", 4);
        model.add_interval(IntervalVar::new("a", 1, 4, 3, 5));
        model.add_interval(IntervalVar::new("b", 1, 4, 3, 5));
        model.add_cumulative(
            vec!["a".into(), "b".into()],
            vec![1, 1],
            CapacityProfile::constant(1, 4, 1),
        );
        let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_invalid_model() {
        let mut model = CpModel::new("t", 4);
        model.add_cumulative(vec!["ghost".into()], vec![1], CapacityProfile::constant(1, 4, 1));
        let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::ModelInvalid);
    }

    #[test]
    fn test_unconstrained_interval_at_earliest() {
        let mut model = CpModel::new("t", 12);
        model.add_interval(IntervalVar::new("free", 4, 12, 2, 13));
        let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.intervals["free"], IntervalSolution { start: 4, end: 6 });
    }

    #[test]
    fn test_cancelled_before_search() {
        let mut model = CpModel::new("t", 12);
        for i in 0..4 {
            model.add_interval(IntervalVar::new(format!("j{i}"), 1, 12, 2, 13).with_weight(1.0));
        }
        model.add_cumulative(
            (0..4).map(|i| format!("j{i}")).collect(),
            vec![1; 4],
            CapacityProfile::constant(1, 12, 1),
        );
        model.set_objective(Objective::WeightedCompletion);

        let flag = Arc::new(AtomicBool::new(true));
        let config = SolverConfig::default().with_cancel(flag);
        let sol = BranchAndBoundSolver::new().solve(&model, &config);
        // the list-scheduled incumbent survives; optimality is not proven
        assert_eq!(sol.status, SolverStatus::Feasible);
        assert_eq!(sol.intervals.len(), 4);
    }

    proptest! {
        #[test]
        fn prop_solution_respects_capacity(
            jobs in proptest::collection::vec((1i64..4, 1i64..3, 0.0f64..5.0), 1..6),
        ) {
            let cap = 3;
            let mut model = CpModel::new("p", 12);
            let mut names = Vec::new();
            let mut demands = Vec::new();
            for (i, (dur, demand, w)) in jobs.iter().enumerate() {
                let name = format!("j{i}");
                model.add_interval(IntervalVar::new(name.clone(), 1, 12, *dur, 13).with_weight(*w).with_due(6));
                names.push(name);
                demands.push(*demand);
            }
            model.add_cumulative(names.clone(), demands.clone(), CapacityProfile::constant(1, 12, cap));
            model.set_objective(hierarchical());

            let sol = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
            if sol.is_solution_found() {
                for t in 1..=12 {
                    let used: i64 = names
                        .iter()
                        .zip(&demands)
                        .filter(|(n, _)| {
                            let s = sol.intervals[n.as_str()];
                            s.start <= t && t < s.end
                        })
                        .map(|(_, d)| *d)
                        .sum();
                    prop_assert!(used <= cap);
                }
                for (name, (dur, _, _)) in names.iter().zip(&jobs) {
                    let s = sol.intervals[name.as_str()];
                    prop_assert_eq!(s.end - s.start, *dur);
                    prop_assert!(s.start >= 1 && s.end <= 13);
                }
            }
        }
    }
}
