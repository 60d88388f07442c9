//! Constraint Programming (CP) framework.
//!
//! A small modeling layer for discrete-time scheduling problems plus an exact
//! branch-and-bound solver.
//!
//! # Key Components
//!
//! - **Variables**: [`IntervalVar`] with [`TimeVar`] start/end bounds
//! - **Constraints**: [`Constraint::Cumulative`] against a time-varying
//!   [`CapacityProfile`]
//! - **Objectives**: weighted tardiness, weighted completion, and their
//!   lexicographic combination via [`Objective::Hierarchical`]
//! - **Model**: [`CpModel`] container with validation
//! - **Solver**: [`CpSolver`] trait and [`BranchAndBoundSolver`]
//!
//! The solver distinguishes a proven-infeasible model from one whose time
//! budget ran out before any solution was found.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod solver;
mod variables;

pub use model::{CapacityProfile, Constraint, CpModel, Objective};
pub use solver::{
    BranchAndBoundSolver, CpSolution, CpSolver, IntervalSolution, SolverConfig, SolverStatus,
};
pub use variables::{IntervalVar, TimeVar};
