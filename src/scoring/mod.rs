//! Composite value scoring.
//!
//! ```text
//! composite = (w_s·safety + w_m·mandate + w_b·benefit + w_u·urgency + w_f·feasibility)
//!             · equity_multiplier
//! ```
//!
//! - safety and mandate come from fixed tier tables
//! - `benefit = clamp((population / cost) / blended_median, 0, 1)`
//! - `urgency = max(floor, e^(-λ·days))`
//!
//! Every score is returned as a full [`ScoreComponents`] breakdown.

mod config;
mod engine;
mod normalizer;
mod types;

pub use config::{NormalizerConfig, ScoringConfig, ScoringWeights};
pub use engine::Scorer;
pub use normalizer::BenefitNormalizer;
pub use types::{
    BatchScoring, CandidateRequest, CrewRequirement, Feasibility, IssueSignal, MandateTier,
    ProjectCandidate, RejectedRequest, SafetyTier, ScoreComponents,
};
