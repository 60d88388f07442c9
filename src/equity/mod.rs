//! District equity model.
//!
//! A district's service ratio compares its per-capita project rate from the
//! previous year with the city-wide rate:
//!
//! ```text
//! ratio      = (projects_d / population_d) / (projects_city / population_city)
//! multiplier = 1 + strength · clamp(1 - ratio, -0.5, 0.5)
//! ```
//!
//! The multiplier is continuous and bounded to `[0.875, 1.125]` with the
//! default strength. Tier labels are advisory only.
//!
//! The model also owns the per-quarter fair-share budget rollup that the
//! governance allocator uses to enforce the 2× fair-share rule.

mod config;
mod model;
mod types;

pub use config::EquityConfig;
pub use model::EquityModel;
pub use types::{
    District, DistrictActivity, DistrictAllocation, DistrictEquity, EquityProfile, EquityTier,
};
