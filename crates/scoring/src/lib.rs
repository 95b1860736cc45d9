//! Derived scoring engine.
//!
//! Pure functions over already-fetched country records: category score
//! estimates, percentile ranks, head-to-head gap analysis and SWOT
//! classification. Nothing here performs I/O or keeps state, and results
//! are recomputed on every call.

pub mod categories;
pub mod gap;
pub mod percentile;
pub mod presentation;
pub mod swot;

pub use categories::{score_categories, Capability, Category, CategoryScores};
pub use gap::{
    gap_analysis, CapabilityRow, CategoryGap, GapAnalysis, GapSummary, Leader, Significance,
};
pub use percentile::{category_averages, percentile, rank_countries, RankedCountry};
pub use presentation::ChartEstimator;
pub use swot::{overall_rating, swot, OverallRating, SwotItem, SwotResult};
