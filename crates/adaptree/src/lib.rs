//! adaptree: online adaptive regression trees.
//!
//! A [`RefinementForest`] approximates a scalar value function over a
//! continuous input space, with one tree per discrete label. Observations
//! arrive one at a time and are absorbed immediately: each leaf keeps running
//! statistics, tests online whether its low and high partitions differ, and
//! splits itself when the evidence is strong enough.
//!
//! # Key Types
//!
//! - [`RefinementForest`] - The forest: `update`, `lookup`, `best_q`, dump
//! - [`TreeConfig`] - Split test and learning-rate configuration
//! - [`RunningStat`] / [`SplitFilter`] - Leaf statistics
//! - [`LpSolver`] - Pluggable solver for split-time corrections
//!
//! # Example
//!
//! ```
//! use adaptree::{RefinementForest, TreeConfig};
//!
//! let config = TreeConfig::builder().filter_val(0.5).build().unwrap();
//! let mut forest = RefinementForest::from_config(&config);
//!
//! for i in 0..2000 {
//!     let x = (i % 100) as f64 / 100.0;
//!     let value = if x < 0.5 { 10.0 } else { 0.0 };
//!     forest.update(7, &[x], value, 1.0, &config).unwrap();
//! }
//! assert!(forest.leaf_count(7) > 1);
//! ```

// Re-export approx traits for users who want to compare estimates
pub use approx;

pub mod config;
pub mod correction;
pub mod error;
pub mod stats;
pub mod testing;
pub mod tree;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::{ConfigError, TreeConfig};
pub use correction::{LinearProgram, LpSolver, MinilpSolver, SolveError, VarBounds};
pub use error::RefineError;
pub use stats::{FilterParams, RunningStat, SplitFilter};
pub use tree::{
    Correction, DimensionStats, Estimate, Label, Node, NodeId, Predictor, RefinementForest,
    Split, UpdateOutcome,
};
