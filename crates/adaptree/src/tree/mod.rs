//! Refinement trees: arena storage, leaf statistics and the label forest.
//!
//! - [`RefinementForest`]: one tree per label, updated online
//! - [`NodeArena`]: append-only node storage shared by all trees
//! - [`ForestIndex`]: sorted label -> root mapping
//! - [`Node`], [`Split`], [`Correction`]: node representation
//! - [`Predictor`], [`DimensionStats`]: statistics of a live leaf

use approx::AbsDiffEq;

mod arena;
mod dump;
mod forest;
mod index;
mod node;
mod predictor;

pub use arena::NodeArena;
pub use forest::{RefinementForest, UpdateOutcome, DEFAULT_SEED};
pub use index::ForestIndex;
pub use node::{Correction, Node, Split};
pub use predictor::{DimensionStats, Predictor};

/// Index of a node in a [`NodeArena`].
pub type NodeId = usize;

/// Opaque key selecting a tree of the forest.
pub type Label = u64;

/// Leaf estimate returned by [`RefinementForest::lookup`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Value estimate; NaN when there is no estimate.
    pub mean: f64,
    /// Observations routed to the leaf.
    pub count: u64,
    /// Population variance of the leaf's values.
    pub variance: f64,
}

impl Estimate {
    /// The "no estimate" sentinel: NaN mean, zero count and variance.
    pub const fn missing() -> Self {
        Self {
            mean: f64::NAN,
            count: 0,
            variance: 0.0,
        }
    }

    /// Returns true for the "no estimate" sentinel.
    #[inline]
    pub fn is_missing(&self) -> bool {
        self.mean.is_nan()
    }

    pub(crate) fn from_predictor(predictor: &Predictor) -> Self {
        let value = predictor.value();
        if value.is_empty() {
            return Self::missing();
        }
        Self {
            mean: value.mean(),
            count: predictor.samples(),
            variance: value.variance(),
        }
    }
}

impl AbsDiffEq for Estimate {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.count == other.count
            && self.mean.abs_diff_eq(&other.mean, epsilon)
            && self.variance.abs_diff_eq(&other.variance, epsilon)
    }
}
