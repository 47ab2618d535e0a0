//! Error types for forest updates.

use crate::tree::NodeId;

/// Errors returned by [`RefinementForest::update`](crate::RefinementForest::update).
///
/// Input errors are detected before any state is touched, so a failed update
/// leaves the forest exactly as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RefineError {
    /// The point has no coordinates.
    #[error("point must have at least one coordinate")]
    EmptyPoint,

    /// The point's dimension differs from the one the forest was built with.
    #[error("point has {got} coordinates, forest expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The observed value is NaN or infinite.
    #[error("observed value must be finite, got {0}")]
    NonFiniteValue(f64),

    /// A coordinate of the point is NaN or infinite.
    #[error("coordinate {dimension} must be finite, got {value}")]
    NonFiniteCoordinate { dimension: usize, value: f64 },

    /// Descent ended on a node that cannot be updated.
    ///
    /// This is a broken internal invariant, not an input problem.
    #[error("node {0} is not a live leaf")]
    NotALeaf(NodeId),
}
