//! Tree node types.

use serde::{Deserialize, Serialize};

use super::predictor::Predictor;
use super::NodeId;

/// Split condition of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Coordinate the node splits on.
    pub dimension: usize,
    /// Boundary value (go low if `point[dimension] <= boundary`).
    pub boundary: f64,
    /// Arena index of the low child.
    pub low: NodeId,
    /// Arena index of the high child.
    pub high: NodeId,
}

impl Split {
    /// Evaluate which child a coordinate value goes to.
    /// Returns true for low, false for high.
    #[inline]
    pub fn goes_low(&self, value: f64) -> bool {
        value <= self.boundary
    }

    /// Child index for a point.
    ///
    /// # Panics
    ///
    /// Panics if `point` has no coordinate at `self.dimension`.
    #[inline]
    pub fn child_for(&self, point: &[f64]) -> NodeId {
        if self.goes_low(point[self.dimension]) {
            self.low
        } else {
            self.high
        }
    }
}

/// Linear model fitted to a leaf's partition statistics when it split.
///
/// Holds one weight per input dimension followed by an intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    coefficients: Vec<f64>,
}

impl Correction {
    /// Build from `dimen` weights followed by the intercept.
    pub fn from_coefficients(coefficients: Vec<f64>) -> Self {
        debug_assert!(!coefficients.is_empty(), "correction needs an intercept");
        Self { coefficients }
    }

    /// Per-dimension weights.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.coefficients[..self.coefficients.len() - 1]
    }

    #[inline]
    pub fn intercept(&self) -> f64 {
        self.coefficients[self.coefficients.len() - 1]
    }

    /// All coefficients, weights first.
    #[inline]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Value of the linear model at `point`.
    pub fn evaluate(&self, point: &[f64]) -> f64 {
        self.weights()
            .iter()
            .zip(point)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept()
    }
}

/// A node in a refinement tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Live leaf with its predictor.
    Leaf(Predictor),
    /// Former leaf that has split.
    Internal {
        split: Split,
        /// Correction computed when the leaf split, if the solve succeeded.
        correction: Option<Correction>,
    },
}

impl Default for Node {
    fn default() -> Self {
        Self::Leaf(Predictor::default())
    }
}

impl Node {
    /// Returns true if this is a leaf node.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Get the predictor, if this is a leaf.
    #[inline]
    pub fn predictor(&self) -> Option<&Predictor> {
        match self {
            Self::Leaf(p) => Some(p),
            Self::Internal { .. } => None,
        }
    }

    #[inline]
    pub(crate) fn predictor_mut(&mut self) -> Option<&mut Predictor> {
        match self {
            Self::Leaf(p) => Some(p),
            Self::Internal { .. } => None,
        }
    }

    /// Get the split condition, if this is an internal node.
    #[inline]
    pub fn split(&self) -> Option<&Split> {
        match self {
            Self::Internal { split, .. } => Some(split),
            Self::Leaf(_) => None,
        }
    }

    /// Correction stored by the split that created this internal node.
    #[inline]
    pub fn correction(&self) -> Option<&Correction> {
        match self {
            Self::Internal { correction, .. } => correction.as_ref(),
            Self::Leaf(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_goes_low() {
        let split = Split {
            dimension: 0,
            boundary: 0.5,
            low: 1,
            high: 2,
        };

        assert!(split.goes_low(0.3));
        assert!(split.goes_low(0.5)); // == boundary goes low
        assert!(!split.goes_low(0.7));
        assert!(!split.goes_low(f64::NAN));
    }

    #[test]
    fn child_for_uses_split_dimension() {
        let split = Split {
            dimension: 1,
            boundary: 0.0,
            low: 3,
            high: 4,
        };
        assert_eq!(split.child_for(&[100.0, -1.0]), 3);
        assert_eq!(split.child_for(&[-100.0, 1.0]), 4);
    }

    #[test]
    fn correction_evaluates_linear_model() {
        let c = Correction::from_coefficients(vec![2.0, -1.0, 0.5]);
        assert_eq!(c.weights(), &[2.0, -1.0]);
        assert_eq!(c.intercept(), 0.5);
        assert_eq!(c.evaluate(&[1.0, 3.0]), 2.0 - 3.0 + 0.5);
    }

    #[test]
    fn default_node_is_empty_leaf() {
        let node = Node::default();
        assert!(node.is_leaf());
        assert!(node.split().is_none());
        assert!(node.correction().is_none());
        assert_eq!(node.predictor().unwrap().samples(), 0);
    }
}
