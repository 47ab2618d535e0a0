//! The per-label forest of refinement trees.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::TreeConfig;
use crate::correction::{fit_correction, LpSolver, MinilpSolver};
use crate::error::RefineError;

use super::arena::NodeArena;
use super::index::ForestIndex;
use super::node::{Correction, Node, Split};
use super::predictor::LeafDecision;
use super::{Estimate, Label, NodeId};

/// Seed used by [`RefinementForest::new`].
pub const DEFAULT_SEED: u64 = 42;

/// What an [`update`](RefinementForest::update) did to the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// The observation was absorbed by a leaf.
    Observed { leaf: NodeId },
    /// The observation was absorbed and at least one midpoint was recentered.
    Rebalanced { leaf: NodeId },
    /// The leaf split; `node` is now internal.
    Split { node: NodeId, split: Split },
}

impl UpdateOutcome {
    /// Returns true if the update split a leaf.
    #[inline]
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split { .. })
    }
}

/// Online regression trees, one per label, sharing a single node arena.
///
/// Each label's tree starts as one empty leaf. Every [`update`](Self::update)
/// routes the observation to a leaf, refreshes its statistics and may split
/// it in two. Reads never modify the forest.
///
/// The forest is not synchronised: updates need `&mut self`. Readers that must
/// not block a writer can work on a [`Clone`].
///
/// # Example
///
/// ```
/// use adaptree::{RefinementForest, TreeConfig};
///
/// let config = TreeConfig::default();
/// let mut forest = RefinementForest::from_config(&config);
/// forest.update(3, &[0.25, 1.0], 5.0, 1.0, &config).unwrap();
///
/// let estimate = forest.lookup(3, &[0.25, 1.0]);
/// assert_eq!(estimate.mean, 5.0);
/// assert!(forest.lookup(4, &[0.0, 0.0]).is_missing());
/// ```
#[derive(Debug, Clone)]
pub struct RefinementForest<R = Xoshiro256PlusPlus, S = MinilpSolver> {
    arena: NodeArena,
    index: ForestIndex,
    dimension: Option<usize>,
    rng: R,
    solver: S,
}

impl RefinementForest {
    /// Empty forest with the default generator seeded with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_parts(Xoshiro256PlusPlus::seed_from_u64(seed), MinilpSolver)
    }

    /// Empty forest seeded from `config.seed`.
    pub fn from_config(config: &TreeConfig) -> Self {
        Self::with_seed(config.seed)
    }
}

impl Default for RefinementForest {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RefinementForest<R, MinilpSolver> {
    /// Empty forest drawing split tie-breaks from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self::with_parts(rng, MinilpSolver)
    }
}

impl<R: Rng, S: LpSolver> RefinementForest<R, S> {
    /// Empty forest with an explicit generator and correction solver.
    pub fn with_parts(rng: R, solver: S) -> Self {
        Self {
            arena: NodeArena::new(),
            index: ForestIndex::new(),
            dimension: None,
            rng,
            solver,
        }
    }

    /// Learn from one observation.
    ///
    /// `delta` scales the indifference margin of the split test and is meant
    /// to be the caller's current step size.
    ///
    /// # Errors
    ///
    /// Rejects empty points, points whose length differs from earlier
    /// updates, and non-finite values or coordinates. Nothing is modified
    /// when an error is returned.
    pub fn update(
        &mut self,
        label: Label,
        point: &[f64],
        value: f64,
        delta: f64,
        config: &TreeConfig,
    ) -> Result<UpdateOutcome, RefineError> {
        self.check_point(point)?;
        if !value.is_finite() {
            return Err(RefineError::NonFiniteValue(value));
        }
        self.dimension = Some(point.len());

        let root = self.index.resolve_or_create(label, &mut self.arena);
        let leaf = self.arena.descend(root, point);
        self.update_leaf(leaf, point, value, delta, config)
    }

    fn check_point(&self, point: &[f64]) -> Result<(), RefineError> {
        if point.is_empty() {
            return Err(RefineError::EmptyPoint);
        }
        if let Some(expected) = self.dimension {
            if expected != point.len() {
                return Err(RefineError::DimensionMismatch {
                    expected,
                    got: point.len(),
                });
            }
        }
        if let Some((dimension, &value)) = point.iter().enumerate().find(|(_, x)| !x.is_finite()) {
            return Err(RefineError::NonFiniteCoordinate { dimension, value });
        }
        Ok(())
    }

    fn update_leaf(
        &mut self,
        leaf: NodeId,
        point: &[f64],
        value: f64,
        delta: f64,
        config: &TreeConfig,
    ) -> Result<UpdateOutcome, RefineError> {
        let params = config.filter_params(delta);
        let predictor = self
            .arena
            .get_mut(leaf)
            .predictor_mut()
            .ok_or(RefineError::NotALeaf(leaf))?;

        predictor.observe(point, value, config.q_learn_rate, &params);
        match predictor.decide(config.filter_val, &mut self.rng) {
            LeafDecision::Split(dimension) => Ok(self.split_leaf(leaf, dimension)),
            LeafDecision::Keep { rebalanced: true } => Ok(UpdateOutcome::Rebalanced { leaf }),
            LeafDecision::Keep { rebalanced: false } => Ok(UpdateOutcome::Observed { leaf }),
        }
    }

    /// Turn `leaf` into an internal node with two fresh leaves.
    fn split_leaf(&mut self, leaf: NodeId, dimension: usize) -> UpdateOutcome {
        let predictor = match self.arena.replace(leaf, Node::default()) {
            Node::Leaf(predictor) => predictor,
            Node::Internal { .. } => unreachable!("split_leaf called on internal node {leaf}"),
        };

        let boundary = predictor.dimensions()[dimension].midpoint.mean();
        let (low_leaf, high_leaf) = predictor.children(dimension);
        let (low_count, high_count) = (low_leaf.value().count(), high_leaf.value().count());
        let correction: Option<Correction> = fit_correction(&predictor, &self.solver);
        drop(predictor);

        let low = self.arena.push(Node::Leaf(low_leaf));
        let high = self.arena.push(Node::Leaf(high_leaf));
        let split = Split {
            dimension,
            boundary,
            low,
            high,
        };
        tracing::debug!(
            node = leaf,
            dimension,
            boundary,
            low_count,
            high_count,
            corrected = correction.is_some(),
            "split leaf"
        );
        self.arena.replace(leaf, Node::Internal { split, correction });
        UpdateOutcome::Split { node: leaf, split }
    }
}

impl<R, S> RefinementForest<R, S> {
    /// Current estimate for `label` at `point`.
    ///
    /// Returns [`Estimate::missing`] if the label has never been updated or
    /// if `point` does not have the forest's dimension.
    pub fn lookup(&self, label: Label, point: &[f64]) -> Estimate {
        if !self.fits(point) {
            return Estimate::missing();
        }
        match self.index.resolve(label) {
            Some(root) => self.leaf_estimate(root, point),
            None => Estimate::missing(),
        }
    }

    /// Points of the wrong length would index past a split dimension.
    #[inline]
    fn fits(&self, point: &[f64]) -> bool {
        self.dimension.map_or(true, |d| point.len() == d)
    }

    fn leaf_estimate(&self, root: NodeId, point: &[f64]) -> Estimate {
        let leaf = self.arena.descend(root, point);
        match self.arena.get(leaf).predictor() {
            Some(p) => Estimate::from_predictor(p),
            None => Estimate::missing(),
        }
    }

    /// Best mean over labels at `point`.
    ///
    /// With `candidates == None` every known label competes; otherwise only
    /// the given labels, which must be sorted ascending. Labels whose mean is
    /// NaN or infinite are skipped. If nothing qualifies, or `point` does not
    /// have the forest's dimension, the result is `+∞` when minimising and
    /// `−∞` when maximising.
    pub fn best_q(&self, point: &[f64], minimize: bool, candidates: Option<&[Label]>) -> f64 {
        let init = if minimize {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        if !self.fits(point) {
            return init;
        }
        let pick = |best: f64, root: NodeId| {
            let v = self.leaf_estimate(root, point).mean;
            if !v.is_finite() {
                best
            } else if minimize {
                best.min(v)
            } else {
                best.max(v)
            }
        };

        match candidates {
            None => self.index.iter().map(|(_, root)| root).fold(init, pick),
            Some(labels) => self.index.matching(labels).fold(init, pick),
        }
    }

    /// Root node of `label`'s tree.
    #[inline]
    pub fn root(&self, label: Label) -> Option<NodeId> {
        self.index.resolve(label)
    }

    /// Known labels in ascending order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.index.iter().map(|(label, _)| label)
    }

    /// Number of labels.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total node count across all trees.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.arena.len()
    }

    /// Dimension fixed by the first update, if any.
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// # Panics
    ///
    /// Panics if `id` is not a node of this forest.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    /// Correction stored when node `id` split, if any.
    pub fn correction(&self, id: NodeId) -> Option<&Correction> {
        self.arena.get(id).correction()
    }

    /// Number of leaves in `label`'s tree (0 for an unknown label).
    pub fn leaf_count(&self, label: Label) -> usize {
        let Some(root) = self.index.resolve(label) else {
            return 0;
        };
        let mut stack = vec![root];
        let mut leaves = 0;
        while let Some(id) = stack.pop() {
            match self.arena.get(id) {
                Node::Leaf(_) => leaves += 1,
                Node::Internal { split, .. } => {
                    stack.push(split.low);
                    stack.push(split.high);
                }
            }
        }
        leaves
    }

    pub(crate) fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub(crate) fn index(&self) -> &ForestIndex {
        &self.index
    }
}
