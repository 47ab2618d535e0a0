//! Leaf payload: value estimate plus per-dimension partition statistics.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::{FilterParams, RunningStat, SplitFilter};

/// Base of the imbalance test used when recentering a midpoint.
const REBALANCE_BASE: f64 = 5.0;

/// Bookkeeping for one input dimension of a live leaf.
///
/// Every observation falls in the low partition if its coordinate is at or
/// below the current midpoint estimate, otherwise in the high partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionStats {
    /// Candidate split boundary.
    pub midpoint: RunningStat,
    /// Values observed in the low partition.
    pub low_value: RunningStat,
    /// Values observed in the high partition.
    pub high_value: RunningStat,
    /// Coordinates observed in the low partition.
    pub low_mid: RunningStat,
    /// Coordinates observed in the high partition.
    pub high_mid: RunningStat,
    /// Evidence that the two partitions differ.
    pub filter: SplitFilter,
}

impl DimensionStats {
    /// Stats seeded with a midpoint estimate and nothing else.
    pub fn with_midpoint(midpoint: RunningStat) -> Self {
        Self {
            midpoint,
            ..Default::default()
        }
    }

    /// Combined low and high coordinate statistics.
    #[inline]
    pub fn combined_mid(&self) -> RunningStat {
        RunningStat::combined(&self.low_mid, &self.high_mid)
    }

    fn observe(&mut self, coordinate: f64, value: f64) {
        if coordinate <= self.midpoint.mean() {
            self.low_value.observe(value);
            self.low_mid.observe(coordinate);
        } else {
            self.high_value.observe(value);
            self.high_mid.observe(coordinate);
        }
    }

    /// Recenter the midpoint if one partition dwarfs the other.
    ///
    /// Returns true if the partitions were rewritten.
    fn rebalance(&mut self) -> bool {
        let mx = self.low_mid.count().max(self.high_mid.count());
        let mn = self.low_mid.count().min(self.high_mid.count());
        if mx < 2 || REBALANCE_BASE.powf(mn as f64) >= mx as f64 || mx <= self.midpoint.count() {
            return false;
        }

        let merged = self.combined_mid();
        if merged.mean() == self.midpoint.mean() {
            return false;
        }

        self.midpoint.merge(&merged);
        self.low_mid = merged;
        self.high_mid = merged;
        self.low_mid.halve_count();
        self.high_mid.halve_count();

        let value = RunningStat::approximate_merge(&self.low_value, &self.high_value);
        self.low_value = value;
        self.high_value = value;
        true
    }
}

/// What a leaf decided after absorbing an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafDecision {
    /// Split on this dimension.
    Split(usize),
    /// No split; `rebalanced` reports whether any midpoint moved.
    Keep { rebalanced: bool },
}

/// Payload of a leaf node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predictor {
    value: RunningStat,
    samples: u64,
    dimensions: Vec<DimensionStats>,
}

impl Predictor {
    /// A fresh child predictor.
    pub(crate) fn seeded(value: RunningStat, midpoints: impl IntoIterator<Item = RunningStat>) -> Self {
        Self {
            value,
            samples: value.count(),
            dimensions: midpoints
                .into_iter()
                .map(DimensionStats::with_midpoint)
                .collect(),
        }
    }

    /// The leaf's value estimate.
    #[inline]
    pub fn value(&self) -> &RunningStat {
        &self.value
    }

    /// Number of observations routed to this leaf (uncapped).
    #[inline]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Per-dimension statistics; empty until the first observation.
    #[inline]
    pub fn dimensions(&self) -> &[DimensionStats] {
        &self.dimensions
    }

    /// Absorb one observation and refresh every split filter.
    pub(crate) fn observe(&mut self, point: &[f64], value: f64, learn_cap: u64, params: &FilterParams) {
        if self.dimensions.len() != point.len() {
            self.dimensions.resize(point.len(), DimensionStats::default());
        }

        self.value.cap_count(learn_cap);
        self.value.observe(value);
        self.samples += 1;

        for (stats, &x) in self.dimensions.iter_mut().zip(point) {
            stats.observe(x, value);
            stats.filter.add(&stats.low_value, &stats.high_value, params);
        }
    }

    /// Choose a split dimension, or rebalance if none qualifies.
    ///
    /// Candidates are all dimensions whose evidence reached `threshold`; one
    /// is drawn uniformly by reservoir sampling so low indices are not
    /// favoured.
    pub(crate) fn decide<R: Rng>(&mut self, threshold: f64, rng: &mut R) -> LeafDecision {
        let mut candidates = 0u32;
        let mut chosen = 0;
        for (i, stats) in self.dimensions.iter().enumerate() {
            if stats.filter.max() >= threshold {
                candidates += 1;
                if rng.gen_range(0..candidates) == 0 {
                    chosen = i;
                }
            }
        }
        if candidates > 0 {
            return LeafDecision::Split(chosen);
        }

        LeafDecision::Keep {
            rebalanced: self.rebalance(),
        }
    }

    /// Recenter unbalanced midpoints. Resets every filter if any moved.
    pub(crate) fn rebalance(&mut self) -> bool {
        let mut moved = false;
        for (i, stats) in self.dimensions.iter_mut().enumerate() {
            if stats.rebalance() {
                tracing::trace!(
                    dimension = i,
                    midpoint = stats.midpoint.mean(),
                    "recentered split midpoint"
                );
                moved = true;
            }
        }
        if moved {
            self.dimensions.iter_mut().for_each(|s| s.filter.reset());
        }
        moved
    }

    /// Build the low and high children for a split on `dimension`.
    ///
    /// A child whose partition is empty starts from this leaf's mean with a
    /// single sample, so neither child is ever created without a prediction.
    pub(crate) fn children(&self, dimension: usize) -> (Predictor, Predictor) {
        let parent = &self.dimensions[dimension];
        let fallback = |seed: RunningStat| {
            if seed.is_empty() && !self.value.is_empty() {
                RunningStat::point(self.value.mean())
            } else {
                seed
            }
        };

        let mids = |low_side: bool| {
            self.dimensions.iter().enumerate().map(move |(i, stats)| {
                if i != dimension {
                    stats.combined_mid()
                } else if low_side {
                    stats.low_mid
                } else {
                    stats.high_mid
                }
            })
        };

        (
            Predictor::seeded(fallback(parent.low_value), mids(true)),
            Predictor::seeded(fallback(parent.high_value), mids(false)),
        )
    }
}
