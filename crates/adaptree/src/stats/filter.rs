//! Online evidence that two partitions of a leaf predict different values.

use serde::{Deserialize, Serialize};

use super::RunningStat;

/// Thresholds driving a [`SplitFilter`] update.
///
/// Built once per leaf update from the tree configuration and the caller's
/// step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Mean differences at or below this margin count as no difference.
    pub indifference: f64,
    /// Statistic value at which a partition starts to produce evidence.
    pub lower_t: f64,
    /// Statistic value at which a partition produces full evidence.
    pub upper_t: f64,
    /// Bound on the absolute value of the statistic.
    pub limit: f64,
    /// Weight of the newest signal in the decayed evidence, in `(0, 1]`.
    pub decay: f64,
}

/// Decayed evidence that the low and high value streams of one dimension differ.
///
/// Two directional channels are kept, "low below high" and "low above high".
/// Each update computes, per channel, the mean difference in excess of the
/// indifference margin divided by the standard error of the difference
/// (bounded to `[-limit, limit]`). The statistic maps linearly to a signal in
/// `[0, 1]` between `lower_t` and `upper_t`, and each channel keeps an
/// exponentially decayed average of its signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitFilter {
    below: f64,
    above: f64,
}

impl SplitFilter {
    pub const fn new() -> Self {
        Self {
            below: 0.0,
            above: 0.0,
        }
    }

    /// Refresh the evidence from the current partition statistics.
    ///
    /// If either partition is empty there is nothing to compare and the
    /// evidence only decays.
    pub fn add(&mut self, low: &RunningStat, high: &RunningStat, params: &FilterParams) {
        let keep = 1.0 - params.decay;
        if low.is_empty() || high.is_empty() {
            self.below *= keep;
            self.above *= keep;
            return;
        }

        let diff = high.mean() - low.mean();
        let spread =
            (low.variance() / low.count() as f64 + high.variance() / high.count() as f64).sqrt();

        let below = signal(
            bounded_statistic(diff - params.indifference, spread, params.limit),
            params,
        );
        let above = signal(
            bounded_statistic(-diff - params.indifference, spread, params.limit),
            params,
        );

        self.below = keep * self.below + params.decay * below;
        self.above = keep * self.above + params.decay * above;
    }

    /// Current evidence: the stronger of the two channels.
    #[inline]
    pub fn max(&self) -> f64 {
        self.below.max(self.above)
    }

    /// Forget all evidence.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// `excess / spread`, bounded to `[-limit, limit]`.
///
/// A zero spread means both partitions are perfectly confident, so any
/// positive excess is maximal evidence.
fn bounded_statistic(excess: f64, spread: f64, limit: f64) -> f64 {
    let raw = if spread > 0.0 && spread.is_finite() {
        excess / spread
    } else if excess > 0.0 {
        limit
    } else {
        -limit
    };
    if raw.is_nan() {
        return -limit;
    }
    raw.clamp(-limit, limit)
}

fn signal(statistic: f64, params: &FilterParams) -> f64 {
    let width = params.upper_t - params.lower_t;
    if width <= 0.0 {
        return if statistic >= params.upper_t { 1.0 } else { 0.0 };
    }
    ((statistic - params.lower_t) / width).clamp(0.0, 1.0)
}
