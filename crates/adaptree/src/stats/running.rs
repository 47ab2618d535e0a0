//! Single-pass mean/variance accumulator.

use serde::{Deserialize, Serialize};

/// Running count, mean and (population) variance of a scalar stream.
///
/// Updates use Welford's recurrence on the variance directly, so the struct
/// never stores a sum of squares that could lose precision on long streams.
/// An empty stat has `count == 0` and reports zero for both mean and variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStat {
    count: u64,
    mean: f64,
    variance: f64,
}

impl RunningStat {
    /// Create an empty accumulator.
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            variance: 0.0,
        }
    }

    /// Create a stat from its parts. Negative or NaN variance is clamped to zero.
    pub fn from_parts(count: u64, mean: f64, variance: f64) -> Self {
        if count == 0 {
            return Self::new();
        }
        Self {
            count,
            mean,
            variance: sanitize_variance(variance),
        }
    }

    /// A single-sample stat: `count = 1`, the given mean, zero variance.
    pub fn point(mean: f64) -> Self {
        Self::from_parts(1, mean, 0.0)
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Square root of the variance.
    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Incorporate one sample in O(1).
    pub fn observe(&mut self, value: f64) {
        debug_assert!(value.is_finite(), "observed non-finite value {value}");
        self.count += 1;
        if self.count == 1 {
            self.mean = value;
            self.variance = 0.0;
            return;
        }
        let n = self.count as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        let delta2 = value - self.mean;
        // population variance: var_n = ((n-1) var_{n-1} + delta * delta2) / n
        self.variance = sanitize_variance(((n - 1.0) * self.variance + delta * delta2) / n);
    }

    /// Clamp the count to `limit`.
    ///
    /// Applied before [`observe`](Self::observe), this turns the running
    /// average into an exponential average with step `1 / (limit + 1)` once
    /// the stream is long enough.
    #[inline]
    pub fn cap_count(&mut self, limit: u64) {
        self.count = self.count.min(limit);
    }

    /// Halve the count, keeping at least one sample on a non-empty stat.
    #[inline]
    pub fn halve_count(&mut self) {
        if self.count > 0 {
            self.count = (self.count / 2).max(1);
        }
    }

    /// Combine with an independently accumulated stream.
    ///
    /// The result is the count-weighted mean and the pooled population
    /// variance of both streams. Empty operands contribute nothing.
    pub fn merge(&mut self, other: &RunningStat) {
        *self = Self::combined(self, other);
    }

    /// Merged view of two stats, leaving both untouched.
    pub fn combined(a: &RunningStat, b: &RunningStat) -> RunningStat {
        if b.count == 0 {
            return *a;
        }
        if a.count == 0 {
            return *b;
        }
        let count = a.count + b.count;
        let (na, nb, n) = (a.count as f64, b.count as f64, count as f64);
        let mean = (a.mean * na + b.mean * nb) / n;
        let da = a.mean - mean;
        let db = b.mean - mean;
        let variance = (na * (a.variance + da * da) + nb * (b.variance + db * db)) / n;
        RunningStat::from_parts(count, mean, variance)
    }

    /// Merge used when a split boundary is moved.
    ///
    /// Same mean and variance as [`combined`](Self::combined), but the count
    /// is halved so that copying the result onto both partitions does not
    /// double the evidence behind either side.
    pub fn approximate_merge(a: &RunningStat, b: &RunningStat) -> RunningStat {
        let mut merged = Self::combined(a, b);
        merged.halve_count();
        merged
    }
}

#[inline]
fn sanitize_variance(variance: f64) -> f64 {
    if variance.is_finite() && variance > 0.0 {
        variance
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn from_slice(values: &[f64]) -> RunningStat {
        let mut stat = RunningStat::new();
        for &v in values {
            stat.observe(v);
        }
        stat
    }

    fn naive(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    #[test]
    fn empty_stat_is_zero() {
        let stat = RunningStat::new();
        assert!(stat.is_empty());
        assert_eq!(stat.mean(), 0.0);
        assert_eq!(stat.variance(), 0.0);
    }

    #[test]
    fn observe_matches_two_pass() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stat = from_slice(&values);
        let (mean, var) = naive(&values);
        assert_eq!(stat.count(), 8);
        assert_abs_diff_eq!(stat.mean(), mean, epsilon = 1e-12);
        assert_abs_diff_eq!(stat.variance(), var, epsilon = 1e-12);
        assert_abs_diff_eq!(stat.std_dev(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn observe_is_stable_with_large_offset() {
        let values: Vec<f64> = (0..1000).map(|i| 1e9 + (i % 10) as f64).collect();
        let stat = from_slice(&values);
        let (_, var) = naive(&values);
        assert_abs_diff_eq!(stat.variance(), var, epsilon = 1e-6);
    }

    #[test]
    fn merge_equals_concatenation() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 11.0, 12.0, 13.0, 14.0];
        let mut merged = from_slice(&a);
        merged.merge(&from_slice(&b));

        let all: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        let (mean, var) = naive(&all);
        assert_eq!(merged.count(), 8);
        assert_abs_diff_eq!(merged.mean(), mean, epsilon = 1e-12);
        assert_abs_diff_eq!(merged.variance(), var, epsilon = 1e-12);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let a = from_slice(&[1.0, 5.0]);
        let mut left = a;
        left.merge(&RunningStat::new());
        assert_eq!(left, a);

        let mut right = RunningStat::new();
        right.merge(&a);
        assert_eq!(right, a);
    }

    #[test]
    fn approximate_merge_halves_count() {
        let a = from_slice(&[0.0, 0.0, 0.0, 0.0]);
        let b = from_slice(&[2.0, 2.0]);
        let merged = RunningStat::approximate_merge(&a, &b);
        assert_eq!(merged.count(), 3);
        assert_abs_diff_eq!(merged.mean(), 2.0 / 3.0, epsilon = 1e-12);
        assert!(merged.variance() > 0.0);
    }

    #[test]
    fn approximate_merge_never_zeroes_a_non_empty_stat() {
        let a = RunningStat::point(3.0);
        let merged = RunningStat::approximate_merge(&a, &RunningStat::new());
        assert_eq!(merged.count(), 1);
        assert_eq!(merged.mean(), 3.0);
    }

    #[test]
    fn capped_count_tracks_recent_values() {
        let mut stat = RunningStat::new();
        for _ in 0..100 {
            stat.cap_count(4);
            stat.observe(0.0);
        }
        for _ in 0..100 {
            stat.cap_count(4);
            stat.observe(1.0);
        }
        assert_eq!(stat.count(), 5);
        assert_abs_diff_eq!(stat.mean(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn from_parts_sanitizes_variance() {
        let stat = RunningStat::from_parts(3, 1.0, f64::NAN);
        assert_eq!(stat.variance(), 0.0);
        let stat = RunningStat::from_parts(3, 1.0, -1.0);
        assert_eq!(stat.variance(), 0.0);
        let stat = RunningStat::from_parts(0, 9.0, 4.0);
        assert!(stat.is_empty());
        assert_eq!(stat.mean(), 0.0);
    }
}
