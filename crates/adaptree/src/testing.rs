//! Synthetic observation streams for tests and benchmarks.

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// `rows` points with `cols` coordinates drawn uniformly from `[low, high)`.
pub fn random_points(rows: usize, cols: usize, seed: u64, low: f64, high: f64) -> Vec<Vec<f64>> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.gen_range(low..high)).collect())
        .collect()
}

/// Step function on one coordinate: `below` if `point[dimension] < step`,
/// otherwise `above`.
pub fn step_targets(points: &[Vec<f64>], dimension: usize, step: f64, below: f64, above: f64) -> Vec<f64> {
    points
        .iter()
        .map(|p| if p[dimension] < step { below } else { above })
        .collect()
}

/// Linear targets `Σ w_i x_i + bias` with uniform noise in `[-noise, noise]`.
pub fn linear_targets(points: &[Vec<f64>], weights: &[f64], bias: f64, seed: u64, noise: f64) -> Vec<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    points
        .iter()
        .map(|p| {
            let clean: f64 = p.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>() + bias;
            if noise > 0.0 {
                clean + rng.gen_range(-noise..noise)
            } else {
                clean
            }
        })
        .collect()
}
