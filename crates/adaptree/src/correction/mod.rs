//! Linear correction fitted when a leaf splits.
//!
//! The fit finds one weight per dimension plus an intercept such that the
//! linear model, evaluated at the centre of every partition the leaf tracked,
//! is as close as possible to that partition's mean value. Deviations are
//! absorbed by non-negative slack pairs whose cost grows with the confidence
//! of the partition, so tight partitions pull harder on the fit:
//!
//! ```text
//! min  Σ c⁺·s⁺ + c⁻·s⁻
//! s.t. Σ_i w_i·x_i + b + s⁺ − s⁻ = mean(side)   for every (dimension, side)
//!      c⁺ = 1 / (1 + r²),  c⁻ = 1 / (1 + r),  r = sd(side) / sd(leaf)
//! ```
//!
//! `x_d` is the side's own centre on the row's dimension `d`; every other
//! coordinate is the dimension's combined centre.

mod lp;

pub use lp::{EqualityRow, LinearProgram, LpSolver, MinilpSolver, SolveError, VarBounds};

use crate::tree::{Correction, Predictor};

/// Build the correction program for a leaf about to split.
///
/// Returns `None` when the leaf's values have zero variance (its mean is
/// already exact) or when no partition holds an observation.
pub fn correction_program(predictor: &Predictor) -> Option<LinearProgram> {
    let leaf_sd = predictor.value().std_dev();
    if !(leaf_sd > 0.0) {
        return None;
    }
    let dims = predictor.dimensions();
    let dimen = dims.len();

    let mut lp = LinearProgram::new();
    for _ in 0..=dimen {
        lp.add_var(0.0, VarBounds::Free);
    }
    let intercept = dimen;

    let centres: Vec<f64> = dims
        .iter()
        .map(|s| {
            let combined = s.combined_mid();
            if combined.is_empty() {
                s.midpoint.mean()
            } else {
                combined.mean()
            }
        })
        .collect();

    for (d, stats) in dims.iter().enumerate() {
        for (value, mid) in [
            (&stats.low_value, &stats.low_mid),
            (&stats.high_value, &stats.high_mid),
        ] {
            if value.is_empty() {
                continue;
            }
            let r = value.std_dev() / leaf_sd;
            let pos = lp.add_var(1.0 / (1.0 + r * r), VarBounds::NonNegative);
            let neg = lp.add_var(1.0 / (1.0 + r), VarBounds::NonNegative);

            let mut terms: Vec<(usize, f64)> = centres
                .iter()
                .enumerate()
                .map(|(i, &c)| (i, if i == d { mid.mean() } else { c }))
                .collect();
            terms.push((intercept, 1.0));
            terms.push((pos, 1.0));
            terms.push((neg, -1.0));

            tracing::trace!(dimension = d, ?terms, rhs = value.mean(), "correction row");
            lp.add_equality(terms, value.mean());
        }
    }

    if lp.rows().is_empty() {
        return None;
    }
    Some(lp)
}

/// Fit the correction for a leaf about to split.
///
/// Solver failures are not errors: the leaf simply gets no correction.
pub fn fit_correction<S: LpSolver + ?Sized>(predictor: &Predictor, solver: &S) -> Option<Correction> {
    let program = correction_program(predictor)?;
    let dimen = predictor.dimensions().len();
    match solver.solve(&program) {
        Ok(solution) if solution.len() > dimen => {
            let coefficients = solution[..=dimen].to_vec();
            if coefficients.iter().all(|c| c.is_finite()) {
                Some(Correction::from_coefficients(coefficients))
            } else {
                tracing::debug!("correction solve returned non-finite coefficients");
                None
            }
        }
        Ok(solution) => {
            tracing::debug!(
                got = solution.len(),
                expected = program.n_vars(),
                "correction solve returned a short solution"
            );
            None
        }
        Err(err) => {
            tracing::debug!(%err, "correction solve failed");
            None
        }
    }
}
