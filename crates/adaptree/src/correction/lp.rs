//! Minimal linear-program description and the solver seam.
//!
//! Corrections only ever need "minimise a linear objective subject to
//! equality rows, with free or non-negative variables", so that is all
//! [`LinearProgram`] can express. Any backend implementing [`LpSolver`] can
//! be plugged into a forest; [`MinilpSolver`] is the default.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

/// Errors reported by an [`LpSolver`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    #[error("linear program is infeasible")]
    Infeasible,
    #[error("linear program is unbounded")]
    Unbounded,
    /// The program references unknown variables or non-finite numbers.
    #[error("malformed linear program: {0}")]
    Malformed(String),
}

/// Domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarBounds {
    /// Any real value.
    Free,
    /// `x >= 0`.
    NonNegative,
}

impl VarBounds {
    fn range(self) -> (f64, f64) {
        match self {
            Self::Free => (f64::NEG_INFINITY, f64::INFINITY),
            Self::NonNegative => (0.0, f64::INFINITY),
        }
    }
}

/// One equality constraint `Σ coeff · x[var] = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualityRow {
    pub terms: Vec<(usize, f64)>,
    pub rhs: f64,
}

/// Minimisation problem over equality rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    objective: Vec<f64>,
    bounds: Vec<VarBounds>,
    rows: Vec<EqualityRow>,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable with its objective coefficient; returns its index.
    pub fn add_var(&mut self, objective: f64, bounds: VarBounds) -> usize {
        self.objective.push(objective);
        self.bounds.push(bounds);
        self.objective.len() - 1
    }

    pub fn add_equality(&mut self, terms: Vec<(usize, f64)>, rhs: f64) {
        self.rows.push(EqualityRow { terms, rhs });
    }

    #[inline]
    pub fn n_vars(&self) -> usize {
        self.objective.len()
    }

    #[inline]
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    #[inline]
    pub fn bounds(&self) -> &[VarBounds] {
        &self.bounds
    }

    #[inline]
    pub fn rows(&self) -> &[EqualityRow] {
        &self.rows
    }

    /// Objective value of a candidate solution.
    pub fn evaluate(&self, solution: &[f64]) -> f64 {
        self.objective.iter().zip(solution).map(|(c, x)| c * x).sum()
    }

    /// Check variable references and that every number is finite.
    pub fn validate(&self) -> Result<(), SolveError> {
        if let Some(i) = self.objective.iter().position(|c| !c.is_finite()) {
            return Err(SolveError::Malformed(format!(
                "objective coefficient {i} is not finite"
            )));
        }
        for (r, row) in self.rows.iter().enumerate() {
            if !row.rhs.is_finite() {
                return Err(SolveError::Malformed(format!("row {r} has non-finite rhs")));
            }
            for &(var, coeff) in &row.terms {
                if var >= self.n_vars() {
                    return Err(SolveError::Malformed(format!(
                        "row {r} references variable {var} of {}",
                        self.n_vars()
                    )));
                }
                if !coeff.is_finite() {
                    return Err(SolveError::Malformed(format!(
                        "row {r} has non-finite coefficient for variable {var}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A linear-program backend.
///
/// Returns the primal value of every variable at an optimum, or an error if
/// no optimum exists.
pub trait LpSolver {
    fn solve(&self, program: &LinearProgram) -> Result<Vec<f64>, SolveError>;
}

impl<S: LpSolver + ?Sized> LpSolver for &S {
    fn solve(&self, program: &LinearProgram) -> Result<Vec<f64>, SolveError> {
        (**self).solve(program)
    }
}

/// Dense simplex backend built on `minilp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinilpSolver;

impl LpSolver for MinilpSolver {
    fn solve(&self, program: &LinearProgram) -> Result<Vec<f64>, SolveError> {
        program.validate()?;

        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<_> = program
            .objective()
            .iter()
            .zip(program.bounds())
            .map(|(&c, b)| problem.add_var(c, b.range()))
            .collect();

        for row in program.rows() {
            let mut expr = LinearExpr::empty();
            for &(var, coeff) in &row.terms {
                expr.add(vars[var], coeff);
            }
            problem.add_constraint(expr, ComparisonOp::Eq, row.rhs);
        }

        let solution = problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => SolveError::Infeasible,
            minilp::Error::Unbounded => SolveError::Unbounded,
        })?;
        Ok(vars.iter().map(|&v| solution[v]).collect())
    }
}
