//! Quadratic programs over the long-only, fully-invested simplex and the
//! solver backends that handle them.
//!
//! Every problem has the form
//!
//! ```text
//! minimize    ½ wᵀ H w − cᵀ w
//! subject to  Σ w = 1,  w ≥ 0
//! ```
//!
//! with `H` positive semidefinite. Backends implement [`QpSolver`] and can be
//! swapped without touching the optimizer.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::linalg::{
    equal_weights, mat_vec_multiply, normalize_weights, project_onto_simplex,
    solve_linear_system,
};
use crate::error::AllocatorError;
use crate::types::Matrix;
use crate::AllocatorResult;

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// A convex QP on the simplex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadraticProgram {
    /// Symmetric PSD matrix `H` of the quadratic term.
    pub hessian: Matrix,
    /// Vector `c` of the linear reward term.
    pub linear: Vec<Decimal>,
}

impl QuadraticProgram {
    pub fn new(hessian: Matrix, linear: Vec<Decimal>) -> AllocatorResult<Self> {
        let n = linear.len();
        if hessian.len() != n {
            return Err(AllocatorError::InvalidInput {
                field: "hessian".into(),
                reason: format!("Expected {}x{} matrix but got {} rows", n, n, hessian.len()),
            });
        }
        for (i, row) in hessian.iter().enumerate() {
            if row.len() != n {
                return Err(AllocatorError::InvalidInput {
                    field: "hessian".into(),
                    reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
                });
            }
        }
        Ok(QuadraticProgram { hessian, linear })
    }

    pub fn dimension(&self) -> usize {
        self.linear.len()
    }

    /// H w − c
    pub fn gradient(&self, w: &[Decimal]) -> Vec<Decimal> {
        mat_vec_multiply(&self.hessian, w)
            .into_iter()
            .zip(self.linear.iter())
            .map(|(hw, c)| hw - *c)
            .collect()
    }
}

/// A backend able to solve [`QuadraticProgram`]s.
///
/// `Ok` carries the optimal weights; any `Err` means no optimal point was
/// found and the caller must not use a partial answer.
pub trait QpSolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &QuadraticProgram) -> AllocatorResult<Vec<Decimal>>;
}

// ---------------------------------------------------------------------------
// Active-set backend
// ---------------------------------------------------------------------------

/// Primal active-set method on the non-negativity bounds.
///
/// Each iteration solves the equality-constrained subproblem on the free
/// weights through its KKT system, then either steps until a weight hits
/// zero or, at a stationary point, releases the bound with the most negative
/// multiplier. Terminates at the exact optimum up to working precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSetSolver {
    pub max_iterations: u32,
    /// Step and multiplier threshold treated as zero.
    pub tolerance: Decimal,
    /// Ridge added to the Hessian diagonal so KKT systems stay non-singular
    /// when `H` is singular (e.g. a purely linear objective).
    pub regularization: Decimal,
}

impl Default for ActiveSetSolver {
    fn default() -> Self {
        ActiveSetSolver {
            max_iterations: 500,
            tolerance: dec!(0.0000000001),
            regularization: dec!(0.000000000001),
        }
    }
}

impl ActiveSetSolver {
    /// Solve the KKT system of the subproblem restricted to `free`:
    ///
    /// ```text
    /// [ H_FF  1 ] [ p ]   [ −g_F ]
    /// [ 1ᵀ    0 ] [ λ ] = [  0   ]
    /// ```
    fn equality_step(
        &self,
        hessian: &[Vec<Decimal>],
        grad: &[Decimal],
        free: &[usize],
    ) -> AllocatorResult<(Vec<Decimal>, Decimal)> {
        let m = free.len();
        let mut kkt: Matrix = vec![vec![Decimal::ZERO; m + 1]; m + 1];
        let mut rhs = vec![Decimal::ZERO; m + 1];
        for (r, &i) in free.iter().enumerate() {
            for (c, &j) in free.iter().enumerate() {
                kkt[r][c] = hessian[i][j];
            }
            kkt[r][m] = Decimal::ONE;
            kkt[m][r] = Decimal::ONE;
            rhs[r] = -grad[i];
        }
        let mut x = solve_linear_system(&kkt, &rhs)?;
        let lambda = x.pop().unwrap_or_default();
        Ok((x, lambda))
    }
}

impl QpSolver for ActiveSetSolver {
    fn name(&self) -> &'static str {
        "active_set"
    }

    fn solve(&self, problem: &QuadraticProgram) -> AllocatorResult<Vec<Decimal>> {
        let n = problem.dimension();
        if n == 0 {
            return Err(AllocatorError::InsufficientData(
                "Quadratic program has no variables".into(),
            ));
        }

        let mut hessian = problem.hessian.clone();
        for (i, row) in hessian.iter_mut().enumerate() {
            row[i] += self.regularization;
        }
        let regularized = QuadraticProgram {
            hessian,
            linear: problem.linear.clone(),
        };

        let mut w = equal_weights(n);
        let mut at_bound = vec![false; n];
        let mut last_delta = Decimal::ZERO;

        for _ in 0..self.max_iterations {
            let grad = regularized.gradient(&w);
            let free: Vec<usize> = (0..n).filter(|&i| !at_bound[i]).collect();
            let (step, lambda) = self.equality_step(&regularized.hessian, &grad, &free)?;

            last_delta = step
                .iter()
                .map(|p| p.abs())
                .fold(Decimal::ZERO, |a, b| if b > a { b } else { a });

            if last_delta <= self.tolerance {
                // Stationary on the current face: the bound multiplier of
                // weight i is g_i + λ and must be non-negative at the optimum.
                let release = (0..n)
                    .filter(|&i| at_bound[i])
                    .map(|i| (i, grad[i] + lambda))
                    .min_by(|a, b| a.1.cmp(&b.1));
                match release {
                    Some((i, multiplier)) if multiplier < -self.tolerance => {
                        at_bound[i] = false;
                    }
                    _ => {
                        normalize_weights(&mut w);
                        return Ok(w);
                    }
                }
                continue;
            }

            let mut alpha = Decimal::ONE;
            let mut blocking: Option<usize> = None;
            for (k, &i) in free.iter().enumerate() {
                if step[k] < Decimal::ZERO {
                    let ratio = -w[i] / step[k];
                    if ratio < alpha {
                        alpha = ratio;
                        blocking = Some(i);
                    }
                }
            }

            for (k, &i) in free.iter().enumerate() {
                w[i] += alpha * step[k];
            }
            if let Some(i) = blocking {
                w[i] = Decimal::ZERO;
                at_bound[i] = true;
            }
        }

        Err(AllocatorError::ConvergenceFailure {
            solver: self.name().into(),
            iterations: self.max_iterations,
            last_delta,
        })
    }
}

// ---------------------------------------------------------------------------
// Projected-gradient backend
// ---------------------------------------------------------------------------

/// Projected gradient descent with a fixed `1/L` step and exact Euclidean
/// projection onto the simplex. `L` is the Gershgorin bound on the largest
/// eigenvalue of `H`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedGradientSolver {
    pub max_iterations: u32,
    /// Largest per-weight change accepted as converged.
    pub tolerance: Decimal,
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        ProjectedGradientSolver {
            max_iterations: 10_000,
            tolerance: dec!(0.000000000001),
        }
    }
}

/// Floor on the Lipschitz bound; a purely linear objective jumps straight
/// to the best vertex.
const MIN_LIPSCHITZ: Decimal = dec!(0.00000001);

impl QpSolver for ProjectedGradientSolver {
    fn name(&self) -> &'static str {
        "projected_gradient"
    }

    fn solve(&self, problem: &QuadraticProgram) -> AllocatorResult<Vec<Decimal>> {
        let n = problem.dimension();
        if n == 0 {
            return Err(AllocatorError::InsufficientData(
                "Quadratic program has no variables".into(),
            ));
        }

        let lipschitz = problem
            .hessian
            .iter()
            .map(|row| row.iter().map(|h| h.abs()).sum::<Decimal>())
            .fold(MIN_LIPSCHITZ, |a, b| if b > a { b } else { a });
        let step = Decimal::ONE / lipschitz;

        let mut w = equal_weights(n);
        let mut last_delta = Decimal::ZERO;

        for _ in 0..self.max_iterations {
            let grad = problem.gradient(&w);
            let target: Vec<Decimal> = w
                .iter()
                .zip(grad.iter())
                .map(|(wi, gi)| *wi - step * *gi)
                .collect();
            let next = project_onto_simplex(&target);

            last_delta = next
                .iter()
                .zip(w.iter())
                .map(|(a, b)| (*a - *b).abs())
                .fold(Decimal::ZERO, |a, b| if b > a { b } else { a });
            w = next;

            if last_delta <= self.tolerance {
                normalize_weights(&mut w);
                return Ok(w);
            }
        }

        Err(AllocatorError::ConvergenceFailure {
            solver: self.name().into(),
            iterations: self.max_iterations,
            last_delta,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(values: &[Decimal]) -> Matrix {
        let n = values.len();
        let mut m = vec![vec![Decimal::ZERO; n]; n];
        for i in 0..n {
            m[i][i] = values[i];
        }
        m
    }

    fn assert_close(a: &[Decimal], b: &[Decimal], tol: Decimal) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((*x - *y).abs() < tol, "{:?} vs {:?}", a, b);
        }
    }

    // ------------------------------------------------------------------
    // 1. Problem construction checks dimensions
    // ------------------------------------------------------------------
    #[test]
    fn test_problem_dimension_mismatch() {
        let err = QuadraticProgram::new(diag(&[dec!(1), dec!(1)]), vec![dec!(0.1)]);
        assert!(err.is_err());
        let ragged = vec![vec![dec!(1), dec!(0)], vec![dec!(1)]];
        assert!(QuadraticProgram::new(ragged, vec![dec!(0.1), dec!(0.2)]).is_err());
    }

    // ------------------------------------------------------------------
    // 2. Gradient
    // ------------------------------------------------------------------
    #[test]
    fn test_gradient() {
        let qp = QuadraticProgram::new(diag(&[dec!(2), dec!(4)]), vec![dec!(1), dec!(0)])
            .unwrap();
        let w = [dec!(0.5), dec!(0.5)];
        assert_eq!(qp.gradient(&w), vec![dec!(0), dec!(2)]);
    }

    // ------------------------------------------------------------------
    // 3. Interior optimum: min-variance of two uncorrelated assets
    // ------------------------------------------------------------------
    #[test]
    fn test_active_set_interior_optimum() {
        // Variances 0.04 and 0.01: inverse-variance weights 0.2 / 0.8.
        let qp = QuadraticProgram::new(diag(&[dec!(0.08), dec!(0.02)]), vec![dec!(0), dec!(0)])
            .unwrap();
        let w = ActiveSetSolver::default().solve(&qp).unwrap();
        assert_close(&w, &[dec!(0.2), dec!(0.8)], dec!(0.000001));
    }

    // ------------------------------------------------------------------
    // 4. Bound becomes active
    // ------------------------------------------------------------------
    #[test]
    fn test_active_set_hits_bound() {
        // Strong reward on asset 0 pushes asset 1 to zero.
        let qp = QuadraticProgram::new(diag(&[dec!(0.1), dec!(0.1)]), vec![dec!(1), dec!(0)])
            .unwrap();
        let w = ActiveSetSolver::default().solve(&qp).unwrap();
        assert_close(&w, &[dec!(1), dec!(0)], dec!(0.000001));
        assert!(w.iter().all(|wi| *wi >= Decimal::ZERO));
    }

    // ------------------------------------------------------------------
    // 5. Linear objective picks the best vertex
    // ------------------------------------------------------------------
    #[test]
    fn test_active_set_linear_objective() {
        let qp = QuadraticProgram::new(
            vec![vec![Decimal::ZERO; 3]; 3],
            vec![dec!(0.20), dec!(0.25), dec!(0.04)],
        )
        .unwrap();
        let w = ActiveSetSolver::default().solve(&qp).unwrap();
        assert_close(&w, &[dec!(0), dec!(1), dec!(0)], dec!(0.000001));
    }

    // ------------------------------------------------------------------
    // 6. Single variable is fully invested
    // ------------------------------------------------------------------
    #[test]
    fn test_single_variable() {
        let qp = QuadraticProgram::new(diag(&[dec!(0.5)]), vec![dec!(0.1)]).unwrap();
        assert_eq!(ActiveSetSolver::default().solve(&qp).unwrap(), vec![Decimal::ONE]);
        assert_eq!(
            ProjectedGradientSolver::default().solve(&qp).unwrap(),
            vec![Decimal::ONE]
        );
    }

    // ------------------------------------------------------------------
    // 7. Empty problem is rejected
    // ------------------------------------------------------------------
    #[test]
    fn test_empty_problem() {
        let qp = QuadraticProgram::new(vec![], vec![]).unwrap();
        assert!(ActiveSetSolver::default().solve(&qp).is_err());
        assert!(ProjectedGradientSolver::default().solve(&qp).is_err());
    }

    // ------------------------------------------------------------------
    // 8. Backends agree
    // ------------------------------------------------------------------
    #[test]
    fn test_backends_agree() {
        let v = [dec!(0.15), dec!(0.20), dec!(0.25)];
        let rho = [[dec!(1), dec!(0.3), dec!(0.1)], [dec!(0.3), dec!(1), dec!(0.5)], [dec!(0.1), dec!(0.5), dec!(1)]];
        let mut h = vec![vec![Decimal::ZERO; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                h[i][j] = dec!(2) * rho[i][j] * v[i] * v[j];
            }
        }
        let qp = QuadraticProgram::new(h, vec![dec!(0.10), dec!(0.04), dec!(0.07)]).unwrap();
        let exact = ActiveSetSolver::default().solve(&qp).unwrap();
        let iterative = ProjectedGradientSolver::default().solve(&qp).unwrap();
        assert_close(&exact, &iterative, dec!(0.0001));
    }

    // ------------------------------------------------------------------
    // 9. Iteration budget exhaustion is reported
    // ------------------------------------------------------------------
    #[test]
    fn test_projected_gradient_budget() {
        let solver = ProjectedGradientSolver {
            max_iterations: 1,
            tolerance: dec!(0.000000000001),
        };
        let qp = QuadraticProgram::new(diag(&[dec!(0.08), dec!(0.02)]), vec![dec!(0), dec!(0)])
            .unwrap();
        assert!(matches!(
            solver.solve(&qp),
            Err(AllocatorError::ConvergenceFailure { .. })
        ));
    }
}
