//! Dense Decimal linear algebra shared by the optimizer and its solvers.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::AllocatorError;
use crate::types::Matrix;
use crate::AllocatorResult;

/// Pivots smaller than this make a linear system singular.
const SINGULAR_PIVOT: Decimal = dec!(0.000000000000000000000001);

/// LDLᵀ pivots above `-PSD_PIVOT_TOLERANCE * scale` are accepted as
/// non-negative; at or below `PSD_PIVOT_TOLERANCE * scale` they count as zero.
const PSD_PIVOT_TOLERANCE: Decimal = dec!(0.000000000001);

/// A zero pivot must leave its column empty up to this relative size.
const PSD_COUPLING_TOLERANCE: Decimal = dec!(0.000001);

/// Dot product.
pub fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter().zip(b.iter()).map(|(x, y)| *x * *y).sum()
}

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> Vec<Decimal> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Quadratic form wᵀ M w.
pub fn quad_form(w: &[Decimal], mat: &[Vec<Decimal>]) -> Decimal {
    vec_dot(w, &mat_vec_multiply(mat, w))
}

/// Square root via Newton's method. Non-positive input returns zero.
pub fn sqrt_decimal(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if x == Decimal::ONE {
        return Decimal::ONE;
    }
    let two = dec!(2);
    // Start above the root so the iteration decreases monotonically.
    let mut guess = if x > Decimal::ONE { x } else { Decimal::ONE };
    for _ in 0..100 {
        let next = (guess + x / guess) / two;
        if (next - guess).abs() < dec!(0.0000000000000000001) {
            return next;
        }
        guess = next;
    }
    guess
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
pub fn solve_linear_system(a: &[Vec<Decimal>], b: &[Decimal]) -> AllocatorResult<Vec<Decimal>> {
    let n = a.len();
    if b.len() != n {
        return Err(AllocatorError::InvalidInput {
            field: "rhs".into(),
            reason: format!("Expected {} values but got {}", n, b.len()),
        });
    }

    let mut aug: Matrix = Vec::with_capacity(n);
    for i in 0..n {
        if a[i].len() != n {
            return Err(AllocatorError::InvalidInput {
                field: "matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, a[i].len(), n),
            });
        }
        let mut row = Vec::with_capacity(n + 1);
        row.extend_from_slice(&a[i]);
        row.push(b[i]);
        aug.push(row);
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < SINGULAR_PIVOT {
            return Err(AllocatorError::SingularSystem(format!(
                "pivot {} in column {} is below {}",
                max_val, col, SINGULAR_PIVOT
            )));
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let pivot_row = aug[col].clone();
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot_row[col];
            if factor.is_zero() {
                continue;
            }
            for (cell, &pv) in aug[row].iter_mut().zip(pivot_row.iter()).skip(col) {
                *cell -= factor * pv;
            }
        }
    }

    let mut x = vec![Decimal::ZERO; n];
    for i in (0..n).rev() {
        let mut acc = aug[i][n];
        for j in (i + 1)..n {
            acc -= aug[i][j] * x[j];
        }
        x[i] = acc / aug[i][i];
    }
    Ok(x)
}

/// Square matrix with identical cells across the diagonal, within `tolerance`.
#[allow(clippy::needless_range_loop)]
pub fn check_symmetric(mat: &[Vec<Decimal>], tolerance: Decimal) -> AllocatorResult<()> {
    let n = mat.len();
    for (i, row) in mat.iter().enumerate() {
        if row.len() != n {
            return Err(AllocatorError::InvalidInput {
                field: "covariance_matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (mat[i][j] - mat[j][i]).abs() > tolerance {
                return Err(AllocatorError::InvalidInput {
                    field: "covariance_matrix".into(),
                    reason: format!(
                        "Not symmetric: [{},{}]={} != [{},{}]={}",
                        i, j, mat[i][j], j, i, mat[j][i]
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Verify positive-semidefiniteness with an LDLᵀ factorization.
///
/// A zero pivot is allowed only when the rest of its column is zero too,
/// which is what distinguishes a singular PSD matrix from an indefinite one.
#[allow(clippy::needless_range_loop)]
pub fn check_positive_semidefinite(mat: &[Vec<Decimal>]) -> AllocatorResult<()> {
    let n = mat.len();
    let scale = (0..n)
        .map(|i| mat[i][i].abs())
        .fold(Decimal::ZERO, |a, b| if b > a { b } else { a });
    let scale = if scale.is_zero() { Decimal::ONE } else { scale };
    let pivot_tol = PSD_PIVOT_TOLERANCE * scale;
    let coupling_tol = PSD_COUPLING_TOLERANCE * scale;

    let mut l: Matrix = vec![vec![Decimal::ZERO; n]; n];
    let mut d = vec![Decimal::ZERO; n];

    for k in 0..n {
        let mut dk = mat[k][k];
        for j in 0..k {
            dk -= l[k][j] * l[k][j] * d[j];
        }
        if dk < -pivot_tol {
            return Err(AllocatorError::NotPositiveSemidefinite { index: k, pivot: dk });
        }

        let zero_pivot = dk <= pivot_tol;
        for i in (k + 1)..n {
            let mut s = mat[i][k];
            for j in 0..k {
                s -= l[i][j] * l[k][j] * d[j];
            }
            if zero_pivot {
                if s.abs() > coupling_tol {
                    return Err(AllocatorError::NotPositiveSemidefinite { index: k, pivot: dk });
                }
            } else {
                l[i][k] = s / dk;
            }
        }
        d[k] = if zero_pivot { Decimal::ZERO } else { dk };
    }
    Ok(())
}

/// Euclidean projection onto the probability simplex {w ≥ 0, Σw = 1}.
pub fn project_onto_simplex(v: &[Decimal]) -> Vec<Decimal> {
    if v.is_empty() {
        return Vec::new();
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));

    let mut cumulative = Decimal::ZERO;
    let mut theta = Decimal::ZERO;
    for (k, u) in sorted.iter().enumerate() {
        cumulative += *u;
        let candidate = (cumulative - Decimal::ONE) / Decimal::from(k as i64 + 1);
        if *u - candidate > Decimal::ZERO {
            theta = candidate;
        }
    }

    v.iter()
        .map(|vi| {
            let w = *vi - theta;
            if w > Decimal::ZERO {
                w
            } else {
                Decimal::ZERO
            }
        })
        .collect()
}

/// Clamp rounding residue below zero and rescale to a unit sum.
pub fn normalize_weights(w: &mut [Decimal]) {
    for wi in w.iter_mut() {
        if *wi < Decimal::ZERO {
            *wi = Decimal::ZERO;
        }
    }
    let total: Decimal = w.iter().sum();
    if !total.is_zero() {
        for wi in w.iter_mut() {
            *wi /= total;
        }
    }
}

/// Equal weights for n assets.
pub fn equal_weights(n: usize) -> Vec<Decimal> {
    if n == 0 {
        return Vec::new();
    }
    let w = Decimal::ONE / Decimal::from(n as i64);
    vec![w; n]
}
