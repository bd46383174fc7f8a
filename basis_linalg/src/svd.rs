// SPDX-License-Identifier: MIT OR Apache-2.0
//! SVD of small square replicated matrices.
//!
//! Two-sided cyclic Jacobi iteration on the Gram matrix AᵀA, accumulating
//! the right vectors; each left vector is the normalized image A·v, its
//! norm the singular value, and columns with vanishing images are completed
//! by Gram-Schmidt. Pure Rust, no LAPACK or BLAS. The
//! systems solved here are (k+1)x(k+1) bordered matrices for basis rank k,
//! so cubic cost in the small dimension is irrelevant.
//!
//! Rank-deficient input is the normal case, not an edge case: the bordered
//! matrix of a sample that adds no new direction carries an exactly-zero
//! trailing singular value, and callers rely on the returned left factor
//! being orthonormal regardless.

use crate::replicated::Replicated;
use crate::LinalgError;

/// Maximum number of full Jacobi sweeps before giving up.
const MAX_SWEEPS: usize = 64;

/// Full SVD of a small square matrix: `a = u * diag(s) * vt`.
#[derive(Debug, Clone)]
pub struct SmallSvd {
    /// Left singular vectors, orthonormal columns.
    pub u: Replicated,
    /// Singular values, descending.
    pub s: Vec<f64>,
    /// Transposed right singular vectors, orthonormal rows.
    pub vt: Replicated,
}

/// Compute the full SVD of a square replicated matrix.
///
/// Every worker calls this on the same replicated input and obtains the
/// same factors; no communication is involved.
pub fn svd_replicated(a: &Replicated) -> Result<SmallSvd, LinalgError> {
    if a.rows == 0 || a.cols == 0 {
        return Err(LinalgError::EmptyMatrix);
    }
    if a.rows != a.cols {
        return Err(LinalgError::NotSquare {
            rows: a.rows,
            cols: a.cols,
        });
    }
    let n = a.rows;

    // Gram matrix G = AᵀA, symmetric positive semi-definite.
    let mut g = Replicated::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a.get(k, i) * a.get(k, j);
            }
            g.set(i, j, sum);
        }
    }

    // Accumulated right vectors.
    let mut v = Replicated::identity(n);

    let tol = f64::EPSILON * n as f64 * g.frobenius_norm().max(f64::MIN_POSITIVE);
    let mut sweeps = 0;
    loop {
        let mut off: f64 = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off = off.max(g.get(p, q).abs());
            }
        }
        // The off-diagonal mass is re-tested after the last sweep before
        // giving up.
        if off <= tol {
            break;
        }
        if sweeps == MAX_SWEEPS {
            return Err(LinalgError::SvdNotConverged { sweeps });
        }
        sweeps += 1;

        for p in 0..n {
            for q in (p + 1)..n {
                let gpq = g.get(p, q);
                if gpq == 0.0 {
                    continue;
                }
                let tau = (g.get(q, q) - g.get(p, p)) / (2.0 * gpq);
                let sign = if tau >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (tau.abs() + (tau * tau + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // G <- Jᵀ G J, columns then rows.
                for i in 0..n {
                    let gip = g.get(i, p);
                    let giq = g.get(i, q);
                    g.set(i, p, c * gip - s * giq);
                    g.set(i, q, s * gip + c * giq);
                }
                for i in 0..n {
                    let gpi = g.get(p, i);
                    let gqi = g.get(q, i);
                    g.set(p, i, c * gpi - s * gqi);
                    g.set(q, i, s * gpi + c * gqi);
                }
                // V <- V J.
                for i in 0..n {
                    let vip = v.get(i, p);
                    let viq = v.get(i, q);
                    v.set(i, p, c * vip - s * viq);
                    v.set(i, q, s * vip + c * viq);
                }
            }
        }
    }

    // The Gram diagonal resolves squared values only down to ε·‖G‖, so the
    // singular values are taken from the image norms ‖A v_j‖ instead.
    let mut image = Replicated::zeros(n, n);
    let mut sigma = vec![0.0; n];
    for j in 0..n {
        let mut norm2 = 0.0;
        for i in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a.get(i, k) * v.get(k, j);
            }
            image.set(i, j, sum);
            norm2 += sum * sum;
        }
        sigma[j] = norm2.sqrt();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| sigma[j].total_cmp(&sigma[i]));

    let mut s_sorted = Vec::with_capacity(n);
    let mut v_sorted = Replicated::zeros(n, n);
    for (dst, &src) in order.iter().enumerate() {
        s_sorted.push(sigma[src]);
        for i in 0..n {
            v_sorted.set(i, dst, v.get(i, src));
        }
    }

    // Left vectors: u_j = A v_j / ‖A v_j‖, unit length by construction;
    // columns whose image vanishes are filled in afterwards so U stays
    // orthonormal.
    let s_max = s_sorted.first().copied().unwrap_or(0.0);
    let breakdown = s_max * n as f64 * f64::EPSILON;
    let mut u = Replicated::zeros(n, n);
    let mut deferred = Vec::new();
    for (dst, &src) in order.iter().enumerate() {
        if s_sorted[dst] > breakdown {
            for i in 0..n {
                u.set(i, dst, image.get(i, src) / s_sorted[dst]);
            }
        } else {
            deferred.push(dst);
        }
    }
    for &j in &deferred {
        complete_column(&mut u, j)?;
    }

    Ok(SmallSvd {
        u,
        s: s_sorted,
        vt: v_sorted.transpose(),
    })
}

/// Fill column `j` of `u` with a unit vector orthogonal to every other
/// nonzero column, chosen deterministically from the coordinate directions.
fn complete_column(u: &mut Replicated, j: usize) -> Result<(), LinalgError> {
    let n = u.rows;
    let mut best: Option<(f64, Vec<f64>)> = None;
    for k in 0..n {
        let mut cand = vec![0.0; n];
        cand[k] = 1.0;
        // Two orthogonalization passes against the populated columns.
        for _ in 0..2 {
            for col in 0..n {
                if col == j {
                    continue;
                }
                let mut dot = 0.0;
                let mut col_norm2 = 0.0;
                for i in 0..n {
                    dot += u.get(i, col) * cand[i];
                    col_norm2 += u.get(i, col) * u.get(i, col);
                }
                if col_norm2 == 0.0 {
                    continue;
                }
                for i in 0..n {
                    let uic = u.get(i, col);
                    cand[i] -= dot * uic / col_norm2;
                }
            }
        }
        let norm = cand.iter().map(|x| x * x).sum::<f64>().sqrt();
        let replace = match &best {
            Some((best_norm, _)) => norm > *best_norm,
            None => true,
        };
        if replace {
            best = Some((norm, cand));
        }
    }
    // With fewer than n populated columns some coordinate direction always
    // survives orthogonalization with norm at least 1/sqrt(n).
    let (norm, cand) = best.ok_or(LinalgError::EmptyMatrix)?;
    if norm == 0.0 {
        return Err(LinalgError::EmptyMatrix);
    }
    for i in 0..n {
        u.set(i, j, cand[i] / norm);
    }
    Ok(())
}
