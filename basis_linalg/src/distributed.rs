// SPDX-License-Identifier: MIT OR Apache-2.0
//! Row-partitioned matrices.
//!
//! A [`RowMatrix`] is one worker's contiguous row block of a conceptually
//! taller matrix; the full matrix never exists in one place. Column count is
//! identical on every worker, rows are disjoint. Products against
//! replicated operands are purely local; anything that contracts over the
//! row dimension goes through the [`GlobalReduce`] seam so every worker
//! ends with the same replicated result.

use serde::{Deserialize, Serialize};

use crate::reduce::GlobalReduce;
use crate::replicated::Replicated;
use crate::LinalgError;

/// One worker's row block of a distributed dense matrix, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMatrix {
    /// Row-major element storage for this worker's rows.
    pub data: Vec<f64>,
    /// Number of rows held locally.
    pub local_rows: usize,
    /// Number of columns (identical on every worker).
    pub cols: usize,
}

impl RowMatrix {
    /// Create a row block from row-major data, validating the shape.
    pub fn new(data: Vec<f64>, local_rows: usize, cols: usize) -> Result<Self, LinalgError> {
        if data.len() != local_rows * cols {
            return Err(LinalgError::InvalidShape {
                product: local_rows * cols,
                length: data.len(),
            });
        }
        Ok(Self {
            data,
            local_rows,
            cols,
        })
    }

    /// Zero row block of the given shape.
    pub fn zeros(local_rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; local_rows * cols],
            local_rows,
            cols,
        }
    }

    /// Single-column row block holding this worker's slice of a vector.
    pub fn from_column(column: &[f64]) -> Self {
        Self {
            data: column.to_vec(),
            local_rows: column.len(),
            cols: 1,
        }
    }

    /// Element at local `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Overwrite the element at local `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Append one column on the right; existing entries are untouched.
    pub fn push_column(&mut self, column: &[f64]) -> Result<(), LinalgError> {
        if column.len() != self.local_rows {
            return Err(LinalgError::DimensionMismatch {
                expected: self.local_rows,
                got: column.len(),
            });
        }
        let new_cols = self.cols + 1;
        let mut data = Vec::with_capacity(self.local_rows * new_cols);
        for i in 0..self.local_rows {
            data.extend_from_slice(&self.data[i * self.cols..(i + 1) * self.cols]);
            data.push(column[i]);
        }
        self.data = data;
        self.cols = new_cols;
        Ok(())
    }

    /// Copy of column `j`'s local slice.
    pub fn column(&self, j: usize) -> Result<Vec<f64>, LinalgError> {
        if j >= self.cols {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                got: j,
            });
        }
        Ok((0..self.local_rows).map(|i| self.get(i, j)).collect())
    }

    /// Local product with a replicated matrix: `self * r`.
    ///
    /// No communication: every element of the result depends only on local
    /// rows and replicated data.
    pub fn mult_replicated(&self, r: &Replicated) -> Result<Self, LinalgError> {
        if self.cols != r.rows {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                got: r.rows,
            });
        }
        let mut out = Self::zeros(self.local_rows, r.cols);
        for i in 0..self.local_rows {
            for k in 0..self.cols {
                let aik = self.get(i, k);
                if aik == 0.0 {
                    continue;
                }
                for j in 0..r.cols {
                    out.data[i * out.cols + j] += aik * r.get(k, j);
                }
            }
        }
        Ok(out)
    }

    /// Local matrix-vector product with replicated coefficients: `self * v`.
    pub fn mult_vec(&self, v: &[f64]) -> Result<Vec<f64>, LinalgError> {
        if self.cols != v.len() {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                got: v.len(),
            });
        }
        let mut out = vec![0.0; self.local_rows];
        for i in 0..self.local_rows {
            let mut sum = 0.0;
            for j in 0..self.cols {
                sum += self.get(i, j) * v[j];
            }
            out[i] = sum;
        }
        Ok(out)
    }

    /// Global product `selfᵀ * v` for a distributed vector `v`.
    ///
    /// `v` is this worker's row slice. Local partial inner products are
    /// reduced through `comm`, so the replicated result is identical on
    /// every worker.
    pub fn transpose_mult_vec(
        &self,
        v: &[f64],
        comm: &dyn GlobalReduce,
    ) -> Result<Vec<f64>, LinalgError> {
        if v.len() != self.local_rows {
            return Err(LinalgError::DimensionMismatch {
                expected: self.local_rows,
                got: v.len(),
            });
        }
        let mut out = vec![0.0; self.cols];
        for i in 0..self.local_rows {
            let vi = v[i];
            if vi == 0.0 {
                continue;
            }
            for j in 0..self.cols {
                out[j] += self.get(i, j) * vi;
            }
        }
        comm.sum_slice(&mut out);
        Ok(out)
    }

    /// Global inner product of columns `i` and `j`.
    pub fn column_global_dot(
        &self,
        i: usize,
        j: usize,
        comm: &dyn GlobalReduce,
    ) -> Result<f64, LinalgError> {
        if i >= self.cols || j >= self.cols {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                got: i.max(j),
            });
        }
        let mut local = 0.0;
        for r in 0..self.local_rows {
            local += self.get(r, i) * self.get(r, j);
        }
        Ok(comm.sum_scalar(local))
    }

    /// Largest deviation of `selfᵀ * self` from the identity, under the
    /// global inner product. Zero for a matrix with exactly orthonormal
    /// columns.
    pub fn orthonormality_error(&self, comm: &dyn GlobalReduce) -> Result<f64, LinalgError> {
        let mut worst: f64 = 0.0;
        for i in 0..self.cols {
            for j in i..self.cols {
                let dot = self.column_global_dot(i, j, comm)?;
                let target = if i == j { 1.0 } else { 0.0 };
                worst = worst.max((dot - target).abs());
            }
        }
        Ok(worst)
    }
}
