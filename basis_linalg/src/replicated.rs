// SPDX-License-Identifier: MIT OR Apache-2.0
//! Small replicated matrices.
//!
//! A [`Replicated`] is held in full, bit-identically, on every worker:
//! rotation factors, singular-value blocks, and the bordered systems the
//! update path solves are all a few dozen entries at most. Operations here
//! never communicate.

use serde::{Deserialize, Serialize};

use crate::LinalgError;

/// A small dense matrix stored row-major, replicated on every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replicated {
    /// Row-major element storage.
    pub data: Vec<f64>,
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Replicated {
    /// Create a matrix from row-major data, validating the shape.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, LinalgError> {
        if data.len() != rows * cols {
            return Err(LinalgError::InvalidShape {
                product: rows * cols,
                length: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Identity matrix of order `n`.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Square diagonal matrix from the given entries.
    pub fn from_diag(diag: &[f64]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diag.iter().enumerate() {
            m.set(i, i, d);
        }
        m
    }

    /// Element at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Overwrite the element at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Transposed copy.
    pub fn transpose(&self) -> Self {
        let mut result = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                result.set(j, i, self.get(i, j));
            }
        }
        result
    }

    /// Matrix product `self * other`.
    pub fn mult(&self, other: &Self) -> Result<Self, LinalgError> {
        if self.cols != other.rows {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                got: other.rows,
            });
        }
        let mut c = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let aik = self.get(i, k);
                if aik == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    c.data[i * c.cols + j] += aik * other.get(k, j);
                }
            }
        }
        Ok(c)
    }

    /// Matrix-vector product `self * v`.
    pub fn mult_vec(&self, v: &[f64]) -> Result<Vec<f64>, LinalgError> {
        if self.cols != v.len() {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                got: v.len(),
            });
        }
        let mut out = vec![0.0; self.rows];
        for i in 0..self.rows {
            let mut sum = 0.0;
            for j in 0..self.cols {
                sum += self.get(i, j) * v[j];
            }
            out[i] = sum;
        }
        Ok(out)
    }

    /// Main-diagonal entries.
    pub fn diagonal(&self) -> Vec<f64> {
        let n = self.rows.min(self.cols);
        (0..n).map(|i| self.get(i, i)).collect()
    }

    /// Leading `rows x cols` block as a new matrix.
    pub fn truncate(&self, rows: usize, cols: usize) -> Result<Self, LinalgError> {
        if rows > self.rows {
            return Err(LinalgError::DimensionMismatch {
                expected: self.rows,
                got: rows,
            });
        }
        if cols > self.cols {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                got: cols,
            });
        }
        let mut out = Self::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                out.set(i, j, self.get(i, j));
            }
        }
        Ok(out)
    }

    /// Embed a square matrix into the next order up, with a trailing 1.
    ///
    /// Produces `[self 0; 0 1]`, the identity extension used when a basis
    /// grows by one column.
    pub fn pad_identity(&self) -> Result<Self, LinalgError> {
        if self.rows != self.cols {
            return Err(LinalgError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let mut out = Self::zeros(n + 1, n + 1);
        for i in 0..n {
            for j in 0..n {
                out.set(i, j, self.get(i, j));
            }
        }
        out.set(n, n, 1.0);
        Ok(out)
    }

    /// Frobenius norm.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Largest absolute entry-wise difference to `other`.
    ///
    /// Shape mismatch reports as infinity rather than an error; this is a
    /// comparison aid, mostly for tests.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        if self.rows != other.rows || self.cols != other.cols {
            return f64::INFINITY;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let m = Replicated::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.get(1, 0), 3.0);
        assert_eq!(m.get(1, 1), 4.0);
    }

    #[test]
    fn test_new_invalid_shape() {
        let result = Replicated::new(vec![1.0, 2.0, 3.0], 2, 2);
        assert!(matches!(result, Err(LinalgError::InvalidShape { .. })));
    }

    #[test]
    fn test_identity() {
        let m = Replicated::identity(3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(m.get(i, j), expected);
            }
        }
    }

    #[test]
    fn test_from_diag() {
        let m = Replicated::from_diag(&[2.0, 5.0]);
        assert_eq!(m.rows, 2);
        assert_eq!(m.cols, 2);
        assert_eq!(m.get(0, 0), 2.0);
        assert_eq!(m.get(1, 1), 5.0);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn test_transpose() {
        let m = Replicated::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        let t = m.transpose();
        assert_eq!(t.rows, 3);
        assert_eq!(t.cols, 2);
        assert_eq!(t.get(0, 1), 4.0);
        assert_eq!(t.get(2, 0), 3.0);
    }

    #[test]
    fn test_mult() {
        let a = Replicated::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let b = Replicated::new(vec![5.0, 6.0, 7.0, 8.0], 2, 2).unwrap();
        let c = a.mult(&b).unwrap();
        assert_eq!(c.get(0, 0), 19.0); // 1*5 + 2*7
        assert_eq!(c.get(0, 1), 22.0); // 1*6 + 2*8
        assert_eq!(c.get(1, 0), 43.0); // 3*5 + 4*7
        assert_eq!(c.get(1, 1), 50.0); // 3*6 + 4*8
    }

    #[test]
    fn test_mult_dimension_mismatch() {
        let a = Replicated::zeros(2, 3);
        let b = Replicated::zeros(2, 2);
        assert!(matches!(
            a.mult(&b),
            Err(LinalgError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_mult_identity_is_noop() {
        let a = Replicated::new(vec![1.0, -2.0, 0.5, 3.0], 2, 2).unwrap();
        let i = Replicated::identity(2);
        assert_eq!(a.mult(&i).unwrap(), a);
        assert_eq!(i.mult(&a).unwrap(), a);
    }

    #[test]
    fn test_mult_vec() {
        let a = Replicated::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let y = a.mult_vec(&[1.0, 1.0]).unwrap();
        assert_eq!(y, vec![3.0, 7.0]);
    }

    #[test]
    fn test_mult_vec_mismatch() {
        let a = Replicated::zeros(2, 2);
        assert!(a.mult_vec(&[1.0]).is_err());
    }

    #[test]
    fn test_diagonal() {
        let m = Replicated::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        assert_eq!(m.diagonal(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_truncate() {
        let m = Replicated::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0], 3, 3).unwrap();
        let t = m.truncate(2, 2).unwrap();
        assert_eq!(t.rows, 2);
        assert_eq!(t.cols, 2);
        assert_eq!(t.get(0, 0), 1.0);
        assert_eq!(t.get(0, 1), 2.0);
        assert_eq!(t.get(1, 0), 4.0);
        assert_eq!(t.get(1, 1), 5.0);
    }

    #[test]
    fn test_truncate_too_large() {
        let m = Replicated::zeros(2, 2);
        assert!(m.truncate(3, 2).is_err());
    }

    #[test]
    fn test_pad_identity() {
        let m = Replicated::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let p = m.pad_identity().unwrap();
        assert_eq!(p.rows, 3);
        assert_eq!(p.cols, 3);
        assert_eq!(p.get(0, 0), 1.0);
        assert_eq!(p.get(1, 1), 4.0);
        assert_eq!(p.get(2, 2), 1.0);
        assert_eq!(p.get(0, 2), 0.0);
        assert_eq!(p.get(2, 0), 0.0);
    }

    #[test]
    fn test_pad_identity_not_square() {
        let m = Replicated::zeros(2, 3);
        assert!(matches!(
            m.pad_identity(),
            Err(LinalgError::NotSquare { rows: 2, cols: 3 })
        ));
    }

    #[test]
    fn test_frobenius_norm() {
        let m = Replicated::new(vec![3.0, 4.0], 1, 2).unwrap();
        assert!((m.frobenius_norm() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_abs_diff() {
        let a = Replicated::new(vec![1.0, 2.0], 1, 2).unwrap();
        let b = Replicated::new(vec![1.5, 1.0], 1, 2).unwrap();
        assert!((a.max_abs_diff(&b) - 1.0).abs() < 1e-12);
        let c = Replicated::zeros(2, 2);
        assert_eq!(a.max_abs_diff(&c), f64::INFINITY);
    }

    #[test]
    fn test_serde_roundtrip() {
        let m = Replicated::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let bytes = bincode::serialize(&m).unwrap();
        let back: Replicated = bincode::deserialize(&bytes).unwrap();
        assert_eq!(m, back);
    }
}
