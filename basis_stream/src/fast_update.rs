// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deferred-rotation update kernel.
//!
//! Keeps the basis in factored form `B = U * U'`: the tall row-partitioned
//! factor U only ever gains columns, while every rotation lands in the
//! small replicated factor U'. Absorbing a sample therefore costs O(k³)
//! replicated work at rank k, independent of the local row count, and the
//! tall factor is rotated once at materialization instead of once per
//! sample. The factored invariant holds after every operation: the live
//! basis is `U * U'` whether or not anyone has materialized it.

use basis_linalg::{global_norm, GlobalReduce, Replicated, RowMatrix};

use crate::error::{BasisError, Result};
use crate::kernel::{check_factors, UpdateKernel};

/// Factor state for one time interval.
#[derive(Debug, Clone)]
struct FastState {
    /// Tall factor U: local rows x k, append-only.
    basis: RowMatrix,
    /// Deferred rotation U': k x k, replicated.
    rotation: Replicated,
    /// Singular-value block: k x k, replicated.
    values: Replicated,
    /// Time of the interval's first sample.
    start_time: f64,
}

/// Deferred-rotation kernel: the live basis is `U * U'` at every point in
/// time, materialized only on demand.
#[derive(Debug, Clone)]
pub struct FastUpdate {
    dim: usize,
    state: Option<FastState>,
}

impl FastUpdate {
    /// Kernel for a worker holding `dim` rows of each sample.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim, state: None }
    }

    /// The deferred rotation factor, if a basis is live. Exposed for
    /// inspection; the sampler never needs it.
    #[must_use]
    pub fn rotation(&self) -> Option<&Replicated> {
        self.state.as_ref().map(|s| &s.rotation)
    }

    fn check_sample(&self, sample: &[f64]) -> Result<()> {
        if sample.len() != self.dim {
            return Err(BasisError::DimensionMismatch {
                expected: self.dim,
                got: sample.len(),
            });
        }
        Ok(())
    }
}

impl UpdateKernel for FastUpdate {
    fn initialize(&mut self, sample: &[f64], time: f64, comm: &dyn GlobalReduce) -> Result<()> {
        if self.state.is_some() {
            return Err(BasisError::AlreadyInitialized);
        }
        self.check_sample(sample)?;
        if time < 0.0 || time.is_nan() {
            return Err(BasisError::NegativeTime(time));
        }
        let norm = global_norm(sample, comm);
        if norm == 0.0 || !norm.is_finite() {
            return Err(BasisError::DegenerateSample);
        }
        let scaled: Vec<f64> = sample.iter().map(|x| x / norm).collect();
        self.state = Some(FastState {
            basis: RowMatrix::from_column(&scaled),
            rotation: Replicated::identity(1),
            values: Replicated::from_diag(&[norm]),
            start_time: time,
        });
        Ok(())
    }

    fn materialize(&self) -> Result<RowMatrix> {
        let state = self.state.as_ref().ok_or(BasisError::NotInitialized)?;
        Ok(state.basis.mult_replicated(&state.rotation)?)
    }

    fn absorb_redundant(&mut self, rotation: &Replicated, values: &Replicated) -> Result<()> {
        let state = self.state.as_mut().ok_or(BasisError::NotInitialized)?;
        check_factors(state.basis.cols, rotation, values)?;
        // The tall factor is untouched; the rotation folds into U'.
        state.rotation = state.rotation.mult(rotation)?;
        state.values = values.clone();
        Ok(())
    }

    fn absorb_novel(
        &mut self,
        column: &[f64],
        rotation: &Replicated,
        values: &Replicated,
    ) -> Result<()> {
        self.check_sample(column)?;
        let state = self.state.as_mut().ok_or(BasisError::NotInitialized)?;
        check_factors(state.basis.cols + 1, rotation, values)?;
        state.basis.push_column(column)?;
        // The previous deferred rotation rides along: U' <- [U' 0; 0 1] * A.
        state.rotation = state.rotation.pad_identity()?.mult(rotation)?;
        state.values = values.clone();
        Ok(())
    }

    fn reset(&mut self) {
        self.state = None;
    }

    fn rank(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.basis.cols)
    }

    fn singular_values(&self) -> Option<&Replicated> {
        self.state.as_ref().map(|s| &s.values)
    }

    fn start_time(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.start_time)
    }
}
