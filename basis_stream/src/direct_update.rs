// SPDX-License-Identifier: MIT OR Apache-2.0
//! Immediate-rotation update kernel.
//!
//! The contrast to the deferred strategy: no small rotation factor exists,
//! every absorbed sample rewrites the tall row-partitioned factor in place.
//! Absorption costs O(local rows x k²) where the deferred kernel pays
//! O(k³), but materialization is a plain copy. Useful when the basis is
//! read after nearly every sample, and as an independent cross-check of the
//! deferred arithmetic.

use basis_linalg::{global_norm, GlobalReduce, Replicated, RowMatrix};

use crate::error::{BasisError, Result};
use crate::kernel::{check_factors, UpdateKernel};

/// Factor state for one time interval.
#[derive(Debug, Clone)]
struct DirectState {
    /// The basis itself: local rows x k, rotated in place.
    basis: RowMatrix,
    /// Singular-value block: k x k, replicated.
    values: Replicated,
    /// Time of the interval's first sample.
    start_time: f64,
}

/// Immediate-rotation kernel: the stored tall factor is the basis.
#[derive(Debug, Clone)]
pub struct DirectUpdate {
    dim: usize,
    state: Option<DirectState>,
}

impl DirectUpdate {
    /// Kernel for a worker holding `dim` rows of each sample.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim, state: None }
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

impl UpdateKernel for DirectUpdate {
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
        self.state = Some(DirectState {
            basis: RowMatrix::from_column(&scaled),
            values: Replicated::from_diag(&[norm]),
            start_time: time,
        });
        Ok(())
    }

    fn materialize(&self) -> Result<RowMatrix> {
        let state = self.state.as_ref().ok_or(BasisError::NotInitialized)?;
        Ok(state.basis.clone())
    }

    fn absorb_redundant(&mut self, rotation: &Replicated, values: &Replicated) -> Result<()> {
        let state = self.state.as_mut().ok_or(BasisError::NotInitialized)?;
        check_factors(state.basis.cols, rotation, values)?;
        state.basis = state.basis.mult_replicated(rotation)?;
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
        state.basis = state.basis.mult_replicated(rotation)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use basis_linalg::SerialReduce;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn initialized(sample: &[f64]) -> DirectUpdate {
        let mut kernel = DirectUpdate::new(sample.len());
        kernel.initialize(sample, 0.0, &SerialReduce).unwrap();
        kernel
    }

    #[test]
    fn test_initialize_scales_to_unit_norm() {
        let kernel = initialized(&[0.0, -2.0]);
        let basis = kernel.materialize().unwrap();
        assert!(basis.get(0, 0).abs() < 1e-12);
        assert!((basis.get(1, 0) + 1.0).abs() < 1e-12);
        let values = kernel.singular_values().unwrap();
        assert!((values.get(0, 0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_absorb_redundant_rotates_immediately() {
        let mut kernel = initialized(&[3.0, 4.0]);
        let stored_before = match &kernel.state {
            Some(state) => state.basis.clone(),
            None => unreachable!(),
        };
        let flip = Replicated::new(vec![-1.0], 1, 1).unwrap();
        kernel
            .absorb_redundant(&flip, &Replicated::from_diag(&[5.0]))
            .unwrap();
        let stored_after = match &kernel.state {
            Some(state) => state.basis.clone(),
            None => unreachable!(),
        };
        // Unlike the deferred kernel, the tall factor itself changes.
        assert!((stored_before.get(0, 0) - 0.6).abs() < 1e-12);
        assert!((stored_after.get(0, 0) + 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_absorb_novel_grows_and_rotates() {
        let mut kernel = initialized(&[1.0, 0.0]);
        let c = FRAC_1_SQRT_2;
        let rotation = Replicated::new(vec![c, -c, c, c], 2, 2).unwrap();
        kernel
            .absorb_novel(&[0.0, 1.0], &rotation, &Replicated::from_diag(&[2.0, 1.0]))
            .unwrap();
        assert_eq!(kernel.rank(), 2);
        let basis = kernel.materialize().unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert!(
                    (basis.get(i, j) - rotation.get(i, j)).abs() < 1e-12,
                    "entry ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_agrees_with_fast_kernel() {
        use crate::fast_update::FastUpdate;

        let comm = SerialReduce;
        let mut direct = DirectUpdate::new(3);
        let mut fast = FastUpdate::new(3);
        direct.initialize(&[1.0, 2.0, 2.0], 0.0, &comm).unwrap();
        fast.initialize(&[1.0, 2.0, 2.0], 0.0, &comm).unwrap();

        let c = FRAC_1_SQRT_2;
        let rotation2 = Replicated::new(vec![c, -c, c, c], 2, 2).unwrap();
        let values2 = Replicated::from_diag(&[4.0, 2.0]);
        let column = [0.0, FRAC_1_SQRT_2, -FRAC_1_SQRT_2];
        direct.absorb_novel(&column, &rotation2, &values2).unwrap();
        fast.absorb_novel(&column, &rotation2, &values2).unwrap();

        let spin = Replicated::new(vec![0.0, 1.0, -1.0, 0.0], 2, 2).unwrap();
        let values_after = Replicated::from_diag(&[3.0, 1.0]);
        direct.absorb_redundant(&spin, &values_after).unwrap();
        fast.absorb_redundant(&spin, &values_after).unwrap();

        let b_direct = direct.materialize().unwrap();
        let b_fast = fast.materialize().unwrap();
        for i in 0..3 {
            for j in 0..2 {
                assert!(
                    (b_direct.get(i, j) - b_fast.get(i, j)).abs() < 1e-12,
                    "entry ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_uninitialized_operations_fail() {
        let mut kernel = DirectUpdate::new(2);
        let factors = Replicated::identity(1);
        assert!(matches!(
            kernel.materialize(),
            Err(BasisError::NotInitialized)
        ));
        assert!(matches!(
            kernel.absorb_redundant(&factors, &factors),
            Err(BasisError::NotInitialized)
        ));
        assert_eq!(kernel.rank(), 0);
    }
}
