// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sampler and kernel configuration.

use serde::{Deserialize, Serialize};

use crate::error::{BasisError, Result};

/// Which update strategy maintains the basis factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KernelKind {
    /// Deferred rotations: absorbing a sample touches only small replicated
    /// factors; the tall factor is rotated once, at materialization.
    #[default]
    FastUpdate,
    /// Immediate rotations: every absorbed sample rewrites the tall factor.
    Direct,
}

/// Configuration for streaming basis construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisConfig {
    /// Rows of the sampled state held by this worker (> 0).
    pub dim: usize,
    /// Residual threshold below which a sample adds no new direction (> 0).
    pub redundancy_tol: f64,
    /// Drop redundant samples entirely instead of folding them into the
    /// singular values.
    pub skip_redundant: bool,
    /// Upper bound on the projection error a redundant classification may
    /// imply (> 0, and at least `redundancy_tol`).
    pub sampling_tol: f64,
    /// Samples absorbed into one basis before the next sample starts a new
    /// time interval (> 0).
    pub samples_per_interval: usize,
    /// Update strategy.
    pub kernel: KernelKind,
    /// Emit a debug event with the updated spectrum after every absorption.
    pub debug_updates: bool,
}

impl BasisConfig {
    /// Configuration with default tolerances for the given local dimension.
    pub fn for_dim(dim: usize) -> Result<Self> {
        let config = Self {
            dim,
            redundancy_tol: 1e-7,
            skip_redundant: false,
            sampling_tol: 1e-2,
            samples_per_interval: 100,
            kernel: KernelKind::default(),
            debug_updates: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Tight tolerances: nearly every sampled direction is kept.
    pub fn high_fidelity(dim: usize) -> Result<Self> {
        let config = Self {
            redundancy_tol: 1e-12,
            sampling_tol: 1e-6,
            ..Self::for_dim(dim)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loose tolerances: aggressive redundancy classification and dropped
    /// redundant samples, for small bases over long streams.
    pub fn coarse(dim: usize) -> Result<Self> {
        let config = Self {
            redundancy_tol: 1e-4,
            sampling_tol: 1e-1,
            skip_redundant: true,
            ..Self::for_dim(dim)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate this configuration.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(BasisError::InvalidDimension);
        }
        if !self.redundancy_tol.is_finite() || self.redundancy_tol <= 0.0 {
            return Err(BasisError::InvalidTolerance {
                name: "redundancy_tol",
                value: self.redundancy_tol,
            });
        }
        if !self.sampling_tol.is_finite() || self.sampling_tol <= 0.0 {
            return Err(BasisError::InvalidTolerance {
                name: "sampling_tol",
                value: self.sampling_tol,
            });
        }
        if self.samples_per_interval == 0 {
            return Err(BasisError::InvalidSampleBudget);
        }
        // A redundant sample certifies a projection error of at most
        // redundancy_tol, which the sampling tolerance must allow.
        if self.redundancy_tol > self.sampling_tol {
            return Err(BasisError::ToleranceOrder {
                redundancy: self.redundancy_tol,
                sampling: self.sampling_tol,
            });
        }
        Ok(())
    }
}
