// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sample classification and basis orchestration.
//!
//! [`BasisSampler`] drives an update kernel from a stream of state
//! snapshots: it decides per sample whether a genuinely new direction
//! arrived, solves the small bordered system that turns that decision into
//! rotation factors, and rolls the basis over to a new time interval when
//! the configured sample budget is spent. The kernels below it never
//! classify; the sampler never touches factor internals.
//!
//! The sampler holds no locks. One sample at a time, by caller discipline;
//! in a partitioned deployment every worker feeds the same sample sequence
//! (each its own row slice) so the replicated state stays identical
//! everywhere.

use std::sync::Arc;

use basis_linalg::{
    global_dot, global_norm, svd_replicated, GlobalReduce, Replicated, RowMatrix, SerialReduce,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::BasisConfig;
use crate::error::{BasisError, Result};
use crate::kernel::{Kernel, UpdateKernel};

/// Minimum batch size before projection fans out across threads.
const PARALLEL_THRESHOLD: usize = 4;

/// How a call to [`BasisSampler::take_sample`] was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleOutcome {
    /// The sample started a new time interval as its rank-1 basis.
    Initialized,
    /// The sample carried a new direction; the rank grew by one.
    Novel,
    /// The sample was within tolerance of the current span and was folded
    /// into the singular values.
    Redundant,
    /// The sample was within tolerance of the current span and dropped.
    SkippedRedundant,
}

/// Result of classifying one sample against the current basis.
struct Classification {
    /// Reduced coordinates Bᵀu, replicated.
    coords: Vec<f64>,
    /// Lift B(Bᵀu), this worker's rows.
    lift: Vec<f64>,
    /// Global norm of the sample minus its projection.
    residual: f64,
    /// Whether the residual is below the redundancy tolerance.
    redundant: bool,
}

/// Streaming driver: classifies snapshots and maintains a basis through an
/// update kernel.
pub struct BasisSampler {
    config: BasisConfig,
    kernel: Kernel,
    comm: Arc<dyn GlobalReduce>,
    /// Materialized basis, refreshed lazily after absorptions.
    cached_basis: Option<RowMatrix>,
    /// Samples absorbed into the current interval's basis.
    samples_absorbed: usize,
    /// Time intervals started so far.
    intervals_started: usize,
}

impl BasisSampler {
    /// Sampler over the given reduction seam.
    pub fn new(config: BasisConfig, comm: Arc<dyn GlobalReduce>) -> Result<Self> {
        config.validate()?;
        let kernel = Kernel::new(config.kernel, config.dim);
        Ok(Self {
            config,
            kernel,
            comm,
            cached_basis: None,
            samples_absorbed: 0,
            intervals_started: 0,
        })
    }

    /// Single-worker sampler.
    pub fn serial(config: BasisConfig) -> Result<Self> {
        Self::new(config, Arc::new(SerialReduce))
    }

    /// Classify and absorb one snapshot taken at simulation `time`.
    #[instrument(skip(self, sample), fields(dim = sample.len(), rank = self.kernel.rank()))]
    pub fn take_sample(&mut self, sample: &[f64], time: f64) -> Result<SampleOutcome> {
        if sample.len() != self.config.dim {
            return Err(BasisError::DimensionMismatch {
                expected: self.config.dim,
                got: sample.len(),
            });
        }
        if time < 0.0 || time.is_nan() {
            return Err(BasisError::NegativeTime(time));
        }

        // First sample ever, or the interval's budget is spent.
        if self.kernel.rank() == 0 || self.samples_absorbed >= self.config.samples_per_interval {
            return self.start_interval(sample, time);
        }

        let class = self.classify(sample)?;
        if class.redundant && self.config.skip_redundant {
            debug!(residual = class.residual, "sample within span, dropped");
            return Ok(SampleOutcome::SkippedRedundant);
        }

        let outcome = if class.redundant {
            self.fold_redundant(&class)?;
            SampleOutcome::Redundant
        } else {
            self.append_novel(sample, &class)?
        };
        self.cached_basis = None;
        self.samples_absorbed += 1;
        if self.config.debug_updates {
            debug!(
                ?outcome,
                rank = self.kernel.rank(),
                values = ?self.singular_values().unwrap_or_default(),
                "absorbed sample"
            );
        }
        Ok(outcome)
    }

    /// The materialized basis for this worker's rows.
    ///
    /// Cached between absorptions; calling this repeatedly is cheap.
    pub fn basis(&mut self) -> Result<&RowMatrix> {
        self.ensure_basis()
    }

    /// Current basis rank; 0 before the first sample.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.kernel.rank()
    }

    /// Rows of the sampled state held by this worker.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.config.dim
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &BasisConfig {
        &self.config
    }

    /// Singular values of the current interval's basis, descending.
    #[must_use]
    pub fn singular_values(&self) -> Option<Vec<f64>> {
        self.kernel.singular_values().map(Replicated::diagonal)
    }

    /// Samples absorbed into the current interval; skipped redundant
    /// samples do not count.
    #[must_use]
    pub fn samples_absorbed(&self) -> usize {
        self.samples_absorbed
    }

    /// Time intervals started so far.
    #[must_use]
    pub fn intervals_started(&self) -> usize {
        self.intervals_started
    }

    /// Simulation time of the current interval's first sample.
    #[must_use]
    pub fn interval_start_time(&self) -> Option<f64> {
        self.kernel.start_time()
    }

    /// Reduced coordinates of `sample` in the current basis, replicated on
    /// every worker.
    pub fn project(&mut self, sample: &[f64]) -> Result<Vec<f64>> {
        if sample.len() != self.config.dim {
            return Err(BasisError::DimensionMismatch {
                expected: self.config.dim,
                got: sample.len(),
            });
        }
        let comm = Arc::clone(&self.comm);
        let basis = self.ensure_basis()?;
        Ok(basis.transpose_mult_vec(sample, comm.as_ref())?)
    }

    /// Lift reduced coordinates back to this worker's rows.
    pub fn reconstruct(&mut self, coords: &[f64]) -> Result<Vec<f64>> {
        let basis = self.ensure_basis()?;
        Ok(basis.mult_vec(coords)?)
    }

    /// Project a batch of samples.
    ///
    /// Local work fans out across threads for large batches; the global
    /// reductions still run one at a time, in order, because the seam
    /// requires every worker to issue the same reduction sequence.
    #[instrument(skip(self, samples), fields(batch = samples.len(), rank = self.kernel.rank()))]
    pub fn project_batch(&mut self, samples: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        for sample in samples {
            if sample.len() != self.config.dim {
                return Err(BasisError::DimensionMismatch {
                    expected: self.config.dim,
                    got: sample.len(),
                });
            }
        }
        let comm = Arc::clone(&self.comm);
        let basis = self.ensure_basis()?;
        let local = SerialReduce;
        let mut out: Vec<Vec<f64>> = if samples.len() >= PARALLEL_THRESHOLD {
            samples
                .par_iter()
                .map(|s| basis.transpose_mult_vec(s, &local))
                .collect::<std::result::Result<_, _>>()?
        } else {
            samples
                .iter()
                .map(|s| basis.transpose_mult_vec(s, &local))
                .collect::<std::result::Result<_, _>>()?
        };
        for coords in &mut out {
            comm.sum_slice(coords);
        }
        Ok(out)
    }

    /// Estimate the next simulation time at which sampling will be needed.
    ///
    /// First-order model: the projection error of the state, currently
    /// `‖u - BBᵀu‖`, grows at rate `‖u̇ - BBᵀu̇‖`; the returned time is when
    /// it reaches the sampling tolerance. Returns `time` itself when the
    /// error already exceeds the tolerance and infinity when it cannot
    /// grow.
    pub fn predict_next_sample_time(
        &mut self,
        sample: &[f64],
        derivative: &[f64],
        time: f64,
    ) -> Result<f64> {
        if sample.len() != self.config.dim {
            return Err(BasisError::DimensionMismatch {
                expected: self.config.dim,
                got: sample.len(),
            });
        }
        if derivative.len() != self.config.dim {
            return Err(BasisError::DimensionMismatch {
                expected: self.config.dim,
                got: derivative.len(),
            });
        }
        let err_now = self.projection_residual(sample)?;
        let err_rate = self.projection_residual(derivative)?;
        if err_now >= self.config.sampling_tol {
            return Ok(time);
        }
        if err_rate <= 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(time + (self.config.sampling_tol - err_now) / err_rate)
    }

    fn ensure_basis(&mut self) -> Result<&RowMatrix> {
        if self.cached_basis.is_none() {
            self.cached_basis = Some(self.kernel.materialize()?);
        }
        self.cached_basis.as_ref().ok_or(BasisError::NotInitialized)
    }

    fn start_interval(&mut self, sample: &[f64], time: f64) -> Result<SampleOutcome> {
        let restarted = self.kernel.rank() != 0;
        if restarted {
            self.kernel.reset();
        }
        // The outgoing basis is unreachable from here on, even when the new
        // interval fails to start.
        self.cached_basis = None;
        self.samples_absorbed = 0;
        self.kernel.initialize(sample, time, self.comm.as_ref())?;
        self.samples_absorbed = 1;
        self.intervals_started += 1;
        debug!(
            time,
            restarted,
            interval = self.intervals_started,
            "started time interval"
        );
        Ok(SampleOutcome::Initialized)
    }

    /// Residual split of a sample against the current basis: reduced
    /// coordinates, lift, and the global norm of what the span misses.
    fn classify(&mut self, sample: &[f64]) -> Result<Classification> {
        let comm = Arc::clone(&self.comm);
        let redundancy_tol = self.config.redundancy_tol;
        let basis = self.ensure_basis()?;

        let coords = basis.transpose_mult_vec(sample, comm.as_ref())?;
        let lift = basis.mult_vec(&coords)?;
        let uu = global_dot(sample, sample, comm.as_ref());
        // coords is already replicated; its inner product needs no reduction.
        let ll: f64 = coords.iter().map(|x| x * x).sum();
        let qq = global_dot(&lift, &lift, comm.as_ref());

        let residual_sq = uu - 2.0 * ll + qq;
        if residual_sq < -64.0 * f64::EPSILON * uu.max(1.0) {
            warn!(
                residual_sq,
                "projection residual went negative; basis may have lost orthonormality"
            );
        }
        let residual = residual_sq.max(0.0).sqrt();
        let redundant = residual < redundancy_tol;
        Ok(Classification {
            coords,
            lift,
            residual,
            redundant,
        })
    }

    /// Solve the bordered system with a zero corner and fold its chopped
    /// left factor into the kernel. Rank is unchanged.
    fn fold_redundant(&mut self, class: &Classification) -> Result<()> {
        let rank = self.kernel.rank();
        let bordered = self.bordered(&class.coords, 0.0)?;
        let svd = svd_replicated(&bordered)?;
        let rotation = svd.u.truncate(rank, rank)?;
        let values = Replicated::from_diag(&svd.s[..rank]);
        self.kernel.absorb_redundant(&rotation, &values)
    }

    /// Solve the full bordered system and append the normalized remainder
    /// direction. Rank grows by one, except for a remainder that vanishes
    /// exactly, which folds through the redundant path instead.
    fn append_novel(&mut self, sample: &[f64], class: &Classification) -> Result<SampleOutcome> {
        let remainder: Vec<f64> = sample
            .iter()
            .zip(class.lift.iter())
            .map(|(u, q)| u - q)
            .collect();
        // The classification residual carries cancellation error near the
        // threshold; the corner and the normalizer use the remainder's own
        // norm so the appended column has unit global length.
        let norm = global_norm(&remainder, self.comm.as_ref());
        if norm == 0.0 {
            self.fold_redundant(class)?;
            return Ok(SampleOutcome::Redundant);
        }
        let bordered = self.bordered(&class.coords, norm)?;
        let svd = svd_replicated(&bordered)?;
        let values = Replicated::from_diag(&svd.s);
        let column: Vec<f64> = remainder.iter().map(|w| w / norm).collect();
        self.kernel.absorb_novel(&column, &svd.u, &values)?;
        Ok(SampleOutcome::Novel)
    }

    /// Bordered system for one sample: current singular values on the
    /// leading diagonal, reduced coordinates in the trailing column,
    /// `corner` at the bottom right, zeros in the bottom row.
    fn bordered(&self, coords: &[f64], corner: f64) -> Result<Replicated> {
        let values = self
            .kernel
            .singular_values()
            .ok_or(BasisError::NotInitialized)?;
        let k = values.rows;
        let mut q = Replicated::zeros(k + 1, k + 1);
        for i in 0..k {
            q.set(i, i, values.get(i, i));
            q.set(i, k, coords[i]);
        }
        q.set(k, k, corner);
        Ok(q)
    }

    fn projection_residual(&mut self, v: &[f64]) -> Result<f64> {
        let comm = Arc::clone(&self.comm);
        let basis = self.ensure_basis()?;
        let coords = basis.transpose_mult_vec(v, comm.as_ref())?;
        let lift = basis.mult_vec(&coords)?;
        let diff: Vec<f64> = v.iter().zip(lift.iter()).map(|(a, b)| a - b).collect();
        Ok(global_norm(&diff, comm.as_ref()))
    }
}
