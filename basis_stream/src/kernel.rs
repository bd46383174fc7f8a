// SPDX-License-Identifier: MIT OR Apache-2.0
//! Update-kernel interface and dispatch.
//!
//! A kernel owns the factored basis of one time interval and applies the
//! structural updates the sampler hands it. Kernels never classify samples
//! and never solve the bordered system; they apply the supplied factors
//! exactly as given. The two shipped strategies differ only in where
//! rotation cost lands: [`FastUpdate`] defers it to materialization,
//! [`DirectUpdate`] pays it per absorbed sample.

use basis_linalg::{GlobalReduce, Replicated, RowMatrix};

use crate::config::KernelKind;
use crate::direct_update::DirectUpdate;
use crate::error::{BasisError, Result};
use crate::fast_update::FastUpdate;

/// A strategy for maintaining a factored basis under absorbed samples.
///
/// State machine: a kernel starts uninitialized; [`initialize`] installs a
/// rank-1 factorization from the first sample of a time interval;
/// [`absorb_redundant`] keeps the rank and [`absorb_novel`] grows it by
/// exactly one; [`reset`] returns to uninitialized. Replicated inputs must
/// be identical on every worker.
///
/// [`initialize`]: UpdateKernel::initialize
/// [`absorb_redundant`]: UpdateKernel::absorb_redundant
/// [`absorb_novel`]: UpdateKernel::absorb_novel
/// [`reset`]: UpdateKernel::reset
pub trait UpdateKernel {
    /// Install a rank-1 factorization from the first sample of an interval.
    ///
    /// The basis becomes the sample scaled to unit global norm; the single
    /// singular value is that norm. Fails if a basis is already live.
    fn initialize(&mut self, sample: &[f64], time: f64, comm: &dyn GlobalReduce) -> Result<()>;

    /// Materialize the current basis as an explicit local row block.
    ///
    /// Pure: repeated calls without intervening absorption return the same
    /// matrix, and the result reflects every absorption so far.
    fn materialize(&self) -> Result<RowMatrix>;

    /// Fold in a sample that adds no new direction.
    ///
    /// `rotation` and `values` are k x k for current rank k; the rank and
    /// the set of spanned directions are unchanged.
    fn absorb_redundant(&mut self, rotation: &Replicated, values: &Replicated) -> Result<()>;

    /// Append a new direction and apply the accompanying rotation.
    ///
    /// `column` is this worker's slice of the unit vector to append;
    /// `rotation` and `values` are (k+1) x (k+1). The rank grows by one.
    fn absorb_novel(
        &mut self,
        column: &[f64],
        rotation: &Replicated,
        values: &Replicated,
    ) -> Result<()>;

    /// Discard all state; the next `initialize` starts a fresh interval.
    fn reset(&mut self);

    /// Current basis rank; 0 while uninitialized.
    fn rank(&self) -> usize;

    /// Current singular-value block, if a basis is live.
    fn singular_values(&self) -> Option<&Replicated>;

    /// Simulation time of the sample that started the current interval.
    fn start_time(&self) -> Option<f64>;
}

/// Both replicated factors of an absorption must be square of the same
/// expected order.
pub(crate) fn check_factors(
    expected: usize,
    rotation: &Replicated,
    values: &Replicated,
) -> Result<()> {
    for factor in [rotation, values] {
        if factor.rows != expected || factor.cols != expected {
            let got = if factor.rows != expected {
                factor.rows
            } else {
                factor.cols
            };
            return Err(BasisError::RankMismatch { expected, got });
        }
    }
    Ok(())
}

/// Config-selected kernel dispatching to one of the shipped strategies.
#[derive(Debug, Clone)]
pub enum Kernel {
    /// Deferred-rotation strategy.
    Fast(FastUpdate),
    /// Immediate-rotation strategy.
    Direct(DirectUpdate),
}

impl Kernel {
    /// Construct the kernel selected by `kind` for a worker holding `dim`
    /// rows of each sample.
    #[must_use]
    pub fn new(kind: KernelKind, dim: usize) -> Self {
        match kind {
            KernelKind::FastUpdate => Self::Fast(FastUpdate::new(dim)),
            KernelKind::Direct => Self::Direct(DirectUpdate::new(dim)),
        }
    }
}

impl UpdateKernel for Kernel {
    fn initialize(&mut self, sample: &[f64], time: f64, comm: &dyn GlobalReduce) -> Result<()> {
        match self {
            Self::Fast(k) => k.initialize(sample, time, comm),
            Self::Direct(k) => k.initialize(sample, time, comm),
        }
    }

    fn materialize(&self) -> Result<RowMatrix> {
        match self {
            Self::Fast(k) => k.materialize(),
            Self::Direct(k) => k.materialize(),
        }
    }

    fn absorb_redundant(&mut self, rotation: &Replicated, values: &Replicated) -> Result<()> {
        match self {
            Self::Fast(k) => k.absorb_redundant(rotation, values),
            Self::Direct(k) => k.absorb_redundant(rotation, values),
        }
    }

    fn absorb_novel(
        &mut self,
        column: &[f64],
        rotation: &Replicated,
        values: &Replicated,
    ) -> Result<()> {
        match self {
            Self::Fast(k) => k.absorb_novel(column, rotation, values),
            Self::Direct(k) => k.absorb_novel(column, rotation, values),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Fast(k) => k.reset(),
            Self::Direct(k) => k.reset(),
        }
    }

    fn rank(&self) -> usize {
        match self {
            Self::Fast(k) => k.rank(),
            Self::Direct(k) => k.rank(),
        }
    }

    fn singular_values(&self) -> Option<&Replicated> {
        match self {
            Self::Fast(k) => k.singular_values(),
            Self::Direct(k) => k.singular_values(),
        }
    }

    fn start_time(&self) -> Option<f64> {
        match self {
            Self::Fast(k) => k.start_time(),
            Self::Direct(k) => k.start_time(),
        }
    }
}
