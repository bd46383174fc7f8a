// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cross-worker reduction seam.
//!
//! Every distributed operation in this crate funnels its communication
//! through [`GlobalReduce`]: an element-wise sum over all workers whose
//! result is identical on every worker. That is the entire wire contract.
//! The crate ships only the serial implementation; a deployment that
//! partitions rows across processes supplies its own reduction behind the
//! same trait.

/// Element-wise global summation across all workers.
///
/// Implementations must return the same value on every participating worker
/// and must be externally synchronized: all workers call the same sequence
/// of reductions in the same order.
pub trait GlobalReduce: Send + Sync {
    /// Sum a scalar contribution over all workers.
    fn sum_scalar(&self, local: f64) -> f64;

    /// Sum slice contributions element-wise over all workers, in place.
    ///
    /// On return, `local` holds the global sums on every worker.
    fn sum_slice(&self, local: &mut [f64]);
}

/// Single-worker reduction: every global sum is the local value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialReduce;

impl GlobalReduce for SerialReduce {
    #[inline]
    fn sum_scalar(&self, local: f64) -> f64 {
        local
    }

    #[inline]
    fn sum_slice(&self, _local: &mut [f64]) {}
}

/// Inner product of two distributed vectors (local row blocks).
///
/// Each worker passes its block; the result is the global inner product,
/// identical on every worker.
pub fn global_dot(a: &[f64], b: &[f64], comm: &dyn GlobalReduce) -> f64 {
    let local: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    comm.sum_scalar(local)
}

/// Euclidean norm of a distributed vector (local row block).
pub fn global_norm(v: &[f64], comm: &dyn GlobalReduce) -> f64 {
    global_dot(v, v, comm).sqrt()
}
