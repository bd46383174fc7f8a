// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dense matrix primitives for streaming reduced-basis maintenance.
//!
//! This crate provides exactly the pieces an incremental SVD needs when the
//! tall factor is row-partitioned across workers and every small factor is
//! replicated on all of them:
//!
//! - **`RowMatrix`**: the local row block of a conceptually taller matrix,
//!   with append-only column growth and the handful of products the update
//!   kernels use.
//! - **`Replicated`**: a small square-ish matrix held identically on every
//!   worker (rotation factors, singular-value blocks, bordered systems).
//! - **`svd_replicated`**: a Jacobi SVD for small square replicated systems.
//!   Pure Rust, no LAPACK or BLAS.
//! - **`GlobalReduce`**: the cross-worker reduction seam. All distributed
//!   operations are written against this trait; a serial run plugs in
//!   [`SerialReduce`] and a multi-worker deployment supplies its own sum.
//!
//! Worker topology never appears explicitly in any signature. Replicated
//! values are assumed bit-identical across workers: the reduction seam is
//! the only place worker-local data meets, and it returns the same result
//! everywhere.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_panics_doc)]
#![warn(missing_docs)]

pub mod distributed;
pub mod reduce;
pub mod replicated;
pub mod svd;

pub use distributed::RowMatrix;
pub use reduce::{global_dot, global_norm, GlobalReduce, SerialReduce};
pub use replicated::Replicated;
pub use svd::{svd_replicated, SmallSvd};

use thiserror::Error;

/// Errors from the matrix primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinalgError {
    /// Raw data length does not match the requested shape.
    #[error("invalid shape: product {product} does not match length {length}")]
    InvalidShape {
        /// Product of the requested dimensions.
        product: usize,
        /// Length of the supplied data.
        length: usize,
    },
    /// Operand dimensions do not line up.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension required by the receiving operand.
        expected: usize,
        /// Dimension actually supplied.
        got: usize,
    },
    /// A square matrix was required.
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare {
        /// Row count of the offending matrix.
        rows: usize,
        /// Column count of the offending matrix.
        cols: usize,
    },
    /// An operand had zero elements.
    #[error("empty matrix")]
    EmptyMatrix,
    /// The Jacobi iteration did not reach the off-diagonal tolerance.
    #[error("SVD failed to converge after {sweeps} sweeps")]
    SvdNotConverged {
        /// Number of full sweeps performed.
        sweeps: usize,
    },
}
