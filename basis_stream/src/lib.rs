// SPDX-License-Identifier: MIT OR Apache-2.0
//! Streaming incremental SVD for reduced-basis construction.
//!
//! This crate maintains an orthonormal basis for the dominant left singular
//! subspace of a stream of state snapshots, one sample at a time, without
//! ever forming the snapshot matrix. It is built for the model-reduction
//! setting: state vectors are tall and row-partitioned across workers,
//! samples arrive as a simulation advances, and most of them add little
//! that the current basis does not already span.
//!
//! # Architecture
//!
//! - [`BasisSampler`] is the entry point: it classifies each incoming
//!   sample as redundant or novel against the live basis, solves a small
//!   bordered SVD to turn the outcome into update factors, and handles
//!   time-interval rollover.
//! - [`UpdateKernel`] is the seam between classification and factor
//!   bookkeeping. [`FastUpdate`] (the default) keeps the basis factored as
//!   `U * U'` and defers all rotations into the small replicated factor;
//!   [`DirectUpdate`] rotates the tall factor on every sample. Both
//!   materialize identical bases, modulo floating-point rounding.
//! - Worker topology lives entirely behind [`GlobalReduce`] from
//!   `basis_linalg`; a serial run uses [`SerialReduce`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use basis_stream::{BasisConfig, BasisSampler};
//!
//! let mut sampler = BasisSampler::serial(BasisConfig::for_dim(1024)?)?;
//! for (state, time) in snapshots {
//!     sampler.take_sample(&state, time)?;
//! }
//! let basis = sampler.basis()?;
//! let coords = sampler.project(&query)?;
//! ```

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::similar_names)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![warn(missing_docs)]

pub mod config;
pub mod direct_update;
pub mod error;
pub mod fast_update;
pub mod kernel;
pub mod sampler;

pub use config::{BasisConfig, KernelKind};
pub use direct_update::DirectUpdate;
pub use error::{BasisError, Result};
pub use fast_update::FastUpdate;
pub use kernel::{Kernel, UpdateKernel};
pub use sampler::{BasisSampler, SampleOutcome};

// Re-export the primitive layer for callers that build factors directly.
pub use basis_linalg::{
    global_dot, global_norm, svd_replicated, GlobalReduce, LinalgError, Replicated, RowMatrix,
    SerialReduce, SmallSvd,
};
