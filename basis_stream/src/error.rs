// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for streaming basis maintenance.
//!
//! Precondition violations (wrong sample length, mismatched factor ranks,
//! negative time) are caller defects: they are reported once and nothing is
//! retried or repaired internally.

use basis_linalg::LinalgError;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BasisError>;

/// Errors from configuration, update kernels, and the sampler.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BasisError {
    /// The configured local dimension was zero.
    #[error("dimension must be positive")]
    InvalidDimension,
    /// A tolerance was non-positive or not finite.
    #[error("invalid {name}: {value} (must be finite and positive)")]
    InvalidTolerance {
        /// Name of the offending configuration field.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The per-interval sample budget was zero.
    #[error("samples per interval must be at least 1")]
    InvalidSampleBudget,
    /// The redundancy tolerance was looser than the sampling tolerance.
    #[error("redundancy tolerance {redundancy} exceeds sampling tolerance {sampling}")]
    ToleranceOrder {
        /// Configured redundancy tolerance.
        redundancy: f64,
        /// Configured sampling tolerance.
        sampling: f64,
    },
    /// A sample or column had the wrong number of local rows.
    #[error("sample length mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Local rows this worker holds.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },
    /// A replicated factor did not match the rank the operation requires.
    #[error("factor rank mismatch: expected {expected}, got {got}")]
    RankMismatch {
        /// Order the factor must have.
        expected: usize,
        /// Order actually supplied.
        got: usize,
    },
    /// Sample time was negative or not a number.
    #[error("invalid sample time: {0}")]
    NegativeTime(f64),
    /// The first sample of an interval had zero or non-finite norm.
    #[error("sample has zero or non-finite norm")]
    DegenerateSample,
    /// An operation needed a basis before any sample was taken.
    #[error("no basis: no sample has been taken yet")]
    NotInitialized,
    /// A first sample arrived while a basis was still live.
    #[error("already initialized; reset before starting a new interval")]
    AlreadyInitialized,
    /// Failure inside the matrix primitives.
    #[error("linear algebra error: {0}")]
    Linalg(#[from] LinalgError),
}
