//! Error types for the filtering pipeline
//!
//! Every fallible operation in this crate validates its inputs up front and
//! returns one of these variants before any convolution or eigenvalue work
//! begins. There are no retries and no partial outputs.

use thiserror::Error;

/// Errors produced by kernel construction, filtering, and eigen analysis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Image rank is not 2D `[batch, channel, h, w]` or 3D `[batch, channel, d, h, w]`.
    #[error("invalid image dimensionality: expected rank 4 (2D) or 5 (3D), got rank {rank}")]
    InvalidDimension { rank: usize },

    /// Derivative order above what the Gaussian kernel builder supports.
    #[error("unsupported derivative order {order}: only orders 0, 1 and 2 are implemented")]
    UnsupportedOrder { order: usize },

    /// An axis count, axis index, or buffer length disagrees with the field shape.
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A scale or kernel sigma below zero.
    #[error("sigma values must be non-negative, got {sigma}")]
    NegativeSigma { sigma: f64 },

    /// A scale range whose step would never reach the stop value.
    #[error("scale range step must be positive, got {step}")]
    InvalidScaleStep { step: f64 },

    /// Eigenvalue input whose per-pixel matrices are not square.
    #[error("matrix field is not square: {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },

    /// Eigenvalue input whose per-pixel matrices are not symmetric within tolerance.
    #[error("matrix field is not symmetric at pixel {pixel}: |a - a^T| = {deviation}")]
    NonHermitianMatrix { pixel: usize, deviation: f64 },

    /// Eigenvalue input with a matrix size other than 2x2 or 3x3.
    #[error("unsupported eigenvalue input size {size}: only 2x2 and 3x3 matrices are solved")]
    InvalidEigenInputSize { size: usize },
}
