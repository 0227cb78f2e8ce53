//! Multiscale Hessian-based enhancement of curvilinear structures
//!
//! This crate builds the Frangi vesselness pipeline from separable
//! Gaussian-derivative convolutions: smoothing kernels, per-pixel Hessian
//! components, closed-form symmetric eigenvalues, and the multiscale
//! vesselness measure itself. Every stage is exposed on its own, so the
//! smoothing, derivative, and eigenvalue machinery can be used directly.
//!
//! Fields are batched, single- or multi-channel, and either 2D or 3D; the
//! dimensionality is fixed by the [`GridShape`] chosen at construction.
//!
//! # Modules
//! - `image`: batched scalar fields over 2D/3D grids
//! - `kernels`: moment-normalized Gaussian-derivative taps (orders 0 to 2)
//! - `filters`: separable convolution, Gaussian derivatives, Hessian,
//!   and the Frangi vesselness filter
//! - `linalg`: closed-form eigensolvers for symmetric 2x2/3x3 fields
//! - `error`: the crate-wide error type
//! - `simd`: SIMD-accelerated inner loops (optional, with `simd` feature)

pub mod error;
pub mod filters;
pub mod image;
pub mod kernels;
pub mod linalg;
pub mod simd;

pub use error::FilterError;
pub use filters::{
    convolve_axis, convolve_axis_per_channel, frangi, frangi_with_progress, gaussian_filter,
    hessian, hessian_eigenvalues, hessian_matrix, BoundaryMode, DerivOrder, ExecContext,
    FrangiParams, Hessian2d, Hessian3d, HessianField, ScaleSpec,
};
pub use image::{GridShape, ImageField};
pub use kernels::GaussianKernel;
pub use linalg::{det3, eigvalsh, eigvalsh2, eigvalsh3, EigenvalueField, MatrixField};
