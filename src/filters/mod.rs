//! Separable image filters and the vesselness pipeline
//!
//! This module provides the filter stages, each usable on its own:
//! - Axis-wise separable convolution with selectable boundary handling
//! - Gaussian smoothing and Gaussian derivatives of order 0 to 2
//! - Per-pixel Hessian components, dense matrices, and eigenvalues
//! - Multiscale Frangi vesselness enhancement

pub mod convolve;
pub mod frangi;
pub mod gaussian;
pub mod hessian;

pub use convolve::{convolve_axis, convolve_axis_per_channel, BoundaryMode};
pub use frangi::{frangi, frangi_with_progress, ExecContext, FrangiParams, ScaleSpec};
pub use gaussian::{gaussian_filter, DerivOrder};
pub use hessian::{
    hessian, hessian_eigenvalues, hessian_matrix, Hessian2d, Hessian3d, HessianField,
};
