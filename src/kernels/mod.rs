//! Kernel construction for separable filtering
//!
//! This module provides the 1D kernels applied axis by axis by the separable
//! convolver:
//! - Gaussian smoothing and Gaussian-derivative kernels (orders 0, 1, 2)

pub mod gaussian;

pub use gaussian::*;
