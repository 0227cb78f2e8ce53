//! SIMD-accelerated inner loops for separable filtering
//!
//! The separable convolver spends nearly all of its time in one operation:
//! the dot product of a kernel with a padded window of line samples. When the
//! `simd` feature is enabled that dot product runs on 256-bit lanes
//! (`wide::f64x4`); otherwise a scalar fallback with identical results is
//! used.

#[cfg(feature = "simd")]
use wide::f64x4;

/// SIMD lane width (4 for f64x4)
#[cfg(feature = "simd")]
pub const SIMD_WIDTH: usize = 4;

#[cfg(not(feature = "simd"))]
pub const SIMD_WIDTH: usize = 1;

/// Compute dot product: sum(a[i] * b[i])
#[cfg(feature = "simd")]
#[inline]
pub fn dot_f64(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let remainder = n % SIMD_WIDTH;

    let mut sum = f64x4::ZERO;

    // Process 4 elements at a time
    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let va = f64x4::from(&a[idx..idx + SIMD_WIDTH]);
        let vb = f64x4::from(&b[idx..idx + SIMD_WIDTH]);
        sum += va * vb;
    }

    // Horizontal sum of SIMD register
    let mut result = sum.reduce_add();

    // Handle remainder
    let start = chunks * SIMD_WIDTH;
    for i in 0..remainder {
        result += a[start + i] * b[start + i];
    }

    result
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn dot_f64(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&ai, &bi)| ai * bi).sum()
}
