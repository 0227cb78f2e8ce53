//! Axis-wise separable convolution
//!
//! One N-D Gaussian (derivative) pass is a sequence of 1D passes, one per
//! spatial axis. Each pass gathers a line of samples, pads it on both sides
//! by the kernel radius according to the boundary mode, and writes the dot
//! product of the taps with the padded window back to the line (the kernel is
//! applied as-is, i.e. cross-correlation).
//!
//! For the line `a b c d` and radius 2, the padded aprons per mode are:
//!
//! - reflect:   `c b | a b c d | c b`   (edge sample not repeated)
//! - replicate: `a a | a b c d | d d`
//! - constant:  `0 0 | a b c d | 0 0`
//! - circular:  `c d | a b c d | a b`
//!
//! Reflection and wrap indices fold periodically, so kernels wider than the
//! axis are handled without error.

use crate::error::FilterError;
use crate::image::{GridShape, ImageField};
use crate::kernels::GaussianKernel;
use crate::simd::dot_f64;

/// How samples beyond the field border are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryMode {
    /// Mirror about the edge without repeating the edge sample.
    #[default]
    Reflect,
    /// Clamp to the edge sample.
    Replicate,
    /// Zero fill.
    Constant,
    /// Wrap around to the opposite edge.
    Circular,
}

/// Map a line position (possibly outside `[0, n)`) to a source index, or
/// `None` where the mode fills with zero.
#[inline]
fn boundary_index(p: isize, n: usize, mode: BoundaryMode) -> Option<usize> {
    let n_i = n as isize;
    if p >= 0 && p < n_i {
        return Some(p as usize);
    }
    match mode {
        BoundaryMode::Constant => None,
        BoundaryMode::Replicate => Some(p.clamp(0, n_i - 1) as usize),
        BoundaryMode::Circular => Some(p.rem_euclid(n_i) as usize),
        BoundaryMode::Reflect => {
            if n == 1 {
                return Some(0);
            }
            let period = 2 * (n_i - 1);
            let q = p.rem_euclid(period);
            Some(if q < n_i {
                q as usize
            } else {
                (period - q) as usize
            })
        }
    }
}

/// Which kernel each channel of a field receives.
enum ChannelKernels<'a> {
    Same(&'a GaussianKernel),
    PerChannel(&'a [GaussianKernel]),
}

impl<'a> ChannelKernels<'a> {
    #[inline]
    fn get(&self, c: usize) -> &'a GaussianKernel {
        match *self {
            ChannelKernels::Same(k) => k,
            ChannelKernels::PerChannel(ks) => &ks[c],
        }
    }
}

/// Visit the plane offset of the first sample of every line along `axis`.
fn for_each_line_base(grid: GridShape, axis: usize, mut f: impl FnMut(usize)) {
    match (grid, axis) {
        (GridShape::TwoD { width, .. }, 0) => {
            for x in 0..width {
                f(x);
            }
        }
        (GridShape::TwoD { height, width }, 1) => {
            for y in 0..height {
                f(y * width);
            }
        }
        (
            GridShape::ThreeD {
                height, width, ..
            },
            0,
        ) => {
            for y in 0..height {
                for x in 0..width {
                    f(y * width + x);
                }
            }
        }
        (
            GridShape::ThreeD {
                depth,
                height,
                width,
            },
            1,
        ) => {
            for z in 0..depth {
                for x in 0..width {
                    f(z * height * width + x);
                }
            }
        }
        (
            GridShape::ThreeD {
                depth,
                height,
                width,
            },
            2,
        ) => {
            for z in 0..depth {
                for y in 0..height {
                    f((z * height + y) * width);
                }
            }
        }
        // axis already validated against the grid rank
        _ => {}
    }
}

fn convolve_impl(
    img: &ImageField,
    kernels: ChannelKernels,
    axis: usize,
    mode: BoundaryMode,
) -> Result<ImageField, FilterError> {
    let grid = img.grid();
    let len = grid.axis_len(axis)?;
    let stride = grid.axis_stride(axis)?;

    let mut out = ImageField::zeros(img.batch(), img.channels(), grid);

    for b in 0..img.batch() {
        for c in 0..img.channels() {
            let kernel = kernels.get(c);
            let r = kernel.radius();
            let taps = kernel.taps();
            let src = img.plane(b, c);
            let dst = out.plane_mut(b, c);

            let mut padded = vec![0.0; len + 2 * r];
            for_each_line_base(grid, axis, |base| {
                for i in 0..len {
                    padded[r + i] = src[base + i * stride];
                }
                for i in 0..r {
                    let left = i as isize - r as isize;
                    padded[i] = boundary_index(left, len, mode).map_or(0.0, |j| padded[r + j]);
                    let right = (len + i) as isize;
                    padded[r + len + i] =
                        boundary_index(right, len, mode).map_or(0.0, |j| padded[r + j]);
                }
                for i in 0..len {
                    dst[base + i * stride] = dot_f64(taps, &padded[i..i + taps.len()]);
                }
            });
        }
    }

    Ok(out)
}

/// Convolve every channel of a field with the same 1D kernel along one axis.
///
/// # Arguments
/// * `img` - Input field
/// * `kernel` - 1D kernel
/// * `axis` - Spatial axis in storage order (2D: 0 = y, 1 = x; 3D: 0 = z,
///   1 = y, 2 = x); out-of-range axes fail with `ShapeMismatch`
/// * `mode` - Boundary handling
///
/// # Returns
/// A field of the same shape as the input.
pub fn convolve_axis(
    img: &ImageField,
    kernel: &GaussianKernel,
    axis: usize,
    mode: BoundaryMode,
) -> Result<ImageField, FilterError> {
    convolve_impl(img, ChannelKernels::Same(kernel), axis, mode)
}

/// Grouped variant of [`convolve_axis`]: channel `c` is convolved with
/// `kernels[c]`.
///
/// This is the primitive under the fused multi-channel Hessian: packing the
/// component kernels into one pass per axis instead of running each component
/// separately. Per channel the result is identical to [`convolve_axis`] with
/// that channel's kernel.
pub fn convolve_axis_per_channel(
    img: &ImageField,
    kernels: &[GaussianKernel],
    axis: usize,
    mode: BoundaryMode,
) -> Result<ImageField, FilterError> {
    if kernels.len() != img.channels() {
        return Err(FilterError::ShapeMismatch {
            what: "kernels per channel",
            expected: img.channels(),
            got: kernels.len(),
        });
    }
    convolve_impl(img, ChannelKernels::PerChannel(kernels), axis, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_field(data: Vec<f64>) -> ImageField {
        let w = data.len();
        ImageField::from_vec_2d(1, w, data).unwrap()
    }

    #[test]
    fn test_border_modes_hand_computed() {
        let img = line_field(vec![10.0, 20.0, 30.0, 40.0]);
        let k = GaussianKernel::from_taps(vec![1.0, 2.0, 4.0]);

        let out = convolve_axis(&img, &k, 1, BoundaryMode::Reflect).unwrap();
        assert_eq!(out.data(), &[120.0, 170.0, 240.0, 230.0]);

        let out = convolve_axis(&img, &k, 1, BoundaryMode::Replicate).unwrap();
        assert_eq!(out.data(), &[110.0, 170.0, 240.0, 270.0]);

        let out = convolve_axis(&img, &k, 1, BoundaryMode::Constant).unwrap();
        assert_eq!(out.data(), &[100.0, 170.0, 240.0, 110.0]);

        let out = convolve_axis(&img, &k, 1, BoundaryMode::Circular).unwrap();
        assert_eq!(out.data(), &[140.0, 170.0, 240.0, 150.0]);
    }

    #[test]
    fn test_strided_axis() {
        // 3 rows x 2 columns, convolved down the columns
        let img = ImageField::from_parts(
            1,
            1,
            GridShape::TwoD {
                height: 3,
                width: 2,
            },
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let k = GaussianKernel::from_taps(vec![1.0, 2.0, 4.0]);

        let out = convolve_axis(&img, &k, 0, BoundaryMode::Replicate).unwrap();
        assert_eq!(out.data(), &[15.0, 22.0, 27.0, 34.0, 33.0, 40.0]);
    }

    #[test]
    fn test_constant_image_smoothing_is_invariant() {
        let img = ImageField::from_vec_3d(5, 6, 7, vec![3.5; 210]).unwrap();
        let k = GaussianKernel::new(1.2, 0, 4.0).unwrap();
        for mode in [BoundaryMode::Reflect, BoundaryMode::Replicate] {
            let mut out = img.clone();
            for axis in 0..3 {
                out = convolve_axis(&out, &k, axis, mode).unwrap();
            }
            for &v in out.data() {
                // off by the truncated tail mass only
                assert!((v - 3.5).abs() < 1e-2, "mode {:?}: {}", mode, v);
            }
        }
    }

    #[test]
    fn test_kernel_wider_than_axis() {
        let img = line_field(vec![5.0, 5.0]);
        let k = GaussianKernel::from_taps(vec![1.0, 2.0, 4.0, 2.0, 1.0]);
        for mode in [
            BoundaryMode::Reflect,
            BoundaryMode::Replicate,
            BoundaryMode::Circular,
        ] {
            let out = convolve_axis(&img, &k, 1, mode).unwrap();
            for &v in out.data() {
                assert_eq!(v, 50.0, "mode {:?}", mode);
            }
        }
    }

    #[test]
    fn test_axis_out_of_range() {
        let img = line_field(vec![1.0, 2.0]);
        let k = GaussianKernel::from_taps(vec![1.0]);
        let err = convolve_axis(&img, &k, 2, BoundaryMode::Reflect).unwrap_err();
        assert!(matches!(err, FilterError::ShapeMismatch { what: "axis index", .. }));
    }

    #[test]
    fn test_grouped_matches_per_channel() {
        let grid = GridShape::TwoD {
            height: 2,
            width: 4,
        };
        let a: Vec<f64> = (0..8).map(|v| v as f64).collect();
        let b: Vec<f64> = (0..8).map(|v| (v * v) as f64 * 0.5).collect();
        let mut both = a.clone();
        both.extend_from_slice(&b);
        let img = ImageField::from_parts(1, 2, grid, both).unwrap();

        let k0 = GaussianKernel::from_taps(vec![1.0, 2.0, 4.0]);
        let k1 = GaussianKernel::from_taps(vec![0.5, 1.0, 0.25]);

        let grouped =
            convolve_axis_per_channel(&img, &[k0.clone(), k1.clone()], 1, BoundaryMode::Reflect)
                .unwrap();

        let single_a = convolve_axis(
            &ImageField::from_parts(1, 1, grid, a).unwrap(),
            &k0,
            1,
            BoundaryMode::Reflect,
        )
        .unwrap();
        let single_b = convolve_axis(
            &ImageField::from_parts(1, 1, grid, b).unwrap(),
            &k1,
            1,
            BoundaryMode::Reflect,
        )
        .unwrap();

        assert_eq!(grouped.plane(0, 0), single_a.data());
        assert_eq!(grouped.plane(0, 1), single_b.data());
    }

    #[test]
    fn test_grouped_kernel_count_validated() {
        let img = line_field(vec![1.0, 2.0, 3.0]);
        let k = GaussianKernel::from_taps(vec![1.0]);
        let err =
            convolve_axis_per_channel(&img, &[k.clone(), k], 1, BoundaryMode::Reflect).unwrap_err();
        assert_eq!(
            err,
            FilterError::ShapeMismatch {
                what: "kernels per channel",
                expected: 1,
                got: 2
            }
        );
    }
}
