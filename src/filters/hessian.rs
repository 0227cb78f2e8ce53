//! Per-pixel Hessian components and eigenvalues
//!
//! The Hessian of a smoothed field is built from Gaussian-derivative
//! convolutions, one per distinct second partial:
//!
//! - 2D: three independent separable passes (`xx`, `xy`, `yy`)
//! - 3D: the six component kernels are packed into one 6-channel grouped
//!   convolution per axis, so each axis of the volume is traversed once
//!   instead of six times; per component the result is identical to the
//!   independent separable passes
//!
//! `x` is the width axis, `y` the height axis, `z` the depth axis.
//! Eigenvalues of the per-pixel component matrix are ordered ascending by
//! absolute value, which is the order the vesselness ratios expect.

use log::trace;

use crate::error::FilterError;
use crate::filters::convolve::{convolve_axis_per_channel, BoundaryMode};
use crate::filters::gaussian::{gaussian_filter, DerivOrder};
use crate::image::ImageField;
use crate::kernels::GaussianKernel;
use crate::linalg::{eigvalsh2, eigvalsh3, EigenvalueField, MatrixField};

/// Second-derivative components of a 2D field.
#[derive(Debug, Clone, PartialEq)]
pub struct Hessian2d {
    pub xx: ImageField,
    pub xy: ImageField,
    pub yy: ImageField,
}

/// Second-derivative components of a 3D field.
#[derive(Debug, Clone, PartialEq)]
pub struct Hessian3d {
    pub xx: ImageField,
    pub xy: ImageField,
    pub xz: ImageField,
    pub yy: ImageField,
    pub yz: ImageField,
    pub zz: ImageField,
}

/// The distinct upper-triangle components of a per-pixel symmetric Hessian.
///
/// The variant tracks the matrix size (2x2 or 3x3); each component is a
/// single-channel [`ImageField`] over the source grid.
#[derive(Debug, Clone, PartialEq)]
pub enum HessianField {
    TwoD(Hessian2d),
    ThreeD(Hessian3d),
}

impl HessianField {
    /// Number of distinct components: 3 in 2D, 6 in 3D.
    pub fn component_count(&self) -> usize {
        match self {
            HessianField::TwoD(_) => 3,
            HessianField::ThreeD(_) => 6,
        }
    }

    /// Components in upper-triangle row-major order
    /// (`xx, xy, yy` or `xx, xy, xz, yy, yz, zz`).
    pub fn components(&self) -> Vec<&ImageField> {
        match self {
            HessianField::TwoD(h) => vec![&h.xx, &h.xy, &h.yy],
            HessianField::ThreeD(h) => vec![&h.xx, &h.xy, &h.xz, &h.yy, &h.yz, &h.zz],
        }
    }

    /// Expand the triangle into full per-pixel dense matrices.
    ///
    /// The inverse of [`HessianField::from_matrix`]: mirroring the triangle
    /// into a [`MatrixField`] and extracting it back is exact.
    pub fn to_matrix(&self) -> Result<MatrixField, FilterError> {
        let components = self.components();
        let first = components[0];
        for c in &components {
            if c.channels() != 1 {
                return Err(FilterError::ShapeMismatch {
                    what: "hessian component channels",
                    expected: 1,
                    got: c.channels(),
                });
            }
        }
        for c in &components[1..] {
            if c.batch() != first.batch() || c.grid() != first.grid() {
                return Err(FilterError::ShapeMismatch {
                    what: "hessian component shapes",
                    expected: first.len(),
                    got: c.len(),
                });
            }
        }

        let n = match self {
            HessianField::TwoD(_) => 2,
            HessianField::ThreeD(_) => 3,
        };
        let total = first.batch() * first.grid().num_pixels();
        let mut data = vec![0.0; total * n * n];

        // upper-triangle planes in row-major order, mirrored below the diagonal
        let mut tri = 0;
        for i in 0..n {
            for j in i..n {
                let plane = components[tri].data();
                for (pixel, &v) in plane.iter().enumerate() {
                    let m = &mut data[pixel * n * n..(pixel + 1) * n * n];
                    m[i * n + j] = v;
                    m[j * n + i] = v;
                }
                tri += 1;
            }
        }

        MatrixField::from_parts(n, n, first.batch(), first.grid(), data)
    }

    /// Extract the upper triangle of a per-pixel matrix field.
    pub fn from_matrix(field: &MatrixField) -> Result<HessianField, FilterError> {
        if field.rows() != field.cols() {
            return Err(FilterError::NonSquareMatrix {
                rows: field.rows(),
                cols: field.cols(),
            });
        }
        let n = field.rows();
        if n != 2 && n != 3 {
            return Err(FilterError::InvalidEigenInputSize { size: n });
        }

        let total = field.total_pixels();
        let plane = |row: usize, col: usize| -> Result<ImageField, FilterError> {
            let data = (0..total).map(|p| field.matrix(p)[row * n + col]).collect();
            ImageField::from_parts(field.batch(), 1, field.grid(), data)
        };

        if n == 2 {
            Ok(HessianField::TwoD(Hessian2d {
                xx: plane(0, 0)?,
                xy: plane(0, 1)?,
                yy: plane(1, 1)?,
            }))
        } else {
            Ok(HessianField::ThreeD(Hessian3d {
                xx: plane(0, 0)?,
                xy: plane(0, 1)?,
                xz: plane(0, 2)?,
                yy: plane(1, 1)?,
                yz: plane(1, 2)?,
                zz: plane(2, 2)?,
            }))
        }
    }
}

pub(crate) fn require_single_channel(img: &ImageField) -> Result<(), FilterError> {
    if img.channels() != 1 {
        return Err(FilterError::ShapeMismatch {
            what: "input channels",
            expected: 1,
            got: img.channels(),
        });
    }
    Ok(())
}

fn repeat_channels(img: &ImageField, channels: usize) -> ImageField {
    let mut out = ImageField::zeros(img.batch(), channels, img.grid());
    for b in 0..img.batch() {
        let src = img.plane(b, 0);
        for c in 0..channels {
            out.plane_mut(b, c).copy_from_slice(src);
        }
    }
    out
}

fn extract_channel(img: &ImageField, c: usize) -> ImageField {
    let mut out = ImageField::zeros(img.batch(), 1, img.grid());
    for b in 0..img.batch() {
        out.plane_mut(b, 0).copy_from_slice(img.plane(b, c));
    }
    out
}

fn hessian_2d(
    img: &ImageField,
    sigma: f64,
    mode: BoundaryMode,
    truncate: f64,
) -> Result<Hessian2d, FilterError> {
    let part = |orders: Vec<usize>| {
        gaussian_filter(img, sigma, DerivOrder::PerAxis(orders), mode, truncate)
    };
    Ok(Hessian2d {
        xx: part(vec![0, 2])?,
        xy: part(vec![1, 1])?,
        yy: part(vec![2, 0])?,
    })
}

/// Derivative order along each axis (z, y, x) for the six packed channels
/// `xx, xy, xz, yy, yz, zz`.
const FUSED_ORDERS: [[usize; 6]; 3] = [
    [0, 0, 1, 0, 1, 2], // z axis
    [0, 1, 0, 2, 1, 0], // y axis
    [2, 1, 1, 0, 0, 0], // x axis
];

fn hessian_3d(
    img: &ImageField,
    sigma: f64,
    mode: BoundaryMode,
    truncate: f64,
) -> Result<Hessian3d, FilterError> {
    let base: Vec<GaussianKernel> = (0..3)
        .map(|order| GaussianKernel::new(sigma, order, truncate))
        .collect::<Result<_, _>>()?;
    trace!(
        "hessian 3d: sigma={} radius={} fused over 6 channels",
        sigma,
        base[0].radius()
    );

    let mut packed = repeat_channels(img, 6);
    for (axis, orders) in FUSED_ORDERS.iter().enumerate() {
        let kernels: Vec<GaussianKernel> =
            orders.iter().map(|&o| base[o].clone()).collect();
        packed = convolve_axis_per_channel(&packed, &kernels, axis, mode)?;
    }

    Ok(Hessian3d {
        xx: extract_channel(&packed, 0),
        xy: extract_channel(&packed, 1),
        xz: extract_channel(&packed, 2),
        yy: extract_channel(&packed, 3),
        yz: extract_channel(&packed, 4),
        zz: extract_channel(&packed, 5),
    })
}

/// Hessian components of a smoothed field.
///
/// # Arguments
/// * `img` - Single-channel input field
/// * `sigma` - Scale of the Gaussian-derivative kernels
/// * `mode` - Boundary handling, honored by both the 2D and the fused 3D path
/// * `truncate` - Kernel half-width in standard deviations
///
/// # Returns
/// Upper-triangle components; 3 fields in 2D, 6 fields in 3D.
pub fn hessian(
    img: &ImageField,
    sigma: f64,
    mode: BoundaryMode,
    truncate: f64,
) -> Result<HessianField, FilterError> {
    require_single_channel(img)?;
    match img.ndim() {
        2 => Ok(HessianField::TwoD(hessian_2d(img, sigma, mode, truncate)?)),
        _ => Ok(HessianField::ThreeD(hessian_3d(img, sigma, mode, truncate)?)),
    }
}

/// Hessian of a smoothed field as full per-pixel dense matrices.
pub fn hessian_matrix(
    img: &ImageField,
    sigma: f64,
    mode: BoundaryMode,
    truncate: f64,
) -> Result<MatrixField, FilterError> {
    hessian(img, sigma, mode, truncate)?.to_matrix()
}

fn sort_by_abs(values: &mut [f64]) {
    values.sort_by(|a, b| {
        a.abs()
            .partial_cmp(&b.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Eigenvalues of the per-pixel Hessian, ordered ascending by absolute value.
///
/// # Arguments
/// * `img` - Single-channel input field
/// * `sigma` - Scale of the Gaussian-derivative kernels
/// * `mode` - Boundary handling
/// * `truncate` - Kernel half-width in standard deviations
///
/// # Returns
/// An [`EigenvalueField`] with `|λ1| <= |λ2| (<= |λ3|)` at every pixel.
pub fn hessian_eigenvalues(
    img: &ImageField,
    sigma: f64,
    mode: BoundaryMode,
    truncate: f64,
) -> Result<EigenvalueField, FilterError> {
    let h = hessian(img, sigma, mode, truncate)?;

    match h {
        HessianField::TwoD(h) => {
            let mut out = EigenvalueField::zeros(2, h.xx.batch(), h.xx.grid());
            for (pixel, ev) in out.data_mut().chunks_exact_mut(2).enumerate() {
                ev.copy_from_slice(&eigvalsh2(
                    h.xx.data()[pixel],
                    h.xy.data()[pixel],
                    h.yy.data()[pixel],
                ));
                sort_by_abs(ev);
            }
            Ok(out)
        }
        HessianField::ThreeD(h) => {
            let mut out = EigenvalueField::zeros(3, h.xx.batch(), h.xx.grid());
            for (pixel, ev) in out.data_mut().chunks_exact_mut(3).enumerate() {
                ev.copy_from_slice(&eigvalsh3(
                    h.xx.data()[pixel],
                    h.xy.data()[pixel],
                    h.xz.data()[pixel],
                    h.yy.data()[pixel],
                    h.yz.data()[pixel],
                    h.zz.data()[pixel],
                ));
                sort_by_abs(ev);
            }
            Ok(out)
        }
    }
}
