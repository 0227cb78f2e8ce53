//! Closed-form eigenvalues of symmetric 2x2 and 3x3 matrices
//!
//! Per-pixel Hessian matrices are tiny, so eigenvalues are computed in closed
//! form rather than by iteration:
//!
//! - 2x2: quadratic formula on trace and determinant, with the discriminant
//!   clamped at zero against rounding
//! - 3x3: trigonometric solution of the characteristic cubic
//!   (Smith, "Eigenvalues of a symmetric 3x3 matrix", Comm. ACM 1961)
//!
//! The scalar cores return eigenvalues in ascending numeric order. The
//! field-level [`eigvalsh`] applies them to every pixel of a [`MatrixField`],
//! optionally validating squareness and symmetry first.

use std::f64::consts::PI;

use crate::error::FilterError;
use crate::image::GridShape;

/// Guards the cubic solver against division by zero for near-isotropic
/// matrices.
const CUBIC_EPS: f64 = 1e-8;

/// Symmetry-check tolerances for [`eigvalsh`] with `check_valid`.
const SYM_ATOL: f64 = 1e-8;
const SYM_RTOL: f64 = 1e-5;

/// Eigenvalues of `[[ii, ij], [ij, jj]]`, ascending.
#[inline]
pub fn eigvalsh2(ii: f64, ij: f64, jj: f64) -> [f64; 2] {
    let tr = ii + jj;
    let det = ii * jj - ij * ij;
    let disc = (tr * tr - 4.0 * det).max(0.0).sqrt();
    [(tr - disc) / 2.0, (tr + disc) / 2.0]
}

/// Determinant of `[[ii, ij, ik], [ij, jj, jk], [ik, jk, kk]]`.
#[inline]
pub fn det3(ii: f64, ij: f64, ik: f64, jj: f64, jk: f64, kk: f64) -> f64 {
    ii * jj * kk + 2.0 * ij * ik * jk - ii * jk * jk - jj * ik * ik - kk * ij * ij
}

/// Eigenvalues of `[[ii, ij, ik], [ij, jj, jk], [ik, jk, kk]]`, ascending.
#[inline]
pub fn eigvalsh3(ii: f64, ij: f64, ik: f64, jj: f64, jk: f64, kk: f64) -> [f64; 3] {
    let q = (ii + jj + kk) / 3.0;
    let p1 = ij * ij + ik * ik + jk * jk;
    let p2 = (ii - q) * (ii - q) + (jj - q) * (jj - q) + (kk - q) * (kk - q);
    let p = ((2.0 * p1 + p2) / 6.0).sqrt();

    let r = (det3(ii - q, ij, ik, jj - q, jk, kk - q) / (p * p * p + CUBIC_EPS) / 2.0)
        .clamp(-1.0, 1.0);

    let phi = r.acos() / 3.0;
    let lam3 = q + 2.0 * p * phi.cos();
    let lam1 = q + 2.0 * p * (phi + 2.0 * PI / 3.0).cos();
    let lam2 = 3.0 * q - lam1 - lam3;
    [lam1, lam2, lam3]
}

/// Per-pixel dense matrices over a spatial grid.
///
/// Storage is one row-major `rows * cols` chunk per pixel, pixels in field
/// order, batches outermost.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixField {
    rows: usize,
    cols: usize,
    batch: usize,
    grid: GridShape,
    data: Vec<f64>,
}

impl MatrixField {
    /// Build a matrix field from raw storage.
    pub fn from_parts(
        rows: usize,
        cols: usize,
        batch: usize,
        grid: GridShape,
        data: Vec<f64>,
    ) -> Result<Self, FilterError> {
        let expected = batch * grid.num_pixels() * rows * cols;
        if data.len() != expected {
            return Err(FilterError::ShapeMismatch {
                what: "matrix field data length",
                expected,
                got: data.len(),
            });
        }
        Ok(MatrixField {
            rows,
            cols,
            batch,
            grid,
            data,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    #[inline]
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Flat storage, one `rows * cols` chunk per pixel.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The matrix at one pixel (flat pixel index across batches).
    #[inline]
    pub fn matrix(&self, pixel: usize) -> &[f64] {
        let n = self.rows * self.cols;
        &self.data[pixel * n..(pixel + 1) * n]
    }

    /// Total pixel count across all batch items.
    #[inline]
    pub fn total_pixels(&self) -> usize {
        self.batch * self.grid.num_pixels()
    }
}

/// Per-pixel eigenvalue tuples over a spatial grid.
///
/// `count` is 2 for 2x2 input and 3 for 3x3 input; storage is one chunk of
/// `count` values per pixel, batches outermost.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenvalueField {
    count: usize,
    batch: usize,
    grid: GridShape,
    data: Vec<f64>,
}

impl EigenvalueField {
    pub(crate) fn zeros(count: usize, batch: usize, grid: GridShape) -> Self {
        EigenvalueField {
            count,
            batch,
            grid,
            data: vec![0.0; count * batch * grid.num_pixels()],
        }
    }

    /// Eigenvalues per pixel (2 or 3).
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    #[inline]
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Flat storage, one chunk of `count` values per pixel.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// The eigenvalues at one pixel (flat pixel index across batches).
    #[inline]
    pub fn values(&self, pixel: usize) -> &[f64] {
        &self.data[pixel * self.count..(pixel + 1) * self.count]
    }

    /// Total pixel count across all batch items.
    #[inline]
    pub fn total_pixels(&self) -> usize {
        self.batch * self.grid.num_pixels()
    }
}

fn validate_symmetric(field: &MatrixField) -> Result<(), FilterError> {
    let n = field.rows();
    for pixel in 0..field.total_pixels() {
        let m = field.matrix(pixel);
        for i in 0..n {
            for j in (i + 1)..n {
                let a = m[i * n + j];
                let b = m[j * n + i];
                let deviation = (a - b).abs();
                if deviation > SYM_ATOL + SYM_RTOL * a.abs().max(b.abs()) {
                    return Err(FilterError::NonHermitianMatrix { pixel, deviation });
                }
            }
        }
    }
    Ok(())
}

/// Eigenvalues of every per-pixel matrix, ascending numeric order per pixel.
///
/// Squareness is always enforced (it is free to check); with `check_valid`
/// every pixel's matrix is additionally scanned for symmetry within
/// tolerance before any solving happens.
///
/// # Arguments
/// * `field` - Per-pixel 2x2 or 3x3 matrices
/// * `check_valid` - Scan the matrices for symmetry first
///
/// # Returns
/// An [`EigenvalueField`] with 2 or 3 values per pixel.
pub fn eigvalsh(field: &MatrixField, check_valid: bool) -> Result<EigenvalueField, FilterError> {
    if field.rows() != field.cols() {
        return Err(FilterError::NonSquareMatrix {
            rows: field.rows(),
            cols: field.cols(),
        });
    }
    if field.rows() != 2 && field.rows() != 3 {
        return Err(FilterError::InvalidEigenInputSize { size: field.rows() });
    }
    if check_valid {
        validate_symmetric(field)?;
    }

    let mut out = EigenvalueField::zeros(field.rows(), field.batch(), field.grid());
    match field.rows() {
        2 => {
            for (ev, m) in out.data_mut().chunks_exact_mut(2).zip(field.data().chunks_exact(4)) {
                ev.copy_from_slice(&eigvalsh2(m[0], m[1], m[3]));
            }
        }
        _ => {
            for (ev, m) in out.data_mut().chunks_exact_mut(3).zip(field.data().chunks_exact(9)) {
                ev.copy_from_slice(&eigvalsh3(m[0], m[1], m[2], m[4], m[5], m[8]));
            }
        }
    }
    Ok(out)
}
