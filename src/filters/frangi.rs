//! Multiscale vesselness enhancement
//!
//! Implements the Frangi (1998) vesselness measure on Hessian eigenvalues
//! ordered `|λ1| <= |λ2| (<= |λ3|)`:
//!
//! - `Ra = λ2 / λ3` separates plate-like from line-like structure (3D only)
//! - `Rb = |λ1| / sqrt(λ2 λ3)` measures deviation from blob-like structure
//! - `S = sqrt(Σ λi²)` is the second-order structure norm
//!
//! `V = (1 - exp(-Ra²/2α²)) · exp(-Rb²/(2β²+ε)) · (1 - exp(-S²/(2γ²+ε)))`
//!
//! λ2 and λ3 are floored at +ε before entering the ratios, so structures with
//! negative principal curvatures produce a divergent `Rb` and vanish; the
//! filter responds to curvilinear structures darker than their surroundings.
//! When γ is not given it is chosen per scale and batch item as half the
//! largest `S`, or 1 when the item has no second-order structure at all. The
//! response over scales is the per-pixel maximum, starting from zero.

use log::{debug, trace};
use rayon::prelude::*;

use crate::error::FilterError;
use crate::filters::convolve::BoundaryMode;
use crate::filters::hessian::{hessian_eigenvalues, require_single_channel};
use crate::image::ImageField;
use crate::linalg::EigenvalueField;

/// How the per-pixel stage of the filter runs.
///
/// The choice never changes the result, only whether pixels are processed
/// on one thread or across the rayon pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecContext {
    Sequential,
    #[default]
    Parallel,
}

/// Scales (sigmas) for the multiscale sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleSpec {
    /// Explicit list of sigmas, used as given.
    List(Vec<f64>),
    /// Arithmetic progression `start, start + step, ...` up to but
    /// excluding `stop`.
    Range { start: f64, stop: f64, step: f64 },
}

impl ScaleSpec {
    /// Materialize the scale list.
    ///
    /// Rejects a non-positive range step and any negative sigma.
    pub fn resolve(&self) -> Result<Vec<f64>, FilterError> {
        let sigmas = match self {
            ScaleSpec::List(sigmas) => sigmas.clone(),
            ScaleSpec::Range { start, stop, step } => {
                if *step <= 0.0 {
                    return Err(FilterError::InvalidScaleStep { step: *step });
                }
                let count = ((stop - start) / step).ceil();
                let count = if count.is_finite() && count > 0.0 {
                    count as usize
                } else {
                    0
                };
                (0..count)
                    .map(|i| start + step * i as f64)
                    .filter(|s| s < stop)
                    .collect()
            }
        };
        if let Some(&sigma) = sigmas.iter().find(|s| **s < 0.0) {
            return Err(FilterError::NegativeSigma { sigma });
        }
        Ok(sigmas)
    }
}

/// Parameters for the vesselness filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FrangiParams {
    /// Scales to sweep.
    pub scales: ScaleSpec,
    /// Plate vs line sensitivity (3D only).
    pub alpha: f64,
    /// Blob sensitivity.
    pub beta: f64,
    /// Structure-norm sensitivity. `None` picks half the largest `S` per
    /// scale and batch item.
    pub gamma: Option<f64>,
    /// Floor for the eigenvalue ratios and denominator guard.
    pub eps: f64,
    /// Boundary handling for the derivative convolutions.
    pub mode: BoundaryMode,
    /// Kernel half-width in standard deviations.
    pub truncate: f64,
}

impl Default for FrangiParams {
    fn default() -> Self {
        FrangiParams {
            scales: ScaleSpec::Range {
                start: 1.0,
                stop: 10.0,
                step: 2.0,
            },
            alpha: 0.5,
            beta: 0.5,
            gamma: None,
            eps: 1e-10,
            mode: BoundaryMode::Reflect,
            truncate: 4.0,
        }
    }
}

/// Vesselness at one pixel from its abs-ordered eigenvalues.
///
/// `a2`, `b2`, `g2` are the precomputed denominators `2α²`, `2β²+ε`
/// and `2γ²+ε`.
fn vesselness(lambdas: &[f64], a2: f64, b2: f64, g2: f64, eps: f64) -> f64 {
    let s2: f64 = lambdas.iter().map(|x| x * x).sum();

    let (term_a, rb2) = if lambdas.len() == 2 {
        let l2 = lambdas[1].max(eps);
        let rb = (lambdas[0] / l2).abs();
        let rb = if rb.is_nan() { 0.0 } else { rb };
        // a 2x2 Hessian cannot look plate-like, the Ra gate stays open
        (1.0, rb * rb)
    } else {
        let l2 = lambdas[1].max(eps);
        let l3 = lambdas[2].max(eps);
        let ra = l2 / l3;
        let rb = lambdas[0].abs() / (l2 * l3).sqrt();
        (1.0 - (-(ra * ra) / a2).exp(), rb * rb)
    };

    let term_b = (-rb2 / b2).exp();
    let term_s = 1.0 - (-s2 / g2).exp();
    let v = term_a * term_b * term_s;
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Fold one scale's eigenvalues into the running per-pixel maximum.
fn accumulate_vesselness(
    ev: &EigenvalueField,
    params: &FrangiParams,
    ctx: ExecContext,
    response: &mut ImageField,
) {
    let count = ev.count();
    let npix = ev.grid().num_pixels();
    let a2 = 2.0 * params.alpha * params.alpha;
    let b2 = 2.0 * params.beta * params.beta + params.eps;

    for b in 0..ev.batch() {
        let lambdas = &ev.data()[b * npix * count..(b + 1) * npix * count];

        let gamma = match params.gamma {
            Some(gamma) => gamma,
            None => {
                let max_s2 = lambdas
                    .chunks_exact(count)
                    .map(|v| v.iter().map(|x| x * x).sum::<f64>())
                    .fold(0.0, f64::max);
                let gamma = max_s2.sqrt() / 2.0;
                if gamma == 0.0 {
                    1.0
                } else {
                    gamma
                }
            }
        };
        let g2 = 2.0 * gamma * gamma + params.eps;
        trace!("vesselness batch {}: gamma={}", b, gamma);

        let out = response.plane_mut(b, 0);
        match ctx {
            ExecContext::Parallel => {
                out.par_iter_mut()
                    .zip(lambdas.par_chunks(count))
                    .for_each(|(o, v)| {
                        *o = o.max(vesselness(v, a2, b2, g2, params.eps));
                    });
            }
            ExecContext::Sequential => {
                for (o, v) in out.iter_mut().zip(lambdas.chunks_exact(count)) {
                    *o = o.max(vesselness(v, a2, b2, g2, params.eps));
                }
            }
        }
    }
}

/// Multiscale vesselness filter.
///
/// # Arguments
/// * `img` - Single-channel 2D or 3D input field
/// * `params` - Scales, sensitivities, and boundary handling
/// * `ctx` - Execution context for the per-pixel stage
///
/// # Returns
/// The per-pixel maximum vesselness over all scales, in `[0, 1)`. An empty
/// scale list yields an all-zero field.
pub fn frangi(
    img: &ImageField,
    params: &FrangiParams,
    ctx: ExecContext,
) -> Result<ImageField, FilterError> {
    frangi_with_progress(img, params, ctx, |_, _| {})
}

/// Multiscale vesselness filter with a progress callback.
///
/// The callback receives `(completed_scales, total_scales)` after each scale.
pub fn frangi_with_progress<F: FnMut(usize, usize)>(
    img: &ImageField,
    params: &FrangiParams,
    ctx: ExecContext,
    mut progress: F,
) -> Result<ImageField, FilterError> {
    require_single_channel(img)?;
    let sigmas = params.scales.resolve()?;
    debug!(
        "frangi: {} scales, alpha={}, beta={}, gamma={:?}",
        sigmas.len(),
        params.alpha,
        params.beta,
        params.gamma
    );

    let mut response = ImageField::zeros(img.batch(), 1, img.grid());
    let total = sigmas.len();
    for (i, &sigma) in sigmas.iter().enumerate() {
        debug!("frangi scale {}/{}: sigma={}", i + 1, total, sigma);
        let ev = hessian_eigenvalues(img, sigma, params.mode, params.truncate)?;
        accumulate_vesselness(&ev, params, ctx, &mut response);
        progress(i + 1, total);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::GridShape;

    fn image_2d(h: usize, w: usize, f: impl Fn(usize, usize) -> f64) -> ImageField {
        let mut data = Vec::with_capacity(h * w);
        for y in 0..h {
            for x in 0..w {
                data.push(f(y, x));
            }
        }
        ImageField::from_vec_2d(h, w, data).unwrap()
    }

    fn image_3d(d: usize, h: usize, w: usize, f: impl Fn(usize, usize, usize) -> f64) -> ImageField {
        let mut data = Vec::with_capacity(d * h * w);
        for z in 0..d {
            for y in 0..h {
                for x in 0..w {
                    data.push(f(z, y, x));
                }
            }
        }
        ImageField::from_vec_3d(d, h, w, data).unwrap()
    }

    fn line_params(scales: Vec<f64>) -> FrangiParams {
        FrangiParams {
            scales: ScaleSpec::List(scales),
            ..FrangiParams::default()
        }
    }

    #[test]
    fn test_scale_range_resolution() {
        let scales = ScaleSpec::Range {
            start: 1.0,
            stop: 10.0,
            step: 2.0,
        };
        assert_eq!(scales.resolve().unwrap(), vec![1.0, 3.0, 5.0, 7.0, 9.0]);

        let empty = ScaleSpec::Range {
            start: 5.0,
            stop: 5.0,
            step: 1.0,
        };
        assert!(empty.resolve().unwrap().is_empty());

        let inverted = ScaleSpec::Range {
            start: 5.0,
            stop: 1.0,
            step: 1.0,
        };
        assert!(inverted.resolve().unwrap().is_empty());
    }

    #[test]
    fn test_scale_spec_rejects_bad_input() {
        let zero_step = ScaleSpec::Range {
            start: 1.0,
            stop: 4.0,
            step: 0.0,
        };
        assert_eq!(
            zero_step.resolve().unwrap_err(),
            FilterError::InvalidScaleStep { step: 0.0 }
        );

        let negative_step = ScaleSpec::Range {
            start: 1.0,
            stop: 4.0,
            step: -1.0,
        };
        assert_eq!(
            negative_step.resolve().unwrap_err(),
            FilterError::InvalidScaleStep { step: -1.0 }
        );

        let negative_sigma = ScaleSpec::List(vec![1.0, -2.0]);
        assert_eq!(
            negative_sigma.resolve().unwrap_err(),
            FilterError::NegativeSigma { sigma: -2.0 }
        );

        let negative_start = ScaleSpec::Range {
            start: -3.0,
            stop: 4.0,
            step: 1.0,
        };
        assert_eq!(
            negative_start.resolve().unwrap_err(),
            FilterError::NegativeSigma { sigma: -3.0 }
        );
    }

    #[test]
    fn test_flat_image_gives_zero_response() {
        let img = ImageField::zeros(
            1,
            1,
            GridShape::TwoD {
                height: 12,
                width: 12,
            },
        );
        let out = frangi(&img, &line_params(vec![1.0, 2.0]), ExecContext::Sequential).unwrap();
        assert!(out.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_scales_give_zero_response() {
        let img = image_2d(8, 8, |y, x| (x + y) as f64);
        let out = frangi(&img, &line_params(vec![]), ExecContext::Sequential).unwrap();
        assert_eq!(out.shape(), vec![1, 1, 8, 8]);
        assert!(out.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_response_stays_in_unit_interval() {
        let img = image_2d(20, 20, |y, x| {
            (0.5 * x as f64).sin() * (0.3 * y as f64).cos()
        });
        let out = frangi(&img, &line_params(vec![1.0, 2.0]), ExecContext::Sequential).unwrap();
        for &v in out.data() {
            assert!((0.0..1.0).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn test_dark_line_2d_enhanced() {
        // dark vertical line on a bright background
        let img = image_2d(21, 21, |_, x| {
            let dx = x as f64 - 10.0;
            1.0 - (-dx * dx / 4.0).exp()
        });
        let out = frangi(&img, &line_params(vec![1.0]), ExecContext::Sequential).unwrap();
        let on_line = out.data()[10 * 21 + 10];
        let background = out.data()[10 * 21 + 2];
        assert!(on_line > 0.5, "on-line response {}", on_line);
        assert!(
            on_line > 10.0 * background,
            "line {} vs background {}",
            on_line,
            background
        );
    }

    #[test]
    fn test_polarity_rejects_bright_lines() {
        // modulation along y keeps the along-line curvature nonzero
        let profile = |y: usize, x: usize| {
            let dx = x as f64 - 10.0;
            (-dx * dx / 4.0).exp() * (1.0 + 0.2 * (0.3 * y as f64).sin())
        };
        let dark = image_2d(21, 21, |y, x| 1.0 - profile(y, x));
        let bright = image_2d(21, 21, profile);

        let params = line_params(vec![1.0]);
        let dark_out = frangi(&dark, &params, ExecContext::Sequential).unwrap();
        let bright_out = frangi(&bright, &params, ExecContext::Sequential).unwrap();

        let center = 10 * 21 + 10;
        assert!(dark_out.data()[center] > 0.3, "dark {}", dark_out.data()[center]);
        assert!(
            bright_out.data()[center] < 1e-6,
            "bright {}",
            bright_out.data()[center]
        );
    }

    #[test]
    fn test_dark_tube_3d_enhanced() {
        // dark tube along z
        let img = image_3d(16, 16, 16, |_, y, x| {
            let (dx, dy) = (x as f64 - 8.0, y as f64 - 8.0);
            1.0 - (-(dx * dx + dy * dy) / 4.0).exp()
        });
        let out = frangi(&img, &line_params(vec![1.0]), ExecContext::Sequential).unwrap();
        let axis = (8 * 16 + 8) * 16 + 8;
        let corner = (2 * 16 + 2) * 16 + 2;
        assert!(out.data()[axis] > 0.3, "on-axis response {}", out.data()[axis]);
        assert!(
            out.data()[axis] > 10.0 * out.data()[corner],
            "axis {} vs corner {}",
            out.data()[axis],
            out.data()[corner]
        );
    }

    #[test]
    fn test_more_scales_never_lower_response() {
        let img = image_2d(21, 21, |_, x| {
            let dx = x as f64 - 10.0;
            1.0 - (-dx * dx / 4.0).exp()
        });
        let single = frangi(&img, &line_params(vec![1.0]), ExecContext::Sequential).unwrap();
        let both = frangi(&img, &line_params(vec![1.0, 2.0]), ExecContext::Sequential).unwrap();
        for (a, b) in single.data().iter().zip(both.data()) {
            assert!(b >= a, "{} < {}", b, a);
        }
    }

    #[test]
    fn test_gamma_override_changes_sensitivity() {
        let img = image_2d(21, 21, |_, x| {
            let dx = x as f64 - 10.0;
            1.0 - (-dx * dx / 4.0).exp()
        });
        let auto = frangi(&img, &line_params(vec![1.0]), ExecContext::Sequential).unwrap();
        let fixed = frangi(
            &img,
            &FrangiParams {
                gamma: Some(10.0),
                ..line_params(vec![1.0])
            },
            ExecContext::Sequential,
        )
        .unwrap();
        let center = 10 * 21 + 10;
        assert!(auto.data()[center] > 0.5);
        assert!(fixed.data()[center] < 0.01, "fixed {}", fixed.data()[center]);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let img = image_2d(18, 19, |y, x| {
            (0.4 * x as f64).sin() + (0.6 * y as f64).cos()
        });
        let params = line_params(vec![1.0, 1.5]);
        let seq = frangi(&img, &params, ExecContext::Sequential).unwrap();
        let par = frangi(&img, &params, ExecContext::Parallel).unwrap();
        assert_eq!(seq.data(), par.data());
    }

    #[test]
    fn test_progress_reports_each_scale() {
        let img = image_2d(8, 8, |y, x| (x * y) as f64);
        let mut seen = Vec::new();
        frangi_with_progress(
            &img,
            &line_params(vec![1.0, 2.0, 3.0]),
            ExecContext::Sequential,
            |done, total| seen.push((done, total)),
        )
        .unwrap();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_rejects_multichannel_input() {
        let grid = GridShape::TwoD {
            height: 4,
            width: 4,
        };
        let img = ImageField::from_parts(1, 2, grid, vec![0.0; 32]).unwrap();
        let err = frangi(&img, &FrangiParams::default(), ExecContext::Sequential).unwrap_err();
        assert!(matches!(err, FilterError::ShapeMismatch { what: "input channels", .. }));
    }
}
