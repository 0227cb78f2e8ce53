//! Normalized 1D Gaussian-derivative kernels
//!
//! Sampled on integer offsets x in [-r, r] with r = ceil(sigma * truncate):
//!
//! order 0:  g(x)  = exp(-x^2 / 2s^2) / (s * sqrt(2*pi))
//! order 1:  g1(x) = g(x) * (-x / s^2), shifted to zero mean, then rescaled
//!           so that sum(g1(x) * x) = -1
//! order 2:  g2(x) = g(x) * (x^2/s^2 - 1) / s^2, shifted to zero mean, then
//!           rescaled so that sum(g2(x) * x^2) = 2
//!
//! The zero-mean shift makes derivative kernels respond with exactly zero on
//! constant regions, and the unit moments calibrate their gain at every
//! sigma. Responses from different scales are therefore directly comparable
//! and the multiscale filter needs no extra sigma^2 factor.

use std::f64::consts::PI;

use crate::error::FilterError;

/// A sampled 1D Gaussian or Gaussian-derivative kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    sigma: f64,
    order: usize,
    radius: usize,
    taps: Vec<f64>,
}

impl GaussianKernel {
    /// Build a kernel for the given scale and derivative order.
    ///
    /// # Arguments
    /// * `sigma` - Gaussian standard deviation in pixels, non-negative
    /// * `order` - Derivative order: 0 (smooth), 1 or 2
    /// * `truncate` - Kernel half-width in standard deviations
    ///
    /// # Returns
    /// Kernel with `2 * ceil(sigma * truncate) + 1` taps
    pub fn new(sigma: f64, order: usize, truncate: f64) -> Result<Self, FilterError> {
        if sigma < 0.0 {
            return Err(FilterError::NegativeSigma { sigma });
        }
        if order > 2 {
            return Err(FilterError::UnsupportedOrder { order });
        }

        let radius = (sigma * truncate).ceil() as usize;
        let len = 2 * radius + 1;
        let var = sigma * sigma;
        let norm = 1.0 / (sigma * (2.0 * PI).sqrt());

        let offset = |i: usize| i as f64 - radius as f64;

        let mut taps: Vec<f64> = (0..len)
            .map(|i| {
                let x = offset(i);
                (-0.5 * x * x / var).exp() * norm
            })
            .collect();

        match order {
            0 => {}
            1 => {
                for (i, t) in taps.iter_mut().enumerate() {
                    *t *= -offset(i) / var;
                }
                shift_to_zero_mean(&mut taps);
                // first moment against x fixed to -1
                let moment: f64 = taps
                    .iter()
                    .enumerate()
                    .map(|(i, &t)| t * offset(i))
                    .sum();
                rescale(&mut taps, moment / -1.0);
            }
            _ => {
                for (i, t) in taps.iter_mut().enumerate() {
                    let x = offset(i);
                    *t *= (x * x / var - 1.0) / var;
                }
                shift_to_zero_mean(&mut taps);
                // second moment against x^2 fixed to 2
                let moment: f64 = taps
                    .iter()
                    .enumerate()
                    .map(|(i, &t)| t * offset(i) * offset(i))
                    .sum();
                rescale(&mut taps, moment / 2.0);
            }
        }

        Ok(GaussianKernel {
            sigma,
            order,
            radius,
            taps,
        })
    }

    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Half-width in samples.
    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Kernel samples from x = -radius to x = +radius.
    #[inline]
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Number of taps, `2 * radius + 1`.
    #[inline]
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

#[cfg(test)]
impl GaussianKernel {
    /// Test-only: wrap arbitrary taps so filtering stages can be checked
    /// against hand-computed values.
    pub(crate) fn from_taps(taps: Vec<f64>) -> Self {
        GaussianKernel {
            sigma: 0.0,
            order: 0,
            radius: taps.len() / 2,
            taps,
        }
    }
}

fn shift_to_zero_mean(taps: &mut [f64]) {
    let mean = taps.iter().sum::<f64>() / taps.len() as f64;
    for t in taps.iter_mut() {
        *t -= mean;
    }
}

fn rescale(taps: &mut [f64], divisor: f64) {
    for t in taps.iter_mut() {
        *t /= divisor;
    }
}
