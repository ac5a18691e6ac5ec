//! Scale-space blob detection.
//!
//! The image is filtered at a ladder of Gaussian scales (difference of
//! Gaussians or scale-normalized Laplacian of Gaussian), local maxima of
//! the stacked responses above a threshold become blobs, and blobs that
//! overlap too much are merged by keeping the larger one.

use std::f64::consts::{PI, SQRT_2};

use log::debug;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{BlobMethod, DetectorOptions};
use crate::error::Result;
use crate::filter::{gaussian_filter, gaussian_laplace};

/// A detected local feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Pixel coordinate along the first image axis
    pub x: f64,
    /// Pixel coordinate along the second image axis
    pub y: f64,
    /// Scale at which the response peaked
    pub sigma: f64,
    /// Peak filter response
    pub response: f64,
}

impl Blob {
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Radius-like size, `sigma * sqrt(2)`
    pub fn size(&self) -> f64 {
        self.sigma * SQRT_2
    }
}

/// Filter responses at each scale, strongest-first order not implied
pub struct ScaleSpace {
    pub sigmas: Vec<f64>,
    pub responses: Vec<Array2<f64>>,
}

/// Build the scale-normalized response stack for `options.method`.
pub fn scale_space(image: &ArrayView2<f64>, options: &DetectorOptions) -> ScaleSpace {
    match options.method {
        BlobMethod::Dog => {
            let k = ((options.max_sigma / options.min_sigma).ln() / options.sigma_ratio.ln())
                as usize
                + 1;
            let ladder: Vec<f64> = (0..=k)
                .map(|i| options.min_sigma * options.sigma_ratio.powi(i as i32))
                .collect();
            let smoothed: Vec<Array2<f64>> = ladder
                .par_iter()
                .map(|&sigma| gaussian_filter(image, sigma))
                .collect();
            let responses = (0..k)
                .map(|i| (&smoothed[i] - &smoothed[i + 1]) * ladder[i])
                .collect();
            ScaleSpace {
                sigmas: ladder[..k].to_vec(),
                responses,
            }
        }
        BlobMethod::Log => {
            let sigmas: Vec<f64> =
                if options.num_sigma == 1 || options.max_sigma == options.min_sigma {
                    vec![options.min_sigma]
                } else {
                    let step =
                        (options.max_sigma - options.min_sigma) / (options.num_sigma - 1) as f64;
                    (0..options.num_sigma)
                        .map(|i| options.min_sigma + step * i as f64)
                        .collect()
                };
            let responses = sigmas
                .par_iter()
                .map(|&sigma| gaussian_laplace(image, sigma) * (-sigma * sigma))
                .collect();
            ScaleSpace { sigmas, responses }
        }
    }
}

/// `(scale, x, y, value)` of every response that is a maximum of its
/// 3x3x3 neighbourhood and exceeds `threshold`.
///
/// Neighbours off the stack are ignored. Plateaus yield every point on the
/// plateau; overlap pruning collapses them afterwards.
pub fn local_maxima(
    responses: &[Array2<f64>],
    threshold: f64,
    border: usize,
) -> Vec<(usize, usize, usize, f64)> {
    let Some(first) = responses.first() else {
        return Vec::new();
    };
    let (width, height) = first.dim();
    if width <= 2 * border || height <= 2 * border {
        return Vec::new();
    }

    let mut peaks = Vec::new();
    for (s, layer) in responses.iter().enumerate() {
        for x in border..width - border {
            for y in border..height - border {
                let value = layer[[x, y]];
                if !(value > threshold) {
                    continue;
                }
                let is_max = (s.saturating_sub(1)..(s + 2).min(responses.len())).all(|ns| {
                    (x.saturating_sub(1)..(x + 2).min(width)).all(|nx| {
                        (y.saturating_sub(1)..(y + 2).min(height))
                            .all(|ny| responses[ns][[nx, ny]] <= value)
                    })
                });
                if is_max {
                    peaks.push((s, x, y, value));
                }
            }
        }
    }
    peaks
}

/// Fraction of the smaller blob's disk covered by the other.
pub fn blob_overlap(a: &Blob, b: &Blob) -> f64 {
    let (r1, r2) = (a.size(), b.size());
    let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();

    if d > r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        return 1.0;
    }

    let ratio1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0);
    let ratio2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0);
    let lens = r1 * r1 * ratio1.acos() + r2 * r2 * ratio2.acos()
        - 0.5 * ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2)).abs().sqrt();

    lens / (PI * r1.min(r2).powi(2))
}

/// Drop the smaller (or, at equal size, weaker) blob of every pair
/// overlapping by more than `overlap`.
pub fn prune_blobs(blobs: Vec<Blob>, overlap: f64) -> Vec<Blob> {
    let mut keep = vec![true; blobs.len()];
    for i in 0..blobs.len() {
        for j in (i + 1)..blobs.len() {
            if !(keep[i] && keep[j]) {
                continue;
            }
            let (a, b) = (&blobs[i], &blobs[j]);
            if blob_overlap(a, b) > overlap {
                let drop_a = a.sigma < b.sigma || (a.sigma == b.sigma && a.response < b.response);
                if drop_a {
                    keep[i] = false;
                } else {
                    keep[j] = false;
                }
            }
        }
    }
    blobs
        .into_iter()
        .zip(keep)
        .filter_map(|(blob, kept)| kept.then_some(blob))
        .collect()
}

/// Find blobs in an already normalized image.
pub fn detect_blobs(image: &ArrayView2<f64>, options: &DetectorOptions) -> Result<Vec<Blob>> {
    options.validate()?;
    if image.is_empty() {
        return Ok(Vec::new());
    }

    let space = scale_space(image, options);
    let border = usize::from(options.exclude_border);
    let mut candidates: Vec<Blob> = local_maxima(&space.responses, options.threshold, border)
        .into_iter()
        .map(|(s, x, y, response)| Blob {
            x: x as f64,
            y: y as f64,
            sigma: space.sigmas[s],
            response,
        })
        .collect();
    candidates.sort_by(|a, b| b.response.total_cmp(&a.response));

    let found = candidates.len();
    let blobs = prune_blobs(candidates, options.overlap);
    debug!(
        "{:?} detection over {} scales: {} peaks, {} blobs after pruning",
        options.method,
        space.sigmas.len(),
        found,
        blobs.len()
    );
    Ok(blobs)
}
