//! Scores comparing recovered occupancy and images against ground truth.

use ndarray::{ArrayView2, Zip};
use shared::OccupancyMask;

use crate::error::{DetectionError, Result};

fn check_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(DetectionError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// Per-site agreement counts between an estimate and the truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Confusion {
    pub true_positive: usize,
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
}

impl Confusion {
    pub fn between(estimated: &OccupancyMask, truth: &OccupancyMask) -> Result<Self> {
        check_shape(truth.shape(), estimated.shape())?;
        let mut counts = Self::default();
        Zip::from(estimated.view())
            .and(truth.view())
            .for_each(|&est, &tru| match (est, tru) {
                (true, true) => counts.true_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_positive += 1,
                (false, true) => counts.false_negative += 1,
            });
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    fn fraction(&self, count: usize) -> f64 {
        match self.total() {
            0 => 0.0,
            n => count as f64 / n as f64,
        }
    }
}

/// Fraction of sites where the two masks agree.
///
/// An empty lattice agrees trivially and scores 1.
pub fn fidelity(estimated: &OccupancyMask, truth: &OccupancyMask) -> Result<f64> {
    let c = Confusion::between(estimated, truth)?;
    if c.total() == 0 {
        return Ok(1.0);
    }
    Ok(c.fraction(c.true_positive + c.true_negative))
}

/// Fraction of all sites marked occupied but actually empty
pub fn false_positive_rate(estimated: &OccupancyMask, truth: &OccupancyMask) -> Result<f64> {
    let c = Confusion::between(estimated, truth)?;
    Ok(c.fraction(c.false_positive))
}

/// Fraction of all sites marked empty but actually occupied
pub fn false_negative_rate(estimated: &OccupancyMask, truth: &OccupancyMask) -> Result<f64> {
    let c = Confusion::between(estimated, truth)?;
    Ok(c.fraction(c.false_negative))
}

/// Peak signal-to-noise ratio of `image` against `signal`, in dB.
///
/// Both images are offset-corrected; the peak is the largest corrected
/// signal value. Identical images give infinity.
pub fn psnr(signal: &ArrayView2<u16>, image: &ArrayView2<u16>, offset: f64) -> Result<f64> {
    check_shape(signal.dim(), image.dim())?;
    if signal.is_empty() {
        return Ok(f64::INFINITY);
    }

    let range = signal
        .iter()
        .map(|&v| f64::from(v) - offset)
        .fold(f64::NEG_INFINITY, f64::max);
    let mut sum_sq = 0.0;
    Zip::from(signal).and(image).for_each(|&s, &i| {
        let diff = f64::from(s) - f64::from(i);
        sum_sq += diff * diff;
    });
    let mse = sum_sq / signal.len() as f64;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (range * range / mse).log10())
}

/// Per-pixel signal over noise, squared when noise adds in quadrature
pub fn snr(signal_mean: f64, noise_std: f64, area: f64, quadrature: bool) -> f64 {
    let ratio = (signal_mean / area) / noise_std;
    if quadrature {
        ratio * ratio
    } else {
        ratio
    }
}
