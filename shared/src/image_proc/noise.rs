//! Noise generation utilities for sensor simulation.
//!
//! Provides the stochastic primitives the sensor models compose:
//! - Poisson resampling of a mean image (shot noise, dark charge, CIC)
//! - Constant-mean Poisson fields
//! - Zero-mean Gaussian fields (readout noise)
//! - Deterministic normal arrays for tests
//!
//! # Seeding
//!
//! Every field is filled in parallel row chunks through
//! [`process_array_in_parallel_chunks`]. Callers pass a base seed, usually
//! drawn from their own RNG, and get identical output for identical seeds
//! regardless of the rayon pool size.

use crate::algo::process_array_in_parallel_chunks;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson, StandardNormal};

/// Draw one Poisson variate with the given mean.
///
/// Zero, negative and non-finite means yield zero.
pub fn sample_poisson<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    if !(mean > 0.0) || !mean.is_finite() {
        return 0.0;
    }
    match Poisson::new(mean) {
        Ok(poisson) => poisson.sample(rng),
        Err(_) => 0.0,
    }
}

/// Draw one normal variate, `mean + std_dev * z`.
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    mean + std_dev * z
}

/// Generate a 2D array of normally distributed values for testing purposes.
///
/// # Example
/// ```
/// use shared::image_proc::noise::simple_normal_array;
///
/// let noise = simple_normal_array((10, 10), 100.0, 10.0, 42);
/// assert_eq!(noise.dim(), (10, 10));
/// ```
pub fn simple_normal_array(
    size: (usize, usize),
    mean: f64,
    std_dev: f64,
    seed: u64,
) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn(size, |_| sample_normal(&mut rng, mean, std_dev))
}

/// Replace every pixel of a mean image by a Poisson draw with that mean
///
/// Used both for shot-noise resampling of already binned photon counts and
/// for converting fractional expected electrons into integer events.
pub fn apply_poisson_noise(mean_image: &Array2<f64>, seed: u64) -> Array2<f64> {
    process_array_in_parallel_chunks(mean_image.clone(), seed, None, |chunk, rng| {
        chunk
            .iter_mut()
            .for_each(|pixel| *pixel = sample_poisson(rng, *pixel));
    })
}

/// Field of independent Poisson draws sharing one mean
pub fn poisson_field(shape: (usize, usize), mean: f64, seed: u64) -> Array2<f64> {
    let poisson = match Poisson::new(mean) {
        Ok(dist) if mean.is_finite() => dist,
        _ => return Array2::zeros(shape),
    };
    process_array_in_parallel_chunks(Array2::zeros(shape), seed, None, |chunk, rng| {
        chunk
            .iter_mut()
            .for_each(|pixel| *pixel = poisson.sample(rng));
    })
}

/// Field of independent zero-mean Gaussian draws
pub fn gaussian_field(shape: (usize, usize), std_dev: f64, seed: u64) -> Array2<f64> {
    if std_dev <= 0.0 {
        return Array2::zeros(shape);
    }
    process_array_in_parallel_chunks(Array2::zeros(shape), seed, None, |chunk, rng| {
        chunk
            .iter_mut()
            .for_each(|pixel| *pixel = sample_normal(rng, 0.0, std_dev));
    })
}
