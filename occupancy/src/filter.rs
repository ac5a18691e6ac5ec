//! Separable Gaussian scale-space filters.
//!
//! Kernels are truncated at four standard deviations and images are
//! extended by mirror reflection about the edge (`d c b a | a b c d | d c b a`),
//! so a constant image stays constant under smoothing.

use ndarray::{Array2, ArrayView2, Axis};

/// Kernels extend to `truncate * sigma` on each side.
pub const TRUNCATE: f64 = 4.0;

/// Normalized 1D Gaussian, or its second derivative when `second_derivative` is set
pub fn gaussian_kernel_1d(sigma: f64, second_derivative: bool) -> Vec<f64> {
    if !(sigma > 0.0) {
        return vec![1.0];
    }
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let sigma2 = sigma * sigma;

    let phi: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / sigma2).exp())
        .collect();
    let sum: f64 = phi.iter().sum();
    let phi = phi.into_iter().map(|v| v / sum);

    if second_derivative {
        phi.zip(-radius..=radius)
            .map(|(p, x)| p * ((x * x) as f64 / (sigma2 * sigma2) - 1.0 / sigma2))
            .collect()
    } else {
        phi.collect()
    }
}

/// Map any index onto `[0, n)` by mirror reflection about the edges.
fn reflect(index: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = index.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

/// Correlate every lane along `axis` with a symmetric kernel.
fn convolve_axis(image: &ArrayView2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let mut output = Array2::<f64>::zeros(image.raw_dim());
    let radius = (kernel.len() / 2) as isize;

    for (lane_in, mut lane_out) in image
        .lanes(axis)
        .into_iter()
        .zip(output.lanes_mut(axis))
    {
        let n = lane_in.len();
        for (i, out) in lane_out.iter_mut().enumerate() {
            let mut sum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let src = reflect(i as isize + k as isize - radius, n);
                sum += lane_in[src] * weight;
            }
            *out = sum;
        }
    }
    output
}

/// Gaussian smoothing with standard deviation `sigma` pixels
pub fn gaussian_filter(image: &ArrayView2<f64>, sigma: f64) -> Array2<f64> {
    if image.is_empty() {
        return image.to_owned();
    }
    let kernel = gaussian_kernel_1d(sigma, false);
    let pass = convolve_axis(image, &kernel, Axis(0));
    convolve_axis(&pass.view(), &kernel, Axis(1))
}

/// Laplacian of the Gaussian-smoothed image
pub fn gaussian_laplace(image: &ArrayView2<f64>, sigma: f64) -> Array2<f64> {
    if image.is_empty() {
        return image.to_owned();
    }
    let smooth = gaussian_kernel_1d(sigma, false);
    let second = gaussian_kernel_1d(sigma, true);

    let d2x = convolve_axis(&convolve_axis(image, &second, Axis(0)).view(), &smooth, Axis(1));
    let d2y = convolve_axis(&convolve_axis(image, &smooth, Axis(0)).view(), &second, Axis(1));
    d2x + d2y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn impulse(size: usize) -> Array2<f64> {
        let mut img = Array2::zeros((size, size));
        img[[size / 2, size / 2]] = 1.0;
        img
    }

    #[test]
    fn test_kernel_normalized() {
        let kernel = gaussian_kernel_1d(1.6, false);
        assert_eq!(kernel.len(), 2 * 6 + 1);
        assert_relative_eq!(kernel.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(kernel[6] > kernel[5]);
        assert_relative_eq!(kernel[0], kernel[12]);
    }

    #[test]
    fn test_second_derivative_kernel_shape() {
        let kernel = gaussian_kernel_1d(2.0, true);
        let center = kernel.len() / 2;
        assert!(kernel[center] < 0.0);
        assert!(kernel[0] > 0.0);
        assert_relative_eq!(kernel.iter().sum::<f64>(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
        assert_eq!(reflect(-9, 4), 0);
        assert_eq!(reflect(3, 1), 0);
    }

    #[test]
    fn test_constant_image_unchanged() {
        let img = Array2::from_elem((7, 5), 3.0);
        let out = gaussian_filter(&img.view(), 1.0);
        for v in out.iter() {
            assert_relative_eq!(*v, 3.0, epsilon = 1e-12);
        }
        let lap = gaussian_laplace(&img.view(), 1.5);
        for v in lap.iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_impulse_response() {
        let img = impulse(21);
        let out = gaussian_filter(&img.view(), 1.0);
        assert_relative_eq!(out.sum(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[[10, 10]], 1.0 / (2.0 * std::f64::consts::PI), epsilon = 2e-3);
        assert_relative_eq!(out[[9, 10]], out[[10, 9]], epsilon = 1e-15);

        let lap = gaussian_laplace(&img.view(), 2.0);
        let peak = lap
            .indexed_iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx);
        assert_eq!(peak, Some((10, 10)));
    }

    #[test]
    fn test_empty_image() {
        let img = Array2::<f64>::zeros((0, 3));
        assert_eq!(gaussian_filter(&img.view(), 1.0).dim(), (0, 3));
    }
}
