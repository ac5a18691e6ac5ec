//! Blob detector parameters.

use serde::{Deserialize, Serialize};

use crate::error::{DetectionError, Result};

/// Scale-space construction used to find blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobMethod {
    /// Difference of Gaussians
    Dog,
    /// Laplacian of Gaussian
    Log,
}

fn default_overlap() -> f64 {
    0.5
}

fn default_sigma_ratio() -> f64 {
    1.6
}

fn default_num_sigma() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorOptions {
    pub method: BlobMethod,
    /// Smallest blob standard deviation searched, in pixels
    pub min_sigma: f64,
    pub max_sigma: f64,
    /// Absolute threshold on the scale-normalized response of the
    /// unit-maximum image
    pub threshold: f64,
    /// Ignore peaks on the outermost pixel ring
    #[serde(default)]
    pub exclude_border: bool,
    /// Blobs overlapping by more than this area fraction are merged
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    /// Ratio between consecutive DoG scales
    #[serde(default = "default_sigma_ratio")]
    pub sigma_ratio: f64,
    /// Number of LoG scales between `min_sigma` and `max_sigma`
    #[serde(default = "default_num_sigma")]
    pub num_sigma: usize,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            method: BlobMethod::Dog,
            min_sigma: 1.0,
            max_sigma: 1.0,
            threshold: 0.01,
            exclude_border: false,
            overlap: default_overlap(),
            sigma_ratio: default_sigma_ratio(),
            num_sigma: default_num_sigma(),
        }
    }
}

impl DetectorOptions {
    /// Fixed, conservative profile used on calibration images
    pub fn reference() -> Self {
        Self {
            threshold: 0.02,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: BlobMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field, reason: String| Err(DetectionError::InvalidOptions { field, reason });

        if !(self.min_sigma > 0.0 && self.min_sigma.is_finite()) {
            return invalid("min_sigma", format!("must be positive, got {}", self.min_sigma));
        }
        if !(self.max_sigma >= self.min_sigma && self.max_sigma.is_finite()) {
            return invalid(
                "max_sigma",
                format!("must be at least min_sigma {}, got {}", self.min_sigma, self.max_sigma),
            );
        }
        if !(self.threshold >= 0.0 && self.threshold.is_finite()) {
            return invalid("threshold", format!("must be non-negative, got {}", self.threshold));
        }
        if !(0.0..=1.0).contains(&self.overlap) {
            return invalid("overlap", format!("must lie in [0, 1], got {}", self.overlap));
        }
        if !(self.sigma_ratio > 1.0) {
            return invalid(
                "sigma_ratio",
                format!("must exceed 1, got {}", self.sigma_ratio),
            );
        }
        if self.num_sigma == 0 {
            return invalid("num_sigma", "must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        DetectorOptions::default().validate().unwrap();
        DetectorOptions::reference().validate().unwrap();
        assert_eq!(DetectorOptions::reference().threshold, 0.02);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut opts = DetectorOptions::default();
        opts.max_sigma = 0.5;
        assert!(matches!(
            opts.validate(),
            Err(DetectionError::InvalidOptions { field: "max_sigma", .. })
        ));

        let opts = DetectorOptions::default().with_threshold(-0.1);
        assert!(opts.validate().is_err());

        let mut opts = DetectorOptions::default();
        opts.sigma_ratio = 1.0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_json_defaults() {
        let opts: DetectorOptions = serde_json::from_str(
            r#"{"method": "log", "min_sigma": 1.0, "max_sigma": 3.0, "threshold": 0.05}"#,
        )
        .unwrap();
        assert_eq!(opts.method, BlobMethod::Log);
        assert_eq!(opts.overlap, 0.5);
        assert_eq!(opts.num_sigma, 10);
        assert!(!opts.exclude_border);
    }
}
