use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("invalid detector option `{field}`: {reason}")]
    InvalidOptions { field: &'static str, reason: String },

    #[error("lattice spacing must be positive and finite, got ({x}, {y}) px")]
    InvalidSpacing { x: f64, y: f64 },

    #[error("reference image must contain exactly one blob, found {count} at {positions:?}")]
    ReferenceBlobCount {
        count: usize,
        positions: Vec<(f64, f64)>,
    },

    #[error("detector is not calibrated: {missing} not set")]
    NotCalibrated { missing: &'static str },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

pub type Result<T> = std::result::Result<T, DetectionError>;
