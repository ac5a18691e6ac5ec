//! Error type shared by every simulation stage.

use shared::ImageSize;
use thiserror::Error;

use crate::image_proc::image::Roi;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("unknown filling distribution `{0}` (expected binomial, bernoulli, poisson, clipped_normal or normal)")]
    UnknownDistribution(String),

    #[error("distribution `{distribution}` does not accept parameter `{parameter}`")]
    UnknownDistributionParameter {
        distribution: String,
        parameter: String,
    },

    #[error("per-site filling has {actual} entries but the lattice has {expected} sites")]
    FillingLength { expected: usize, actual: usize },

    #[error(
        "no readout characterization for {amplifier} amplifier at {readout_rate_hz} Hz, preamp setting {preamp}"
    )]
    CameraSettingUnavailable {
        amplifier: String,
        readout_rate_hz: f64,
        preamp: u8,
    },

    #[error("atom temperature {temperature_k} K is not bound by a trap of depth {trap_depth_k} K")]
    NotTrapped {
        temperature_k: f64,
        trap_depth_k: f64,
    },

    #[error("ground truth requested before any atoms were loaded")]
    GroundTruthUnavailable,

    #[error("region {roi} does not fit inside a {size} image")]
    RoiOutOfBounds { roi: Roi, size: ImageSize },

    #[error("failed to read options: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse options: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
