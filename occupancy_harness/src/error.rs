use occupancy::DetectionError;
use shared::frame_io::FrameIoError;
use simulator::SimulationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("artifact error: {0}")]
    FrameIo(#[from] FrameIoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid sweep: {0}")]
    InvalidSweep(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
