//! Optics and sensor hardware models

pub mod dark_current;
pub mod ixon;
pub mod optics;
pub mod sensor;

pub use dark_current::DarkCurrentEstimator;
pub use ixon::{readout_performance, Amplifier, IxonUltra888, ReadoutPerformance, ReadoutRate};
pub use optics::{Optics, GAUSSIAN_AIRY_PREFACTOR};
pub use sensor::{BasicCamera, Sensor, SensorModel};
