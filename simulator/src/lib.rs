//! Fluorescence imaging simulation for atoms in optical tweezer arrays.
//!
//! The pipeline runs leaf-first: [`lattice`] places the tweezer sites,
//! [`atoms`] loads them and scatters fluorescence photons, the optics in
//! [`hardware::optics`] blur the photons and the sensor models in
//! [`hardware`] turn them into digitized frames. [`experiment::Experiment`]
//! wires the stages together from an [`config::ExperimentOptions`].
//!
//! Every stochastic stage takes the caller's RNG explicitly.

pub mod atoms;
pub mod config;
pub mod error;
pub mod experiment;
pub mod hardware;
pub mod image_proc;
pub mod lattice;
pub mod species;

pub use config::ExperimentOptions;
pub use error::SimulationError;
pub use experiment::Experiment;
pub use hardware::{Sensor, SensorModel};
pub use image_proc::image::{Roi, SensorImage};
pub use lattice::Lattice;
