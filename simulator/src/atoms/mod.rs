//! Atom loading and fluorescence.

pub mod emission;
pub mod population;

pub use emission::{generate_photons, photons_per_atom, PhotonSet, ThermalSpread};
pub use population::{Atom, AtomPopulation, FillingDistribution, FillingMean, Loading};
