//! End-to-end imaging experiment.
//!
//! An [`Experiment`] owns one configured pipeline. Each trial is a
//! [`Experiment::load_atoms`] followed by one or more
//! [`Experiment::image_atoms`] calls; ground truth from the last load stays
//! available for evaluation.

use log::debug;
use rand::RngCore;
use shared::OccupancyMask;

use crate::atoms::{generate_photons, AtomPopulation, Atom, ThermalSpread};
use crate::config::ExperimentOptions;
use crate::error::Result;
use crate::hardware::{Optics, Sensor, SensorModel};
use crate::image_proc::SensorImage;
use crate::lattice::Lattice;

pub struct Experiment {
    options: ExperimentOptions,
    lattice: Lattice,
    population: AtomPopulation,
    optics: Optics,
    sensor: SensorModel,
    thermal: ThermalSpread,
    atoms: Vec<Atom>,
}

impl Experiment {
    pub fn new(options: ExperimentOptions) -> Result<Self> {
        options.validate()?;

        let geometry = &options.geometry;
        let lattice = Lattice::new(
            geometry.n_sites,
            geometry.spacing_m,
            geometry.angle_rad,
            geometry.offset_m,
        );
        let population = AtomPopulation::from_options(&options.atoms.filling)?;
        let optics = options.build_optics()?;
        let sensor = SensorModel::from_options(&options.camera, &optics)?;
        let thermal = options.thermal_spread()?;

        debug!(
            "experiment: {}x{} lattice, {} filling, {} with {} at {:.3} um/px",
            geometry.n_sites.0,
            geometry.n_sites.1,
            population.distribution().name(),
            options.atoms.species.name,
            sensor.name(),
            sensor.scale_m_per_px() * 1e6
        );

        Ok(Self {
            options,
            lattice,
            population,
            optics,
            sensor,
            thermal,
            atoms: Vec::new(),
        })
    }

    pub fn options(&self) -> &ExperimentOptions {
        &self.options
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn optics(&self) -> &Optics {
        &self.optics
    }

    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    pub fn thermal_spread(&self) -> ThermalSpread {
        self.thermal
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Lattice pitch on the sensor, in pixels per site along each axis
    pub fn spacing_px(&self) -> (f64, f64) {
        self.lattice.spacing_px(self.sensor.scale_m_per_px())
    }

    /// Run one load cycle and return its ground truth.
    pub fn load_atoms(&mut self, rng: &mut dyn RngCore) -> Result<&OccupancyMask> {
        let loading = self.population.load_atoms(rng, self.lattice.positions())?;
        self.atoms = loading.atoms;
        self.lattice.set_ground_truth_mask(&loading.occupancy)
    }

    pub fn ground_truth_mask(&self) -> Result<&OccupancyMask> {
        self.lattice.ground_truth_mask()
    }

    /// Image the currently loaded atoms for `imaging_time_s`.
    ///
    /// With no atoms loaded the result is a pure noise frame.
    pub fn image_atoms(&self, rng: &mut dyn RngCore, imaging_time_s: f64) -> SensorImage {
        let photons = generate_photons(
            rng,
            &self.atoms,
            self.options.imaging.scattering_rate_hz,
            self.thermal,
            imaging_time_s,
            self.optics.collection_efficiency(),
        );
        let photons = self.optics.apply_diffraction(rng, photons);
        debug!(
            "imaging {} atoms for {:.3e} s: {} photons reach the sensor",
            self.atoms.len(),
            imaging_time_s,
            photons.len()
        );
        self.sensor.expose(&photons, imaging_time_s, rng)
    }

    /// Image with the configured default exposure
    pub fn image_default(&self, rng: &mut dyn RngCore) -> SensorImage {
        self.image_atoms(rng, self.options.camera.exposure_time_s)
    }
}
