//! Experiment configuration.
//!
//! All quantities are SI base units and every field name carries its unit
//! suffix. Options are plain serde structs so they load from JSON; call
//! [`ExperimentOptions::validate`] (done automatically by the loaders and
//! by [`crate::Experiment::new`]) before using them.
//!
//! # Example
//!
//! ```rust
//! use simulator::config::{ExperimentOptions, FillingMean};
//!
//! let mut options = ExperimentOptions::default();
//! options.geometry.n_sites = (1, 1);
//! options.atoms.filling.mean = FillingMean::Uniform(1.0);
//! options.validate().unwrap();
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use crate::atoms::FillingMean;

use crate::atoms::{AtomPopulation, ThermalSpread};
use crate::error::{Result, SimulationError};
use crate::hardware::ixon::Amplifier;
use crate::hardware::optics::{Optics, GAUSSIAN_AIRY_PREFACTOR};
use crate::hardware::sensor::SensorModel;
use crate::lattice::Lattice;
use crate::species::{models, Species};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryOptions {
    /// Sites along (i, j)
    pub n_sites: (usize, usize),
    pub spacing_m: (f64, f64),
    pub angle_rad: f64,
    pub offset_m: (f64, f64),
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            n_sites: (10, 10),
            spacing_m: (5e-6, 5e-6),
            angle_rad: 0.0,
            offset_m: (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillingOptions {
    /// `binomial`/`bernoulli`, `poisson` or `clipped_normal`/`normal`
    pub distribution: String,
    pub mean: FillingMean,
    /// Distribution-specific extras (`trials`, `width`)
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

impl Default for FillingOptions {
    fn default() -> Self {
        Self {
            distribution: "binomial".to_string(),
            mean: FillingMean::Uniform(0.5),
            parameters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomOptions {
    pub species: Species,
    pub temperature_k: f64,
    pub filling: FillingOptions,
    /// Fixed thermal spread; derived from the trap when absent
    #[serde(default)]
    pub thermal_sigma_m: Option<ThermalSpread>,
}

impl Default for AtomOptions {
    fn default() -> Self {
        Self {
            species: models::CESIUM.clone(),
            temperature_k: 20e-6,
            filling: FillingOptions::default(),
            thermal_sigma_m: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapOptions {
    pub waist_m: f64,
    /// Trap depth expressed as a temperature
    pub depth_k: f64,
}

impl Default for TrapOptions {
    fn default() -> Self {
        Self {
            waist_m: 1e-6,
            depth_k: 1e-3,
        }
    }
}

fn unit_axis_scale() -> (f64, f64) {
    (1.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticsOptions {
    pub magnification: f64,
    pub numerical_aperture: f64,
    /// Gaussian PSF width in units of `wavelength / (2 NA)`
    pub psf_prefactor: f64,
    #[serde(default = "unit_axis_scale")]
    pub psf_axis_scale: (f64, f64),
}

impl Default for OpticsOptions {
    fn default() -> Self {
        Self {
            magnification: 500.0 / 40.0,
            numerical_aperture: 0.6,
            psf_prefactor: GAUSSIAN_AIRY_PREFACTOR,
            psf_axis_scale: unit_axis_scale(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicCameraOptions {
    pub gain: f64,
    pub dark_mean_counts: f64,
    pub dark_std_counts: f64,
}

impl Default for BasicCameraOptions {
    fn default() -> Self {
        Self {
            gain: 1.0,
            dark_mean_counts: 100.0,
            dark_std_counts: 2.0,
        }
    }
}

fn default_quantum_efficiency() -> f64 {
    0.8
}

fn default_clock_induced_charge() -> f64 {
    0.005
}

fn default_baseline_offset() -> f64 {
    100.0
}

fn default_bit_depth() -> u8 {
    16
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IxonOptions {
    pub gain: f64,
    pub preamp: u8,
    pub amplifier: Amplifier,
    pub readout_rate_hz: f64,
    pub sensor_temperature_k: f64,
    #[serde(default = "default_quantum_efficiency")]
    pub quantum_efficiency: f64,
    /// Mean clock-induced charge events per pixel per frame
    #[serde(default = "default_clock_induced_charge")]
    pub clock_induced_charge: f64,
    #[serde(default = "default_baseline_offset")]
    pub baseline_offset_counts: f64,
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u8,
}

impl Default for IxonOptions {
    fn default() -> Self {
        Self {
            gain: 100.0,
            preamp: 1,
            amplifier: Amplifier::ElectronMultiplying,
            readout_rate_hz: 30e6,
            sensor_temperature_k: 203.15,
            quantum_efficiency: default_quantum_efficiency(),
            clock_induced_charge: default_clock_induced_charge(),
            baseline_offset_counts: default_baseline_offset(),
            bit_depth: default_bit_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CameraModel {
    Basic(BasicCameraOptions),
    #[serde(rename = "ixon_ultra_888")]
    IxonUltra888(IxonOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraOptions {
    pub pixel_size_m: f64,
    /// Sensor pixels along (x, y)
    pub sensor_size: (usize, usize),
    /// Pixel coordinate of the object-plane origin
    pub position_px: (f64, f64),
    /// Default imaging time
    pub exposure_time_s: f64,
    pub model: CameraModel,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            pixel_size_m: 13.5e-6,
            sensor_size: (1024, 1024),
            position_px: (4.0, 4.0),
            exposure_time_s: 5e-3,
            model: CameraModel::IxonUltra888(IxonOptions::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingOptions {
    /// Photons scattered per atom per second
    pub scattering_rate_hz: f64,
}

impl Default for ImagingOptions {
    fn default() -> Self {
        Self {
            scattering_rate_hz: 1e6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOptions {
    pub geometry: GeometryOptions,
    pub atoms: AtomOptions,
    #[serde(default)]
    pub trap: TrapOptions,
    pub optics: OpticsOptions,
    pub camera: CameraOptions,
    pub imaging: ImagingOptions,
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::invalid(
            field,
            format!("must be positive, got {value}"),
        ))
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::invalid(
            field,
            format!("must be non-negative, got {value}"),
        ))
    }
}

impl ExperimentOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn site_count(&self) -> usize {
        self.geometry.n_sites.0 * self.geometry.n_sites.1
    }

    /// Thermal spread, fixed or derived from the trap
    pub fn thermal_spread(&self) -> Result<ThermalSpread> {
        match self.atoms.thermal_sigma_m {
            Some(spread) => Ok(spread),
            None => Lattice::thermal_sigma_from_trap(
                self.trap.waist_m,
                self.atoms.temperature_k,
                self.trap.depth_k,
            )
            .map(ThermalSpread::Isotropic),
        }
    }

    pub fn build_optics(&self) -> Result<Optics> {
        let (sx, sy) = self.optics.psf_axis_scale;
        Optics::new(
            self.optics.magnification,
            self.optics.numerical_aperture,
            self.atoms.species.imaging_wavelength_m,
            self.optics.psf_prefactor,
        )?
        .with_axis_scale(sx, sy)
    }

    /// Check every field, failing on the first problem found.
    pub fn validate(&self) -> Result<()> {
        let geometry = &self.geometry;
        if geometry.n_sites.0 == 0 || geometry.n_sites.1 == 0 {
            return Err(SimulationError::invalid(
                "geometry.n_sites",
                format!("both axes need at least one site, got {:?}", geometry.n_sites),
            ));
        }
        positive("geometry.spacing_m.0", geometry.spacing_m.0)?;
        positive("geometry.spacing_m.1", geometry.spacing_m.1)?;
        if !geometry.angle_rad.is_finite() {
            return Err(SimulationError::invalid("geometry.angle_rad", "must be finite"));
        }
        if !(geometry.offset_m.0.is_finite() && geometry.offset_m.1.is_finite()) {
            return Err(SimulationError::invalid("geometry.offset_m", "must be finite"));
        }

        non_negative("atoms.temperature_k", self.atoms.temperature_k)?;
        AtomPopulation::from_options(&self.atoms.filling)?;
        if let FillingMean::PerSite(means) = &self.atoms.filling.mean {
            if means.len() != self.site_count() {
                return Err(SimulationError::FillingLength {
                    expected: self.site_count(),
                    actual: means.len(),
                });
            }
        }
        match self.atoms.thermal_sigma_m {
            Some(spread) => {
                let (sx, sy) = spread.sigmas();
                non_negative("atoms.thermal_sigma_m.x", sx)?;
                non_negative("atoms.thermal_sigma_m.y", sy)?;
            }
            None => {
                positive("trap.waist_m", self.trap.waist_m)?;
                self.thermal_spread()?;
            }
        }

        let optics = self.build_optics()?;

        let camera = &self.camera;
        positive("camera.pixel_size_m", camera.pixel_size_m)?;
        if camera.sensor_size.0 == 0 || camera.sensor_size.1 == 0 {
            return Err(SimulationError::invalid(
                "camera.sensor_size",
                format!("must be non-empty, got {:?}", camera.sensor_size),
            ));
        }
        non_negative("camera.exposure_time_s", camera.exposure_time_s)?;
        SensorModel::from_options(camera, &optics)?;

        non_negative("imaging.scattering_rate_hz", self.imaging.scattering_rate_hz)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        let options = ExperimentOptions::default();
        options.validate().unwrap();
        assert_eq!(options.site_count(), 100);
        assert_eq!(options.camera.position_px, (4.0, 4.0));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");
        let options = ExperimentOptions::default();
        options.save_to_file(&path).unwrap();
        let loaded = ExperimentOptions::from_json_file(&path).unwrap();
        assert_eq!(loaded, options);
    }

    #[test]
    fn test_camera_model_tag() {
        let json = serde_json::to_value(CameraModel::IxonUltra888(IxonOptions::default())).unwrap();
        assert_eq!(json["type"], "ixon_ultra_888");
        assert_eq!(json["amplifier"], "EM");

        let basic: CameraModel = serde_json::from_str(
            r#"{"type": "basic", "gain": 2.0, "dark_mean_counts": 10.0, "dark_std_counts": 1.0}"#,
        )
        .unwrap();
        assert!(matches!(basic, CameraModel::Basic(b) if b.gain == 2.0));
    }

    #[test]
    fn test_ixon_defaults_fill_in() {
        let ixon: IxonOptions = serde_json::from_str(
            r#"{"gain": 50, "preamp": 2, "amplifier": "EM",
                "readout_rate_hz": 10e6, "sensor_temperature_k": 193.15}"#,
        )
        .unwrap();
        assert_eq!(ixon.quantum_efficiency, 0.8);
        assert_eq!(ixon.clock_induced_charge, 0.005);
        assert_eq!(ixon.bit_depth, 16);
    }

    #[test]
    fn test_unknown_distribution_rejected() {
        let mut options = ExperimentOptions::default();
        options.atoms.filling.distribution = "geometric".to_string();
        assert!(matches!(
            options.validate(),
            Err(SimulationError::UnknownDistribution(name)) if name == "geometric"
        ));
    }

    #[test]
    fn test_unavailable_camera_setting_rejected() {
        let mut options = ExperimentOptions::default();
        if let CameraModel::IxonUltra888(ixon) = &mut options.camera.model {
            ixon.readout_rate_hz = 5e6;
        }
        assert!(matches!(
            options.validate(),
            Err(SimulationError::CameraSettingUnavailable { .. })
        ));
    }

    #[test]
    fn test_field_checks() {
        let mut options = ExperimentOptions::default();
        options.geometry.n_sites = (0, 3);
        assert!(matches!(
            options.validate(),
            Err(SimulationError::InvalidConfig { field, .. }) if field == "geometry.n_sites"
        ));

        let mut options = ExperimentOptions::default();
        options.optics.numerical_aperture = 1.2;
        assert!(options.validate().is_err());

        let mut options = ExperimentOptions::default();
        options.atoms.filling.mean = FillingMean::PerSite(vec![0.5; 3]);
        assert!(matches!(
            options.validate(),
            Err(SimulationError::FillingLength { expected: 100, actual: 3 })
        ));

        let mut options = ExperimentOptions::default();
        options.atoms.temperature_k = 5e-3;
        assert!(matches!(
            options.validate(),
            Err(SimulationError::NotTrapped { .. })
        ));
    }

    #[test]
    fn test_thermal_override() {
        let mut options = ExperimentOptions::default();
        options.atoms.thermal_sigma_m = Some(ThermalSpread::PerAxis { x: 1e-7, y: 2e-7 });
        options.atoms.temperature_k = 5e-3;
        options.validate().unwrap();
        assert_eq!(options.thermal_spread().unwrap().sigmas(), (1e-7, 2e-7));
    }

    #[test]
    fn test_invalid_json_reports_parse_error() {
        assert!(matches!(
            ExperimentOptions::from_json_str("{"),
            Err(SimulationError::Json(_))
        ));
    }
}
