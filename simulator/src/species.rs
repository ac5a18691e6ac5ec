//! Atomic species constants used by the imaging model.
//!
//! Only the quantities the pipeline consumes are carried: the imaging
//! transition wavelength feeds the diffraction blur. Trap depth and
//! saturation intensity are supplied as plain numbers by the caller.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// D2 imaging line wavelength in metres
    pub imaging_wavelength_m: f64,
    /// Natural linewidth of the imaging line in Hz
    pub linewidth_hz: f64,
}

impl Species {
    pub fn new(name: impl Into<String>, imaging_wavelength_m: f64, linewidth_hz: f64) -> Self {
        Self {
            name: name.into(),
            imaging_wavelength_m,
            linewidth_hz,
        }
    }

    /// Upper bound on the scattering rate of a saturated two-level transition
    pub fn max_scattering_rate_hz(&self) -> f64 {
        std::f64::consts::PI * self.linewidth_hz
    }
}

/// Standard species
pub mod models {
    use super::*;
    use once_cell::sync::Lazy;

    /// Cesium 133, D2 line (Steck)
    pub static CESIUM: Lazy<Species> =
        Lazy::new(|| Species::new("cesium", 852.347_275_82e-9, 5.234e6));

    /// Rubidium 87, D2 line (Steck)
    pub static RUBIDIUM_87: Lazy<Species> =
        Lazy::new(|| Species::new("rubidium87", 780.241_209_686e-9, 6.0666e6));
}
