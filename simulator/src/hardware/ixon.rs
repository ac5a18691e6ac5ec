//! EMCCD model after the Andor iXon Ultra 888.
//!
//! Photons become counts through seven stages, in this order: spatial
//! binning, shot-noise resampling, quantum efficiency, dark charge and
//! clock-induced charge, EM gain, readout noise, digitization. The
//! noise-free `signal` frame follows the same gain and digitization with
//! every stochastic stage replaced by its expectation.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use ndarray::Array2;
use once_cell::sync::Lazy;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use shared::image_proc::noise::{apply_poisson_noise, gaussian_field, poisson_field};
use shared::units::{FrequencyExt, Temperature, TemperatureExt};
use uom::si::f64::Frequency;

use super::dark_current::DarkCurrentEstimator;
use super::sensor::{digitize, Sensor};
use crate::atoms::PhotonSet;
use crate::config::IxonOptions;
use crate::error::{Result, SimulationError};
use crate::image_proc::{bin_photons, PixelGrid, SensorImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amplifier {
    #[serde(rename = "EM", alias = "em")]
    ElectronMultiplying,
    #[serde(rename = "conventional")]
    Conventional,
}

impl fmt::Display for Amplifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ElectronMultiplying => write!(f, "EM"),
            Self::Conventional => write!(f, "conventional"),
        }
    }
}

/// Horizontal readout rates the camera supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadoutRate {
    Mhz30,
    Mhz20,
    Mhz10,
    Mhz1,
    Khz100,
}

impl ReadoutRate {
    const ALL: [ReadoutRate; 5] = [
        Self::Mhz30,
        Self::Mhz20,
        Self::Mhz10,
        Self::Mhz1,
        Self::Khz100,
    ];

    pub fn frequency(&self) -> Frequency {
        match self {
            Self::Mhz30 => Frequency::from_megahertz(30.0),
            Self::Mhz20 => Frequency::from_megahertz(20.0),
            Self::Mhz10 => Frequency::from_megahertz(10.0),
            Self::Mhz1 => Frequency::from_megahertz(1.0),
            Self::Khz100 => Frequency::from_kilohertz(100.0),
        }
    }

    /// Match a configured rate to a supported one
    pub fn from_hz(readout_rate_hz: f64) -> Option<Self> {
        let requested = Frequency::from_hertz(readout_rate_hz).as_megahertz();
        Self::ALL
            .into_iter()
            .find(|rate| (rate.frequency().as_megahertz() - requested).abs() < 1e-6)
    }
}

/// Readout characteristics for one amplifier/rate/preamp combination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadoutPerformance {
    /// Readout noise, electrons RMS
    pub read_noise_e: f64,
    /// Electrons per digital count
    pub sensitivity_e_per_count: f64,
}

type PerformanceKey = (Amplifier, ReadoutRate, u8);

static PERFORMANCE_TABLE: Lazy<HashMap<PerformanceKey, ReadoutPerformance>> = Lazy::new(|| {
    use Amplifier::*;
    use ReadoutRate::*;

    let entries = [
        ((ElectronMultiplying, Mhz30, 1), (140.0, 18.7)),
        ((ElectronMultiplying, Mhz30, 2), (89.0, 4.6)),
        ((ElectronMultiplying, Mhz20, 1), (103.0, 16.6)),
        ((ElectronMultiplying, Mhz20, 2), (63.0, 4.2)),
        ((ElectronMultiplying, Mhz10, 1), (62.0, 16.5)),
        ((ElectronMultiplying, Mhz10, 2), (41.0, 4.1)),
        ((ElectronMultiplying, Mhz1, 1), (17.0, 16.0)),
        ((ElectronMultiplying, Mhz1, 2), (10.0, 3.9)),
        ((Conventional, Mhz1, 1), (6.6, 3.4)),
        ((Conventional, Mhz1, 2), (4.8, 0.8)),
        ((Conventional, Khz100, 1), (3.9, 3.4)),
        ((Conventional, Khz100, 2), (3.2, 0.8)),
    ];

    entries
        .into_iter()
        .map(|(key, (read_noise_e, sensitivity_e_per_count))| {
            (
                key,
                ReadoutPerformance {
                    read_noise_e,
                    sensitivity_e_per_count,
                },
            )
        })
        .collect()
});

/// Look up readout noise and sensitivity for a camera setting.
pub fn readout_performance(
    amplifier: Amplifier,
    readout_rate_hz: f64,
    preamp: u8,
) -> Result<ReadoutPerformance> {
    let unavailable = || SimulationError::CameraSettingUnavailable {
        amplifier: amplifier.to_string(),
        readout_rate_hz,
        preamp,
    };
    let rate = ReadoutRate::from_hz(readout_rate_hz).ok_or_else(unavailable)?;
    PERFORMANCE_TABLE
        .get(&(amplifier, rate, preamp))
        .copied()
        .ok_or_else(unavailable)
}

#[derive(Debug, Clone)]
pub struct IxonUltra888 {
    grid: PixelGrid,
    gain: f64,
    performance: ReadoutPerformance,
    dark_current_e_per_px_s: f64,
    clock_induced_charge: f64,
    quantum_efficiency: f64,
    baseline_offset_counts: f64,
    max_count: f64,
}

impl IxonUltra888 {
    pub fn new(grid: PixelGrid, options: &IxonOptions) -> Result<Self> {
        let performance =
            readout_performance(options.amplifier, options.readout_rate_hz, options.preamp)?;

        if !(options.gain >= 1.0) {
            return Err(SimulationError::invalid(
                "camera.model.gain",
                format!("must be at least 1, got {}", options.gain),
            ));
        }
        if options.amplifier == Amplifier::Conventional && options.gain != 1.0 {
            return Err(SimulationError::invalid(
                "camera.model.gain",
                format!(
                    "conventional amplifier has no EM register, gain must be 1, got {}",
                    options.gain
                ),
            ));
        }
        if !(0.0..=1.0).contains(&options.quantum_efficiency) {
            return Err(SimulationError::invalid(
                "camera.model.quantum_efficiency",
                format!("must lie in [0, 1], got {}", options.quantum_efficiency),
            ));
        }
        if !(options.clock_induced_charge >= 0.0) {
            return Err(SimulationError::invalid(
                "camera.model.clock_induced_charge",
                format!("must be non-negative, got {}", options.clock_induced_charge),
            ));
        }
        if options.bit_depth == 0 || options.bit_depth > 16 {
            return Err(SimulationError::invalid(
                "camera.model.bit_depth",
                format!("must be 1..=16, got {}", options.bit_depth),
            ));
        }

        let temperature = Temperature::from_kelvin(options.sensor_temperature_k);
        let dark_current_e_per_px_s =
            DarkCurrentEstimator::ixon_ultra_888().estimate_at_temperature(temperature);
        debug!(
            "iXon: {} amplifier, gain {}, read noise {} e-, {} e-/count, dark {:.2e} e-/px/s at {:.1} C",
            options.amplifier,
            options.gain,
            performance.read_noise_e,
            performance.sensitivity_e_per_count,
            dark_current_e_per_px_s,
            temperature.as_celsius()
        );

        Ok(Self {
            grid,
            gain: options.gain,
            performance,
            dark_current_e_per_px_s,
            clock_induced_charge: options.clock_induced_charge,
            quantum_efficiency: options.quantum_efficiency,
            baseline_offset_counts: options.baseline_offset_counts,
            max_count: ((1u32 << options.bit_depth) - 1) as f64,
        })
    }

    pub fn performance(&self) -> ReadoutPerformance {
        self.performance
    }

    pub fn dark_current_e_per_px_s(&self) -> f64 {
        self.dark_current_e_per_px_s
    }

    fn to_counts(&self, electrons: &Array2<f64>) -> Array2<u16> {
        let sensitivity = self.performance.sensitivity_e_per_count;
        electrons.mapv(|e| digitize(e / sensitivity + self.baseline_offset_counts, self.max_count))
    }
}

impl Sensor for IxonUltra888 {
    fn name(&self) -> &str {
        "iXon Ultra 888"
    }

    fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    fn expose(
        &self,
        photons: &PhotonSet,
        exposure_time_s: f64,
        rng: &mut dyn RngCore,
    ) -> SensorImage {
        let incident = bin_photons(photons, &self.grid);
        let shape = incident.dim();

        let shot = apply_poisson_noise(&incident, rng.next_u64());
        let photoelectrons = shot * self.quantum_efficiency;

        let dark_mean = self.dark_current_e_per_px_s * exposure_time_s.max(0.0);
        let dark = poisson_field(shape, dark_mean, rng.next_u64());
        let cic = poisson_field(shape, self.clock_induced_charge, rng.next_u64());
        let pre_gain = photoelectrons + dark + cic;

        let amplified = pre_gain * self.gain;
        let total = amplified + gaussian_field(shape, self.performance.read_noise_e, rng.next_u64());

        let expected = (incident * self.quantum_efficiency + dark_mean + self.clock_induced_charge)
            * self.gain;

        debug!(
            "iXon exposure {:.3e} s: {} photons, dark mean {:.2e} e-/px",
            exposure_time_s,
            photons.len(),
            dark_mean
        );

        SensorImage {
            image: self.to_counts(&total),
            signal: self.to_counts(&expected),
            scale_m_per_px: self.grid.scale_m_per_px,
            offset_px: self.grid.position_px,
            origin_px: (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use shared::ImageSize;

    fn grid(size: usize) -> PixelGrid {
        PixelGrid {
            size: ImageSize::from_width_height(size, size),
            scale_m_per_px: 1e-6,
            position_px: (0.0, 0.0),
        }
    }

    fn options() -> IxonOptions {
        IxonOptions::default()
    }

    #[test]
    fn test_table_lookup() {
        let perf = readout_performance(Amplifier::ElectronMultiplying, 30e6, 1).unwrap();
        assert_eq!(perf.read_noise_e, 140.0);
        assert_eq!(perf.sensitivity_e_per_count, 18.7);

        let conv = readout_performance(Amplifier::Conventional, 1e5, 2).unwrap();
        assert_eq!(conv.sensitivity_e_per_count, 0.8);
    }

    #[test]
    fn test_table_rejects_missing_settings() {
        let err = readout_performance(Amplifier::Conventional, 30e6, 1).unwrap_err();
        match err {
            SimulationError::CameraSettingUnavailable {
                amplifier,
                readout_rate_hz,
                preamp,
            } => {
                assert_eq!(amplifier, "conventional");
                assert_eq!(readout_rate_hz, 30e6);
                assert_eq!(preamp, 1);
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(readout_performance(Amplifier::ElectronMultiplying, 17e6, 1).is_err());
        assert!(readout_performance(Amplifier::ElectronMultiplying, 10e6, 3).is_err());
    }

    #[test]
    fn test_conventional_requires_unit_gain() {
        let mut opts = options();
        opts.amplifier = Amplifier::Conventional;
        opts.readout_rate_hz = 1e6;
        opts.gain = 100.0;
        assert!(IxonUltra888::new(grid(4), &opts).is_err());
        opts.gain = 1.0;
        assert!(IxonUltra888::new(grid(4), &opts).is_ok());
    }

    #[test]
    fn test_dark_frame_sits_at_offset() {
        let mut opts = options();
        opts.clock_induced_charge = 0.0;
        let camera = IxonUltra888::new(grid(64), &opts).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let frame = camera.expose(&PhotonSet::default(), 1e-3, &mut rng);

        assert_eq!(frame.image.dim(), (64, 64));
        assert!(frame.signal.iter().all(|&v| v == 100));
        // Read noise of 140 e- is ~7.5 counts at 18.7 e-/count
        let mean = frame.mean();
        assert_relative_eq!(mean, 99.5, epsilon = 0.5);
    }

    #[test]
    fn test_photons_raise_signal() {
        let camera = IxonUltra888::new(grid(8), &options()).unwrap();
        let mut photons = PhotonSet::default();
        for _ in 0..100 {
            photons.push(3.5e-6, 4.5e-6);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let frame = camera.expose(&photons, 1e-3, &mut rng);

        // 100 photons * 0.8 QE * gain 100 / 18.7 e-/count
        let expected = (100.0 * 0.8 * 100.0 / 18.7 + 100.0) as u16;
        assert!(frame.signal[[3, 4]].abs_diff(expected) <= 1);
        assert!(frame.image[[3, 4]] > 300);
        assert_eq!(frame.signal[[0, 0]], 100);
    }

    #[test]
    fn test_saturates_at_bit_depth() {
        let camera = IxonUltra888::new(grid(2), &options()).unwrap();
        let mut photons = PhotonSet::default();
        for _ in 0..50_000 {
            photons.push(0.5e-6, 0.5e-6);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let frame = camera.expose(&photons, 1e-3, &mut rng);
        assert_eq!(frame.image[[0, 0]], u16::MAX);
        assert_eq!(frame.signal[[0, 0]], u16::MAX);
    }

    #[test]
    fn test_reproducible_for_seed() {
        let camera = IxonUltra888::new(grid(16), &options()).unwrap();
        let mut photons = PhotonSet::default();
        photons.push(8e-6, 8e-6);
        let a = camera.expose(&photons, 1e-3, &mut ChaCha8Rng::seed_from_u64(5));
        let b = camera.expose(&photons, 1e-3, &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_readout_rate_parsing() {
        assert_eq!(ReadoutRate::from_hz(30e6), Some(ReadoutRate::Mhz30));
        assert_eq!(ReadoutRate::from_hz(100e3), Some(ReadoutRate::Khz100));
        assert_eq!(ReadoutRate::from_hz(5e6), None);
    }
}
