//! Sensor capability and the configurable camera models.

use log::debug;
use rand::RngCore;
use shared::image_proc::noise::gaussian_field;
use shared::ImageSize;

use super::ixon::IxonUltra888;
use super::optics::Optics;
use crate::atoms::PhotonSet;
use crate::config::{BasicCameraOptions, CameraModel, CameraOptions};
use crate::error::{Result, SimulationError};
use crate::image_proc::{bin_photons, PixelGrid, Roi, SensorImage};

/// Anything that turns photon positions into a digitized frame.
pub trait Sensor: Send + Sync {
    fn name(&self) -> &str;

    fn grid(&self) -> &PixelGrid;

    /// Sample one exposure.
    ///
    /// `exposure_time_s` sets the accumulated dark charge; photon count is
    /// decided upstream.
    fn expose(
        &self,
        photons: &PhotonSet,
        exposure_time_s: f64,
        rng: &mut dyn RngCore,
    ) -> SensorImage;

    fn image_size(&self) -> ImageSize {
        self.grid().size
    }

    /// Object-plane metres per pixel
    fn scale_m_per_px(&self) -> f64 {
        self.grid().scale_m_per_px
    }

    fn crop(&self, image: &SensorImage, roi: &Roi) -> Result<SensorImage> {
        image.crop(roi)
    }
}

/// Floor and clip a value into `[0, max_count]`.
pub(crate) fn digitize(value: f64, max_count: f64) -> u16 {
    value.floor().clamp(0.0, max_count) as u16
}

/// Photon counter with gain, constant offset and Gaussian background.
#[derive(Debug, Clone)]
pub struct BasicCamera {
    grid: PixelGrid,
    gain: f64,
    dark_mean_counts: f64,
    dark_std_counts: f64,
}

impl BasicCamera {
    pub fn new(grid: PixelGrid, options: &BasicCameraOptions) -> Result<Self> {
        if !(options.gain > 0.0) {
            return Err(SimulationError::invalid(
                "camera.model.gain",
                format!("must be positive, got {}", options.gain),
            ));
        }
        if !(options.dark_std_counts >= 0.0) {
            return Err(SimulationError::invalid(
                "camera.model.dark_std_counts",
                format!("must be non-negative, got {}", options.dark_std_counts),
            ));
        }
        Ok(Self {
            grid,
            gain: options.gain,
            dark_mean_counts: options.dark_mean_counts,
            dark_std_counts: options.dark_std_counts,
        })
    }
}

impl Sensor for BasicCamera {
    fn name(&self) -> &str {
        "basic camera"
    }

    fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    fn expose(
        &self,
        photons: &PhotonSet,
        _exposure_time_s: f64,
        rng: &mut dyn RngCore,
    ) -> SensorImage {
        let counts = bin_photons(photons, &self.grid);
        let noise = gaussian_field(counts.dim(), self.dark_std_counts, rng.next_u64());

        let signal = counts * self.gain + self.dark_mean_counts;
        let image = &signal + &noise;
        let max = f64::from(u16::MAX);

        SensorImage {
            image: image.mapv(|v| digitize(v, max)),
            signal: signal.mapv(|v| digitize(v, max)),
            scale_m_per_px: self.grid.scale_m_per_px,
            offset_px: self.grid.position_px,
            origin_px: (0, 0),
        }
    }
}

/// Camera variant chosen by configuration
#[derive(Debug, Clone)]
pub enum SensorModel {
    Basic(BasicCamera),
    IxonUltra888(IxonUltra888),
}

impl SensorModel {
    pub fn from_options(options: &CameraOptions, optics: &Optics) -> Result<Self> {
        let grid = PixelGrid {
            size: ImageSize::from_width_height(options.sensor_size.0, options.sensor_size.1),
            scale_m_per_px: optics.image_scale(options.pixel_size_m),
            position_px: options.position_px,
        };
        debug!(
            "sensor grid {} at {:.3} um/px, offset {:?} px",
            grid.size,
            grid.scale_m_per_px * 1e6,
            grid.position_px
        );

        Ok(match &options.model {
            CameraModel::Basic(basic) => Self::Basic(BasicCamera::new(grid, basic)?),
            CameraModel::IxonUltra888(ixon) => Self::IxonUltra888(IxonUltra888::new(grid, ixon)?),
        })
    }

    fn inner(&self) -> &dyn Sensor {
        match self {
            Self::Basic(camera) => camera,
            Self::IxonUltra888(camera) => camera,
        }
    }
}

impl Sensor for SensorModel {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn grid(&self) -> &PixelGrid {
        self.inner().grid()
    }

    fn expose(
        &self,
        photons: &PhotonSet,
        exposure_time_s: f64,
        rng: &mut dyn RngCore,
    ) -> SensorImage {
        self.inner().expose(photons, exposure_time_s, rng)
    }
}
