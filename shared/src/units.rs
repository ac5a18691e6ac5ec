//! Type-safe physical units
//!
//! Configuration stores plain SI floats; these `uom` quantities are used
//! where values cross into formulas that are easy to get wrong by a scale
//! factor (sensor temperature in Celsius, wavelengths in nanometres,
//! readout rates in megahertz).

use uom::si::f64::{Frequency, Length, ThermodynamicTemperature};
use uom::si::frequency::{hertz, kilohertz, megahertz};
use uom::si::length::{meter, nanometer};
use uom::si::thermodynamic_temperature::{degree_celsius, kelvin};

/// Type alias for temperature with convenient methods
pub type Temperature = ThermodynamicTemperature;

pub trait TemperatureExt {
    fn from_celsius(celsius: f64) -> Self;
    fn as_celsius(&self) -> f64;
    fn from_kelvin(kelvin: f64) -> Self;
    fn as_kelvin(&self) -> f64;
}

pub trait LengthExt {
    fn from_nanometers(nm: f64) -> Self;
    fn as_nanometers(&self) -> f64;
    fn from_meters(m: f64) -> Self;
    fn as_meters(&self) -> f64;
}

pub trait FrequencyExt {
    fn from_hertz(hz: f64) -> Self;
    fn as_hertz(&self) -> f64;
    fn from_kilohertz(khz: f64) -> Self;
    fn from_megahertz(mhz: f64) -> Self;
    fn as_megahertz(&self) -> f64;
}

impl TemperatureExt for Temperature {
    fn from_celsius(celsius: f64) -> Self {
        Temperature::new::<degree_celsius>(celsius)
    }

    fn as_celsius(&self) -> f64 {
        self.get::<degree_celsius>()
    }

    fn from_kelvin(k: f64) -> Self {
        Temperature::new::<kelvin>(k)
    }

    fn as_kelvin(&self) -> f64 {
        self.get::<kelvin>()
    }
}

impl LengthExt for Length {
    fn from_nanometers(nm: f64) -> Self {
        Length::new::<nanometer>(nm)
    }

    fn as_nanometers(&self) -> f64 {
        self.get::<nanometer>()
    }

    fn from_meters(m: f64) -> Self {
        Length::new::<meter>(m)
    }

    fn as_meters(&self) -> f64 {
        self.get::<meter>()
    }
}

impl FrequencyExt for Frequency {
    fn from_hertz(hz: f64) -> Self {
        Frequency::new::<hertz>(hz)
    }

    fn as_hertz(&self) -> f64 {
        self.get::<hertz>()
    }

    fn from_kilohertz(khz: f64) -> Self {
        Frequency::new::<kilohertz>(khz)
    }

    fn from_megahertz(mhz: f64) -> Self {
        Frequency::new::<megahertz>(mhz)
    }

    fn as_megahertz(&self) -> f64 {
        self.get::<megahertz>()
    }
}
