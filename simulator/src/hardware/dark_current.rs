//! Dark current estimation for different sensor temperatures
//!
//! Thermally generated charge follows an Arrhenius law,
//! `D(T) = D0 * exp(-E / T)` with `E` an activation temperature. Two
//! characterization points fix both constants.

use shared::units::{Temperature, TemperatureExt};

use crate::error::{Result, SimulationError};

#[derive(Debug, Clone, PartialEq)]
pub struct DarkCurrentEstimator {
    /// Prefactor in electrons/pixel/second
    prefactor: f64,
    /// Activation temperature in kelvin
    activation_k: f64,
}

impl DarkCurrentEstimator {
    /// Fit the Arrhenius constants through two `(temperature, e-/px/s)` points.
    ///
    /// # Example
    /// ```
    /// use shared::units::{Temperature, TemperatureExt};
    /// use simulator::hardware::dark_current::DarkCurrentEstimator;
    ///
    /// let estimator = DarkCurrentEstimator::from_reference_points(
    ///     (Temperature::from_celsius(-80.0), 2.5e-4),
    ///     (Temperature::from_celsius(-100.0), 1.1e-4),
    /// )
    /// .unwrap();
    /// let at_minus_80 = estimator.estimate_at_temperature(Temperature::from_celsius(-80.0));
    /// assert!((at_minus_80 - 2.5e-4).abs() < 1e-12);
    /// ```
    pub fn from_reference_points(
        first: (Temperature, f64),
        second: (Temperature, f64),
    ) -> Result<Self> {
        let (t1, d1) = (first.0.as_kelvin(), first.1);
        let (t2, d2) = (second.0.as_kelvin(), second.1);
        if !(t1 > 0.0 && t2 > 0.0) || t1 == t2 || !(d1 > 0.0 && d2 > 0.0) {
            return Err(SimulationError::invalid(
                "camera.dark_current",
                "reference points need distinct positive temperatures and positive rates",
            ));
        }

        Ok(Self::fit((t1, d1), (t2, d2)))
    }

    fn fit((t1, d1): (f64, f64), (t2, d2): (f64, f64)) -> Self {
        let activation_k = -(d2 / d1).ln() / (1.0 / t2 - 1.0 / t1);
        Self {
            prefactor: d1 * (activation_k / t1).exp(),
            activation_k,
        }
    }

    /// iXon Ultra 888 datasheet points: 2.5e-4 e-/px/s at -80 C and
    /// 1.1e-4 e-/px/s at -100 C.
    pub fn ixon_ultra_888() -> Self {
        Self::fit(
            (Temperature::from_celsius(-80.0).as_kelvin(), 2.5e-4),
            (Temperature::from_celsius(-100.0).as_kelvin(), 1.1e-4),
        )
    }

    pub fn activation_k(&self) -> f64 {
        self.activation_k
    }

    /// Dark current in electrons/pixel/second at `temperature`
    pub fn estimate_at_temperature(&self, temperature: Temperature) -> f64 {
        let t = temperature.as_kelvin();
        if t <= 0.0 {
            return 0.0;
        }
        self.prefactor * (-self.activation_k / t).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_passes_through_reference_points() {
        let est = DarkCurrentEstimator::ixon_ultra_888();
        assert_relative_eq!(
            est.estimate_at_temperature(Temperature::from_celsius(-80.0)),
            2.5e-4,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            est.estimate_at_temperature(Temperature::from_celsius(-100.0)),
            1.1e-4,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_fit_matches_builtin() {
        let fitted = DarkCurrentEstimator::from_reference_points(
            (Temperature::from_celsius(-80.0), 2.5e-4),
            (Temperature::from_celsius(-100.0), 1.1e-4),
        )
        .unwrap();
        let builtin = DarkCurrentEstimator::ixon_ultra_888();
        assert_relative_eq!(fitted.activation_k(), builtin.activation_k(), max_relative = 1e-12);
    }

    #[test]
    fn test_warmer_is_darker() {
        let est = DarkCurrentEstimator::ixon_ultra_888();
        let cold = est.estimate_at_temperature(Temperature::from_celsius(-100.0));
        let warm = est.estimate_at_temperature(Temperature::from_celsius(-70.0));
        assert!(warm > 2.5e-4);
        assert!(cold < warm);
        assert!(est.activation_k() > 0.0);
    }

    #[test]
    fn test_rejects_degenerate_points() {
        let t = Temperature::from_celsius(-80.0);
        assert!(DarkCurrentEstimator::from_reference_points((t, 1e-4), (t, 2e-4)).is_err());
        assert!(DarkCurrentEstimator::from_reference_points(
            (t, 0.0),
            (Temperature::from_celsius(-90.0), 1e-4)
        )
        .is_err());
    }
}
