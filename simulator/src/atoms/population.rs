//! Stochastic loading of tweezer sites.
//!
//! Each site draws an occupancy count independently from the configured
//! distribution, then occupied sites are expanded into one [`Atom`] per
//! count at the site position.

use std::collections::BTreeMap;

use log::debug;
use rand::Rng;
use rand_distr::{Binomial, Distribution};
use serde::{Deserialize, Serialize};
use shared::image_proc::noise::{sample_normal, sample_poisson};

use crate::config::FillingOptions;
use crate::error::{Result, SimulationError};

/// Discrete distribution of atoms per site
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillingDistribution {
    /// `trials` independent loading attempts with probability `mean` each
    Binomial { trials: u64 },
    Poisson,
    /// Normal with standard deviation `width * sqrt(mean)`, floored and
    /// clipped at zero
    ClippedNormal { width: f64 },
}

impl FillingDistribution {
    /// Resolve a configured distribution name and its extra parameters.
    ///
    /// Unknown names and parameters are rejected rather than ignored.
    pub fn from_name(name: &str, parameters: &BTreeMap<String, f64>) -> Result<Self> {
        let reject = |parameter: &str| SimulationError::UnknownDistributionParameter {
            distribution: name.to_string(),
            parameter: parameter.to_string(),
        };

        match name {
            "binomial" | "bernoulli" => {
                let mut trials = 1;
                for (key, &value) in parameters {
                    match key.as_str() {
                        "trials" | "n" => {
                            if !(value >= 1.0) || value.fract() != 0.0 {
                                return Err(SimulationError::invalid(
                                    "atoms.filling.parameters.trials",
                                    format!("must be a positive integer, got {value}"),
                                ));
                            }
                            trials = value as u64;
                        }
                        other => return Err(reject(other)),
                    }
                }
                Ok(Self::Binomial { trials })
            }
            "poisson" => match parameters.keys().next() {
                Some(key) => Err(reject(key)),
                None => Ok(Self::Poisson),
            },
            "clipped_normal" | "normal" => {
                let mut width = 1.0;
                for (key, &value) in parameters {
                    match key.as_str() {
                        "width" => {
                            if !(value >= 0.0) || !value.is_finite() {
                                return Err(SimulationError::invalid(
                                    "atoms.filling.parameters.width",
                                    format!("must be non-negative, got {value}"),
                                ));
                            }
                            width = value;
                        }
                        other => return Err(reject(other)),
                    }
                }
                Ok(Self::ClippedNormal { width })
            }
            other => Err(SimulationError::UnknownDistribution(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Binomial { .. } => "binomial",
            Self::Poisson => "poisson",
            Self::ClippedNormal { .. } => "clipped_normal",
        }
    }

    pub fn validate_mean(&self, mean: f64) -> Result<()> {
        let ok = match self {
            Self::Binomial { .. } => (0.0..=1.0).contains(&mean),
            Self::Poisson | Self::ClippedNormal { .. } => mean >= 0.0 && mean.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(SimulationError::invalid(
                "atoms.filling.mean",
                format!("{mean} is outside the domain of the {} distribution", self.name()),
            ))
        }
    }

    /// Draw one occupancy count. `mean` must already be validated.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, mean: f64) -> u32 {
        match *self {
            Self::Binomial { trials } => match Binomial::new(trials, mean) {
                Ok(dist) => dist.sample(rng) as u32,
                Err(_) => 0,
            },
            Self::Poisson => sample_poisson(rng, mean) as u32,
            Self::ClippedNormal { width } => {
                if mean <= 0.0 {
                    return 0;
                }
                sample_normal(rng, mean, width * mean.sqrt()).floor().max(0.0) as u32
            }
        }
    }
}

/// Expected filling, uniform or per site in lattice enumeration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillingMean {
    Uniform(f64),
    PerSite(Vec<f64>),
}

impl FillingMean {
    fn values(&self) -> &[f64] {
        match self {
            Self::Uniform(mean) => std::slice::from_ref(mean),
            Self::PerSite(means) => means,
        }
    }

    fn at(&self, site: usize) -> f64 {
        match self {
            Self::Uniform(mean) => *mean,
            Self::PerSite(means) => means.get(site).copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    pub x: f64,
    pub y: f64,
    /// Flat site index in lattice enumeration order
    pub site: usize,
}

/// Outcome of one load cycle
#[derive(Debug, Clone, Default)]
pub struct Loading {
    pub occupancy: Vec<u32>,
    pub atoms: Vec<Atom>,
}

impl Loading {
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }
}

#[derive(Debug, Clone)]
pub struct AtomPopulation {
    distribution: FillingDistribution,
    mean: FillingMean,
}

impl AtomPopulation {
    pub fn new(distribution: FillingDistribution, mean: FillingMean) -> Result<Self> {
        for &value in mean.values() {
            distribution.validate_mean(value)?;
        }
        Ok(Self { distribution, mean })
    }

    pub fn from_options(options: &FillingOptions) -> Result<Self> {
        let distribution =
            FillingDistribution::from_name(&options.distribution, &options.parameters)?;
        Self::new(distribution, options.mean.clone())
    }

    pub fn distribution(&self) -> FillingDistribution {
        self.distribution
    }

    /// Draw occupancy for every site and expand it into atoms.
    pub fn load_atoms<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        site_positions: &[(f64, f64)],
    ) -> Result<Loading> {
        if let FillingMean::PerSite(means) = &self.mean {
            if means.len() != site_positions.len() {
                return Err(SimulationError::FillingLength {
                    expected: site_positions.len(),
                    actual: means.len(),
                });
            }
        }

        let occupancy: Vec<u32> = (0..site_positions.len())
            .map(|site| self.distribution.sample(rng, self.mean.at(site)))
            .collect();

        let atoms: Vec<Atom> = site_positions
            .iter()
            .zip(&occupancy)
            .enumerate()
            .flat_map(|(site, (&(x, y), &count))| {
                (0..count).map(move |_| Atom { x, y, site })
            })
            .collect();

        debug!(
            "loaded {} atoms into {} of {} sites ({})",
            atoms.len(),
            occupancy.iter().filter(|&&c| c > 0).count(),
            site_positions.len(),
            self.distribution.name()
        );

        Ok(Loading { occupancy, atoms })
    }
}
