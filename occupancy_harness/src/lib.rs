//! Harness for exercising tweezer occupancy detection against simulation.
//!
//! Bridges the `simulator` and `occupancy` crates: calibrates a detector
//! from a simulated single-atom frame, then sweeps imaging time and scores
//! the recovered occupancy against ground truth.

pub mod error;
pub mod runner;

pub use error::{HarnessError, Result};
pub use runner::{
    calibrate_detector, log_spaced, run_sweep, summarize, SweepConfig, TimeSummary, TrialResult,
    TrialRunner,
};

use simulator::config::CameraModel;
use simulator::ExperimentOptions;

/// Switch an iXon camera to another readout rate; other models are left alone.
pub fn set_readout_rate(options: &mut ExperimentOptions, readout_rate_hz: f64) {
    if let CameraModel::IxonUltra888(ixon) = &mut options.camera.model {
        ixon.readout_rate_hz = readout_rate_hz;
    }
}

/// Parse `"a,b"` into a pair.
pub fn parse_pair<T: std::str::FromStr>(s: &str) -> std::result::Result<(T, T), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("expected 'a,b', got '{s}'"));
    }
    let parse = |p: &str| {
        p.trim()
            .parse::<T>()
            .map_err(|_| format!("invalid value '{}'", p.trim()))
    };
    Ok((parse(parts[0])?, parse(parts[1])?))
}
