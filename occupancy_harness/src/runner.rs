//! Imaging-time sweeps of the simulate, detect and score loop.
//!
//! Every unit of work is one `(imaging time, run)` pair. Units share only
//! the calibrated [`Detector`] (read-only) and draw from their own ChaCha
//! stream, so a sweep gives the same numbers serial or parallel.

use std::io::Write;
use std::time::Instant;

use log::{debug, info};
use occupancy::evaluation::{false_positive_rate, fidelity, psnr};
use occupancy::{Detector, DetectorOptions};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use simulator::config::FillingMean;
use simulator::{Experiment, ExperimentOptions, Roi, Sensor};

use crate::error::{HarnessError, Result};

/// `n` values spaced evenly in log10 between `start` and `stop`
pub fn log_spaced(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let (a, b) = (start.log10(), stop.log10());
            (0..n)
                .map(|i| 10f64.powf(a + (b - a) * i as f64 / (n - 1) as f64))
                .collect()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub imaging_times_s: Vec<f64>,
    pub runs: usize,
    /// Region every frame is cropped to before detection
    pub roi: Roi,
    pub base_seed: u64,
    /// Exposure of the single-atom calibration frame
    pub reference_imaging_time_s: f64,
    pub detector: DetectorOptions,
    /// Counts subtracted before computing PSNR
    pub psnr_offset_counts: f64,
    /// Normalization floor in dark-frame standard deviations; zero skips
    /// dark calibration
    pub noise_floor_sigmas: f64,
    pub serial: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            imaging_times_s: log_spaced(1e-5, 1e-3, 50),
            runs: 20,
            roi: Roi::new(0, 50, 0, 50),
            base_seed: 0,
            reference_imaging_time_s: 0.1,
            detector: DetectorOptions::default(),
            psnr_offset_counts: 0.0,
            noise_floor_sigmas: 100.0,
            serial: false,
        }
    }
}

impl SweepConfig {
    pub fn unit_count(&self) -> usize {
        self.imaging_times_s.len() * self.runs
    }

    /// All `(time_index, run)` pairs, time-major
    pub fn units(&self) -> Vec<(usize, usize)> {
        (0..self.imaging_times_s.len())
            .flat_map(|t| (0..self.runs).map(move |r| (t, r)))
            .collect()
    }

    /// Independent generator for one unit of work
    pub fn trial_rng(&self, time_index: usize, run: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.base_seed);
        rng.set_stream((time_index * self.runs + run) as u64 + 1);
        rng
    }
}

/// Scores of one imaging trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub time_index: usize,
    pub run: usize,
    pub imaging_time_s: f64,
    pub fidelity: f64,
    pub false_positive_rate: f64,
    pub psnr: f64,
    pub detection_time_s: f64,
    pub blobs: usize,
    pub dropped: usize,
    pub true_filling: f64,
}

impl TrialResult {
    pub fn write_csv_header(out: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            out,
            "time_index,run,imaging_time_s,fidelity,false_positive_rate,psnr_db,\
            detection_time_s,blobs,dropped,true_filling"
        )
    }

    pub fn write_csv_row(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            out,
            "{},{},{:.6e},{:.4},{:.4},{:.3},{:.6},{},{},{:.3}",
            self.time_index,
            self.run,
            self.imaging_time_s,
            self.fidelity,
            self.false_positive_rate,
            self.psnr,
            self.detection_time_s,
            self.blobs,
            self.dropped,
            self.true_filling
        )
    }
}

/// Mean and spread of all runs at one imaging time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSummary {
    pub time_index: usize,
    pub imaging_time_s: f64,
    pub runs: usize,
    pub fidelity_mean: f64,
    pub fidelity_std: f64,
    pub psnr_mean: f64,
    pub psnr_std: f64,
    pub detection_time_mean_s: f64,
    pub detection_time_std_s: f64,
}

/// Population mean and standard deviation
fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

/// Aggregate results per imaging time, ordered by time index.
pub fn summarize(results: &[TrialResult]) -> Vec<TimeSummary> {
    let Some(last) = results.iter().map(|r| r.time_index).max() else {
        return Vec::new();
    };
    (0..=last)
        .filter_map(|t| {
            let group: Vec<&TrialResult> = results.iter().filter(|r| r.time_index == t).collect();
            let first = group.first()?;
            let (fidelity_mean, fidelity_std) = mean_std(group.iter().map(|r| r.fidelity));
            let (psnr_mean, psnr_std) = mean_std(group.iter().map(|r| r.psnr));
            let (detection_time_mean_s, detection_time_std_s) =
                mean_std(group.iter().map(|r| r.detection_time_s));
            Some(TimeSummary {
                time_index: t,
                imaging_time_s: first.imaging_time_s,
                runs: group.len(),
                fidelity_mean,
                fidelity_std,
                psnr_mean,
                psnr_std,
                detection_time_mean_s,
                detection_time_std_s,
            })
        })
        .collect()
}

/// Options for the one-site, always-filled calibration experiment
pub fn reference_options(options: &ExperimentOptions) -> ExperimentOptions {
    let mut reference = options.clone();
    reference.geometry.n_sites = (1, 1);
    reference.atoms.filling.mean = FillingMean::Uniform(1.0);
    reference
}

/// Image a single atom and calibrate a detector from it.
///
/// Unless `noise_floor_sigmas` is zero, an atom-free frame taken first sets
/// the detector background and normalization floor.
pub fn calibrate_detector(options: &ExperimentOptions, config: &SweepConfig) -> Result<Detector> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.base_seed);
    let mut reference = Experiment::new(reference_options(options))?;
    let (sx, sy) = reference.spacing_px();
    let mut detector = Detector::new();
    detector.set_spacing(sx, sy)?;

    if config.noise_floor_sigmas > 0.0 {
        let dark = reference.image_atoms(&mut rng, config.reference_imaging_time_s);
        let dark = reference.sensor().crop(&dark, &config.roi)?;
        detector.calibrate_dark(
            &dark.image.view(),
            &dark.signal.view(),
            config.noise_floor_sigmas,
        )?;
    }

    reference.load_atoms(&mut rng)?;
    let frame = reference.image_atoms(&mut rng, config.reference_imaging_time_s);
    let cropped = reference.sensor().crop(&frame, &config.roi)?;
    detector.set_reference(&cropped.image.view())?;
    info!(
        "calibrated: spacing ({sx:.3}, {sy:.3}) px, reference at {:?}",
        detector.reference_px()
    );
    Ok(detector)
}

/// One sweep unit with a fixed detector
pub struct TrialRunner<'a> {
    pub options: &'a ExperimentOptions,
    pub config: &'a SweepConfig,
    pub detector: &'a Detector,
}

impl TrialRunner<'_> {
    pub fn run(&self, time_index: usize, run: usize) -> Result<TrialResult> {
        let imaging_time_s = *self
            .config
            .imaging_times_s
            .get(time_index)
            .ok_or_else(|| HarnessError::InvalidSweep(format!("no imaging time {time_index}")))?;
        let mut rng = self.config.trial_rng(time_index, run);

        let mut experiment = Experiment::new(self.options.clone())?;
        let truth = experiment.load_atoms(&mut rng)?.clone();
        let frame = experiment.image_atoms(&mut rng, imaging_time_s);
        let cropped = experiment.sensor().crop(&frame, &self.config.roi)?;

        let start = Instant::now();
        let detection = self.detector.locate(
            &cropped.image.view(),
            &self.config.detector,
            self.options.geometry.n_sites,
        )?;
        let detection_time_s = start.elapsed().as_secs_f64();

        let result = TrialResult {
            time_index,
            run,
            imaging_time_s,
            fidelity: fidelity(&detection.mask, &truth)?,
            false_positive_rate: false_positive_rate(&detection.mask, &truth)?,
            psnr: psnr(
                &cropped.signal.view(),
                &cropped.image.view(),
                self.config.psnr_offset_counts,
            )?,
            detection_time_s,
            blobs: detection.blobs.len(),
            dropped: detection.dropped,
            true_filling: truth.filling_fraction(),
        };
        debug!(
            "t={:.3e} s run {}: fidelity {:.3}, {} blobs",
            imaging_time_s, run, result.fidelity, result.blobs
        );
        Ok(result)
    }
}

/// Calibrate, then run every unit of the sweep.
pub fn run_sweep(options: &ExperimentOptions, config: &SweepConfig) -> Result<Vec<TrialResult>> {
    if config.runs == 0 || config.imaging_times_s.is_empty() {
        return Err(HarnessError::InvalidSweep(
            "need at least one imaging time and one run".to_string(),
        ));
    }
    options.validate()?;
    let detector = calibrate_detector(options, config)?;
    let runner = TrialRunner {
        options,
        config,
        detector: &detector,
    };

    let units = config.units();
    if config.serial {
        units.iter().map(|&(t, r)| runner.run(t, r)).collect()
    } else {
        units.par_iter().map(|&(t, r)| runner.run(t, r)).collect()
    }
}
