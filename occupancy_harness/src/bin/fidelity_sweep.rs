//! Detection fidelity versus imaging time
//!
//! Calibrates a detector from a simulated single-atom frame, then images a
//! partly filled lattice at log-spaced imaging times, several runs each,
//! and writes fidelity, PSNR and detection time per run to CSV.
//!
//! Usage:
//! ```
//! cargo run --release --bin fidelity_sweep -- [OPTIONS]
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use occupancy::{BlobMethod, DetectorOptions};
use occupancy_harness::{
    calibrate_detector, log_spaced, parse_pair, set_readout_rate, summarize, SweepConfig,
    TrialResult, TrialRunner,
};
use rayon::prelude::*;
use simulator::config::FillingMean;
use simulator::{ExperimentOptions, Roi};

/// Default filename for sweep results CSV
const DEFAULT_CSV_FILENAME: &str = "fidelity_sweep_YYYYMMDD_HHMMSS.csv";

fn parse_method(s: &str) -> Result<BlobMethod, String> {
    match s.to_ascii_lowercase().as_str() {
        "dog" => Ok(BlobMethod::Dog),
        "log" => Ok(BlobMethod::Log),
        _ => Err(format!("unknown blob method '{s}', expected dog or log")),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "Fidelity Sweep",
    about = "Scores occupancy detection across imaging times",
    long_about = None
)]
struct Args {
    /// Experiment options JSON; built-in defaults when absent
    #[arg(long)]
    options: Option<PathBuf>,

    /// Lattice sites as "n_i,n_j"
    #[arg(long, default_value = "10,10", value_parser = parse_pair::<usize>)]
    n_sites: (usize, usize),

    /// Mean filling probability per site
    #[arg(long, default_value_t = 0.5)]
    filling: f64,

    /// Shortest imaging time in seconds
    #[arg(long, default_value_t = 1e-5)]
    min_time: f64,

    /// Longest imaging time in seconds
    #[arg(long, default_value_t = 1e-3)]
    max_time: f64,

    /// Number of log-spaced imaging times
    #[arg(long, default_value_t = 50)]
    n_times: usize,

    /// Runs per imaging time
    #[arg(long, default_value_t = 20)]
    runs: usize,

    /// Side length of the square crop at the sensor origin, in pixels
    #[arg(long, default_value_t = 50)]
    roi_size: usize,

    /// Imaging time of the calibration frame in seconds
    #[arg(long, default_value_t = 0.1)]
    reference_time: f64,

    /// Readout rate override in Hz for the iXon model
    #[arg(long)]
    readout_rate: Option<f64>,

    /// Blob method (dog or log)
    #[arg(long, default_value = "dog", value_parser = parse_method)]
    method: BlobMethod,

    #[arg(long, default_value_t = 1.0)]
    min_sigma: f64,

    #[arg(long, default_value_t = 1.0)]
    max_sigma: f64,

    /// Detection threshold on the normalized response
    #[arg(long, default_value_t = 0.01)]
    threshold: f64,

    #[arg(long)]
    exclude_border: bool,

    /// Normalization floor in dark-frame standard deviations (0 disables)
    #[arg(long, default_value_t = 100.0)]
    noise_floor_sigmas: f64,

    /// Base random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Run trials serially instead of in parallel
    #[arg(long, default_value_t = false)]
    serial: bool,

    /// Output CSV file for trial results
    #[arg(short, long, default_value = DEFAULT_CSV_FILENAME)]
    output_csv: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut options = match &args.options {
        Some(path) => ExperimentOptions::from_json_file(path)?,
        None => ExperimentOptions::default(),
    };
    options.geometry.n_sites = args.n_sites;
    options.atoms.filling.mean = FillingMean::Uniform(args.filling);
    if let Some(rate) = args.readout_rate {
        set_readout_rate(&mut options, rate);
    }
    options.validate()?;

    let config = SweepConfig {
        imaging_times_s: log_spaced(args.min_time, args.max_time, args.n_times),
        runs: args.runs,
        roi: Roi::new(0, args.roi_size, 0, args.roi_size),
        base_seed: args.seed,
        reference_imaging_time_s: args.reference_time,
        detector: DetectorOptions {
            method: args.method,
            min_sigma: args.min_sigma,
            max_sigma: args.max_sigma,
            threshold: args.threshold,
            exclude_border: args.exclude_border,
            ..DetectorOptions::default()
        },
        psnr_offset_counts: 0.0,
        noise_floor_sigmas: args.noise_floor_sigmas,
        serial: args.serial,
    };
    config.detector.validate()?;

    println!("Fidelity Sweep");
    println!("==============");
    println!("Lattice: {}x{}", args.n_sites.0, args.n_sites.1);
    println!("Filling: {}", args.filling);
    println!(
        "Imaging times: {} from {:.2e} s to {:.2e} s",
        args.n_times, args.min_time, args.max_time
    );
    println!("Runs per time: {}", args.runs);

    let detector = calibrate_detector(&options, &config)?;
    let runner = TrialRunner {
        options: &options,
        config: &config,
        detector: &detector,
    };

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output_filename = args.output_csv.replace("YYYYMMDD_HHMMSS", &timestamp);
    println!("\nOutput CSV: {output_filename}");

    let pb = ProgressBar::new(config.unit_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Running trials");

    let units = config.units();
    let results: Result<Vec<TrialResult>, _> = if config.serial {
        units
            .iter()
            .map(|&(t, r)| {
                pb.inc(1);
                runner.run(t, r)
            })
            .collect()
    } else {
        units
            .par_iter()
            .map(|&(t, r)| {
                pb.inc(1);
                runner.run(t, r)
            })
            .collect()
    };
    pb.finish_with_message("Trials complete!");
    let results = results?;

    let mut file = BufWriter::new(File::create(&output_filename)?);
    TrialResult::write_csv_header(&mut file)?;
    for result in &results {
        result.write_csv_row(&mut file)?;
    }
    file.flush()?;

    println!(
        "\n{:>12} {:>10} {:>10} {:>10} {:>12}",
        "time (s)", "fidelity", "std", "psnr (dB)", "detect (ms)"
    );
    for row in summarize(&results) {
        println!(
            "{:>12.3e} {:>10.4} {:>10.4} {:>10.2} {:>12.3}",
            row.imaging_time_s,
            row.fidelity_mean,
            row.fidelity_std,
            row.psnr_mean,
            row.detection_time_mean_s * 1e3
        );
    }

    Ok(())
}
