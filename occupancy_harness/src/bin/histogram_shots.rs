//! Repeated shots of a sparse row for count histograms
//!
//! Loads and images a half-filled row of widely spaced sites many times,
//! storing every cropped frame with its ground truth as a JSON batch and
//! the per-pixel mean as a 16-bit PNG.

use std::path::PathBuf;

use clap::Parser;
use indicatif::ProgressBar;
use occupancy_harness::{parse_pair, set_readout_rate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shared::frame_io::{save_png_u16, ShotBatch};
use shared::occupancy_mask::MaskRecord;
use simulator::config::FillingMean;
use simulator::{Experiment, ExperimentOptions, Roi, Sensor};

#[derive(Parser, Debug)]
#[command(name = "Histogram Shots", about = "Generates repeated shots for count histograms")]
struct Args {
    /// Number of shots
    #[arg(long, default_value_t = 50)]
    shots: usize,

    /// Imaging time per shot in seconds
    #[arg(long, default_value_t = 5e-3)]
    imaging_time: f64,

    /// iXon readout rate in Hz
    #[arg(long, default_value_t = 1e6)]
    readout_rate: f64,

    /// Lattice sites as "n_i,n_j"
    #[arg(long, default_value = "10,1", value_parser = parse_pair::<usize>)]
    n_sites: (usize, usize),

    /// Site spacing in metres as "x,y"
    #[arg(long, default_value = "24e-6,24e-6", value_parser = parse_pair::<f64>)]
    spacing: (f64, f64),

    /// Pixel position of the lattice origin as "x,y"
    #[arg(long, default_value = "25,25", value_parser = parse_pair::<f64>)]
    position: (f64, f64),

    /// Crop as "width,height" from the sensor origin
    #[arg(long, default_value = "250,50", value_parser = parse_pair::<usize>)]
    roi: (usize, usize),

    #[arg(long, default_value_t = 0.5)]
    filling: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output directory for the batch and mean image
    #[arg(long, default_value = "histogram_shots")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut options = ExperimentOptions::default();
    set_readout_rate(&mut options, args.readout_rate);
    options.geometry.n_sites = args.n_sites;
    options.geometry.spacing_m = args.spacing;
    options.camera.position_px = args.position;
    options.atoms.filling.mean = FillingMean::Uniform(args.filling);

    let mut experiment = Experiment::new(options)?;
    let roi = Roi::new(0, args.roi.0, 0, args.roi.1);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut batch = ShotBatch::new(args.roi.0, args.roi.1, experiment.sensor().scale_m_per_px());

    let pb = ProgressBar::new(args.shots as u64);
    for _ in 0..args.shots {
        let truth = MaskRecord::from(experiment.load_atoms(&mut rng)?);
        let frame = experiment.image_atoms(&mut rng, args.imaging_time);
        let cropped = experiment.sensor().crop(&frame, &roi)?;
        batch.push(&cropped.image)?;
        batch.truth.push(truth);
        pb.inc(1);
    }
    pb.finish_and_clear();

    std::fs::create_dir_all(&args.output_dir)?;
    let batch_path = args.output_dir.join("shots.json");
    batch.save_to_file(&batch_path)?;

    let mean = batch.mean_frame()?.mapv(|v| v.round().clamp(0.0, u16::MAX as f64) as u16);
    let mean_path = args.output_dir.join("mean.png");
    save_png_u16(&mean_path, &mean)?;

    println!("Wrote {} shots to {}", batch.len(), batch_path.display());
    println!("Mean image: {}", mean_path.display());
    Ok(())
}
