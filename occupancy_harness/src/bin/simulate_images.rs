//! Reference and sparse frames for offline detection work
//!
//! Writes a single-atom reference frame and a frame of a filled row, both
//! cropped to the same region, as 16-bit PNGs alongside the options used.

use std::path::PathBuf;

use clap::Parser;
use occupancy_harness::{parse_pair, set_readout_rate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shared::frame_io::save_png_u16;
use simulator::config::FillingMean;
use simulator::{Experiment, ExperimentOptions, Roi, Sensor};

#[derive(Parser, Debug)]
#[command(name = "Simulate Images", about = "Writes reference and sparse tweezer frames")]
struct Args {
    /// Experiment options JSON; built-in defaults when absent
    #[arg(long)]
    options: Option<PathBuf>,

    /// iXon readout rate in Hz
    #[arg(long, default_value_t = 30e6)]
    readout_rate: f64,

    /// Imaging time in seconds for both frames
    #[arg(long, default_value_t = 1e-2)]
    imaging_time: f64,

    /// Sites of the sparse frame as "n_i,n_j"
    #[arg(long, default_value = "10,1", value_parser = parse_pair::<usize>)]
    n_sites: (usize, usize),

    /// Filling of the sparse frame
    #[arg(long, default_value_t = 1.0)]
    filling: f64,

    /// Side length of the square crop, in pixels
    #[arg(long, default_value_t = 50)]
    roi_size: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value = "simulated_images")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut options = match &args.options {
        Some(path) => ExperimentOptions::from_json_file(path)?,
        None => ExperimentOptions::default(),
    };
    set_readout_rate(&mut options, args.readout_rate);
    let roi = Roi::new(0, args.roi_size, 0, args.roi_size);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    std::fs::create_dir_all(&args.output_dir)?;

    let mut reference_options = options.clone();
    reference_options.geometry.n_sites = (1, 1);
    reference_options.atoms.filling.mean = FillingMean::Uniform(1.0);
    let mut reference = Experiment::new(reference_options)?;
    reference.load_atoms(&mut rng)?;
    let frame = reference.image_atoms(&mut rng, args.imaging_time);
    let cropped = reference.sensor().crop(&frame, &roi)?;
    save_png_u16(&args.output_dir.join("atoms_reference.png"), &cropped.image)?;

    let mut sparse_options = options;
    sparse_options.geometry.n_sites = args.n_sites;
    sparse_options.atoms.filling.mean = FillingMean::Uniform(args.filling);
    let mut sparse = Experiment::new(sparse_options)?;
    let truth = sparse.load_atoms(&mut rng)?.clone();
    let frame = sparse.image_atoms(&mut rng, args.imaging_time);
    let cropped = sparse.sensor().crop(&frame, &roi)?;
    save_png_u16(&args.output_dir.join("atoms_sparse.png"), &cropped.image)?;
    save_png_u16(&args.output_dir.join("atoms_sparse_signal.png"), &cropped.signal)?;

    sparse
        .options()
        .save_to_file(&args.output_dir.join("options.json"))?;

    println!("Ground truth:\n{truth}");
    println!("Frames written to {}", args.output_dir.display());
    Ok(())
}
