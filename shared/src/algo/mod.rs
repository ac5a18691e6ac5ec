//! Array processing helpers shared between the simulator and detection crates.

pub mod parallel;

pub use parallel::process_array_in_parallel_chunks;
