//! l2t-stars: ECOSTRESS L2T STARS product generation
//!
//! Orchestrates the STARS data fusion that produces the 70 m tiled NDVI and
//! albedo product: run-config handling, prior resolution from the previous
//! granule, invocation of the Julia toolchain and packaging of the output.

pub mod types;
pub mod exit_codes;
pub mod constants;
pub mod daterange;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{LayerKind, StarsError, StarsLayer, StarsResult, Threads, Variable};
pub use config::{PipelineOptions, ToolchainConfig};
pub use daterange::{get_date, parse_date, SpinupWindow};

pub use io::{generate_runconfig, L2TSTARSConfig, RunConfigRequest, SystemProcessRunner};
pub use crate::core::{resolve_prior, run_from_runconfig, run_l2t_stars, DataFusionRequest, FusionInvoker, Prior};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
