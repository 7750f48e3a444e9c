//! Runtime options for the toolchain and the product-generation pipeline

use crate::constants::{DEFAULT_NUM_WORKERS, SPINUP_DAYS};
use crate::types::Threads;
use std::path::PathBuf;

/// Location of the Julia runtime and the two toolchain projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// Julia executable, looked up on `PATH` when not absolute
    pub julia_executable: String,
    /// Julia project holding the STARS data-fusion code
    pub stars_project_directory: PathBuf,
    /// Data-fusion entry script, relative to the STARS project
    pub fusion_script_name: String,
    /// Julia project holding the VNP43NRT BRDF code
    pub vnp43nrt_project_directory: PathBuf,
    pub brdf_script_name: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            julia_executable: "julia".to_string(),
            stars_project_directory: PathBuf::from("STARS_jl"),
            fusion_script_name: "process_ECOSTRESS_data_fusion_distributed_bias.jl".to_string(),
            vnp43nrt_project_directory: PathBuf::from("VNP43NRT_jl"),
            brdf_script_name: "process_VNP43NRT.jl".to_string(),
        }
    }
}

impl ToolchainConfig {
    /// Defaults, with the project directories taken from
    /// `L2T_STARS_JULIA`, `STARS_JL_DIRECTORY` and `VNP43NRT_JL_DIRECTORY` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(julia) = std::env::var("L2T_STARS_JULIA") {
            config.julia_executable = julia;
        }
        if let Ok(directory) = std::env::var("STARS_JL_DIRECTORY") {
            config.stars_project_directory = PathBuf::from(directory);
        }
        if let Ok(directory) = std::env::var("VNP43NRT_JL_DIRECTORY") {
            config.vnp43nrt_project_directory = PathBuf::from(directory);
        }
        config
    }

    pub fn fusion_script(&self) -> PathBuf {
        self.stars_project_directory.join(&self.fusion_script_name)
    }

    pub fn brdf_script(&self) -> PathBuf {
        self.vnp43nrt_project_directory.join(&self.brdf_script_name)
    }
}

/// Knobs of a product-generation run that are not part of the run-config
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub threads: Threads,
    pub num_workers: usize,
    /// Days of HLS observations before the target date
    pub hls_spinup_days: i64,
    /// Days of VIIRS observations before the target date
    pub viirs_spinup_days: i64,
    pub remove_input_staging: bool,
    pub remove_prior: bool,
    pub remove_posterior: bool,
    pub toolchain: ToolchainConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threads: Threads::Auto,
            num_workers: DEFAULT_NUM_WORKERS,
            hls_spinup_days: SPINUP_DAYS,
            viirs_spinup_days: SPINUP_DAYS,
            remove_input_staging: true,
            remove_prior: true,
            remove_posterior: true,
            toolchain: ToolchainConfig::default(),
        }
    }
}
