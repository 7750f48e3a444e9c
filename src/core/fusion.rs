//! Invocation of the STARS data-fusion toolchain

use crate::config::ToolchainConfig;
use crate::constants::DEFAULT_NUM_WORKERS;
use crate::core::environment::{derive_environment, process_environment, Environment};
use crate::core::prior::complete_group;
use crate::io::filenames::generate_fusion_input_directories;
use crate::io::process::{ExitStatus, ProcessCommand, ProcessRunner};
use crate::types::{StarsError, StarsResult, Threads};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// One run of the data-fusion toolchain for a single product
#[derive(Debug, Clone)]
pub struct DataFusionRequest {
    pub tile: String,
    pub coarse_cell_size: u32,
    pub fine_cell_size: u32,
    pub viirs_start_date: NaiveDate,
    pub viirs_end_date: NaiveDate,
    pub hls_start_date: NaiveDate,
    pub hls_end_date: NaiveDate,
    pub downsampled_directory: PathBuf,
    pub product_name: String,
    pub posterior_filename: PathBuf,
    pub posterior_uq_filename: PathBuf,
    pub posterior_flag_filename: PathBuf,
    pub posterior_bias_filename: PathBuf,
    pub posterior_bias_uq_filename: PathBuf,
    pub prior_filename: Option<PathBuf>,
    pub prior_uq_filename: Option<PathBuf>,
    pub prior_bias_filename: Option<PathBuf>,
    pub prior_bias_uq_filename: Option<PathBuf>,
    pub threads: Threads,
    pub num_workers: usize,
}

impl DataFusionRequest {
    /// Request with no prior, automatic threading and the default worker count
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tile: &str,
        coarse_cell_size: u32,
        fine_cell_size: u32,
        viirs_start_date: NaiveDate,
        viirs_end_date: NaiveDate,
        hls_start_date: NaiveDate,
        hls_end_date: NaiveDate,
        downsampled_directory: PathBuf,
        product_name: &str,
        posterior: [PathBuf; 5],
    ) -> Self {
        let [posterior_filename, posterior_uq_filename, posterior_flag_filename, posterior_bias_filename, posterior_bias_uq_filename] =
            posterior;
        Self {
            tile: tile.to_string(),
            coarse_cell_size,
            fine_cell_size,
            viirs_start_date,
            viirs_end_date,
            hls_start_date,
            hls_end_date,
            downsampled_directory,
            product_name: product_name.to_string(),
            posterior_filename,
            posterior_uq_filename,
            posterior_flag_filename,
            posterior_bias_filename,
            posterior_bias_uq_filename,
            prior_filename: None,
            prior_uq_filename: None,
            prior_bias_filename: None,
            prior_bias_uq_filename: None,
            threads: Threads::Auto,
            num_workers: DEFAULT_NUM_WORKERS,
        }
    }

    pub fn with_prior(mut self, value: PathBuf, uncertainty: PathBuf, bias: PathBuf, bias_uncertainty: PathBuf) -> Self {
        self.prior_filename = Some(value);
        self.prior_uq_filename = Some(uncertainty);
        self.prior_bias_filename = Some(bias);
        self.prior_bias_uq_filename = Some(bias_uncertainty);
        self
    }

    pub fn with_threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    fn posterior_paths(&self) -> [(&'static str, &Path); 5] {
        [
            ("posterior_filename", self.posterior_filename.as_path()),
            ("posterior_UQ_filename", self.posterior_uq_filename.as_path()),
            ("posterior_flag_filename", self.posterior_flag_filename.as_path()),
            ("posterior_bias_filename", self.posterior_bias_filename.as_path()),
            ("posterior_bias_UQ_filename", self.posterior_bias_uq_filename.as_path()),
        ]
    }

    /// Prior paths to pass on, only when all four are given and exist on disk
    pub fn eligible_prior(&self) -> Option<[&Path; 4]> {
        let group = complete_group([
            self.prior_filename.as_deref(),
            self.prior_uq_filename.as_deref(),
            self.prior_bias_filename.as_deref(),
            self.prior_bias_uq_filename.as_deref(),
        ])?;

        if let Some(missing) = group.iter().find(|path| !path.exists()) {
            log::info!("prior file {} does not exist, running without prior", missing.display());
            return None;
        }
        Some(group)
    }

    fn validate(&self) -> StarsResult<()> {
        if self.tile.is_empty() {
            return Err(StarsError::MissingArgument("tile".to_string()));
        }
        for (name, path) in self.posterior_paths() {
            if path.as_os_str().is_empty() {
                return Err(StarsError::MissingArgument(name.to_string()));
            }
        }
        if self.coarse_cell_size == 0 || self.fine_cell_size == 0 {
            return Err(StarsError::InvalidArgument("cell sizes must be positive".to_string()));
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Builds and launches data-fusion runs
pub struct FusionInvoker<R: ProcessRunner> {
    runner: R,
    toolchain: ToolchainConfig,
    base_environment: Option<Environment>,
}

impl<R: ProcessRunner> FusionInvoker<R> {
    pub fn new(runner: R, toolchain: ToolchainConfig) -> Self {
        Self {
            runner,
            toolchain,
            base_environment: None,
        }
    }

    /// Use `env` instead of the process environment as the base for the child's environment
    pub fn with_base_environment(mut self, env: Environment) -> Self {
        self.base_environment = Some(env);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Command line and environment for a request, without launching anything
    pub fn build_command(&self, request: &DataFusionRequest) -> StarsResult<ProcessCommand> {
        request.validate()?;

        let base = match &self.base_environment {
            Some(env) => env.clone(),
            None => process_environment(),
        };
        let env = derive_environment(&base, request.threads);

        let (coarse_directory, fine_directory) =
            generate_fusion_input_directories(&request.downsampled_directory, &request.product_name);

        let mut args = vec![
            "--project=@.".to_string(),
            // relative to the project directory the child runs in
            self.toolchain.fusion_script_name.clone(),
            request.tile.clone(),
            request.coarse_cell_size.to_string(),
            request.fine_cell_size.to_string(),
            request.num_workers.to_string(),
            request.viirs_start_date.format("%Y-%m-%d").to_string(),
            request.viirs_end_date.format("%Y-%m-%d").to_string(),
            request.hls_start_date.format("%Y-%m-%d").to_string(),
            request.hls_end_date.format("%Y-%m-%d").to_string(),
            path_arg(&coarse_directory),
            path_arg(&fine_directory),
        ];
        args.extend(request.posterior_paths().iter().map(|(_, path)| path_arg(path)));

        match request.eligible_prior() {
            Some(prior) => {
                log::info!("passing prior to data fusion for {}", request.product_name);
                args.extend(prior.iter().map(|path| path_arg(path)));
            }
            None => log::info!("no prior passed to data fusion for {}", request.product_name),
        }

        Ok(ProcessCommand::new(&self.toolchain.julia_executable)
            .args(args)
            .envs(env)
            .current_dir(self.toolchain.stars_project_directory.clone()))
    }

    /// Launch the toolchain and block until it exits
    ///
    /// A non-zero exit is returned as a status for the caller to interpret.
    /// Failure to start the executable is returned as [`StarsError::Launch`].
    pub fn invoke(&self, request: &DataFusionRequest) -> StarsResult<ExitStatus> {
        let command = self.build_command(request)?;
        log::info!(
            "data fusion {} tile {} coarse {}m fine {}m VIIRS {}..{} HLS {}..{}",
            request.product_name,
            request.tile,
            request.coarse_cell_size,
            request.fine_cell_size,
            request.viirs_start_date,
            request.viirs_end_date,
            request.hls_start_date,
            request.hls_end_date
        );
        self.runner.run(&command)
    }
}
