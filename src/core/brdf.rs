//! Invocation of the VNP43NRT BRDF toolchain

use crate::config::ToolchainConfig;
use crate::core::environment::{derive_environment, process_environment, Environment};
use crate::io::process::{ExitStatus, ProcessCommand, ProcessRunner};
use crate::types::{StarsError, StarsResult, Threads};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// BRDF retrieval for one band over one sinusoidal tile
#[derive(Debug, Clone)]
pub struct BrdfRequest {
    pub band: String,
    pub h: u32,
    pub v: u32,
    pub tile_width_cells: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reflectance_directory: PathBuf,
    pub solar_zenith_directory: PathBuf,
    pub sensor_zenith_directory: PathBuf,
    pub relative_azimuth_directory: PathBuf,
    pub sza_filename: PathBuf,
    pub output_directory: PathBuf,
    /// Instantiate the Julia project before running
    pub initialize_julia: bool,
    pub threads: Threads,
}

impl BrdfRequest {
    fn validate(&self) -> StarsResult<()> {
        if self.band.is_empty() {
            return Err(StarsError::MissingArgument("band".to_string()));
        }
        if self.h > 35 || self.v > 17 {
            return Err(StarsError::InvalidArgument(format!(
                "sinusoidal tile h{:02}v{:02} out of range",
                self.h, self.v
            )));
        }
        if self.end_date < self.start_date {
            return Err(StarsError::InvalidArgument(format!(
                "BRDF window ends ({}) before it starts ({})",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Builds and launches VNP43NRT BRDF runs
pub struct BrdfInvoker<R: ProcessRunner> {
    runner: R,
    toolchain: ToolchainConfig,
    base_environment: Option<Environment>,
}

impl<R: ProcessRunner> BrdfInvoker<R> {
    pub fn new(runner: R, toolchain: ToolchainConfig) -> Self {
        Self {
            runner,
            toolchain,
            base_environment: None,
        }
    }

    pub fn with_base_environment(mut self, env: Environment) -> Self {
        self.base_environment = Some(env);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn environment(&self, threads: Threads) -> Environment {
        let base = match &self.base_environment {
            Some(env) => env.clone(),
            None => process_environment(),
        };
        derive_environment(&base, threads)
    }

    fn project_flag(&self) -> String {
        format!("--project={}", self.toolchain.vnp43nrt_project_directory.display())
    }

    /// `julia --project=<VNP43NRT> -e "using Pkg; Pkg.instantiate()"`
    pub fn instantiate_command(&self, threads: Threads) -> ProcessCommand {
        ProcessCommand::new(&self.toolchain.julia_executable)
            .arg(self.project_flag())
            .arg("-e")
            .arg("using Pkg; Pkg.instantiate()")
            .envs(self.environment(threads))
    }

    pub fn build_command(&self, request: &BrdfRequest) -> StarsResult<ProcessCommand> {
        request.validate()?;

        Ok(ProcessCommand::new(&self.toolchain.julia_executable)
            .arg(self.project_flag())
            .arg(path_arg(&self.toolchain.brdf_script()))
            .arg(request.band.clone())
            .arg(request.h.to_string())
            .arg(request.v.to_string())
            .arg(request.tile_width_cells.to_string())
            .arg(request.start_date.format("%Y-%m-%d").to_string())
            .arg(request.end_date.format("%Y-%m-%d").to_string())
            .arg(path_arg(&request.reflectance_directory))
            .arg(path_arg(&request.solar_zenith_directory))
            .arg(path_arg(&request.sensor_zenith_directory))
            .arg(path_arg(&request.relative_azimuth_directory))
            .arg(path_arg(&request.sza_filename))
            .arg(path_arg(&request.output_directory))
            .envs(self.environment(request.threads)))
    }

    /// Run the BRDF retrieval, blocking until it exits
    ///
    /// The status of the optional project instantiation is logged and ignored.
    pub fn invoke(&self, request: &BrdfRequest) -> StarsResult<ExitStatus> {
        let command = self.build_command(request)?;

        if request.initialize_julia {
            let status = self.runner.run(&self.instantiate_command(request.threads))?;
            if !status.success() {
                log::warn!("VNP43NRT project instantiation exited with {:?}", status);
            }
        }

        log::info!(
            "VNP43NRT BRDF band {} h{:02}v{:02} {}..{}",
            request.band,
            request.h,
            request.v,
            request.start_date,
            request.end_date
        );
        self.runner.run(&command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::process::RecordingProcessRunner;

    fn request() -> BrdfRequest {
        BrdfRequest {
            band: "red".to_string(),
            h: 8,
            v: 5,
            tile_width_cells: 1200,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            reflectance_directory: PathBuf::from("/tmp/reflectance"),
            solar_zenith_directory: PathBuf::from("/tmp/solar"),
            sensor_zenith_directory: PathBuf::from("/tmp/sensor"),
            relative_azimuth_directory: PathBuf::from("/tmp/ra"),
            sza_filename: PathBuf::from("/tmp/sza.tif"),
            output_directory: PathBuf::from("/tmp/output"),
            initialize_julia: false,
            threads: Threads::Auto,
        }
    }

    #[test]
    fn test_reversed_window_rejected() {
        let mut req = request();
        req.end_date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let invoker = BrdfInvoker::new(RecordingProcessRunner::new(), ToolchainConfig::default());
        assert!(invoker.invoke(&req).is_err());
        assert!(invoker.runner().calls().is_empty());
    }

    #[test]
    fn test_initialize_runs_instantiate_first() {
        let mut req = request();
        req.initialize_julia = true;
        let invoker = BrdfInvoker::new(RecordingProcessRunner::new(), ToolchainConfig::default())
            .with_base_environment(Environment::new());
        invoker.runner().push_response(ExitStatus::Failed(1));

        let status = invoker.invoke(&req).unwrap();
        assert!(status.success());

        let calls = invoker.runner().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args[1], "-e");
        assert_eq!(calls[0].args[2], "using Pkg; Pkg.instantiate()");
        assert_eq!(calls[1].args[2], "red");
    }
}
