//! Top-level L2T STARS product generation for one tile and date

use crate::config::PipelineOptions;
use crate::constants::{DOWNSAMPLED_DIRECTORY, L2T_STARS_SHORT_NAME, TARGET_RESOLUTION};
use crate::core::fusion::{DataFusionRequest, FusionInvoker};
use crate::core::prior::{resolve_prior, Prior};
use crate::daterange::SpinupWindow;
use crate::exit_codes;
use crate::io::filenames::{
    generate_input_staging_directory, generate_model_state_filename,
    generate_model_state_tile_date_directory,
};
use crate::io::granule::package_granule;
use crate::io::process::ProcessRunner;
use crate::io::runconfig::L2TSTARSConfig;
use crate::types::{LayerKind, StarsError, StarsLayer, StarsResult, Variable};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Sources staged under the sources directory before fusion
const INPUT_SOURCES: [&str; 2] = ["HLS", "VIIRS"];

/// Model-state paths the toolchain writes for one variable, in [`LayerKind::ALL`] order
pub fn posterior_paths(
    model_directory: &Path,
    variable: Variable,
    date_utc: NaiveDate,
    tile: &str,
) -> StarsResult<[PathBuf; 5]> {
    let mut paths = Vec::with_capacity(LayerKind::ALL.len());
    for kind in LayerKind::ALL {
        let layer = StarsLayer::new(variable, kind);
        paths.push(generate_model_state_filename(
            model_directory,
            &layer.state_variable(),
            date_utc,
            tile,
            TARGET_RESOLUTION,
        )?);
    }
    paths
        .try_into()
        .map_err(|_| StarsError::InvalidArgument("posterior layer count mismatch".to_string()))
}

fn create_parent_directories(paths: &[PathBuf]) -> StarsResult<()> {
    for path in paths {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn remove_directory(directory: &Path, label: &str) {
    if !directory.exists() {
        return;
    }
    match std::fs::remove_dir_all(directory) {
        Ok(()) => log::info!("removed {} directory: {}", label, directory.display()),
        Err(e) => log::warn!("unable to remove {} directory {}: {}", label, directory.display(), e),
    }
}

struct FusionWindows {
    hls: SpinupWindow,
    viirs: SpinupWindow,
}

fn fuse_variable<R: ProcessRunner>(
    invoker: &FusionInvoker<R>,
    config: &L2TSTARSConfig,
    options: &PipelineOptions,
    windows: &FusionWindows,
    prior: &Prior,
    variable: Variable,
) -> StarsResult<[PathBuf; 5]> {
    let posterior = posterior_paths(&config.model_directory, variable, config.date_utc, &config.tile)?;
    create_parent_directories(&posterior)?;

    let downsampled_directory = config.working_directory.join(DOWNSAMPLED_DIRECTORY).join(&config.tile);
    let mut request = DataFusionRequest::new(
        &config.tile,
        variable.coarse_cell_size(),
        TARGET_RESOLUTION,
        windows.viirs.start,
        windows.viirs.end,
        windows.hls.start,
        windows.hls.end,
        downsampled_directory,
        variable.name(),
        posterior.clone(),
    )
    .with_threads(options.threads)
    .with_num_workers(options.num_workers);

    if let Some(layers) = prior.layers() {
        let layers = layers.variable(variable);
        request = request.with_prior(
            layers.value.clone(),
            layers.uncertainty.clone(),
            layers.bias.clone(),
            layers.bias_uncertainty.clone(),
        );
    }

    let status = invoker.invoke(&request)?;
    if !status.success() {
        return Err(StarsError::DataFusionFailed {
            variable: variable.name().to_string(),
            code: status.code(),
        });
    }

    if let Some(missing) = posterior.iter().find(|path| !path.exists()) {
        return Err(StarsError::BlankOutput(format!(
            "{} data fusion produced no {}",
            variable.name(),
            missing.display()
        )));
    }

    Ok(posterior)
}

/// Produce the L2T STARS granule described by `config`, returning the exit code
pub fn run_l2t_stars<R: ProcessRunner>(
    config: &L2TSTARSConfig,
    options: &PipelineOptions,
    runner: R,
) -> StarsResult<i32> {
    if !config.l2t_lste_filename.exists() {
        return Err(StarsError::InputFilesInaccessible(format!(
            "L2T_LSTE file not found: {}",
            config.l2t_lste_filename.display()
        )));
    }

    let zip_filename = config.l2t_stars_zip_filename();
    if zip_filename.exists() {
        log::info!("L2T STARS granule already exists: {}", zip_filename.display());
        return Ok(exit_codes::SUCCESS);
    }

    log::info!(
        "{} {} tile {} date {}",
        L2T_STARS_SHORT_NAME,
        config.granule_id,
        config.tile,
        config.date_utc
    );

    let windows = FusionWindows {
        hls: SpinupWindow::ending_on(config.date_utc, options.hls_spinup_days)?,
        viirs: SpinupWindow::ending_on(config.date_utc, options.viirs_spinup_days)?,
    };
    log::info!("HLS window {}, VIIRS window {}", windows.hls, windows.viirs);

    let prior = resolve_prior(
        &config.tile,
        TARGET_RESOLUTION,
        &config.model_directory,
        config.l2t_stars_prior_filename.as_deref(),
    )?;

    let invoker = FusionInvoker::new(runner, options.toolchain.clone());
    let mut layers: Vec<(StarsLayer, PathBuf)> = Vec::with_capacity(10);
    for variable in [Variable::NDVI, Variable::Albedo] {
        let posterior = fuse_variable(&invoker, config, options, &windows, &prior, variable)?;
        layers.extend(
            LayerKind::ALL
                .into_iter()
                .map(|kind| StarsLayer::new(variable, kind))
                .zip(posterior),
        );
    }

    package_granule(&config.output_directory, &config.granule_id, &layers)?;

    if options.remove_input_staging {
        for (source, window) in INPUT_SOURCES.iter().zip([&windows.hls, &windows.viirs]) {
            for date in window.dates() {
                let directory =
                    generate_input_staging_directory(&config.sources_directory, &config.tile, date, source)?;
                remove_directory(&directory, "input staging");
            }
        }
    }

    if options.remove_prior {
        if let Some(prior_date_utc) = prior.prior_date_utc {
            let directory =
                generate_model_state_tile_date_directory(&config.model_directory, &config.tile, prior_date_utc)?;
            remove_directory(&directory, "prior");
        }
    }

    if options.remove_posterior {
        let directory =
            generate_model_state_tile_date_directory(&config.model_directory, &config.tile, config.date_utc)?;
        remove_directory(&directory, "posterior");
    }

    Ok(exit_codes::SUCCESS)
}

/// Read a run-config and run the pipeline, mapping every failure to its exit code
pub fn run_from_runconfig<P: AsRef<Path>, R: ProcessRunner>(
    runconfig_filename: P,
    options: &PipelineOptions,
    runner: R,
) -> i32 {
    let result = L2TSTARSConfig::from_file(runconfig_filename)
        .and_then(|config| run_l2t_stars(&config, options, runner));

    match result {
        Ok(code) => code,
        Err(e) => {
            let code = e.exit_code();
            log::error!("{} (exit code {}: {})", e, code, exit_codes::describe(code));
            code
        }
    }
}
