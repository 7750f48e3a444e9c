use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use l2t_stars::config::{PipelineOptions, ToolchainConfig};
use l2t_stars::constants::{L2T_STARS_LONG_NAME, SPINUP_DAYS, WORKING_DIRECTORY};
use l2t_stars::exit_codes;
use l2t_stars::io::{generate_runconfig, RunConfigRequest, SystemProcessRunner};
use l2t_stars::{run_from_runconfig, Threads};
use std::path::PathBuf;

/// ECOSTRESS L2T STARS NDVI and albedo product generation
#[derive(Parser)]
#[command(name = "l2t-stars", version)]
#[command(about = L2T_STARS_LONG_NAME, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce the L2T STARS granule described by a run-config
    Run {
        /// Run-config XML file
        runconfig: Option<PathBuf>,

        /// Julia threads per worker ("auto" or a positive count)
        #[arg(long, default_value = "auto")]
        threads: Threads,

        /// Distributed workers used by the data fusion
        #[arg(long, default_value_t = l2t_stars::constants::DEFAULT_NUM_WORKERS)]
        num_workers: usize,

        /// Days of HLS and VIIRS observations before the target date
        #[arg(long, default_value_t = SPINUP_DAYS)]
        spinup_days: i64,

        /// Keep staged HLS and VIIRS inputs after the run
        #[arg(long)]
        keep_input_staging: bool,

        /// Keep the prior model state after the run
        #[arg(long)]
        keep_prior: bool,

        /// Keep the posterior model state after the run
        #[arg(long)]
        keep_posterior: bool,
    },
    /// Write a run-config for an L2T_LSTE granule
    Runconfig {
        /// L2T_LSTE granule the product is generated for
        #[arg(long)]
        lste: PathBuf,

        /// Previous L2T STARS granule used as prior
        #[arg(long)]
        prior: Option<PathBuf>,

        /// Working directory for sources, model state and output
        #[arg(long, default_value = WORKING_DIRECTORY)]
        working_directory: PathBuf,

        /// Explicit run-config path
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, default_value = l2t_stars::constants::DEFAULT_BUILD)]
        build: String,

        #[arg(long, default_value_t = l2t_stars::constants::DEFAULT_PRODUCT_COUNTER)]
        product_counter: u32,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("l2t-stars {}", l2t_stars::VERSION);

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            runconfig,
            threads,
            num_workers,
            spinup_days,
            keep_input_staging,
            keep_prior,
            keep_posterior,
        } => {
            let runconfig = match runconfig {
                Some(path) => path,
                None => {
                    log::error!("no run-config given");
                    std::process::exit(exit_codes::RUNCONFIG_FILENAME_NOT_SUPPLIED);
                }
            };
            let options = PipelineOptions {
                threads,
                num_workers,
                hls_spinup_days: spinup_days,
                viirs_spinup_days: spinup_days,
                remove_input_staging: !keep_input_staging,
                remove_prior: !keep_prior,
                remove_posterior: !keep_posterior,
                toolchain: ToolchainConfig::from_env(),
            };
            let code = run_from_runconfig(&runconfig, &options, SystemProcessRunner);
            std::process::exit(code);
        }
        Commands::Runconfig {
            lste,
            prior,
            working_directory,
            output,
            build,
            product_counter,
        } => {
            let mut request = RunConfigRequest::new(lste, working_directory);
            request.prior_l2t_stars_filename = prior;
            request.runconfig_filename = output;
            request.build = build;
            request.product_counter = product_counter;

            let path = generate_runconfig(&request).context("failed to generate run-config")?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
