//! I/O modules for file layout, granules, run-configs and subprocesses

pub mod filenames;
pub mod granule;
pub mod process;
pub mod runconfig;

pub use granule::{Granule, GranuleDownloader, GranuleId, GranuleQuery, LocalGranuleDirectory, StarsArchive};
pub use process::{ExitStatus, ProcessCommand, ProcessRunner, RecordingProcessRunner, SystemProcessRunner};
pub use runconfig::{generate_runconfig, generate_runconfig_with_download, L2TSTARSConfig, RunConfigRequest};
