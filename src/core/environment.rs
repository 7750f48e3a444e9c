//! Environment handed to toolchain subprocesses

use crate::constants::{GDAL_CONFLICT_VARIABLES, THREADS_VARIABLE};
use crate::types::Threads;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// Complete environment of a child process
///
/// Keys and values are kept as OS strings so variables that are not valid
/// Unicode reach the child unchanged.
pub type Environment = BTreeMap<OsString, OsString>;

/// Snapshot of the current process environment
pub fn process_environment() -> Environment {
    std::env::vars_os().collect()
}

/// Copy of `base` without the keys in `remove`; absent keys are ignored
pub fn without_keys(base: &Environment, remove: &[&str]) -> Environment {
    base.iter()
        .filter(|(key, _)| !remove.iter().any(|name| key.as_os_str() == OsStr::new(name)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Environment for a Julia toolchain run
///
/// The host's GDAL variables are dropped so the toolchain uses its own GDAL
/// build, and the thread count is set. `base` is left untouched.
pub fn derive_environment(base: &Environment, threads: Threads) -> Environment {
    let mut env = without_keys(base, &GDAL_CONFLICT_VARIABLES);
    env.insert(THREADS_VARIABLE.into(), threads.to_string().into());
    env
}
