//! Blocking subprocess launch for the external toolchain

use crate::core::environment::Environment;
use crate::types::{StarsError, StarsResult};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Fully resolved subprocess invocation
///
/// `env` is the complete environment of the child; nothing is inherited from
/// the launching process beyond what is listed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Environment,
    pub working_dir: Option<PathBuf>,
}

impl ProcessCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: Environment::new(),
            working_dir: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Value the child will see for `key`
    pub fn env_var(&self, key: &str) -> Option<&OsStr> {
        self.env.get(OsStr::new(key)).map(|value| value.as_os_str())
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|arg| {
            if arg.contains(char::is_whitespace) {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        }));
        parts.join(" ")
    }
}

/// Outcome of a child process that was started successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failed(i32),
    /// Terminated without an exit code (killed by a signal)
    Terminated,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Failed(code) => Some(*code),
            ExitStatus::Terminated => None,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(0) => ExitStatus::Success,
            Some(code) => ExitStatus::Failed(code),
            None => ExitStatus::Terminated,
        }
    }
}

/// Something that can run a [`ProcessCommand`] to completion
///
/// A non-zero exit is an `Ok` status. `Err` is reserved for commands that
/// could not be started at all.
pub trait ProcessRunner {
    fn run(&self, command: &ProcessCommand) -> StarsResult<ExitStatus>;
}

/// Runs commands with `std::process::Command`, blocking until exit
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &ProcessCommand) -> StarsResult<ExitStatus> {
        log::info!("{}", command.display());

        let mut process = std::process::Command::new(&command.program);
        process.args(&command.args).env_clear().envs(&command.env);
        if let Some(dir) = &command.working_dir {
            process.current_dir(dir);
        }

        let status = process.status().map_err(|source| StarsError::Launch {
            program: command.program.clone(),
            source,
        })?;

        let status = ExitStatus::from(status);
        if !status.success() {
            log::warn!("{} exited with {:?}", command.program, status);
        }
        Ok(status)
    }
}

/// Records commands instead of launching them; replies with queued statuses
#[derive(Debug, Clone, Default)]
pub struct RecordingProcessRunner {
    calls: Arc<Mutex<Vec<ProcessCommand>>>,
    responses: Arc<Mutex<Vec<ExitStatus>>>,
}

impl RecordingProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the status returned by the next call; calls beyond the queue succeed
    pub fn push_response(&self, status: ExitStatus) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push(status);
        }
    }

    pub fn calls(&self) -> Vec<ProcessCommand> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn last_call(&self) -> Option<ProcessCommand> {
        self.calls().pop()
    }
}

impl ProcessRunner for RecordingProcessRunner {
    fn run(&self, command: &ProcessCommand) -> StarsResult<ExitStatus> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.clone());
        }
        let status = match self.responses.lock() {
            Ok(mut responses) if !responses.is_empty() => responses.remove(0),
            _ => ExitStatus::Success,
        };
        Ok(status)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, command: &ProcessCommand) -> StarsResult<ExitStatus> {
        (**self).run(command)
    }
}
