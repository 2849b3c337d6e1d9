//! Relaunching the harness inside a prepared directory.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use thiserror::Error;

/// Subcommand the child is started with.
pub const RUN_SUBCOMMAND: &str = "run";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("could not locate the current executable: {0}")]
    CurrentExe(#[source] io::Error),
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn { program: PathBuf, source: io::Error },
    #[error("failed waiting for the child process: {0}")]
    Wait(#[source] io::Error),
    #[error("child process failed ({})", describe_exit(*code))]
    ChildFailed { code: Option<i32> },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Starts a child process with inherited stdio in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    /// This executable, started with the `run` subcommand.
    pub fn current_exe(working_dir: impl Into<PathBuf>) -> Result<Self, LaunchError> {
        let program = std::env::current_exe().map_err(LaunchError::CurrentExe)?;
        Ok(Self::new(program, working_dir).arg(RUN_SUBCOMMAND))
    }

    /// Append a fixed argument placed before any extra arguments.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Full argument list for a launch with `extra`.
    #[must_use]
    pub fn arguments(&self, extra: &[OsString]) -> Vec<OsString> {
        self.args.iter().chain(extra).cloned().collect()
    }

    pub fn launch(&self, extra: &[OsString]) -> Result<Child, LaunchError> {
        let args = self.arguments(extra);
        tracing::info!(
            program = %self.program.display(),
            cwd = %self.working_dir.display(),
            "Launching test process"
        );
        for (index, arg) in args.iter().enumerate() {
            tracing::info!(index, arg = %arg.to_string_lossy(), "Launch argument");
        }

        Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    /// Launch and wait. A nonzero exit is [`LaunchError::ChildFailed`].
    pub fn launch_and_wait(&self, extra: &[OsString]) -> Result<ExitStatus, LaunchError> {
        let mut child = self.launch(extra)?;
        let status = child.wait().map_err(LaunchError::Wait)?;
        if status.success() {
            tracing::info!("Test process exited cleanly");
            Ok(status)
        } else {
            tracing::warn!(code = ?status.code(), "Test process failed");
            Err(LaunchError::ChildFailed {
                code: status.code(),
            })
        }
    }
}
