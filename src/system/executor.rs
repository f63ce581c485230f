// src/system/executor.rs

//! Launching of external tools.

use crate::CancellationToken;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while launching or waiting for a tool.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The process could not be spawned or waited on.
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    /// The tool ran and failed.
    #[error("Command '{command}' exited with a non-zero status ({status}).")]
    NonZeroExitStatus {
        /// The displayed command line.
        command: String,
        /// The exit status.
        status: ExitStatus,
    },
    /// The cancellation token was set while the tool was running; the child was killed.
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

/// A fully resolved tool launch: program, generated arguments, working directory and the
/// packaged environment to add on top of the inherited one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// The resolved executable.
    pub program: PathBuf,
    /// Generated arguments, in order.
    pub args: Vec<String>,
    /// Directory the tool runs in.
    pub working_dir: PathBuf,
    /// Extra variables for the child process.
    pub env: BTreeMap<String, String>,
}

impl ToolInvocation {
    /// An invocation with no extra environment.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, working_dir: &Path) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.to_path_buf(),
            env: BTreeMap::new(),
        }
    }

    /// Adds variables to the child's environment.
    pub fn with_env(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// The invocation as a single shell-quoted line, for display.
    pub fn display_line(&self) -> String {
        let program = self.program.to_string_lossy().into_owned();
        let parts = std::iter::once(program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(parts).unwrap_or_else(|_| {
            std::iter::once(program.clone())
                .chain(self.args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

/// Runs `invocation` to completion, with support for graceful cancellation.
/// This function will not return until the process has finished, but it can be
/// interrupted by the CancellationToken.
pub fn execute(
    invocation: &ToolInvocation,
    cancellation_token: &CancellationToken,
) -> Result<(), ExecutionError> {
    let command_line = invocation.display_line();
    if cancellation_token.load(Ordering::SeqCst) {
        return Err(ExecutionError::Cancelled);
    }

    log::debug!(
        "Launching {} in {}",
        command_line,
        invocation.working_dir.display()
    );
    let mut child = StdCommand::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(dunce::simplified(&invocation.working_dir))
        .envs(&invocation.env)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

    // Non-blocking wait loop to allow for cancellation.
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return Err(ExecutionError::NonZeroExitStatus {
                        command: command_line,
                        status,
                    });
                }
                return Ok(());
            }
            Ok(None) => {
                if cancellation_token.load(Ordering::SeqCst) {
                    log::debug!(
                        "Cancellation requested, killing child process (PID: {})...",
                        child.id()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(ExecutionError::CommandFailed(command_line, e)),
        }
    }
}

// MARK: --- UNIT TESTS ---
