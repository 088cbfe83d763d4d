//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

/// Error raised when a subprocess cannot be run at all.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("`{}` not found", program.display())]
    NotFound { program: PathBuf },

    #[error("failed to execute `{}`", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    fn from_io(program: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            ProcessError::NotFound {
                program: program.to_path_buf(),
            }
        } else {
            ProcessError::Spawn {
                program: program.to_path_buf(),
                source,
            }
        }
    }
}

/// How a finished subprocess terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Exited normally with the given code.
    Exited(i32),
    /// Killed by the given signal (unix only).
    Signaled(i32),
}

impl ProcessStatus {
    /// True for a zero exit.
    pub fn success(&self) -> bool {
        matches!(self, ProcessStatus::Exited(0))
    }

    /// Exit code as a shell would report it.
    ///
    /// A signal death maps to `128 + signal`.
    pub fn code(&self) -> i32 {
        match *self {
            ProcessStatus::Exited(code) => code,
            ProcessStatus::Signaled(signal) => 128 + signal,
        }
    }

    fn from_exit_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ProcessStatus::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ProcessStatus::Signaled(signal);
            }
        }

        ProcessStatus::Exited(1)
    }
}

/// Captured output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ProcessStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Stdout decoded lossily and trimmed.
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Stderr decoded lossily and trimmed.
    pub fn stderr_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set every variable of a mapping.
    pub fn envs<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the environment overlay.
    pub fn get_envs(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Build the Command.
    ///
    /// The overlay is applied on top of the inherited environment.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        cmd
    }

    /// Run to completion with stdout and stderr captured.
    pub fn exec(&self) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd
            .output()
            .map_err(|e| ProcessError::from_io(&self.program, e))?;

        Ok(ProcessOutput {
            status: ProcessStatus::from_exit_status(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Run to completion with inherited stdio and return the status only.
    pub fn status(&self) -> Result<ProcessStatus, ProcessError> {
        let mut cmd = self.build_command();
        let status = cmd
            .status()
            .map_err(|e| ProcessError::from_io(&self.program, e))?;
        Ok(ProcessStatus::from_exit_status(status))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Runs processes on behalf of a capture session.
///
/// The system implementation spawns real children; tests substitute a
/// recording mock.
pub trait Executor {
    /// Run with captured output.
    fn output(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput, ProcessError>;

    /// Run with inherited stdio, returning the termination status.
    fn status(&self, cmd: &ProcessBuilder) -> Result<ProcessStatus, ProcessError>;
}

/// Executor backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn output(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput, ProcessError> {
        cmd.exec()
    }

    fn status(&self, cmd: &ProcessBuilder) -> Result<ProcessStatus, ProcessError> {
        cmd.status()
    }
}

/// Find an executable in PATH.
///
/// Paths with more than one component are returned as-is when they exist.
pub fn find_executable(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    which::which(name.as_ref()).ok()
}
