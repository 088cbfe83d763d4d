//! Build capture sessions.
//!
//! A [`CaptureSession`] wraps one build-driver invocation:
//!
//! 1. **Discovery** resolves the native compiler once, at construction.
//! 2. **Composition** appends compiler-role overrides to the command and
//!    exports the real compiler path for the wrappers.
//! 3. **Execution** runs the driver and relays its exit code.
//!
//! Sessions are single-shot: [`CaptureSession::capture`] consumes the
//! session.

pub mod environment;
pub mod exec;
pub mod frontend;
pub mod toolchain;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::util::config::CaptureConfig;
use crate::util::process::Executor;

pub use environment::{ambient_environment, compose, ComposedBuild, Environment};
pub use exec::BuildOutcome;
pub use frontend::{EnvSupplier, FrontendEnv};
pub use toolchain::{Toolchain, VersionQuery};

/// Wrapper directory baked in at compile time, if any.
const BUILTIN_WRAPPER_DIR: Option<&str> = option_env!("XCAPTURE_WRAPPER_DIR");

/// Errors that stop a session before the build finishes.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no build command given")]
    EmptyCommand,

    #[error("toolchain selector `{}` not found", program.display())]
    SelectorNotFound { program: PathBuf },

    #[error("could not locate the native compiler with `{command}`: {reason}")]
    Discovery { command: String, reason: String },

    #[error("build driver `{}` not found", program.display())]
    DriverNotFound { program: PathBuf },

    #[error("failed to launch build driver `{}`", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not determine the wrapper directory")]
    WrapperDir(#[source] io::Error),
}

/// Locations of the C and C++ capture wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperPaths {
    pub c: PathBuf,
    pub cxx: PathBuf,
}

impl WrapperPaths {
    /// Wrappers at explicit paths.
    pub fn new(c: impl Into<PathBuf>, cxx: impl Into<PathBuf>) -> Self {
        WrapperPaths {
            c: c.into(),
            cxx: cxx.into(),
        }
    }

    /// `clang` and `clang++` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        WrapperPaths::new(dir.join("clang"), dir.join("clang++"))
    }

    /// The wrappers this build of xcapture ships with.
    ///
    /// `XCAPTURE_WRAPPER_DIR` at compile time wins; otherwise the
    /// `wrappers` directory beside the running executable.
    pub fn resolve() -> Result<Self, CaptureError> {
        if let Some(dir) = BUILTIN_WRAPPER_DIR {
            return Ok(WrapperPaths::in_dir(Path::new(dir)));
        }

        let exe = std::env::current_exe().map_err(CaptureError::WrapperDir)?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(WrapperPaths::in_dir(&dir.join("wrappers")))
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Constructed,
    EnvironmentComposed,
    Executing,
    Succeeded,
    Failed(i32),
}

/// One captured build.
pub struct CaptureSession<'a> {
    config: &'a CaptureConfig,
    executor: &'a dyn Executor,
    supplier: Box<dyn EnvSupplier + 'a>,
    wrappers: WrapperPaths,
    toolchain: Toolchain,
    command: Vec<String>,
    state: SessionState,
}

impl<'a> CaptureSession<'a> {
    /// Discover the toolchain and prepare a session for `command`.
    ///
    /// Fails, without running anything but the discovery tools, when the
    /// command is empty or the compiler cannot be resolved.
    pub fn new(
        config: &'a CaptureConfig,
        command: Vec<String>,
        wrappers: WrapperPaths,
        executor: &'a dyn Executor,
    ) -> Result<Self, CaptureError> {
        if command.is_empty() {
            return Err(CaptureError::EmptyCommand);
        }

        let toolchain = Toolchain::discover(executor, &config.xcrun, &config.xcodebuild)?;

        Ok(CaptureSession {
            config,
            executor,
            supplier: Box::new(FrontendEnv),
            wrappers,
            toolchain,
            command,
            state: SessionState::Constructed,
        })
    }

    /// Replace the front-end environment supplier.
    pub fn with_env_supplier(mut self, supplier: impl EnvSupplier + 'a) -> Self {
        self.supplier = Box::new(supplier);
        self
    }

    /// The native compiler resolved at construction.
    pub fn compiler(&self) -> &Path {
        &self.toolchain.compiler
    }

    /// The build command as given, before overrides.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Compose the command and environment against `ambient`.
    pub fn compose(&self, ambient: &Environment) -> ComposedBuild {
        let frontend = self.supplier.env_vars(self.config);
        compose(
            &self.command,
            ambient,
            &self.toolchain.compiler,
            &self.wrappers,
            &frontend,
        )
    }

    /// Run the captured build against an ambient environment snapshot.
    pub fn capture(mut self, ambient: &Environment) -> Result<BuildOutcome, CaptureError> {
        let composed = self.compose(ambient);
        self.transition(SessionState::EnvironmentComposed);

        self.transition(SessionState::Executing);
        let outcome = exec::run_build(self.executor, &composed, ambient, self.config.debug)?;

        self.transition(match outcome {
            BuildOutcome::Succeeded => SessionState::Succeeded,
            BuildOutcome::Failed { code, .. } => SessionState::Failed(code),
        });

        Ok(outcome)
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("Capture session: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
