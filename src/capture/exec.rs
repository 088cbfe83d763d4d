//! Delegated execution of the build driver.

use crate::util::process::{find_executable, Executor, ProcessBuilder, ProcessError};

use super::environment::{ComposedBuild, Environment};
use super::CaptureError;

/// How a captured build ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The driver exited with status 0.
    Succeeded,
    /// The driver exited non-zero.
    Failed {
        /// The driver's own exit code.
        code: i32,
        /// Failure detail, collected in debug mode only.
        diagnostic: Option<String>,
    },
}

impl BuildOutcome {
    /// True when the build succeeded.
    pub fn success(&self) -> bool {
        matches!(self, BuildOutcome::Succeeded)
    }

    /// Status the caller should exit with.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildOutcome::Succeeded => 0,
            BuildOutcome::Failed { code, .. } => *code,
        }
    }
}

/// Run the composed build and wait for it.
///
/// No timeout and no retry: the driver alone decides how long the build
/// takes and whether it passed.
pub fn run_build(
    executor: &dyn Executor,
    composed: &ComposedBuild,
    ambient: &Environment,
    debug: bool,
) -> Result<BuildOutcome, CaptureError> {
    let (program, args) = composed
        .command
        .split_first()
        .ok_or(CaptureError::EmptyCommand)?;

    let cmd = ProcessBuilder::new(program)
        .args(args)
        .envs(&composed.env);

    tracing::debug!("Running `{}`", cmd.display_command());

    let status = executor.status(&cmd).map_err(|e| match e {
        ProcessError::NotFound { program } => CaptureError::DriverNotFound { program },
        ProcessError::Spawn { program, source } => CaptureError::Launch { program, source },
    })?;

    if status.success() {
        return Ok(BuildOutcome::Succeeded);
    }

    let code = status.code();
    tracing::debug!("`{}` exited with code {}", program, code);

    let diagnostic = debug.then(|| failure_report(&cmd, composed, ambient, code));
    if let Some(ref report) = diagnostic {
        tracing::error!("{}", report);
    }

    Ok(BuildOutcome::Failed { code, diagnostic })
}

/// Everything an operator needs to reproduce a failed captured build.
fn failure_report(
    cmd: &ProcessBuilder,
    composed: &ComposedBuild,
    ambient: &Environment,
    code: i32,
) -> String {
    let driver = match find_executable(cmd.get_program()) {
        Some(path) => path.display().to_string(),
        None => format!("{} (not on PATH)", cmd.get_program().display()),
    };

    let mut report = format!(
        "build command failed with exit code {}\n  command: {}\n  driver:  {}\n  environment overrides:",
        code,
        cmd.display_command(),
        driver
    );

    for (key, value) in composed.overlay(ambient) {
        report.push_str(&format!("\n    {}={}", key, value));
    }

    report
}
