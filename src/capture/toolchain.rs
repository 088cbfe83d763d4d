//! Native toolchain discovery.
//!
//! The compiler path comes from the platform toolchain selector
//! (`xcrun --find clang`) and is the only hard requirement. Version banners
//! for the build driver and the compiler are informational.

use std::path::{Path, PathBuf};

use crate::util::process::{Executor, ProcessBuilder, ProcessError};

use super::CaptureError;

/// Shown in logs when a version banner could not be obtained.
pub const VERSION_UNAVAILABLE: &str = "<unavailable>";

/// Outcome of a best-effort `--version` style query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionQuery {
    /// The tool printed a banner.
    Reported(String),
    /// The tool is not installed.
    Absent,
    /// The tool ran but exited non-zero.
    Failed { code: i32, stderr: String },
    /// The tool exists but could not be launched.
    Unlaunchable(String),
}

impl VersionQuery {
    /// Run `program args..` and classify the result.
    pub fn run(executor: &dyn Executor, program: &Path, args: &[&str]) -> Self {
        let cmd = ProcessBuilder::new(program).args(args);
        match executor.output(&cmd) {
            Ok(output) if output.status.success() => {
                VersionQuery::Reported(output.stdout_trimmed())
            }
            Ok(output) => VersionQuery::Failed {
                code: output.status.code(),
                stderr: output.stderr_trimmed(),
            },
            Err(ProcessError::NotFound { .. }) => VersionQuery::Absent,
            Err(e) => VersionQuery::Unlaunchable(e.to_string()),
        }
    }

    /// The banner, or a placeholder.
    pub fn text(&self) -> &str {
        match self {
            VersionQuery::Reported(text) => text,
            _ => VERSION_UNAVAILABLE,
        }
    }

    /// Log the query result under `label`.
    fn log(&self, label: &str, program: &Path) {
        match self {
            VersionQuery::Reported(text) => tracing::info!("{} version:\n{}", label, text),
            VersionQuery::Absent => tracing::info!(
                "{} version: {} (`{}` not found)",
                label,
                VERSION_UNAVAILABLE,
                program.display()
            ),
            VersionQuery::Failed { code, stderr } => tracing::info!(
                "{} version: {} (`{}` exited with code {}){}",
                label,
                VERSION_UNAVAILABLE,
                program.display(),
                code,
                if stderr.is_empty() {
                    String::new()
                } else {
                    format!("\n{}", stderr)
                }
            ),
            VersionQuery::Unlaunchable(reason) => tracing::info!(
                "{} version: {} ({})",
                label,
                VERSION_UNAVAILABLE,
                reason
            ),
        }
    }
}

/// The toolchain a session captures against.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Absolute path of the native C compiler.
    pub compiler: PathBuf,
    /// Build driver version banner.
    pub driver_version: VersionQuery,
    /// Native compiler version banner.
    pub compiler_version: VersionQuery,
}

impl Toolchain {
    /// Resolve the compiler and query version banners.
    ///
    /// Only compiler resolution can fail.
    pub fn discover(
        executor: &dyn Executor,
        selector: &Path,
        driver: &Path,
    ) -> Result<Self, CaptureError> {
        let compiler = resolve_compiler(executor, selector)?;
        tracing::debug!("Resolved native compiler: {}", compiler.display());

        let driver_version = VersionQuery::run(executor, driver, &["-version"]);
        driver_version.log("Xcode", driver);

        let compiler_version = VersionQuery::run(executor, &compiler, &["--version"]);
        compiler_version.log("clang", &compiler);

        Ok(Toolchain {
            compiler,
            driver_version,
            compiler_version,
        })
    }
}

/// Ask the toolchain selector for the active `clang`.
pub fn resolve_compiler(executor: &dyn Executor, selector: &Path) -> Result<PathBuf, CaptureError> {
    let cmd = ProcessBuilder::new(selector).args(["--find", "clang"]);

    let output = executor.output(&cmd).map_err(|e| match e {
        ProcessError::NotFound { program } => CaptureError::SelectorNotFound { program },
        other => CaptureError::Discovery {
            command: cmd.display_command(),
            reason: other.to_string(),
        },
    })?;

    if !output.status.success() {
        let stderr = output.stderr_trimmed();
        return Err(CaptureError::Discovery {
            command: cmd.display_command(),
            reason: if stderr.is_empty() {
                format!("exited with code {}", output.status.code())
            } else {
                stderr
            },
        });
    }

    let path = output.stdout_trimmed();
    if path.is_empty() {
        return Err(CaptureError::Discovery {
            command: cmd.display_command(),
            reason: "no compiler path printed".to_string(),
        });
    }

    let path = PathBuf::from(path);
    if !path.is_absolute() {
        return Err(CaptureError::Discovery {
            command: cmd.display_command(),
            reason: format!("`{}` is not an absolute path", path.display()),
        });
    }

    Ok(path)
}
