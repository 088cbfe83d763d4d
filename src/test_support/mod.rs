//! Test utilities and mocks for xcapture unit tests.
//!
//! `MockExecutor` stands in for [`SystemExecutor`](crate::util::process::SystemExecutor):
//! it replays canned responses for matching commands and records every
//! call, including the environment overlay it was given.
//!
//! # Example
//!
//! ```rust,ignore
//! let exec = MockExecutor::new();
//! exec.expect_prefix("xcrun --find clang", MockResponse::stdout("/usr/bin/clang\n"));
//! exec.expect_prefix("xcodebuild -target", MockResponse::exit(65));
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::util::process::{Executor, ProcessBuilder, ProcessError, ProcessOutput, ProcessStatus};

/// Canned result for a matched command.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Process ran and terminated with this output.
    Ran(ProcessOutput),
    /// Program does not exist.
    NotFound,
}

impl MockResponse {
    /// Successful run printing `stdout`.
    pub fn stdout(stdout: &str) -> Self {
        MockResponse::Ran(ProcessOutput {
            status: ProcessStatus::Exited(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        })
    }

    /// Run exiting with `code` and no output.
    pub fn exit(code: i32) -> Self {
        MockResponse::Ran(ProcessOutput {
            status: ProcessStatus::Exited(code),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }

    /// Run exiting with `code` and printing `stderr`.
    pub fn failure(code: i32, stderr: &str) -> Self {
        MockResponse::Ran(ProcessOutput {
            status: ProcessStatus::Exited(code),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        })
    }

    /// Run killed by `signal`.
    pub fn signaled(signal: i32) -> Self {
        MockResponse::Ran(ProcessOutput {
            status: ProcessStatus::Signaled(signal),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

/// A command the mock was asked to run.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl RecordedCall {
    /// Program and arguments joined by spaces.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<(String, MockResponse)>,
    calls: Vec<RecordedCall>,
}

/// Mock process executor.
///
/// Expectations are matched by command prefix in insertion order.
/// Unmatched commands behave as a missing program.
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, response: MockResponse) -> &Self {
        self.state
            .lock()
            .unwrap()
            .expectations
            .push((prefix.to_string(), response));
        self
    }

    /// Get all commands that were called.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls whose program matches `program`.
    pub fn calls_to(&self, program: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == PathBuf::from(program))
            .collect()
    }

    fn respond(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput, ProcessError> {
        let mut state = self.state.lock().unwrap();
        let full_cmd = cmd.display_command();

        state.calls.push(RecordedCall {
            program: cmd.get_program().to_path_buf(),
            args: cmd.get_args().to_vec(),
            env: cmd.get_envs().clone(),
        });

        let response = state
            .expectations
            .iter()
            .find(|(prefix, _)| full_cmd.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone());

        match response {
            Some(MockResponse::Ran(output)) => Ok(output),
            Some(MockResponse::NotFound) | None => Err(ProcessError::NotFound {
                program: cmd.get_program().to_path_buf(),
            }),
        }
    }
}

impl Executor for MockExecutor {
    fn output(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput, ProcessError> {
        self.respond(cmd)
    }

    fn status(&self, cmd: &ProcessBuilder) -> Result<ProcessStatus, ProcessError> {
        self.respond(cmd).map(|output| output.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_and_replays() {
        let exec = MockExecutor::new();
        exec.expect_prefix("xcrun --find", MockResponse::stdout("/usr/bin/clang\n"));

        let cmd = ProcessBuilder::new("xcrun")
            .args(["--find", "clang"])
            .env("A", "1");
        let output = exec.output(&cmd).unwrap();

        assert_eq!(output.stdout_trimmed(), "/usr/bin/clang");
        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].display(), "xcrun --find clang");
        assert_eq!(calls[0].env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_unmatched_command_is_not_found() {
        let exec = MockExecutor::new();
        let err = exec.status(&ProcessBuilder::new("make")).unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }
}
