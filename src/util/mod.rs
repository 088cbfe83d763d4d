//! Shared utilities

pub mod config;
pub mod process;
pub mod shell;

pub use config::CaptureConfig;
pub use shell::Shell;
