//! xcapture - run `xcodebuild` with every compiler call routed through
//! capture wrappers.
//!
//! The library owns the capture session. It finds the native compiler,
//! composes the driver's command line and environment, then runs the
//! driver and relays its exit code unchanged.

pub mod capture;
pub mod util;

/// Test utilities and mocks for xcapture unit tests.
#[cfg(test)]
pub mod test_support;

pub use capture::{BuildOutcome, CaptureError, CaptureSession, WrapperPaths};
pub use util::config::CaptureConfig;
