//! Provisioning and invocation of pipeline helper tools.
//!
//! - [`install::Installer`] fetches `{tool}-{OS}-{ARCH}` binaries from GitHub
//!   releases into a tools directory.
//! - [`stepman::Stepman`] and [`envman::Envman`] turn typed requests into
//!   `stepman`/`envman` command lines and their output back into values.

pub mod config;
pub mod download;
pub mod envman;
pub mod error;
pub mod install;
pub mod platform;
pub mod runner;
pub mod stepman;
pub mod types;

#[cfg(test)]
mod tests;

pub use envman::{AddOptions, Envman};
pub use error::{DownloadError, InstallError, InvocationError, PlatformError};
pub use install::{InstallRequest, Installer};
pub use runner::{FakeRunner, Invocation, InvocationOutput, OutputMode, ProcessRunner, ToolRunner};
pub use stepman::{StepSource, Stepman};
pub use types::{LogLevel, PlatformInfo, StepInfoFormat, ToolshedSettings};
