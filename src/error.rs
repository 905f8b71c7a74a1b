//! Error types for platform detection, downloads, installs and tool invocations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Unsupported platform ({0})")]
    UnsupportedPlatform(String),
    #[error("Unsupported architecture ({0})")]
    UnsupportedArchitecture(String),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to create ({}): {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to download from ({url}): {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download from ({url}) returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to write ({url}) to ({}): {source}", .path.display())]
    Copy {
        url: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move download into place at ({}): {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("No tool (bin) name provided! URL was: {url}")]
    EmptyName { url: String },
    #[error("Tool (bin) name ({name}) must be a plain file name")]
    InvalidName { name: String },
    #[error("Failed to determine platform: {0}")]
    Platform(#[from] PlatformError),
    #[error("Failed to create tools directory ({}): {source}", .path.display())]
    ToolsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to download: {0}")]
    Download(#[from] DownloadError),
    #[error("Failed to make file ({}) executable: {source}", .path.display())]
    Chmod {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write stdin of `{program}`: {source}")]
    Stdin {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to collect output of `{program}`: {source}")]
    Capture {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` {}", describe_failure(.code, .details))]
    Failed {
        program: String,
        code: Option<i32>,
        details: Option<String>,
    },
    #[error("failed to clear envstore ({}), error: {message}", .path.display())]
    EnvstoreClear { path: PathBuf, message: String },
}

impl InvocationError {
    /// Exit code of the child, when it ran and exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            InvocationError::Failed { code, .. } => *code,
            _ => None,
        }
    }

    /// Diagnostic text captured from the child, if the output mode captured any.
    pub fn details(&self) -> Option<&str> {
        match self {
            InvocationError::Failed { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

fn describe_failure(code: &Option<i32>, details: &Option<String>) -> String {
    let status = match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    };
    match details {
        Some(details) => format!("{status}, details: {details}"),
        None => status,
    }
}
