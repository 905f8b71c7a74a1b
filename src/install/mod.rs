//! Tool installation module
//!
//! This module provides functionality for:
//! - Building GitHub release download URLs for the current platform
//! - Downloading a single binary into the tools directory
//! - Marking the installed binary executable

pub mod github;

pub use github::build_release_url;

use crate::download::download_file;
use crate::error::InstallError;
use crate::types::ToolshedSettings;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A tool to fetch from a GitHub release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub tool_name: String,
    pub publisher: String,
    pub version: String,
}

/// Installs binaries into a single tools directory.
#[derive(Debug, Clone)]
pub struct Installer {
    tools_dir: PathBuf,
}

impl Installer {
    pub fn new(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: tools_dir.into(),
        }
    }

    pub fn from_settings(settings: &ToolshedSettings) -> Self {
        Self::new(settings.tools_dir.clone())
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    pub async fn install(&self, request: &InstallRequest) -> Result<PathBuf, InstallError> {
        self.install_from_github(&request.tool_name, &request.publisher, &request.version)
            .await
    }

    /// Downloads `url` to `<tools_dir>/<bin_name>` and makes it executable.
    ///
    /// Returns the installed path. An existing binary of the same name is replaced.
    pub async fn install_from_url(&self, bin_name: &str, url: &str) -> Result<PathBuf, InstallError> {
        if bin_name.trim().is_empty() {
            return Err(InstallError::EmptyName {
                url: url.to_string(),
            });
        }
        // The binary must land directly inside the tools directory.
        let mut components = Path::new(bin_name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(InstallError::InvalidName {
                name: bin_name.to_string(),
            });
        }

        fs::create_dir_all(&self.tools_dir).map_err(|source| InstallError::ToolsDir {
            path: self.tools_dir.clone(),
            source,
        })?;

        let destination = self.tools_dir.join(bin_name);
        tracing::debug!("Installing {} from {} to {}", bin_name, url, destination.display());

        download_file(url, &destination).await?;
        make_executable(&destination)?;

        tracing::info!("Installed {} to {}", bin_name, destination.display());
        Ok(destination)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| {
        InstallError::Chmod {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}
