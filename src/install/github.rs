//! GitHub release installs
//!
//! Release assets are expected to be published as bare binaries named
//! `{tool}-{OS}-{ARCH}`, e.g. `envman-Linux-x86_64`.

use super::Installer;
use crate::error::InstallError;
use crate::platform::get_system_info;
use crate::types::PlatformInfo;
use std::path::PathBuf;

/// Build the download URL of a release asset for the given platform
///
/// # Arguments
/// * `tool_name` - Repository name, also the asset prefix
/// * `publisher` - GitHub user or organisation owning the repository
/// * `version` - Release tag, used verbatim
pub fn build_release_url(
    tool_name: &str,
    publisher: &str,
    version: &str,
    platform: &PlatformInfo,
) -> String {
    format!(
        "https://github.com/{}/{}/releases/download/{}/{}-{}-{}",
        publisher, tool_name, version, tool_name, platform.os, platform.arch
    )
}

impl Installer {
    /// Installs `tool_name` from `publisher`'s GitHub release `version` for the running platform.
    pub async fn install_from_github(
        &self,
        tool_name: &str,
        publisher: &str,
        version: &str,
    ) -> Result<PathBuf, InstallError> {
        let platform = get_system_info()?;
        let url = build_release_url(tool_name, publisher, version, &platform);
        tracing::debug!("Resolved release asset URL: {}", url);
        self.install_from_url(tool_name, &url).await
    }
}
