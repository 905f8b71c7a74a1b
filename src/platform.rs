use crate::error::PlatformError;
use crate::types::*;

/// Maps a `std::env::consts::OS` value to the OS spelling used in release asset names.
pub fn os_from_raw(os: &str) -> Result<OsName, PlatformError> {
    match os {
        "macos" | "darwin" => Ok(OsName::Darwin),
        "linux" => Ok(OsName::Linux),
        other => Err(PlatformError::UnsupportedPlatform(other.to_string())),
    }
}

/// Maps a `std::env::consts::ARCH` value to the arch spelling used in release asset names.
pub fn arch_from_raw(arch: &str) -> Result<ArchName, PlatformError> {
    match arch {
        "x86_64" | "amd64" => Ok(ArchName::X86_64),
        other => Err(PlatformError::UnsupportedArchitecture(other.to_string())),
    }
}

pub fn identify_os() -> Result<OsName, PlatformError> {
    os_from_raw(std::env::consts::OS)
}

pub fn identify_arch() -> Result<ArchName, PlatformError> {
    arch_from_raw(std::env::consts::ARCH)
}

pub fn get_system_info() -> Result<PlatformInfo, PlatformError> {
    let info = PlatformInfo {
        os: identify_os()?,
        arch: identify_arch()?,
    };
    tracing::trace!("Detected platform: {}-{}", info.os, info.arch);
    Ok(info)
}
