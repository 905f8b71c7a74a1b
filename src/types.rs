use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OsName {
    Darwin,
    Linux,
}

impl fmt::Display for OsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsName::Darwin => write!(f, "Darwin"),
            OsName::Linux => write!(f, "Linux"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArchName {
    #[serde(rename = "x86_64")]
    X86_64,
}

impl fmt::Display for ArchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchName::X86_64 => write!(f, "x86_64"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformInfo {
    pub os: OsName,
    pub arch: ArchName,
}

/// Verbosity handed to `stepman` and `envman` through `--loglevel`.
///
/// The string forms are the level names both tools accept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Panic,
    Fatal,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Panic => "panic",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "panic" => Ok(LogLevel::Panic),
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" | "trace" => Ok(LogLevel::Debug),
            other => Err(format!("Unknown log level '{}'", other)),
        }
    }
}

impl From<LevelFilter> for LogLevel {
    fn from(filter: LevelFilter) -> Self {
        if filter == LevelFilter::OFF {
            LogLevel::Panic
        } else if filter == LevelFilter::ERROR {
            LogLevel::Error
        } else if filter == LevelFilter::WARN {
            LogLevel::Warning
        } else if filter == LevelFilter::INFO {
            LogLevel::Info
        } else {
            LogLevel::Debug
        }
    }
}

/// Output format of `stepman step-info` and `stepman step-list`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepInfoFormat {
    #[default]
    Raw,
    Json,
}

impl StepInfoFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepInfoFormat::Raw => "raw",
            StepInfoFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolshedSettings {
    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,
    #[serde(default = "default_stepman_bin")]
    pub stepman_bin: String,
    #[serde(default = "default_envman_bin")]
    pub envman_bin: String,
    /// Overrides the level derived from `-v`/`-q` when set.
    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

pub(crate) fn default_tools_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolshed")
        .join("tools")
}
fn default_stepman_bin() -> String {
    "stepman".to_string()
}
fn default_envman_bin() -> String {
    "envman".to_string()
}

impl Default for ToolshedSettings {
    fn default() -> Self {
        Self {
            tools_dir: default_tools_dir(),
            stepman_bin: default_stepman_bin(),
            envman_bin: default_envman_bin(),
            log_level: None,
        }
    }
}
