use crate::types::*;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = ".toolshed";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_CONFIG: &str = "TOOLSHED_CONFIG";
pub const ENV_TOOLS_DIR: &str = "TOOLSHED_TOOLS_DIR";
pub const ENV_STEPMAN: &str = "TOOLSHED_STEPMAN";
pub const ENV_ENVMAN: &str = "TOOLSHED_ENVMAN";
pub const ENV_LOG_LEVEL: &str = "TOOLSHED_LOG_LEVEL";

pub const SETTING_KEYS: [&str; 4] = ["tools_dir", "stepman_bin", "envman_bin", "log_level"];

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join(CONFIG_DIR_NAME);
    Ok(path)
}

pub fn get_config_file_path() -> Result<PathBuf> {
    let path = match std::env::var_os(ENV_CONFIG) {
        Some(path) => PathBuf::from(path),
        None => get_user_config_dir()?.join(CONFIG_FILE_NAME),
    };
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

pub fn load_settings() -> Result<ToolshedSettings> {
    let mut settings = load_settings_file(&get_config_file_path()?)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

/// Reads settings from `path`, falling back to defaults when it does not exist.
pub fn load_settings_file(path: &Path) -> Result<ToolshedSettings> {
    if !path.exists() {
        return Ok(ToolshedSettings::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read config file at {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")
}

pub fn apply_env_overrides<F>(settings: &mut ToolshedSettings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(ENV_TOOLS_DIR).filter(|v| !v.is_empty()) {
        settings.tools_dir = PathBuf::from(dir);
    }
    if let Some(bin) = lookup(ENV_STEPMAN).filter(|v| !v.is_empty()) {
        settings.stepman_bin = bin;
    }
    if let Some(bin) = lookup(ENV_ENVMAN).filter(|v| !v.is_empty()) {
        settings.envman_bin = bin;
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
        let level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow!("Invalid {}: {}", ENV_LOG_LEVEL, e))?;
        settings.log_level = Some(level);
    }
    Ok(())
}

pub fn save_settings(settings: &ToolshedSettings) -> Result<()> {
    save_settings_file(&get_config_file_path()?, settings)
}

pub fn save_settings_file(path: &Path, settings: &ToolshedSettings) -> Result<()> {
    if let Some(config_dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(config_dir)?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content)
        .with_context(|| format!("Could not write config file at {}", path.display()))?;

    Ok(())
}

pub fn get_setting(settings: &ToolshedSettings, key: &str) -> Result<String> {
    match normalize_key(key).as_str() {
        "tools_dir" => Ok(settings.tools_dir.display().to_string()),
        "stepman_bin" => Ok(settings.stepman_bin.clone()),
        "envman_bin" => Ok(settings.envman_bin.clone()),
        "log_level" => Ok(settings
            .log_level
            .map(|l| l.to_string())
            .unwrap_or_default()),
        other => Err(invalid_key(other)),
    }
}

pub fn set_setting(settings: &mut ToolshedSettings, key: &str, value: &str) -> Result<()> {
    match normalize_key(key).as_str() {
        "tools_dir" => settings.tools_dir = PathBuf::from(value),
        "stepman_bin" => settings.stepman_bin = value.to_string(),
        "envman_bin" => settings.envman_bin = value.to_string(),
        "log_level" => {
            settings.log_level = Some(value.parse::<LogLevel>().map_err(|e| anyhow!(e))?)
        }
        other => return Err(invalid_key(other)),
    }
    Ok(())
}

pub fn unset_setting(settings: &mut ToolshedSettings, key: &str) -> Result<()> {
    let defaults = ToolshedSettings::default();
    match normalize_key(key).as_str() {
        "tools_dir" => settings.tools_dir = defaults.tools_dir,
        "stepman_bin" => settings.stepman_bin = defaults.stepman_bin,
        "envman_bin" => settings.envman_bin = defaults.envman_bin,
        "log_level" => settings.log_level = None,
        other => return Err(invalid_key(other)),
    }
    Ok(())
}

fn invalid_key(key: &str) -> anyhow::Error {
    anyhow!(
        "'{}' is not a valid configuration setting. Valid settings: {}",
        key,
        SETTING_KEYS.join(", ")
    )
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}
