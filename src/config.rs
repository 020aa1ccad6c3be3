use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub termination: TerminationConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommandsConfig {
    /// Upper bound for every external tool invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub tool: DiscoveryTool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TerminationConfig {
    /// Ask before killing anything.
    #[serde(default = "default_confirm")]
    pub confirm: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryTool {
    #[default]
    Auto,
    Lsof,
    Ss,
    Netstat,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_confirm() -> bool {
    true
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            tool: DiscoveryTool::Auto,
        }
    }
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            confirm: default_confirm(),
        }
    }
}

impl Config {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.commands.timeout_secs)
    }
}

pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".portkill.json")
}

pub fn load_or_create_config() -> Result<Config> {
    load_or_create_config_at(&get_config_path())
}

pub fn load_or_create_config_at(path: &Path) -> Result<Config> {
    if path.exists() {
        load_and_validate_config_at(path)
    } else {
        let config = Config::default();
        save_config_at(&config, path)?;
        log::debug!("wrote default config to {:?}", path);
        Ok(config)
    }
}

pub fn load_and_validate_config_at(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).context("failed to read config file")?;
    let config: Config =
        serde_json::from_str(&content).context("failed to parse config file")?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.commands.timeout_secs == 0 {
        bail!("commands.timeout_secs must be greater than 0");
    }
    Ok(())
}

pub fn save_config_at(config: &Config, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, content).context("failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"discovery": {"tool": "ss"}}"#).unwrap();
        assert_eq!(config.discovery.tool, DiscoveryTool::Ss);
        assert_eq!(config.commands.timeout_secs, 10);
        assert!(config.termination.confirm);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.commands.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn creates_file_on_first_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portkill.json");
        let created = load_or_create_config_at(&path).unwrap();
        assert!(path.exists());
        let loaded = load_or_create_config_at(&path).unwrap();
        assert_eq!(created, loaded);
    }

    #[test]
    fn saved_config_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portkill.json");
        let mut config = Config::default();
        config.commands.timeout_secs = 3;
        config.discovery.tool = DiscoveryTool::Lsof;
        save_config_at(&config, &path).unwrap();
        assert_eq!(load_and_validate_config_at(&path).unwrap(), config);
    }

    #[test]
    fn unknown_tool_fails_to_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portkill.json");
        fs::write(&path, r#"{"discovery": {"tool": "netstat2"}}"#).unwrap();
        assert!(load_and_validate_config_at(&path).is_err());
    }

    #[test]
    fn zero_timeout_on_disk_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portkill.json");
        fs::write(&path, r#"{"commands": {"timeout_secs": 0}}"#).unwrap();
        assert!(load_or_create_config_at(&path).is_err());
    }
}
