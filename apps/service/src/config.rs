use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    ReadFailed,
    #[error("failed to write config file")]
    WriteFailed,
    #[error("failed to parse config file")]
    ParseFailed,
    #[error("no usable config directory")]
    ConfigPathUnavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseSettings,
    pub monitor: MonitorSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the local database file.
    pub path: path::PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between scheduler ticks. Global: every service is checked
    /// once per tick.
    pub tick_seconds: u64,
    /// Total timeout applied to each probe.
    pub probe_timeout_seconds: u64,
    /// Skip peer-certificate validation in HTTP probes. On by default to
    /// match the monitor's historical behavior; turning it off makes
    /// probes fail against hosts with broken certificates.
    pub accept_invalid_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseSettings { path: "lookout.db".into() },
            monitor: MonitorSettings {
                tick_seconds: 60,
                probe_timeout_seconds: 10,
                accept_invalid_certs: true,
            },
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.tick_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor.probe_timeout_seconds)
    }

    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/lookout/config.toml or the
    /// specified path, with the name config.toml, if one does not exist.
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string =
                fs::read_to_string(&config_path).map_err(|_err| ConfigError::ReadFailed)?;
            toml::from_str(raw_string.as_str()).map_err(|_err| ConfigError::ParseFailed)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String =
            toml::to_string_pretty(self).map_err(|_err| ConfigError::ParseFailed)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_err| ConfigError::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(|_err| ConfigError::WriteFailed)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Internal Configuration State:")?;
        writeln!(f, "  Database")?;
        writeln!(f, "    Path: {}", self.database.path.display())?;
        writeln!(f, "  Monitor")?;
        writeln!(f, "    Tick: {}s", self.monitor.tick_seconds)?;
        writeln!(f, "    Probe timeout: {}s", self.monitor.probe_timeout_seconds)?;
        writeln!(f, "    Accept invalid certificates: {}", self.monitor.accept_invalid_certs)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/lookout/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("lookout/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_default_config_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::from_config(Some(&path)).unwrap();

        assert!(path.exists());
        assert_eq!(config.monitor.tick_seconds, 60);
        assert!(config.monitor.accept_invalid_certs);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.monitor.tick_seconds = 15;
        config.database.path = "/tmp/other.db".into();
        config.write_config(&path).unwrap();

        let loaded = Config::from_config(Some(&path)).unwrap();
        assert_eq!(loaded.monitor.tick_seconds, 15);
        assert_eq!(loaded.database.path, path::PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn normalizes_config_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        Config::from_config(Some(&path)).unwrap();

        assert!(dir.path().join("config.toml").exists());
    }
}
