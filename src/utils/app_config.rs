/// Application configuration management
/// Loaded from ~/.config/homewatch/config.toml unless overridden

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::models::{RetentionPolicy, ServiceConfig, SmoothingPolicy};
use crate::utils::constants::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database and collector output files
    pub data_dir: PathBuf,
    /// Database file; defaults to `<data_dir>/dashboard.db`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    pub server: ServerConfig,
    pub checks: CheckConfig,
    pub retention: RetentionPolicy,
    pub services: Vec<ServiceConfig>,
    pub volumes: Vec<VolumeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub http_timeout_secs: u64,
    pub accept_invalid_certs: bool,
    pub sparkline_samples: usize,
    pub smoothing: SmoothingPolicy,
}

/// A storage volume reported by `/api/stats`.
///
/// Exactly one of `path` (a mount point measured locally) or `stats_file`
/// (a JSON file written by a host-side collector) must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Relative paths resolve against `data_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_file: Option<PathBuf>,
}

impl VolumeConfig {
    pub fn path(key: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.to_string(),
            path: Some(path.into()),
            stats_file: None,
        }
    }

    pub fn stats_file(key: &str, file: impl Into<PathBuf>) -> Self {
        Self {
            key: key.to_string(),
            path: None,
            stats_file: Some(file.into()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: None,
            server: ServerConfig::default(),
            checks: CheckConfig::default(),
            retention: RetentionPolicy::default(),
            services: default_services(),
            volumes: default_volumes(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors: false,
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            accept_invalid_certs: false,
            sparkline_samples: DEFAULT_SPARKLINE_SAMPLES,
            smoothing: SmoothingPolicy::None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl AppConfig {
    /// Resolve the config file path: explicit argument, then HOMEWATCH_CONFIG,
    /// then the per-user config directory
    pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var("HOMEWATCH_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration, falling back to built-in defaults when the file
    /// does not exist, then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::config_path(explicit)?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// HOMEWATCH_DATA_DIR wins over DATA_DIR
    pub fn apply_env_overrides(&mut self) {
        let data_dir = std::env::var("HOMEWATCH_DATA_DIR").or_else(|_| std::env::var("DATA_DIR"));
        if let Ok(dir) = data_dir {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
    }

    /// Save configuration to file, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = self.to_toml()?;
        fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DB_FILE_NAME))
    }

    /// Check the configuration for problems; an empty list means valid
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.checks.http_timeout_secs == 0 {
            errors.push("checks.http_timeout_secs must be greater than 0".to_string());
        }
        if self.checks.sparkline_samples == 0 {
            errors.push("checks.sparkline_samples must be greater than 0".to_string());
        }
        if let SmoothingPolicy::ConsecutiveFailures { threshold: 0 } = self.checks.smoothing {
            errors.push("checks.smoothing.threshold must be greater than 0".to_string());
        }

        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                errors.push("service with empty name".to_string());
            }
            if !names.insert(service.name.as_str()) {
                errors.push(format!("duplicate service name '{}'", service.name));
            }
            if service.check_type.includes_http() && service.url.is_none() {
                errors.push(format!(
                    "service '{}' uses check_type '{}' but has no url",
                    service.name, service.check_type
                ));
            }
            if service.check_type.includes_docker() && service.docker_container.is_none() {
                errors.push(format!(
                    "service '{}' uses check_type '{}' but has no docker_container",
                    service.name, service.check_type
                ));
            }
        }

        let mut keys = HashSet::new();
        for volume in &self.volumes {
            if RESERVED_STATS_KEYS.contains(&volume.key.as_str()) {
                errors.push(format!("volume key '{}' is reserved", volume.key));
            }
            if !keys.insert(volume.key.as_str()) {
                errors.push(format!("duplicate volume key '{}'", volume.key));
            }
            match (&volume.path, &volume.stats_file) {
                (Some(_), Some(_)) => errors.push(format!(
                    "volume '{}' sets both path and stats_file",
                    volume.key
                )),
                (None, None) => errors.push(format!(
                    "volume '{}' needs either path or stats_file",
                    volume.key
                )),
                _ => {}
            }
        }

        errors
    }
}
