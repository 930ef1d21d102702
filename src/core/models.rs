/// Data model for monitored services and their health observations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which probe(s) a service is checked with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Http,
    Docker,
    Both,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Http => "http",
            CheckType::Docker => "docker",
            CheckType::Both => "both",
        }
    }

    pub fn includes_http(&self) -> bool {
        matches!(self, CheckType::Http | CheckType::Both)
    }

    pub fn includes_docker(&self) -> bool {
        matches!(self, CheckType::Docker | CheckType::Both)
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for CheckType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(CheckType::Http),
            "docker" => Ok(CheckType::Docker),
            "both" => Ok(CheckType::Both),
            other => Err(ParseEnumError {
                kind: "check_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Observed health of a service.
///
/// Variants are declared worst-first so the derived `Ord` gives
/// `Down < Degraded < Unknown < Up`, and combining two observations is `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Down,
    Degraded,
    Unknown,
    Up,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Up => "up",
            HealthStatus::Down => "down",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unknown => "unknown",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }

    /// Get color for terminal display
    pub fn color(&self) -> &'static str {
        match self {
            HealthStatus::Up => "green",
            HealthStatus::Degraded => "yellow",
            HealthStatus::Down => "red",
            HealthStatus::Unknown => "bright black",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(HealthStatus::Up),
            "down" => Ok(HealthStatus::Down),
            "degraded" => Ok(HealthStatus::Degraded),
            "unknown" => Ok(HealthStatus::Unknown),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Service entry as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub icon_emoji: String,
    pub check_type: CheckType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Service row as stored in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub icon_emoji: String,
    pub check_type: CheckType,
    pub url: Option<String>,
    pub docker_container: Option<String>,
    pub public_url: Option<String>,
    pub enabled: bool,
    pub priority: i64,
}

/// Result of a single probe, before it is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub status: HealthStatus,
    pub response_time_ms: Option<u64>,
    pub error_message: Option<String>,
}

impl Observation {
    pub fn up(response_time_ms: Option<u64>) -> Self {
        Self {
            status: HealthStatus::Up,
            response_time_ms,
            error_message: None,
        }
    }

    pub fn degraded(response_time_ms: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            response_time_ms,
            error_message: Some(message.into()),
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Down,
            response_time_ms: None,
            error_message: Some(message.into()),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unknown,
            response_time_ms: None,
            error_message: Some(message.into()),
        }
    }

    /// Placeholder for a service that has never been checked
    pub fn no_data() -> Self {
        Self {
            status: HealthStatus::Unknown,
            response_time_ms: None,
            error_message: None,
        }
    }
}

/// Persisted observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub id: i64,
    pub service_id: i64,
    pub status: HealthStatus,
    pub response_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheck {
    pub fn observation(&self) -> Observation {
        Observation {
            status: self.status,
            response_time_ms: self.response_time_ms,
            error_message: self.error_message.clone(),
        }
    }
}

/// One entry of the `/api/health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub name: String,
    pub display_name: String,
    pub icon_emoji: String,
    pub public_url: Option<String>,
    pub status: HealthStatus,
    pub response_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub sparkline: Vec<bool>,
}

impl ServiceHealth {
    pub fn new(service: &Service, observation: Observation, sparkline: Vec<bool>) -> Self {
        Self {
            name: service.name.clone(),
            display_name: service.display_name.clone(),
            icon_emoji: service.icon_emoji.clone(),
            public_url: service.public_url.clone(),
            status: observation.status,
            response_time_ms: observation.response_time_ms,
            error_message: observation.error_message,
            sparkline,
        }
    }
}

/// How raw per-cycle statuses are turned into reported statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SmoothingPolicy {
    /// Report every observation as-is
    #[default]
    None,
    /// Report `down` only after `threshold` consecutive non-up observations;
    /// shorter failure streaks are reported as `degraded`
    ConsecutiveFailures { threshold: u32 },
}

impl SmoothingPolicy {
    /// How many recent rows must be inspected to apply this policy
    pub fn lookback(&self) -> usize {
        match self {
            SmoothingPolicy::None => 0,
            SmoothingPolicy::ConsecutiveFailures { threshold } => *threshold as usize,
        }
    }

    /// `failure_streak` counts consecutive non-up rows including the current one.
    pub fn apply(&self, observation: Observation, failure_streak: usize) -> Observation {
        match self {
            SmoothingPolicy::ConsecutiveFailures { threshold }
                if observation.status == HealthStatus::Down
                    && failure_streak < *threshold as usize =>
            {
                Observation {
                    status: HealthStatus::Degraded,
                    ..observation
                }
            }
            _ => observation,
        }
    }
}

/// How long health history is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Delete observations older than this many days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u32>,
    /// Keep at most this many observations per service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows_per_service: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: Some(crate::utils::DEFAULT_RETENTION_DAYS),
            max_rows_per_service: None,
        }
    }
}
