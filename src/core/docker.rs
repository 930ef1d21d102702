/// Docker integration
///
/// Container state lookups for the container probe and container counts for
/// the stats collector, behind the `ContainerRuntime` trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::errors::Error as BollardError;
use bollard::models::HealthStatusEnum;
use bollard::Docker;
use serde::Serialize;

use crate::core::error::RuntimeError;
use crate::utils::ContainerState;

/// Docker's own healthcheck verdict for a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerHealth {
    Healthy,
    Unhealthy,
    Starting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub state: ContainerState,
    /// `None` when the container defines no healthcheck
    pub health: Option<ContainerHealth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContainerCounts {
    pub running: usize,
    pub total: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Look up a container by name
    async fn inspect(&self, name: &str) -> Result<ContainerStatus, RuntimeError>;

    /// Count running and total containers on the host
    async fn container_counts(&self) -> Result<ContainerCounts, RuntimeError>;
}

#[derive(Clone)]
pub struct DockerManager {
    docker: Docker,
}

impl DockerManager {
    /// Create a Docker client using the local defaults (socket or DOCKER_HOST)
    pub fn new() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon. Is Docker running?")?;

        Ok(Self { docker })
    }

    /// Check if Docker daemon is accessible
    pub async fn check_docker(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    fn classify_error(name: &str, err: BollardError) -> RuntimeError {
        match err {
            BollardError::DockerResponseServerError {
                status_code: 404, ..
            } => RuntimeError::NotFound(name.to_string()),
            BollardError::DockerResponseServerError { message, .. } => RuntimeError::Api(message),
            other => RuntimeError::Unreachable(other.to_string()),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerManager {
    async fn inspect(&self, name: &str) -> Result<ContainerStatus, RuntimeError> {
        let response = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| Self::classify_error(name, e))?;

        let state = response.state.ok_or_else(|| {
            RuntimeError::Api(format!("inspect response for '{}' has no state", name))
        })?;

        let container_state = if state.running.unwrap_or(false) {
            ContainerState::Running
        } else {
            state
                .status
                .map(|s| ContainerState::from(s.to_string().as_str()))
                .unwrap_or(ContainerState::Unknown)
        };

        let health = state
            .health
            .and_then(|h| h.status)
            .and_then(|status| match status {
                HealthStatusEnum::HEALTHY => Some(ContainerHealth::Healthy),
                HealthStatusEnum::UNHEALTHY => Some(ContainerHealth::Unhealthy),
                HealthStatusEnum::STARTING => Some(ContainerHealth::Starting),
                _ => None,
            });

        Ok(ContainerStatus {
            state: container_state,
            health,
        })
    }

    async fn container_counts(&self) -> Result<ContainerCounts, RuntimeError> {
        let options = Some(ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        });

        let containers = self
            .docker
            .list_containers(options)
            .await
            .map_err(|e| Self::classify_error("*", e))?;

        let running = containers
            .iter()
            .filter(|c| c.state.as_deref() == Some("running"))
            .count();

        Ok(ContainerCounts {
            running,
            total: containers.len(),
        })
    }
}

/// Stand-in used when no Docker client could be constructed at startup.
///
/// Every call reports the runtime as unreachable so health cycles still
/// complete with `unknown` container observations.
pub struct UnavailableRuntime {
    reason: String,
}

impl UnavailableRuntime {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for UnavailableRuntime {
    async fn inspect(&self, _name: &str) -> Result<ContainerStatus, RuntimeError> {
        Err(RuntimeError::Unreachable(self.reason.clone()))
    }

    async fn container_counts(&self) -> Result<ContainerCounts, RuntimeError> {
        Err(RuntimeError::Unreachable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: scan-runner".to_string(),
        };
        assert_eq!(
            DockerManager::classify_error("scan-runner", err),
            RuntimeError::NotFound("scan-runner".to_string())
        );
    }

    #[test]
    fn test_classify_server_error() {
        let err = BollardError::DockerResponseServerError {
            status_code: 500,
            message: "internal".to_string(),
        };
        assert_eq!(
            DockerManager::classify_error("n8n", err),
            RuntimeError::Api("internal".to_string())
        );
    }

    #[tokio::test]
    async fn test_unavailable_runtime() {
        let runtime = UnavailableRuntime::new("socket missing");
        assert_eq!(
            runtime.inspect("n8n").await,
            Err(RuntimeError::Unreachable("socket missing".to_string()))
        );
        assert!(runtime.container_counts().await.is_err());
    }

    #[tokio::test]
    async fn test_docker_manager_creation() {
        // This test requires Docker to be running
        if let Ok(manager) = DockerManager::new() {
            if manager.check_docker().await {
                assert!(manager.container_counts().await.is_ok());
            }
        }
    }
}
