/// Service probes
///
/// Each probe turns one service definition into an `Observation`. Probes never
/// return errors: every failure mode is classified into a status and message.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::docker::{ContainerHealth, ContainerRuntime};
use crate::core::error::RuntimeError;
use crate::core::models::{Observation, Service};

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, service: &Service) -> Observation;
}

/// GET the service URL and classify the outcome
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent(concat!("homewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, timeout })
    }

    pub async fn check_url(&self, url: &str) -> Observation {
        let started = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => {
                let elapsed = elapsed_ms(started);
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    Observation::up(Some(elapsed))
                } else {
                    Observation::degraded(Some(elapsed), format!("HTTP {}", status))
                }
            }
            Err(e) if e.is_timeout() => Observation::down(format!("timeout after {:?}", self.timeout)),
            Err(e) if e.is_connect() => Observation::down(format!("connection failed: {}", root_cause(&e))),
            Err(e) => Observation::down(e.to_string()),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Innermost error in the source chain
fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, service: &Service) -> Observation {
        match service.url.as_deref() {
            Some(url) => self.check_url(url).await,
            None => Observation::unknown(format!("service '{}' has no url configured", service.name)),
        }
    }
}

/// Ask the container runtime for the container's state and health
pub struct ContainerProbe {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerProbe {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub async fn check_container(&self, name: &str) -> Observation {
        match self.runtime.inspect(name).await {
            Ok(status) if !status.state.is_running() => {
                Observation::down(format!("container '{}' is {}", name, status.state.as_str()))
            }
            Ok(status) => match status.health {
                None | Some(ContainerHealth::Healthy) => Observation::up(None),
                Some(ContainerHealth::Starting) => {
                    Observation::degraded(None, format!("container '{}' health check starting", name))
                }
                Some(ContainerHealth::Unhealthy) => {
                    Observation::degraded(None, format!("container '{}' is unhealthy", name))
                }
            },
            Err(e @ RuntimeError::NotFound(_)) => Observation::down(e.to_string()),
            Err(e @ RuntimeError::Unreachable(_)) => Observation::unknown(e.to_string()),
            Err(e @ RuntimeError::Api(_)) => Observation::down(e.to_string()),
        }
    }
}

#[async_trait]
impl Probe for ContainerProbe {
    async fn probe(&self, service: &Service) -> Observation {
        match service.docker_container.as_deref() {
            Some(name) => self.check_container(name).await,
            None => Observation::unknown(format!(
                "service '{}' has no docker_container configured",
                service.name
            )),
        }
    }
}

/// Run the HTTP and container probes together and keep the worse result
pub struct CombinedProbe {
    http: Arc<dyn Probe>,
    container: Arc<dyn Probe>,
}

impl CombinedProbe {
    pub fn new(http: Arc<dyn Probe>, container: Arc<dyn Probe>) -> Self {
        Self { http, container }
    }
}

#[async_trait]
impl Probe for CombinedProbe {
    async fn probe(&self, service: &Service) -> Observation {
        let (http, container) = tokio::join!(self.http.probe(service), self.container.probe(service));
        combine(http, container)
    }
}

/// Combine the two halves of a `both` check.
///
/// The reported status is the worse of the two. The worse observation also
/// supplies timing and message; on a tie the HTTP observation is kept, so two
/// `up` results report the HTTP response time.
pub fn combine(http: Observation, container: Observation) -> Observation {
    if container.status < http.status {
        container
    } else {
        http
    }
}
