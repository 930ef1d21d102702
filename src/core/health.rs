/// Health checking for configured services
///
/// Dispatches each service to the probe matching its check type and runs a
/// whole batch concurrently. A probe that panics is reported as `down` for its
/// own service only.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::docker::ContainerRuntime;
use crate::core::models::{CheckType, Observation, Service};
use crate::core::probe::{CombinedProbe, ContainerProbe, HttpProbe, Probe};

pub struct HealthChecker {
    http: Arc<dyn Probe>,
    container: Arc<dyn Probe>,
    combined: Arc<dyn Probe>,
}

impl HealthChecker {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        http_timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let http: Arc<dyn Probe> = Arc::new(HttpProbe::new(http_timeout, accept_invalid_certs)?);
        let container: Arc<dyn Probe> = Arc::new(ContainerProbe::new(runtime));
        Ok(Self::with_probes(http, container))
    }

    /// Build from arbitrary probes; the combined probe wraps the two given
    pub fn with_probes(http: Arc<dyn Probe>, container: Arc<dyn Probe>) -> Self {
        let combined: Arc<dyn Probe> = Arc::new(CombinedProbe::new(http.clone(), container.clone()));
        Self {
            http,
            container,
            combined,
        }
    }

    fn probe_for(&self, check_type: CheckType) -> &Arc<dyn Probe> {
        match check_type {
            CheckType::Http => &self.http,
            CheckType::Docker => &self.container,
            CheckType::Both => &self.combined,
        }
    }

    /// Probe every service concurrently. The result is index-aligned with `services`.
    pub async fn check_all(self: &Arc<Self>, services: &[Service]) -> Vec<Observation> {
        let handles: Vec<_> = services
            .iter()
            .cloned()
            .map(|service| {
                let checker = Arc::clone(self);
                tokio::spawn(async move { checker.probe(&service).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(services)
            .map(|(result, service)| match result {
                Ok(observation) if observation.status.is_up() => {
                    debug!(service = %service.name, "probe finished");
                    observation
                }
                Ok(observation) => {
                    warn!(
                        service = %service.name,
                        status = %observation.status,
                        reason = observation.error_message.as_deref().unwrap_or(""),
                        "service not healthy"
                    );
                    observation
                }
                Err(e) => {
                    warn!(service = %service.name, error = %e, "probe task failed");
                    Observation::down(format!("probe task failed: {}", e))
                }
            })
            .collect()
    }
}

#[async_trait]
impl Probe for HealthChecker {
    async fn probe(&self, service: &Service) -> Observation {
        self.probe_for(service.check_type).probe(service).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::HealthStatus;

    /// Probe returning a fixed observation, or panicking for one service name
    struct Scripted {
        observation: Observation,
        panic_on: Option<&'static str>,
    }

    #[async_trait]
    impl Probe for Scripted {
        async fn probe(&self, service: &Service) -> Observation {
            if self.panic_on == Some(service.name.as_str()) {
                panic!("probe exploded for {}", service.name);
            }
            self.observation.clone()
        }
    }

    fn scripted(observation: Observation, panic_on: Option<&'static str>) -> Arc<dyn Probe> {
        Arc::new(Scripted { observation, panic_on })
    }

    fn service(name: &str, check_type: CheckType) -> Service {
        Service {
            id: 0,
            name: name.to_string(),
            display_name: name.to_string(),
            icon_emoji: String::new(),
            check_type,
            url: Some("http://localhost".to_string()),
            docker_container: Some(name.to_string()),
            public_url: None,
            enabled: true,
            priority: 0,
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_check_type() {
        let checker = Arc::new(HealthChecker::with_probes(
            scripted(Observation::up(Some(12)), None),
            scripted(Observation::down("container 'b' is stopped"), None),
        ));

        let services = vec![
            service("a", CheckType::Http),
            service("b", CheckType::Docker),
            service("c", CheckType::Both),
        ];
        let results = checker.check_all(&services).await;

        assert_eq!(results[0], Observation::up(Some(12)));
        assert_eq!(results[1].status, HealthStatus::Down);
        assert_eq!(results[2].status, HealthStatus::Down);
        assert_eq!(
            results[2].error_message.as_deref(),
            Some("container 'b' is stopped")
        );
    }

    #[tokio::test]
    async fn test_panicking_probe_is_isolated() {
        let checker = Arc::new(HealthChecker::with_probes(
            scripted(Observation::up(Some(5)), Some("broken")),
            scripted(Observation::up(None), None),
        ));

        let services = vec![
            service("broken", CheckType::Http),
            service("fine", CheckType::Http),
        ];
        let results = checker.check_all(&services).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, HealthStatus::Down);
        assert!(results[0]
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("probe task failed"));
        assert_eq!(results[1], Observation::up(Some(5)));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let checker = Arc::new(HealthChecker::with_probes(
            scripted(Observation::up(None), None),
            scripted(Observation::up(None), None),
        ));
        assert!(checker.check_all(&[]).await.is_empty());
    }
}
