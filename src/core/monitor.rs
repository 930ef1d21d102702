/// One polling cycle: probe every enabled service, record the raw results,
/// and assemble the health response with sparklines

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::health::HealthChecker;
use crate::core::models::{Observation, RetentionPolicy, Service, ServiceHealth, SmoothingPolicy};
use crate::core::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub sparkline_samples: usize,
    pub smoothing: SmoothingPolicy,
    pub retention: RetentionPolicy,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            sparkline_samples: crate::utils::DEFAULT_SPARKLINE_SAMPLES,
            smoothing: SmoothingPolicy::None,
            retention: RetentionPolicy::default(),
        }
    }
}

pub struct Monitor {
    db: Arc<Database>,
    checker: Arc<HealthChecker>,
    settings: MonitorSettings,
}

impl Monitor {
    pub fn new(db: Arc<Database>, checker: Arc<HealthChecker>, settings: MonitorSettings) -> Self {
        Self {
            db,
            checker,
            settings,
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run one cycle. Entries come back in registry order (priority, then id).
    ///
    /// Probe failures are folded into observations; only storage failures
    /// make the whole cycle fail.
    pub async fn poll(&self) -> Result<Vec<ServiceHealth>> {
        let started = Instant::now();

        let db = Arc::clone(&self.db);
        let services = tokio::task::spawn_blocking(move || db.list_enabled_services())
            .await
            .context("registry task failed")?
            .context("Failed to list services")?;

        let observations = self.checker.check_all(&services).await;

        let db = Arc::clone(&self.db);
        let settings = self.settings;
        let health = tokio::task::spawn_blocking(move || {
            let health = services
                .iter()
                .zip(observations)
                .map(|(service, observation)| record_and_summarize(&db, &settings, service, observation))
                .collect::<Result<Vec<_>>>()?;

            if let Err(e) = db.prune(&settings.retention) {
                warn!(error = %e, "failed to prune health history");
            }
            Ok::<_, anyhow::Error>(health)
        })
        .await
        .context("recorder task failed")??;

        let up = health.iter().filter(|h| h.status.is_up()).count();
        info!(
            services = health.len(),
            up,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "health cycle complete"
        );
        Ok(health)
    }
}

fn record_and_summarize(
    db: &Database,
    settings: &MonitorSettings,
    service: &Service,
    observation: Observation,
) -> Result<ServiceHealth> {
    db.record(service.id, &observation)
        .with_context(|| format!("Failed to record health for '{}'", service.name))?;

    let lookback = settings.smoothing.lookback();
    let streak = if lookback > 0 {
        db.failure_streak(service.id, lookback)?
    } else {
        0
    };
    let reported = settings.smoothing.apply(observation, streak);

    let sparkline = db.recent_history(service.id, settings.sparkline_samples)?;
    Ok(ServiceHealth::new(service, reported, sparkline))
}
