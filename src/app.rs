/// Application state shared by the CLI commands and the HTTP server

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::{
    ContainerRuntime, Database, DockerManager, HealthChecker, Monitor, MonitorSettings,
    StatsCollector, UnavailableRuntime, Volume,
};
use crate::utils::AppConfig;

pub struct App {
    pub monitor: Monitor,
    pub stats: StatsCollector,
}

impl App {
    /// Open the database, register configured services and connect to Docker.
    ///
    /// A missing Docker daemon is not fatal: container checks then report
    /// `unknown` and the stats endpoint reports a docker error.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let db_path = config.database_path();
        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let inserted = db
            .ensure_defaults(&config.services)
            .context("Failed to register services")?;
        info!(path = %db_path.display(), inserted, "database ready");

        let runtime: Arc<dyn ContainerRuntime> = match DockerManager::new() {
            Ok(docker) => Arc::new(docker),
            Err(e) => {
                warn!(error = %e, "docker unavailable; container checks will report unknown");
                Arc::new(UnavailableRuntime::new(e.to_string()))
            }
        };

        Self::from_parts(config, Arc::new(db), runtime)
    }

    pub fn from_parts(
        config: &AppConfig,
        db: Arc<Database>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Result<Self> {
        let checker = HealthChecker::new(
            runtime.clone(),
            Duration::from_secs(config.checks.http_timeout_secs),
            config.checks.accept_invalid_certs,
        )?;

        let settings = MonitorSettings {
            sparkline_samples: config.checks.sparkline_samples,
            smoothing: config.checks.smoothing,
            retention: config.retention,
        };

        let volumes = config
            .volumes
            .iter()
            .map(|volume| Volume::from_config(volume, &config.data_dir))
            .collect();

        Ok(Self {
            monitor: Monitor::new(db, Arc::new(checker), settings),
            stats: StatsCollector::new(runtime, volumes),
        })
    }
}
