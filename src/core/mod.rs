pub mod docker;
pub mod error;
pub mod health;
pub mod history;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod probe;
pub mod recorder;
pub mod registry;
pub mod storage;

pub use docker::{ContainerRuntime, DockerManager, UnavailableRuntime};
pub use error::{RuntimeError, StorageError};
pub use health::HealthChecker;
pub use metrics::{StatsCollector, StatsSnapshot, Volume};
pub use models::{CheckType, HealthStatus, Observation, Service, ServiceHealth};
pub use monitor::{Monitor, MonitorSettings};
pub use storage::Database;
