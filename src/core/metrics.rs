/// Host statistics for the stats endpoint
///
/// Container counts, volume usage, CPU and RAM are gathered concurrently and
/// independently. A failing metric becomes an `{error}` marker for that key
/// only; nothing is persisted and nothing is retried within a request.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use nix::sys::statvfs::statvfs;
use sysinfo::System;
use tracing::debug;

use crate::core::docker::{ContainerCounts, ContainerRuntime};
use crate::utils::{bytes_to_gb, percent, round1, VolumeConfig};

/// A metric value or the reason it could not be read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric<T> {
    Ok(T),
    Failed { error: String },
}

impl<T> Metric<T> {
    pub fn failed(error: impl Into<String>) -> Self {
        Metric::Failed {
            error: error.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Metric::Ok(_))
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Metric<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Metric::Ok(value),
            Err(e) => Metric::failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskStats {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}

impl DiskStats {
    /// `free` is the space available to unprivileged users, so `used + free`
    /// can fall short of `total` on filesystems with reserved blocks
    pub fn from_bytes(total: u64, used: u64, free: u64) -> Self {
        Self {
            total_gb: bytes_to_gb(total),
            used_gb: bytes_to_gb(used),
            free_gb: bytes_to_gb(free),
            percent: percent(used, total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuStats {
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RamStats {
    pub total_gb: f64,
    pub used_gb: f64,
    pub percent: f64,
}

/// One `/api/stats` response
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub docker: Metric<ContainerCounts>,
    /// In configuration order
    pub volumes: Vec<(String, Metric<DiskStats>)>,
    pub cpu: Metric<CpuStats>,
    pub ram: Metric<RamStats>,
}

impl Serialize for StatsSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.volumes.len() + 3))?;
        map.serialize_entry("docker", &self.docker)?;
        for (key, metric) in &self.volumes {
            map.serialize_entry(key, metric)?;
        }
        map.serialize_entry("cpu", &self.cpu)?;
        map.serialize_entry("ram", &self.ram)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    /// Usage of the filesystem containing this path
    Mount(PathBuf),
    /// Entry in a JSON file written by a host-side collector
    StatsFile(PathBuf),
    /// Neither source configured
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub key: String,
    pub source: VolumeSource,
}

impl Volume {
    /// Relative stats files resolve against `data_dir`
    pub fn from_config(config: &VolumeConfig, data_dir: &Path) -> Self {
        let source = match (&config.path, &config.stats_file) {
            (Some(path), _) => VolumeSource::Mount(path.clone()),
            (None, Some(file)) if file.is_absolute() => VolumeSource::StatsFile(file.clone()),
            (None, Some(file)) => VolumeSource::StatsFile(data_dir.join(file)),
            (None, None) => {
                VolumeSource::Invalid(format!("volume '{}' has no path or stats_file", config.key))
            }
        };
        Self {
            key: config.key.clone(),
            source,
        }
    }
}

pub struct StatsCollector {
    runtime: Arc<dyn ContainerRuntime>,
    volumes: Vec<Volume>,
}

impl StatsCollector {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, volumes: Vec<Volume>) -> Self {
        Self { runtime, volumes }
    }

    pub async fn collect(&self) -> StatsSnapshot {
        let volumes = futures::future::join_all(self.volumes.iter().map(|volume| async move {
            (volume.key.clone(), collect_volume(volume).await)
        }));

        let (docker, volumes, cpu, ram) = tokio::join!(
            self.collect_docker(),
            volumes,
            collect_cpu(),
            collect_ram()
        );

        debug!(volumes = volumes.len(), "stats collected");
        StatsSnapshot {
            docker,
            volumes,
            cpu,
            ram,
        }
    }

    async fn collect_docker(&self) -> Metric<ContainerCounts> {
        self.runtime.container_counts().await.into()
    }
}

async fn collect_volume(volume: &Volume) -> Metric<DiskStats> {
    match &volume.source {
        VolumeSource::Mount(path) => {
            let path = path.clone();
            match tokio::task::spawn_blocking(move || disk_usage(&path)).await {
                Ok(result) => result.into(),
                Err(e) => Metric::failed(format!("disk task failed: {}", e)),
            }
        }
        VolumeSource::StatsFile(file) => read_stats_file(file, &volume.key).await,
        VolumeSource::Invalid(reason) => Metric::failed(reason.clone()),
    }
}

/// Usage of the filesystem containing `path`, whatever its type (tmpfs, NFS
/// and CIFS mounts included)
fn disk_usage(path: &Path) -> Result<DiskStats, String> {
    let stat = statvfs(path).map_err(|e| format!("{}: {}", path.display(), e))?;

    let fragment = stat.fragment_size() as u64;
    let total = stat.blocks() as u64 * fragment;
    let used = (stat.blocks() as u64).saturating_sub(stat.blocks_free() as u64) * fragment;
    let free = stat.blocks_available() as u64 * fragment;
    Ok(DiskStats::from_bytes(total, used, free))
}

async fn read_stats_file(file: &Path, key: &str) -> Metric<DiskStats> {
    let contents = match tokio::fs::read_to_string(file).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Metric::failed("stats not yet collected")
        }
        Err(e) => return Metric::failed(format!("{}: {}", file.display(), e)),
    };

    parse_stats_file(&contents, key)
}

fn parse_stats_file(contents: &str, key: &str) -> Metric<DiskStats> {
    let mut entries: HashMap<String, Metric<DiskStats>> = match serde_json::from_str(contents) {
        Ok(entries) => entries,
        Err(e) => return Metric::failed(format!("invalid stats file: {}", e)),
    };

    entries
        .remove(key)
        .unwrap_or_else(|| Metric::failed(format!("no stats reported for '{}'", key)))
}

async fn collect_cpu() -> Metric<CpuStats> {
    let result = tokio::task::spawn_blocking(|| {
        let mut sys = System::new();
        sys.refresh_cpu();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu();

        if sys.cpus().is_empty() {
            return Err("CPU monitoring unavailable".to_string());
        }
        Ok(CpuStats {
            percent: round1(f64::from(sys.global_cpu_info().cpu_usage())),
        })
    })
    .await;

    match result {
        Ok(result) => result.into(),
        Err(e) => Metric::failed(format!("cpu task failed: {}", e)),
    }
}

async fn collect_ram() -> Metric<RamStats> {
    let result = tokio::task::spawn_blocking(|| {
        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err("RAM monitoring unavailable".to_string());
        }
        let used = total.saturating_sub(sys.available_memory());
        Ok(RamStats {
            total_gb: bytes_to_gb(total),
            used_gb: bytes_to_gb(used),
            percent: percent(used, total),
        })
    })
    .await;

    match result {
        Ok(result) => result.into(),
        Err(e) => Metric::failed(format!("ram task failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::docker::MockContainerRuntime;
    use crate::core::error::RuntimeError;
    use serde_json::json;
    use tempfile::tempdir;

    const NAS_JSON: &str = r#"{
        "h_drive": {"total_gb": 3629.4, "used_gb": 2210.0, "free_gb": 1419.4, "percent": 60.9},
        "i_drive": {"error": "share not mounted"}
    }"#;

    #[test]
    fn test_disk_stats_from_bytes() {
        let gib = 1024 * 1024 * 1024;
        let stats = DiskStats::from_bytes(100 * gib, 75 * gib, 20 * gib);
        assert_eq!(stats.total_gb, 100.0);
        assert_eq!(stats.used_gb, 75.0);
        assert_eq!(stats.free_gb, 20.0);
        assert_eq!(stats.percent, 75.0);
    }

    #[test]
    fn test_disk_usage_of_root() {
        let stats = disk_usage(Path::new("/")).unwrap();
        assert!(stats.total_gb > 0.0);
        assert!(stats.used_gb <= stats.total_gb);
        assert!(stats.free_gb <= stats.total_gb);
        assert!((0.0..=100.0).contains(&stats.percent));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_disk_usage_of_tmpfs_mount() {
        // /dev/shm is a tmpfs on Linux hosts and most containers
        let shm = Path::new("/dev/shm");
        if !shm.is_dir() {
            return;
        }

        let stat = statvfs(shm).unwrap();
        let fragment = stat.fragment_size() as u64;
        let expected = DiskStats::from_bytes(
            stat.blocks() as u64 * fragment,
            (stat.blocks() as u64 - stat.blocks_free() as u64) * fragment,
            stat.blocks_available() as u64 * fragment,
        );

        let stats = disk_usage(shm).unwrap();
        assert_eq!(stats.total_gb, expected.total_gb);
        assert!(stats.percent <= 100.0);
    }

    #[test]
    fn test_disk_usage_of_missing_path() {
        let err = disk_usage(Path::new("/definitely/not/mounted/here")).unwrap_err();
        assert!(err.starts_with("/definitely/not/mounted/here: "), "{}", err);
    }

    #[test]
    fn test_parse_stats_file() {
        assert_eq!(
            parse_stats_file(NAS_JSON, "h_drive"),
            Metric::Ok(DiskStats {
                total_gb: 3629.4,
                used_gb: 2210.0,
                free_gb: 1419.4,
                percent: 60.9,
            })
        );
        assert_eq!(
            parse_stats_file(NAS_JSON, "i_drive"),
            Metric::failed("share not mounted")
        );
        assert_eq!(
            parse_stats_file(NAS_JSON, "z_drive"),
            Metric::failed("no stats reported for 'z_drive'")
        );
        assert!(matches!(
            parse_stats_file("not json", "h_drive"),
            Metric::Failed { error } if error.starts_with("invalid stats file")
        ));
    }

    #[tokio::test]
    async fn test_missing_stats_file() {
        let dir = tempdir().unwrap();
        let volume = Volume::from_config(&VolumeConfig::stats_file("h_drive", "nas_stats.json"), dir.path());
        assert_eq!(
            collect_volume(&volume).await,
            Metric::failed("stats not yet collected")
        );
    }

    #[tokio::test]
    async fn test_stats_file_volume() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("nas_stats.json"), NAS_JSON).unwrap();

        let volume = Volume::from_config(&VolumeConfig::stats_file("h_drive", "nas_stats.json"), dir.path());
        assert_eq!(
            volume.source,
            VolumeSource::StatsFile(dir.path().join("nas_stats.json"))
        );
        assert!(collect_volume(&volume).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_mount_is_isolated() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_container_counts()
            .returning(|| Ok(ContainerCounts { running: 7, total: 9 }));

        let volumes = vec![Volume::from_config(
            &VolumeConfig::path("c_drive", "/definitely/not/mounted/here"),
            Path::new("/data"),
        )];
        let snapshot = StatsCollector::new(Arc::new(runtime), volumes).collect().await;

        assert_eq!(snapshot.docker, Metric::Ok(ContainerCounts { running: 7, total: 9 }));
        assert_eq!(snapshot.volumes.len(), 1);
        assert!(!snapshot.volumes[0].1.is_ok());
        assert!(snapshot.cpu.is_ok(), "{:?}", snapshot.cpu);
        assert!(snapshot.ram.is_ok(), "{:?}", snapshot.ram);
    }

    #[tokio::test]
    async fn test_docker_failure_is_marked() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_container_counts()
            .returning(|| Err(RuntimeError::Unreachable("no socket".to_string())));

        let snapshot = StatsCollector::new(Arc::new(runtime), Vec::new()).collect().await;
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json["docker"],
            json!({"error": "container runtime unreachable: no socket"})
        );
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = StatsSnapshot {
            docker: Metric::Ok(ContainerCounts { running: 3, total: 4 }),
            volumes: vec![
                ("c_drive".to_string(), Metric::Ok(DiskStats::from_bytes(0, 0, 0))),
                ("h_drive".to_string(), Metric::failed("stats not yet collected")),
            ],
            cpu: Metric::Ok(CpuStats { percent: 12.5 }),
            ram: Metric::failed("RAM monitoring unavailable"),
        };

        let text = serde_json::to_string(&snapshot).unwrap();
        let keys: Vec<_> = ["\"docker\"", "\"c_drive\"", "\"h_drive\"", "\"cpu\"", "\"ram\""]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["docker"], json!({"running": 3, "total": 4}));
        assert_eq!(json["h_drive"], json!({"error": "stats not yet collected"}));
        assert_eq!(json["cpu"], json!({"percent": 12.5}));
        assert_eq!(json["ram"], json!({"error": "RAM monitoring unavailable"}));
        assert_eq!(json["c_drive"]["percent"], 0.0);
    }
}
