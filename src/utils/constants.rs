/// Built-in defaults
///
/// Used when no configuration file exists yet; `homewatch config init` writes
/// them out so they can be edited without rebuilding.

use crate::core::models::{CheckType, ServiceConfig};
use crate::utils::app_config::VolumeConfig;

pub const APP_NAME: &str = "homewatch";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "dashboard.db";
pub const NAS_STATS_FILE_NAME: &str = "nas_stats.json";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SPARKLINE_SAMPLES: usize = 48;
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Keys of the stats response that volumes may not use
pub const RESERVED_STATS_KEYS: &[&str] = &["docker", "cpu", "ram"];

/// Service definition: (name, display name, emoji, check type, url, container, public url)
type DefaultService = (
    &'static str,
    &'static str,
    &'static str,
    CheckType,
    Option<&'static str>,
    Option<&'static str>,
    Option<&'static str>,
);

const DEFAULT_SERVICES: &[DefaultService] = &[
    ("n8n", "n8n Workflows", "⚡", CheckType::Both,
        Some("http://localhost:5678"), Some("n8n"), Some("http://localhost:5678")),
    ("jellyfin", "Jellyfin Media", "🎬", CheckType::Http,
        Some("http://localhost:8096"), Some("jellyfin"), Some("http://localhost:8096")),
    ("qbittorrent", "qBittorrent", "🌊", CheckType::Http,
        Some("http://localhost:8080"), Some("qbittorrent"), Some("http://localhost:8080")),
    ("open-webui", "Open WebUI", "🧠", CheckType::Http,
        Some("http://host.docker.internal:3000"), Some("open-webui"), Some("http://localhost:3000")),
    ("discord-relay", "Discord Relay", "🤖", CheckType::Docker,
        None, Some("claude-relay"), None),
    ("cloudflared", "Cloudflare Tunnel", "☁️", CheckType::Docker,
        None, Some("cloudflared-tunnel"), None),
    ("scan-runner", "Scan Runner", "📦", CheckType::Docker,
        None, Some("scan-runner"), None),
    ("uptime-kuma", "Uptime Kuma", "📊", CheckType::Http,
        Some("http://host.docker.internal:3001"), Some("uptime-kuma"), Some("http://localhost:3001")),
    ("home-assistant", "Home Assistant", "🏠", CheckType::Http,
        Some("http://homeassistant.local:8123"), None, Some("http://homeassistant.local:8123")),
];

/// The built-in service list
pub fn default_services() -> Vec<ServiceConfig> {
    DEFAULT_SERVICES
        .iter()
        .map(|(name, display_name, emoji, check_type, url, container, public_url)| ServiceConfig {
            name: name.to_string(),
            display_name: display_name.to_string(),
            icon_emoji: emoji.to_string(),
            check_type: *check_type,
            url: url.map(str::to_string),
            docker_container: container.map(str::to_string),
            public_url: public_url.map(str::to_string),
            enabled: true,
        })
        .collect()
}

/// The built-in volume list: the local drive mounted at /host_c and two NAS
/// shares reported by a host-side collector
pub fn default_volumes() -> Vec<VolumeConfig> {
    vec![
        VolumeConfig::path("c_drive", "/host_c"),
        VolumeConfig::stats_file("h_drive", NAS_STATS_FILE_NAME),
        VolumeConfig::stats_file("i_drive", NAS_STATS_FILE_NAME),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_services_are_consistent() {
        let services = default_services();
        let names: HashSet<_> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), services.len());

        for service in &services {
            if service.check_type.includes_http() {
                assert!(service.url.is_some(), "{} needs a url", service.name);
            }
            if service.check_type.includes_docker() {
                assert!(service.docker_container.is_some(), "{} needs a container", service.name);
            }
        }
    }

    #[test]
    fn test_default_volumes() {
        let keys: Vec<_> = default_volumes().into_iter().map(|v| v.key).collect();
        assert_eq!(keys, vec!["c_drive", "h_drive", "i_drive"]);
    }
}
