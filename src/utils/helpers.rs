/// Helper utilities for homewatch

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Bytes to GiB, rounded to one decimal
pub fn bytes_to_gb(bytes: u64) -> f64 {
    round1(bytes as f64 / GIB)
}

/// Percentage of `part` in `total`, rounded to one decimal (0 when total is 0)
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

/// Format an optional response time for terminal output
pub fn format_response_time(ms: Option<u64>) -> String {
    match ms {
        Some(ms) if ms >= 1000 => format!("{:.1}s", ms as f64 / 1000.0),
        Some(ms) => format!("{}ms", ms),
        None => "-".to_string(),
    }
}

/// Truncate string with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a sparkline as a compact terminal string
pub fn sparkline_glyphs(samples: &[bool]) -> String {
    samples.iter().map(|up| if *up { '▮' } else { '▯' }).collect()
}

/// Parse Docker container status to simplified state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    Paused,
    Restarting,
    Dead,
    Unknown,
}

impl From<&str> for ContainerState {
    fn from(status: &str) -> Self {
        let status_lower = status.to_lowercase();
        if status_lower.starts_with("up") || status_lower.contains("running") {
            ContainerState::Running
        } else if status_lower.contains("paused") {
            ContainerState::Paused
        } else if status_lower.contains("restarting") {
            ContainerState::Restarting
        } else if status_lower.contains("dead") || status_lower.contains("removing") {
            ContainerState::Dead
        } else if status_lower.contains("exited")
            || status_lower.contains("stopped")
            || status_lower.contains("created")
        {
            ContainerState::Stopped
        } else {
            ContainerState::Unknown
        }
    }
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Stopped => "stopped",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Dead => "dead",
            ContainerState::Unknown => "in an unknown state",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_gb() {
        assert_eq!(bytes_to_gb(0), 0.0);
        assert_eq!(bytes_to_gb(1073741824), 1.0);
        assert_eq!(bytes_to_gb(1610612736), 1.5);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(10, 10), 100.0);
    }

    #[test]
    fn test_format_response_time() {
        assert_eq!(format_response_time(Some(120)), "120ms");
        assert_eq!(format_response_time(Some(2500)), "2.5s");
        assert_eq!(format_response_time(None), "-");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("connection refused by peer", 12), "connectio...");
    }

    #[test]
    fn test_sparkline_glyphs() {
        assert_eq!(sparkline_glyphs(&[true, false, true]), "▮▯▮");
        assert_eq!(sparkline_glyphs(&[]), "");
    }

    #[test]
    fn test_container_state() {
        assert_eq!(ContainerState::from("Up 2 hours"), ContainerState::Running);
        assert_eq!(ContainerState::from("running"), ContainerState::Running);
        assert_eq!(ContainerState::from("Exited (0)"), ContainerState::Stopped);
        assert_eq!(ContainerState::from("created"), ContainerState::Stopped);
        assert_eq!(ContainerState::from("paused"), ContainerState::Paused);
        assert_eq!(ContainerState::from(""), ContainerState::Unknown);
        assert!(ContainerState::Running.is_running());
        assert!(!ContainerState::Stopped.is_running());
    }
}
