//! Bridge configuration loaded from TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    /// When set, every sensor type is managed and `disable` requests are
    /// overridden to forced-enable.
    #[serde(default)]
    pub sensor_test_mode: bool,
}

/// Where to find the sensor hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// The hub's well-known bus name, used to match ownership signals.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Path of the hub's raw data socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            socket_path: default_socket_path(),
        }
    }
}

/// Retry and exception-window timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay before a failed state machine retries, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Exception window armed when the hub appears on the bus.
    #[serde(default = "default_hub_started_window_ms")]
    pub hub_started_window_ms: u64,
    /// Exception window armed when the hub vanishes from the bus.
    #[serde(default = "default_hub_stopped_window_ms")]
    pub hub_stopped_window_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            hub_started_window_ms: default_hub_started_window_ms(),
            hub_stopped_window_ms: default_hub_stopped_window_ms(),
        }
    }
}

impl TimingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn hub_started_window(&self) -> Duration {
        Duration::from_millis(self.hub_started_window_ms)
    }

    pub fn hub_stopped_window(&self) -> Duration {
        Duration::from_millis(self.hub_stopped_window_ms)
    }
}

fn default_service_name() -> String {
    "org.sensorhub.Service".to_string()
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/run/sensorhubd.sock")
}

fn default_retry_delay_ms() -> u64 {
    10_000
}

fn default_hub_started_window_ms() -> u64 {
    2_000
}

fn default_hub_stopped_window_ms() -> u64 {
    5_000
}

/// Load configuration from the given path, or defaults when absent.
pub fn load_config(path: Option<&str>) -> Result<BridgeConfig, crate::error::BridgeError> {
    use crate::error::BridgeError;

    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("failed to read config: {e}")))?;
    toml::from_str(&content).map_err(|e| BridgeError::Config(format!("failed to parse config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("retry_delay_ms = 10000"));
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r#"
sensor_test_mode = true

[hub]
service_name = "org.sensorhub.Service"
socket_path = "/run/sensorhubd.sock"

[timing]
retry_delay_ms = 500
hub_started_window_ms = 100
hub_stopped_window_ms = 200
"#;
        let config: BridgeConfig = toml::from_str(toml_str).unwrap();
        assert!(config.sensor_test_mode);
        assert_eq!(config.timing.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.hub.service_name, "org.sensorhub.Service");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert!(!config.sensor_test_mode);
        assert_eq!(config.timing.retry_delay_ms, 10_000);
        assert_eq!(config.hub.socket_path, PathBuf::from("/run/sensorhubd.sock"));
    }
}
