//! Configuration file management.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shallot_types::network::PortLayout;
use shallot_types::{BASE_ONION_ROUTER_PORT, BASE_USER_PORT, REGISTRY_PORT};
use tracing_subscriber::EnvFilter;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SHALLOT_CONFIG";

/// Config file looked up in the working directory when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "shallot.toml";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Addresses and ports.
    #[serde(default)]
    pub network: NetworkConfig,
    /// How many actors to launch.
    #[serde(default)]
    pub topology: TopologyConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Interface every actor binds and every client dials.
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_registry_port")]
    pub registry_port: u16,
    /// Onion router `n` listens on `base_onion_router_port + n`.
    #[serde(default = "default_base_onion_router_port")]
    pub base_onion_router_port: u16,
    /// User `u` listens on `base_user_port + u`.
    #[serde(default = "default_base_user_port")]
    pub base_user_port: u16,
}

/// Network size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default = "default_onion_routers")]
    pub onion_routers: u32,
    #[serde(default = "default_users")]
    pub users: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level for `shallot*` targets: "trace" | "debug" | "info" |
    /// "warn" | "error". Used only when `RUST_LOG` is unset or invalid.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_registry_port() -> u16 {
    REGISTRY_PORT
}

fn default_base_onion_router_port() -> u16 {
    BASE_ONION_ROUTER_PORT
}

fn default_base_user_port() -> u16 {
    BASE_USER_PORT
}

fn default_onion_routers() -> u32 {
    10
}

fn default_users() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            registry_port: default_registry_port(),
            base_onion_router_port: default_base_onion_router_port(),
            base_user_port: default_base_user_port(),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            onion_routers: default_onion_routers(),
            users: default_users(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Build the log filter, preferring `RUST_LOG` over the configured level.
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        self.env_filter_from(rust_log.as_deref())
    }

    fn env_filter_from(&self, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
        if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
            match EnvFilter::try_new(directives) {
                Ok(filter) => return Ok(filter),
                Err(e) => eprintln!("ignoring invalid {}: {e}", EnvFilter::DEFAULT_ENV),
            }
        }
        Ok(EnvFilter::try_new(format!("shallot={}", self.log_level))?)
    }
}

impl DaemonConfig {
    /// Load configuration from `$SHALLOT_CONFIG`, else `./shallot.toml`.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from `path`.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Routing-address layout shared by every actor of this network.
    pub fn port_layout(&self) -> PortLayout {
        PortLayout {
            registry_port: self.network.registry_port,
            base_onion_router_port: self.network.base_onion_router_port,
            base_user_port: self.network.base_user_port,
        }
    }

    fn config_path() -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.network.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.network.registry_port, 8080);
        assert_eq!(config.topology.onion_routers, 10);
        assert_eq!(config.topology.users, 2);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.port_layout(), config.port_layout());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: DaemonConfig = toml::from_str(
            r#"
            [network]
            base_onion_router_port = 14000

            [topology]
            onion_routers = 3
            "#,
        )
        .expect("parse");

        let layout = parsed.port_layout();
        assert_eq!(layout.router_port(2), 14002);
        assert_eq!(layout.user_port(1), 3001);
        assert_eq!(parsed.topology.onion_routers, 3);
        assert_eq!(parsed.topology.users, 2);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("shallot-{}.toml", std::process::id()));
        std::fs::write(&path, "[logging]\nlog_level = \"debug\"\n").expect("write");

        let config = DaemonConfig::load_from(&path).expect("load");
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.network.registry_port, 8080);

        std::fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn test_rust_log_overrides_configured_level() {
        let logging = LoggingConfig::default();

        let filter = logging.env_filter_from(Some("shallot=debug")).expect("filter");
        assert_eq!(filter.to_string(), "shallot=debug");

        let filter = logging.env_filter_from(None).expect("filter");
        assert_eq!(filter.to_string(), "shallot=info");
    }

    #[test]
    fn test_blank_or_invalid_rust_log_falls_back() {
        let logging = LoggingConfig {
            log_level: "warn".to_string(),
        };
        for rust_log in ["", "  ", "shallot=loudest"] {
            let filter = logging.env_filter_from(Some(rust_log)).expect("filter");
            assert_eq!(filter.to_string(), "shallot=warn", "{rust_log:?}");
        }
    }

    #[test]
    fn test_bad_configured_level_is_error() {
        let logging = LoggingConfig {
            log_level: "loudest".to_string(),
        };
        assert!(logging.env_filter_from(None).is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        assert!(toml::from_str::<DaemonConfig>("[network]\nhost = 5").is_err());
    }
}
