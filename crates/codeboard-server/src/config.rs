//! Server configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use codeboard_core::CoordinatorConfig;
use thiserror::Error;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

pub const PORT_VAR: &str = "PORT";
pub const BIND_VAR: &str = "CODEBOARD_BIND";
pub const CORS_ORIGIN_VAR: &str = "CODEBOARD_CORS_ORIGIN";
pub const EVICT_EMPTY_ROOMS_VAR: &str = "CODEBOARD_EVICT_EMPTY_ROOMS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Single allowed browser origin; `None` allows any origin.
    pub cors_origin: Option<String>,
    pub coordinator: CoordinatorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            cors_origin: None,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    /// Unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(port) = get(PORT_VAR) {
            let port = port.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                var: PORT_VAR,
                value: port,
            })?;
            config.bind_addr.set_port(port);
        }

        if let Some(host) = get(BIND_VAR) {
            let ip = host.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                var: BIND_VAR,
                value: host,
            })?;
            config.bind_addr.set_ip(ip);
        }

        config.cors_origin = get(CORS_ORIGIN_VAR);

        if let Some(flag) = get(EVICT_EMPTY_ROOMS_VAR) {
            config.coordinator.evict_empty_rooms = parse_bool(&flag).ok_or(ConfigError::InvalidValue {
                var: EVICT_EMPTY_ROOMS_VAR,
                value: flag,
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.coordinator.evict_empty_rooms);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "3030"),
            ("CODEBOARD_BIND", "127.0.0.1"),
            ("CODEBOARD_CORS_ORIGIN", "http://localhost:3000"),
            ("CODEBOARD_EVICT_EMPTY_ROOMS", "yes"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:3030".parse().unwrap());
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3000"));
        assert!(config.coordinator.evict_empty_rooms);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = config_from(&[("PORT", " "), ("CODEBOARD_CORS_ORIGIN", "")]).unwrap();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.cors_origin, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidValue { var: "PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("CODEBOARD_EVICT_EMPTY_ROOMS", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
