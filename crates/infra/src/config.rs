//! Service configuration loaded from `FEEDLINE_*` environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use feedline_auth::{GateConfig, PendingPolicy};
use feedline_events::DEFAULT_SUBSCRIBER_CAPACITY;
use feedline_observability::{LogConfig, LogFormat};

use crate::pagination::PaginationConfig;

pub const ENV_PREFIX: &str = "FEEDLINE_";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub bind_addr: SocketAddr,
    pub pagination: PaginationConfig,
    pub subscriber_capacity: usize,
    pub gate: GateConfig,
    pub log: LogConfig,
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            pagination: PaginationConfig::default(),
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            gate: GateConfig::default(),
            log: LogConfig::default(),
            database_url: None,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests use a map).
    ///
    /// `lookup` receives full variable names, e.g. `FEEDLINE_BIND_ADDR`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = Self::default();

        let bind_addr = vars
            .parse::<SocketAddr>("BIND_ADDR")?
            .unwrap_or(defaults.bind_addr);

        let default_page_size = vars
            .parse::<u32>("DEFAULT_PAGE_SIZE")?
            .unwrap_or(defaults.pagination.default_page_size);
        let max_page_size = vars
            .parse::<u32>("MAX_PAGE_SIZE")?
            .unwrap_or(defaults.pagination.max_page_size);
        if max_page_size == 0 {
            return Err(vars.invalid("MAX_PAGE_SIZE", "0"));
        }

        let subscriber_capacity = vars
            .parse::<usize>("SUBSCRIBER_CAPACITY")?
            .unwrap_or(defaults.subscriber_capacity);
        if subscriber_capacity == 0 {
            return Err(vars.invalid("SUBSCRIBER_CAPACITY", "0"));
        }

        let auth_timeout = vars
            .parse::<u64>("AUTH_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.gate.auth_timeout);

        let pending_policy = match vars.get("PENDING_POLICY") {
            None => defaults.gate.pending_policy,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "buffer" => PendingPolicy::Buffer,
                "discard" => PendingPolicy::Discard,
                _ => return Err(vars.invalid("PENDING_POLICY", &raw)),
            },
        };

        let format = vars
            .parse::<LogFormat>("LOG_FORMAT")?
            .unwrap_or(defaults.log.format);

        let database_url = vars.get("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            bind_addr,
            pagination: PaginationConfig {
                default_page_size: default_page_size.min(max_page_size),
                max_page_size,
            },
            subscriber_capacity,
            gate: GateConfig {
                auth_timeout,
                pending_policy,
            },
            log: LogConfig {
                format,
                ..defaults.log
            },
            database_url,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{name}"))
    }

    fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| self.invalid(name, &raw)),
        }
    }

    fn invalid(&self, name: &str, value: &str) -> ConfigError {
        ConfigError::Invalid {
            key: format!("{ENV_PREFIX}{name}"),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<FeedConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FeedConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config, FeedConfig::default());
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.pagination.default_page_size, 20);
        assert_eq!(config.pagination.max_page_size, 100);
        assert_eq!(config.subscriber_capacity, 64);
        assert_eq!(config.gate.auth_timeout, Duration::from_secs(10));
        assert_eq!(config.gate.pending_policy, PendingPolicy::Buffer);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("FEEDLINE_BIND_ADDR", "127.0.0.1:9000"),
            ("FEEDLINE_DEFAULT_PAGE_SIZE", "5"),
            ("FEEDLINE_MAX_PAGE_SIZE", "50"),
            ("FEEDLINE_SUBSCRIBER_CAPACITY", "8"),
            ("FEEDLINE_AUTH_TIMEOUT_MS", "250"),
            ("FEEDLINE_PENDING_POLICY", "discard"),
            ("FEEDLINE_LOG_FORMAT", "pretty"),
            ("FEEDLINE_DATABASE_URL", "postgres://localhost/feed"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.pagination.default_page_size, 5);
        assert_eq!(config.pagination.max_page_size, 50);
        assert_eq!(config.subscriber_capacity, 8);
        assert_eq!(config.gate.auth_timeout, Duration::from_millis(250));
        assert_eq!(config.gate.pending_policy, PendingPolicy::Discard);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/feed"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            load(&[("FEEDLINE_MAX_PAGE_SIZE", "lots")]).unwrap_err(),
            ConfigError::Invalid {
                key: "FEEDLINE_MAX_PAGE_SIZE".to_string(),
                value: "lots".to_string(),
            }
        );
        assert!(load(&[("FEEDLINE_SUBSCRIBER_CAPACITY", "0")]).is_err());
        assert!(load(&[("FEEDLINE_PENDING_POLICY", "maybe")]).is_err());
        assert!(load(&[("FEEDLINE_LOG_FORMAT", "xml")]).is_err());
        assert!(load(&[("FEEDLINE_BIND_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn default_page_size_never_exceeds_max() {
        let config = load(&[("FEEDLINE_MAX_PAGE_SIZE", "10")]).unwrap();
        assert_eq!(config.pagination.default_page_size, 10);
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = load(&[("FEEDLINE_DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database_url, None);
    }
}
