//! Server configuration management

use std::str::FromStr;
use std::time::Duration;

use aquila_templates::S3Settings;

use crate::error::{ApiError, Result};
use crate::logging::{LogFormat, LogLevel};
use crate::services::reward_fetcher::EndpointKind;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Service name used in logs
    pub project_name: String,

    /// Host to bind to
    pub host: String,

    /// Port serving reward pages and health checks
    pub port: u16,

    /// Port of the dedicated metrics listener
    pub metrics_port: u16,

    /// Also serve `/metrics` on the main port
    pub metrics_debug: bool,

    pub root_log_level: LogLevel,

    /// Level for the template store and cache
    pub blob_log_level: LogLevel,

    pub log_format: LogFormat,

    /// When false the template cache is disabled and never touches the store
    pub fetch_templates: bool,

    pub rewards: RewardServiceConfig,

    /// Template container connection, required when `fetch_templates` is set
    pub blob: Option<S3Settings>,
}

/// Upstream reward services and the HTTP client talking to them
#[derive(Debug, Clone, PartialEq)]
pub struct RewardServiceConfig {
    pub polaris_host: String,
    pub polaris_prefix: String,
    pub cosmos_host: String,
    pub cosmos_prefix: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Extra attempts after a 502/503/504
    pub max_retries: u32,
    /// Seconds, doubled on every retry
    pub backoff_factor: f64,
}

impl RewardServiceConfig {
    /// Base URL rewards are fetched from for the given service
    pub fn base_url(&self, kind: EndpointKind) -> String {
        match kind {
            EndpointKind::Polaris => format!("{}{}", self.polaris_host, self.polaris_prefix),
            EndpointKind::Cosmos => format!("{}{}", self.cosmos_host, self.cosmos_prefix),
        }
    }
}

impl Default for RewardServiceConfig {
    fn default() -> Self {
        Self {
            polaris_host: "http://polaris-api".to_string(),
            polaris_prefix: "/loyalty".to_string(),
            cosmos_host: "http://cosmos-api".to_string(),
            cosmos_prefix: "/loyalty".to_string(),
            connect_timeout: Duration::from_millis(3050),
            read_timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_factor: 1.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let reward_defaults = RewardServiceConfig::default();

        let string = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let fetch_templates = parse_bool(&var, "FETCH_TEMPLATES", true)?;
        let backoff_factor: f64 = parse(
            &var,
            "REWARD_BACKOFF_FACTOR",
            reward_defaults.backoff_factor,
        )?;
        if !backoff_factor.is_finite() || backoff_factor < 0.0 {
            return Err(ApiError::config(format!(
                "REWARD_BACKOFF_FACTOR must be a finite, non-negative number, got '{}'",
                backoff_factor
            )));
        }
        let blob = match var("BLOB_ENDPOINT_URL").filter(|v| !v.is_empty()) {
            Some(endpoint_url) => Some(S3Settings {
                endpoint_url,
                bucket: string("BLOB_CONTAINER", "aquila-templates"),
                access_key_id: var("BLOB_ACCESS_KEY_ID"),
                secret_access_key: var("BLOB_SECRET_ACCESS_KEY"),
            }),
            None if fetch_templates => {
                return Err(ApiError::config(
                    "BLOB_ENDPOINT_URL must be set when FETCH_TEMPLATES is enabled",
                ));
            }
            None => None,
        };

        Ok(Self {
            project_name: string("PROJECT_NAME", &defaults.project_name),
            host: string("HOST", &defaults.host),
            port: parse(&var, "PROJECT_PORT", defaults.port)?,
            metrics_port: parse(&var, "METRICS_PORT", defaults.metrics_port)?,
            metrics_debug: parse_bool(&var, "METRICS_DEBUG", defaults.metrics_debug)?,
            root_log_level: parse(&var, "ROOT_LOG_LEVEL", defaults.root_log_level)?,
            blob_log_level: parse(&var, "BLOB_LOGGING_LEVEL", defaults.blob_log_level)?,
            log_format: parse(&var, "LOG_FORMATTER", defaults.log_format)?,
            fetch_templates,
            rewards: RewardServiceConfig {
                polaris_host: string("POLARIS_HOST", &reward_defaults.polaris_host),
                polaris_prefix: string("POLARIS_PREFIX", &reward_defaults.polaris_prefix),
                cosmos_host: string("COSMOS_HOST", &reward_defaults.cosmos_host),
                cosmos_prefix: string("COSMOS_PREFIX", &reward_defaults.cosmos_prefix),
                connect_timeout: Duration::from_millis(parse(
                    &var,
                    "REWARD_CONNECT_TIMEOUT_MS",
                    reward_defaults.connect_timeout.as_millis() as u64,
                )?),
                read_timeout: Duration::from_millis(parse(
                    &var,
                    "REWARD_READ_TIMEOUT_MS",
                    reward_defaults.read_timeout.as_millis() as u64,
                )?),
                max_retries: parse(&var, "REWARD_MAX_RETRIES", reward_defaults.max_retries)?,
                backoff_factor,
            },
            blob,
        })
    }
}

fn parse<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ApiError::config(format!("Invalid {} value '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool<F>(var: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ApiError::config(format!("Invalid {} value '{}'", key, raw))),
        },
        None => Ok(default),
    }
}

impl Default for ServerConfig {
    /// Environment defaults, except template fetching is off
    fn default() -> Self {
        Self {
            project_name: "aquila".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            metrics_port: 9100,
            metrics_debug: false,
            root_log_level: LogLevel::Error,
            blob_log_level: LogLevel::Error,
            log_format: LogFormat::Json,
            fetch_templates: false,
            rewards: RewardServiceConfig::default(),
            blob: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BLOB_ENDPOINT_URL", "http://minio:9000")]).unwrap();

        assert_eq!(config.project_name, "aquila");
        assert_eq!(config.port, 5000);
        assert_eq!(config.metrics_port, 9100);
        assert!(!config.metrics_debug);
        assert!(config.fetch_templates);
        assert_eq!(config.root_log_level, LogLevel::Error);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.rewards.base_url(EndpointKind::Polaris),
            "http://polaris-api/loyalty"
        );
        assert_eq!(
            config.rewards.base_url(EndpointKind::Cosmos),
            "http://cosmos-api/loyalty"
        );
        assert_eq!(config.rewards.connect_timeout, Duration::from_millis(3050));
        assert_eq!(config.rewards.read_timeout, Duration::from_secs(10));

        let blob = config.blob.unwrap();
        assert_eq!(blob.bucket, "aquila-templates");
        assert_eq!(blob.access_key_id, None);
    }

    #[test]
    fn test_rejects_unusable_backoff_factor() {
        for value in ["inf", "-inf", "NaN", "-1"] {
            let result = load(&[
                ("BLOB_ENDPOINT_URL", "http://minio:9000"),
                ("REWARD_BACKOFF_FACTOR", value),
            ]);
            assert!(
                matches!(result, Err(ApiError::Config(_))),
                "{} should be rejected",
                value
            );
        }

        let config = load(&[
            ("BLOB_ENDPOINT_URL", "http://minio:9000"),
            ("REWARD_BACKOFF_FACTOR", "0"),
        ])
        .unwrap();
        assert_eq!(config.rewards.backoff_factor, 0.0);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PROJECT_PORT", "8080"),
            ("METRICS_DEBUG", "True"),
            ("ROOT_LOG_LEVEL", "DEBUG"),
            ("BLOB_LOGGING_LEVEL", "WARNING"),
            ("LOG_FORMATTER", "brief"),
            ("FETCH_TEMPLATES", "false"),
            ("POLARIS_HOST", "http://localhost:8000"),
            ("POLARIS_PREFIX", "/api"),
            ("REWARD_MAX_RETRIES", "0"),
            ("REWARD_BACKOFF_FACTOR", "0.5"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.metrics_debug);
        assert_eq!(config.root_log_level, LogLevel::Debug);
        assert_eq!(config.blob_log_level, LogLevel::Warning);
        assert_eq!(config.log_format, LogFormat::Brief);
        assert!(!config.fetch_templates);
        assert!(config.blob.is_none());
        assert_eq!(
            config.rewards.base_url(EndpointKind::Polaris),
            "http://localhost:8000/api"
        );
        assert_eq!(config.rewards.max_retries, 0);
        assert_eq!(config.rewards.backoff_factor, 0.5);
    }

    #[test]
    fn test_invalid_values() {
        let base = ("BLOB_ENDPOINT_URL", "http://minio:9000");

        assert!(matches!(
            load(&[base, ("PROJECT_PORT", "not-a-port")]),
            Err(ApiError::Config(msg)) if msg.contains("PROJECT_PORT")
        ));
        assert!(load(&[base, ("ROOT_LOG_LEVEL", "LOUD")]).is_err());
        assert!(load(&[base, ("LOG_FORMATTER", "xml")]).is_err());
        assert!(load(&[base, ("METRICS_DEBUG", "maybe")]).is_err());
    }

    #[test]
    fn test_blob_endpoint_required_when_fetching_templates() {
        assert!(matches!(load(&[]), Err(ApiError::Config(msg)) if msg.contains("BLOB_ENDPOINT_URL")));
        assert!(load(&[("FETCH_TEMPLATES", "0")]).is_ok());
    }
}
