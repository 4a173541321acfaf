//! Tracing Subscriber Initialization
//!
//! JSON output for deployments, pretty output for local work. `RUST_LOG`
//! overrides the default filter.

use custab_core::ConfigError;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "custab_engine=info,custab_storage=info,warn";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ConfigError::InvalidValue {
                field: "CUSTAB_LOG_FORMAT".to_string(),
                value: s.to_string(),
                reason: "expected json or pretty".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "custab".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(name) = lookup("CUSTAB_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(format) = lookup("CUSTAB_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup; a second call fails because a subscriber is
/// already set.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ConfigError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    };
    installed.map_err(|e| ConfigError::InvalidValue {
        field: "tracing subscriber".to_string(),
        value: config.service_name.clone(),
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.service_name, "custab");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_telemetry_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CUSTAB_SERVICE_NAME", "layouts"),
            ("CUSTAB_LOG_FORMAT", "Pretty"),
        ]
        .into_iter()
        .collect();
        let config = TelemetryConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.service_name, "layouts");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let err = TelemetryConfig::from_lookup(|k| {
            (k == "CUSTAB_LOG_FORMAT").then(|| "xml".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
