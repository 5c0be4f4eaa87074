mod access_log;

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::logger::Logger;

pub use access_log::{AccessLogConfig, DEFAULT_FIELDS_KEY, DEFAULT_LOGGER_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Settings for the demo server binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub log_format: LogFormat,
    pub fields_key: String,
    pub logger_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| {
                info!("SERVER_HOST not set, using default: 0.0.0.0");
                "0.0.0.0".to_string()
            }),
            server_port: Self::parse_var(&lookup, "SERVER_PORT", 8080)
                .context("Failed to parse SERVER_PORT")?,
            log_format: Self::parse_var(&lookup, "LOG_FORMAT", LogFormat::Pretty)
                .context("Failed to parse LOG_FORMAT")?,
            fields_key: lookup("ACCESS_LOG_FIELDS_KEY")
                .unwrap_or_else(|| DEFAULT_FIELDS_KEY.to_string()),
            logger_key: lookup("ACCESS_LOG_LOGGER_KEY")
                .unwrap_or_else(|| DEFAULT_LOGGER_KEY.to_string()),
        };

        config.validate()?;

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    fn parse_var<F, T>(lookup: &F, var_name: &str, default: T) -> Result<T>
    where
        F: Fn(&str) -> Option<String>,
        T: FromStr + fmt::Debug,
        T::Err: fmt::Display,
    {
        match lookup(var_name) {
            Some(val) => match val.parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            None => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.server_host.trim().is_empty() {
            return Err(anyhow::anyhow!("SERVER_HOST must not be empty"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Middleware settings using `logger` as the default sink.
    pub fn access_log(&self, logger: Logger) -> AccessLogConfig {
        AccessLogConfig::new(logger)
            .with_fields_key(self.fields_key.clone())
            .with_logger_key(self.logger_key.clone())
    }
}
