use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::domain::services::dispatch::{TaskExecutor, ThreadPoolExecutor, TokioExecutor};

const ASYNC_WORKERS: &str = "GRID_DISPATCH_ASYNC_WORKERS";
const EXECUTOR: &str = "GRID_DISPATCH_EXECUTOR";
const LOG_FILTER: &str = "GRID_DISPATCH_LOG";
const DEFAULT_SESSION: &str = "GRID_DISPATCH_DEFAULT_SESSION";

/// Errors raised while loading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The tokio executor was requested outside a runtime
    #[error("No tokio runtime available for the tokio executor")]
    NoRuntime,
}

/// Which asynchronous primitive runs fire-and-forget deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Threads,
    Tokio,
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threads" => Ok(Self::Threads),
            "tokio" => Ok(Self::Tokio),
            other => Err(format!("expected `threads` or `tokio`, got `{other}`")),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threads => f.write_str("threads"),
            Self::Tokio => f.write_str("tokio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Worker threads for asynchronous delivery, at least one
    pub async_workers: usize,
    pub executor: ExecutorKind,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
    /// Session used when a map notification does not name one
    pub default_session: String,
}

impl DispatchConfig {
    pub fn from_env() -> DispatchConfig {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<DispatchConfig, ConfigError> {
        // Load .env file
        dotenv().ok();

        let defaults = Self::default();

        let async_workers = match env::var(ASYNC_WORKERS) {
            Ok(raw) => {
                let workers = raw.trim().parse::<usize>().map_err(|err| ConfigError::InvalidValue {
                    key: ASYNC_WORKERS,
                    value: raw.clone(),
                    reason: err.to_string(),
                })?;
                if workers == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: ASYNC_WORKERS,
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    });
                }
                workers
            }
            Err(_) => defaults.async_workers,
        };

        let executor = match env::var(EXECUTOR) {
            Ok(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
                key: EXECUTOR,
                value: raw.clone(),
                reason,
            })?,
            Err(_) => defaults.executor,
        };

        let log_filter = env::var(LOG_FILTER).unwrap_or(defaults.log_filter);
        let default_session = env::var(DEFAULT_SESSION).unwrap_or(defaults.default_session);

        let config = DispatchConfig {
            async_workers,
            executor,
            log_filter,
            default_session,
        };
        info!(
            workers = config.async_workers,
            executor = %config.executor,
            session = %config.default_session,
            "Loaded dispatch configuration"
        );
        Ok(config)
    }

    /// Creates the configured executor. The tokio executor attaches to the runtime
    /// the caller is running in.
    pub fn build_executor(&self) -> Result<Arc<dyn TaskExecutor>, ConfigError> {
        match self.executor {
            ExecutorKind::Threads => Ok(Arc::new(ThreadPoolExecutor::new(self.async_workers))),
            ExecutorKind::Tokio => {
                let executor = TokioExecutor::current().ok_or(ConfigError::NoRuntime)?;
                Ok(Arc::new(executor))
            }
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            async_workers: 4,
            executor: ExecutorKind::Threads,
            log_filter: "info".to_string(),
            default_session: "default".to_string(),
        }
    }
}

/// Installs a fmt subscriber filtered by the configured directive. Does nothing when
/// a global subscriber is already set.
pub fn init_tracing(config: &DispatchConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
