//! Configuration module for the brigades backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for authenticated routes
    pub api_psk: Option<String>,
    /// Pre-shared key for administrator routes
    pub admin_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Base URL of the clusters service, without trailing slash
    pub clusters_url: String,
    /// Timeout for cluster existence checks
    pub clusters_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let api_psk = non_empty_var("BRIGADES_API_PSK");
        let admin_psk = non_empty_var("BRIGADES_ADMIN_PSK");

        let db_path = env::var("BRIGADES_DB_PATH")
            .unwrap_or_else(|_| "./data/brigades.sqlite".to_string())
            .into();

        let bind_addr = env::var("BRIGADES_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3002".to_string())
            .parse()?;

        let log_level = env::var("BRIGADES_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::parse(
            &env::var("BRIGADES_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        );

        let clusters_url = env::var("BRIGADES_CLUSTERS_URL")
            .unwrap_or_else(|_| "http://localhost:3003/api/clusters".to_string())
            .trim_end_matches('/')
            .to_string();

        let clusters_timeout = env::var("BRIGADES_CLUSTERS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        Ok(Self {
            api_psk,
            admin_psk,
            db_path,
            bind_addr,
            log_level,
            log_format,
            clusters_url,
            clusters_timeout,
        })
    }

    /// Whether any authentication key is configured.
    pub fn auth_enabled(&self) -> bool {
        self.api_psk.is_some() || self.admin_psk.is_some()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
