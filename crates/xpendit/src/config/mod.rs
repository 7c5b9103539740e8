use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_RATES_BASE_URL: &str = "https://openexchangerates.org/api";
const DEFAULT_RATES_TIMEOUT_SECS: u64 = 20;
const DEFAULT_RATES_MAX_CONCURRENCY: usize = 4;

/// Environment variables checked, in order, for the Open Exchange Rates credential.
const RATES_APP_ID_VARS: [&str; 4] = [
    "OPEN_EXCHANGE_APP_ID",
    "OXR_APP_ID",
    "APP_ID",
    "OPENEXCHANGERATES_APP_ID",
];

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub rates: RatesConfig,
    pub policy_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let app_id = RATES_APP_ID_VARS
            .iter()
            .filter_map(|name| env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());
        let base_url = env::var("RATES_BASE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_RATES_BASE_URL.to_string());
        let timeout_secs = match env::var("RATES_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidRatesTimeout)?,
            Err(_) => DEFAULT_RATES_TIMEOUT_SECS,
        };
        let max_concurrency = match env::var("RATES_MAX_CONCURRENCY") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidRatesConcurrency)?,
            Err(_) => DEFAULT_RATES_MAX_CONCURRENCY,
        };

        let policy_path = env::var("POLICY_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            rates: RatesConfig {
                app_id,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
                max_concurrency,
            },
            policy_path,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Exchange-rate lookup settings. A missing `app_id` is not an error: batches
/// then run without external rates.
#[derive(Clone)]
pub struct RatesConfig {
    pub app_id: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_concurrency: usize,
}

impl fmt::Debug for RatesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatesConfig")
            .field("app_id", &self.app_id.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRatesTimeout,
    InvalidRatesConcurrency,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRatesTimeout => {
                write!(f, "RATES_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidRatesConcurrency => {
                write!(f, "RATES_MAX_CONCURRENCY must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidRatesTimeout
            | ConfigError::InvalidRatesConcurrency => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RATES_BASE_URL");
        env::remove_var("RATES_TIMEOUT_SECS");
        env::remove_var("RATES_MAX_CONCURRENCY");
        env::remove_var("POLICY_PATH");
        for name in RATES_APP_ID_VARS {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.rates.base_url, DEFAULT_RATES_BASE_URL);
        assert_eq!(config.rates.max_concurrency, 4);
        assert!(config.policy_path.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn credential_falls_back_through_aliases() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ID", "legacy-key");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.rates.app_id.as_deref(), Some("legacy-key"));

        env::set_var("OPEN_EXCHANGE_APP_ID", "primary-key");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.rates.app_id.as_deref(), Some("primary-key"));
        assert!(!format!("{:?}", config.rates).contains("primary-key"));
        reset_env();
    }

    #[test]
    fn rejects_zero_concurrency() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RATES_MAX_CONCURRENCY", "0");
        let error = AppConfig::load().expect_err("zero concurrency rejected");
        assert!(matches!(error, ConfigError::InvalidRatesConcurrency));
        reset_env();
    }
}
