use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEVELOPMENT_TOKEN_SECRET: &str = "lifelink-development-secret";
const DEFAULT_VERIFY_LINK_BASE: &str = "https://lifelink-xi.vercel.app/verifymail";
const DEFAULT_OUTBOUND_TIMEOUT_MS: u64 = 5_000;

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
    pub workflow: WorkflowConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            workflow: WorkflowConfig::from_env(environment)?,
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

/// Secrets and collaborator limits shared by the workflow engines.
#[derive(Clone)]
pub struct WorkflowConfig {
    pub token_secret: String,
    pub verify_link_base: String,
    pub outbound_timeout: Duration,
    pub blob_dir: PathBuf,
}

impl WorkflowConfig {
    fn from_env(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let token_secret = match env::var("LIFELINK_TOKEN_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingTokenSecret)
            }
            _ => DEVELOPMENT_TOKEN_SECRET.to_string(),
        };

        let verify_link_base = env::var("LIFELINK_VERIFY_LINK_BASE")
            .unwrap_or_else(|_| DEFAULT_VERIFY_LINK_BASE.to_string());

        let timeout_ms = match env::var("LIFELINK_OUTBOUND_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidTimeout)?,
            Err(_) => DEFAULT_OUTBOUND_TIMEOUT_MS,
        };

        let blob_dir = env::var("LIFELINK_BLOB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        Ok(Self {
            token_secret,
            verify_link_base: verify_link_base.trim_end_matches('/').to_string(),
            outbound_timeout: Duration::from_millis(timeout_ms),
            blob_dir,
        })
    }

    /// Settings suitable for tests and local demos.
    pub fn development() -> Self {
        Self {
            token_secret: DEVELOPMENT_TOKEN_SECRET.to_string(),
            verify_link_base: DEFAULT_VERIFY_LINK_BASE.to_string(),
            outbound_timeout: Duration::from_millis(DEFAULT_OUTBOUND_TIMEOUT_MS),
            blob_dir: PathBuf::from("./uploads"),
        }
    }
}

impl fmt::Debug for WorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowConfig")
            .field("token_secret", &"<redacted>")
            .field("verify_link_base", &self.verify_link_base)
            .field("outbound_timeout", &self.outbound_timeout)
            .field("blob_dir", &self.blob_dir)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingTokenSecret,
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingTokenSecret => {
                write!(f, "LIFELINK_TOKEN_SECRET must be set in production")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "LIFELINK_OUTBOUND_TIMEOUT_MS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::MissingTokenSecret
            | ConfigError::InvalidTimeout => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "LIFELINK_TOKEN_SECRET",
            "LIFELINK_VERIFY_LINK_BASE",
            "LIFELINK_OUTBOUND_TIMEOUT_MS",
            "LIFELINK_BLOB_DIR",
        ] {
            env::remove_var(key);
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
        assert_eq!(config.workflow.outbound_timeout, Duration::from_secs(5));
        assert_eq!(config.workflow.token_secret, DEVELOPMENT_TOKEN_SECRET);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn production_requires_token_secret() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        match AppConfig::load() {
            Err(ConfigError::MissingTokenSecret) => {}
            other => panic!("expected missing secret error, got {other:?}"),
        }

        env::set_var("LIFELINK_TOKEN_SECRET", "prod-secret");
        let config = AppConfig::load().expect("config loads with secret");
        assert_eq!(config.workflow.token_secret, "prod-secret");
        reset_env();
    }

    #[test]
    fn rejects_zero_outbound_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LIFELINK_OUTBOUND_TIMEOUT_MS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidTimeout)
        ));
        reset_env();
    }

    #[test]
    fn verify_link_base_drops_trailing_slash() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LIFELINK_VERIFY_LINK_BASE", "https://example.test/verify/");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.workflow.verify_link_base, "https://example.test/verify");
        reset_env();
    }
}
