use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, RwLock};
use std::time::Duration;

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

const DEFAULT_VENDOR_HOST: &str = "https://api.sumsub.com";
const DEFAULT_TIMEOUT_THRESHOLD_SECS: u64 = 600;
const DEFAULT_BACKOFF_BASE: u32 = 2;
const DEFAULT_BACKOFF_FIRST_EXPONENT: u32 = 1;

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub verification: VerificationConfig,
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
            verification: VerificationConfig::from_env()?,
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

/// Vendor endpoint, credentials, and polling limits handed to each workflow.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub vendor_host: String,
    pub app_token: String,
    pub secret_key: String,
    pub timeout_threshold: Duration,
    pub backoff_base: u32,
    pub backoff_first_exponent: u32,
}

impl VerificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = parse_var(
            "KYC_TIMEOUT_THRESHOLD_SECS",
            DEFAULT_TIMEOUT_THRESHOLD_SECS,
        )?;

        Ok(Self {
            vendor_host: env::var("KYC_VENDOR_HOST")
                .unwrap_or_else(|_| DEFAULT_VENDOR_HOST.to_string()),
            app_token: env::var("KYC_APP_TOKEN").unwrap_or_default(),
            secret_key: env::var("KYC_SECRET_KEY").unwrap_or_default(),
            timeout_threshold: Duration::from_secs(timeout_secs),
            backoff_base: parse_var("KYC_BACKOFF_BASE", DEFAULT_BACKOFF_BASE)?,
            backoff_first_exponent: parse_var(
                "KYC_BACKOFF_FIRST_EXPONENT",
                DEFAULT_BACKOFF_FIRST_EXPONENT,
            )?,
        })
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            vendor_host: DEFAULT_VENDOR_HOST.to_string(),
            app_token: String::new(),
            secret_key: String::new(),
            timeout_threshold: Duration::from_secs(DEFAULT_TIMEOUT_THRESHOLD_SECS),
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_first_exponent: DEFAULT_BACKOFF_FIRST_EXPONENT,
        }
    }
}

impl fmt::Debug for VerificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationConfig")
            .field("vendor_host", &self.vendor_host)
            .field("app_token", &redacted(&self.app_token))
            .field("secret_key", &redacted(&self.secret_key))
            .field("timeout_threshold", &self.timeout_threshold)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_first_exponent", &self.backoff_first_exponent)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Read-mostly holder so credentials can be swapped while workflows run.
///
/// Readers get an `Arc` snapshot; a workflow keeps the snapshot it started
/// with even if the configuration is replaced underneath it.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<VerificationConfig>>>,
}

impl SharedConfig {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn snapshot(&self) -> Arc<VerificationConfig> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, config: VerificationConfig) {
        let next = Arc::new(config);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative integer (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
