use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::admittance::identity::{SimilarityMatcher, DEFAULT_SIMILARITY_THRESHOLD};
use crate::workflows::admittance::preprocess::{
    PreprocessPolicy, Preprocessor, DEFAULT_SUSPICIOUS_EMAIL_ENDING,
};

/// Timestamp layout used by the registration form export.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

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
    pub admittance: AdmittanceConfig,
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

        let admittance = AdmittanceConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            admittance,
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

/// Knobs for duplicate screening and registration parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittanceConfig {
    pub similarity_threshold: f64,
    pub timestamp_format: String,
    pub suspicious_email_endings: Vec<String>,
}

impl Default for AdmittanceConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            suspicious_email_endings: vec![DEFAULT_SUSPICIOUS_EMAIL_ENDING.to_string()],
        }
    }
}

impl AdmittanceConfig {
    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(
            SimilarityMatcher::new(self.similarity_threshold),
            PreprocessPolicy {
                suspicious_email_endings: self.suspicious_email_endings.clone(),
            },
        )
    }

    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let similarity_threshold = match env::var("APP_SIMILARITY_THRESHOLD") {
            Ok(raw) => parse_threshold(&raw)?,
            Err(_) => defaults.similarity_threshold,
        };

        let timestamp_format = env::var("APP_TIMESTAMP_FORMAT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.timestamp_format);

        let suspicious_email_endings = match env::var("APP_SUSPICIOUS_EMAIL_ENDINGS") {
            Ok(raw) => raw
                .split(',')
                .map(|ending| ending.trim().to_lowercase())
                .filter(|ending| !ending.is_empty())
                .collect(),
            Err(_) => defaults.suspicious_email_endings,
        };

        Ok(Self {
            similarity_threshold,
            timestamp_format,
            suspicious_email_endings,
        })
    }
}

/// Validates a similarity threshold, which must lie in (0, 1].
pub fn parse_threshold(raw: &str) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::InvalidSimilarityThreshold {
        value: raw.to_string(),
    };
    let threshold = raw.trim().parse::<f64>().map_err(|_| invalid())?;
    validate_threshold(threshold)
}

pub fn validate_threshold(threshold: f64) -> Result<f64, ConfigError> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(threshold)
    } else {
        Err(ConfigError::InvalidSimilarityThreshold {
            value: threshold.to_string(),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSimilarityThreshold { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSimilarityThreshold { value } => write!(
                f,
                "APP_SIMILARITY_THRESHOLD must be a number in (0, 1], got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidSimilarityThreshold { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
