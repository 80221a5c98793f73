//! Database configuration
//!
//! Read once at process start, either from a full `DATABASE_URL` or from the
//! discrete `DB_*` variables the storefront deployment uses.

use std::env;
use std::time::Duration;

use url::Url;

use crate::backends::DatabaseBackendType;
use crate::error::ModelError;

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Unsupported database driver: {driver}")]
    UnsupportedDriver { driver: String },
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

/// Connection provider configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite::memory:`, `postgres://...`, `mysql://...`)
    pub url: String,
    /// Upper bound on establishing the connection
    pub connect_timeout: Duration,
    /// Log every statement at debug level
    pub log_statements: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mysql://root@localhost:3306/ecommerce".to_string(),
            connect_timeout: Duration::from_secs(30),
            log_statements: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(url) => url,
            None => compose_url(&lookup)?,
        };

        DatabaseBackendType::from_url(&url).map_err(|_| ConfigError::InvalidValue {
            field: "DATABASE_URL".to_string(),
            value: redact_url(&url),
            expected: "a sqlite:, postgres:// or mysql:// URL".to_string(),
        })?;

        let mut config = Self::new(url);

        if let Some(timeout) = lookup("DB_CONNECT_TIMEOUT") {
            let seconds: u64 = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "DB_CONNECT_TIMEOUT".to_string(),
                value: timeout.clone(),
                expected: "a number of seconds".to_string(),
            })?;
            config.connect_timeout = Duration::from_secs(seconds);
        }

        if let Some(flag) = lookup("DB_LOG_STATEMENTS") {
            config.log_statements = flag.parse().map_err(|_| ConfigError::InvalidValue {
                field: "DB_LOG_STATEMENTS".to_string(),
                value: flag.clone(),
                expected: "true or false".to_string(),
            })?;
        }

        Ok(config)
    }

    /// Backend implied by the URL scheme
    pub fn backend(&self) -> Result<DatabaseBackendType, ConfigError> {
        DatabaseBackendType::from_url(&self.url).map_err(|_| ConfigError::UnsupportedDriver {
            driver: Url::parse(&self.url)
                .map(|url| url.scheme().to_string())
                .unwrap_or_else(|_| redact_url(&self.url)),
        })
    }

    /// URL safe to log (credentials stripped)
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

fn compose_url<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let driver = lookup("DB_DRIVER").unwrap_or_else(|| "mysql".to_string());
    let backend: DatabaseBackendType = driver
        .parse()
        .map_err(|_| ConfigError::UnsupportedDriver { driver: driver.clone() })?;

    let name = lookup("DB_NAME").unwrap_or_else(|| "ecommerce".to_string());
    if backend == DatabaseBackendType::SQLite {
        return Ok(format!("sqlite://{}", name));
    }

    let invalid = |field: &str, value: &str, expected: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    };

    let scheme = match backend {
        DatabaseBackendType::PostgreSQL => "postgres",
        _ => "mysql",
    };
    let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let mut url = Url::parse(&format!("{}://{}", scheme, host))
        .ok()
        .filter(|url| url.has_host())
        .ok_or_else(|| invalid("DB_HOST", &host, "a host name or address"))?;

    if let Some(port) = lookup("DB_PORT") {
        let number: u16 = port
            .parse()
            .map_err(|_| invalid("DB_PORT", &port, "valid port number (0-65535)"))?;
        url.set_port(Some(number))
            .map_err(|_| invalid("DB_PORT", &port, "valid port number (0-65535)"))?;
    }

    let user = lookup("DB_USER").unwrap_or_else(|| "root".to_string());
    url.set_username(&user)
        .map_err(|_| invalid("DB_USER", &user, "a user name"))?;

    let pass = lookup("DB_PASS").unwrap_or_default();
    if !pass.is_empty() {
        url.set_password(Some(&pass))
            .map_err(|_| invalid("DB_PASS", "***", "a password"))?;
    }

    url.set_path(&name);
    Ok(url.to_string())
}

/// Replace the password of a connection URL with `***`
fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                return format!("{}://<redacted>", parsed.scheme());
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}
