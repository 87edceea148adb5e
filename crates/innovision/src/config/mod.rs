use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::limit::WindowPolicy;

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
    pub school: SchoolConfig,
    pub smtp: SmtpConfig,
    pub sessions: SessionConfig,
    pub limits: RateLimitConfig,
    pub admin_seed: Option<AdminSeed>,
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

        let school = SchoolConfig::load();
        let smtp = SmtpConfig::load(&school)?;
        let sessions = SessionConfig {
            max_age_secs: numeric_var("SESSION_MAX_AGE", 86_400)?,
        };
        let limits = RateLimitConfig::load()?;
        let admin_seed = AdminSeed::load();

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            school,
            smtp,
            sessions,
            limits,
            admin_seed,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Identity block printed on confirmation documents and email footers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolConfig {
    pub name: String,
    pub tagline: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl SchoolConfig {
    fn load() -> Self {
        Self {
            name: env::var("SCHOOL_NAME").unwrap_or_else(|_| "InnoVision School".to_string()),
            tagline: env::var("SCHOOL_TAGLINE")
                .unwrap_or_else(|_| "École de Technologies".to_string()),
            address: env::var("SCHOOL_ADDRESS")
                .unwrap_or_else(|_| "Blida, Rue Mohamed Ouali, Blida".to_string()),
            phone: env::var("SCHOOL_PHONE").unwrap_or_else(|_| "0797 61 69 44".to_string()),
            email: env::var("SCHOOL_EMAIL")
                .unwrap_or_else(|_| "contact@innovision-school.dz".to_string()),
        }
    }
}

/// Outbound mail settings. Credentials are optional so development
/// deployments can run without a relay; the service falls back to a
/// log-only notifier when they are absent.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sender: String,
    pub admin_email: String,
    pub timeout_secs: u64,
}

impl SmtpConfig {
    fn load(school: &SchoolConfig) -> Result<Self, ConfigError> {
        let username = env::var("SMTP_USER").ok();
        let sender = env::var("SMTP_SENDER")
            .ok()
            .or_else(|| username.clone())
            .unwrap_or_else(|| school.email.clone());
        let admin_email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| school.email.clone());

        Ok(Self {
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber { key: "SMTP_PORT" })?,
            username,
            password: env::var("SMTP_PASS").ok(),
            sender,
            admin_email,
            timeout_secs: numeric_var("SMTP_TIMEOUT_SECS", 10)?,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Session lifetime controls for the admin surface.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub max_age_secs: u64,
}

/// Per-surface request budgets enforced by the rate limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enrollment: WindowPolicy,
    pub document: WindowPolicy,
    pub admin: WindowPolicy,
}

impl RateLimitConfig {
    fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            enrollment: WindowPolicy {
                max_requests: numeric_var("ENROLLMENT_RATE_MAX", 5)?,
                window_secs: numeric_var("ENROLLMENT_RATE_WINDOW_SECS", 3_600)?,
            },
            document: WindowPolicy {
                max_requests: numeric_var("PDF_RATE_MAX", 20)?,
                window_secs: numeric_var("PDF_RATE_WINDOW_SECS", 600)?,
            },
            admin: WindowPolicy {
                max_requests: numeric_var("ADMIN_RATE_MAX", 50)?,
                window_secs: numeric_var("ADMIN_RATE_WINDOW_SECS", 900)?,
            },
        })
    }
}

/// Administrator provisioned at startup. The hash comes from the
/// `admin hash-password` CLI command; administrators never self-register.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password_hash: String,
}

impl AdminSeed {
    fn load() -> Option<Self> {
        let email = env::var("ADMIN_LOGIN_EMAIL").ok()?;
        let password_hash = env::var("ADMIN_PASSWORD_HASH").ok()?;
        Some(Self {
            email,
            password_hash,
        })
    }
}

fn numeric_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
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
