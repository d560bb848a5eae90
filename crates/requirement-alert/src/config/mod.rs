use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::requirements::DispatchPolicy;

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
    pub mail: Option<MailConfig>,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dispatch_policy = match env::var("DISPATCH_POLICY") {
            Ok(raw) => raw
                .parse::<DispatchPolicy>()
                .map_err(|_| ConfigError::InvalidDispatchPolicy(raw))?,
            Err(_) => DispatchPolicy::default(),
        };

        let shops_seed_file = env::var("SHOPS_SEED_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            mail: MailConfig::from_env()?,
            intake: IntakeConfig {
                dispatch_policy,
                shops_seed_file,
            },
        })
    }

    /// Mail settings are optional at load time so non-serving commands work without them.
    pub fn require_mail(&self) -> Result<&MailConfig, ConfigError> {
        self.mail.as_ref().ok_or(ConfigError::MissingMailCredentials)
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

/// SMTP account used to alert suppliers.
#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub sender_name: String,
}

impl MailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let username = env::var("MAIL_USER").ok().filter(|v| !v.is_empty());
        let password = env::var("MAIL_PASS").ok().filter(|v| !v.is_empty());

        let (username, password) = match (username, password) {
            (Some(username), Some(password)) => (username, password),
            (None, None) => return Ok(None),
            _ => return Err(ConfigError::MissingMailCredentials),
        };

        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "465".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            sender_name: "Requirement Alert".to_string(),
        }))
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

/// Knobs for the requirement intake workflow.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub dispatch_policy: DispatchPolicy,
    pub shops_seed_file: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("SMTP_PORT must be a valid u16")]
    InvalidSmtpPort,
    #[error("MAIL_USER and MAIL_PASS must both be set")]
    MissingMailCredentials,
    #[error("DISPATCH_POLICY must be 'best-effort' or 'strict', found '{0}'")]
    InvalidDispatchPolicy(String),
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
            "PORT",
            "APP_LOG_LEVEL",
            "MAIL_USER",
            "MAIL_PASS",
            "SMTP_HOST",
            "SMTP_PORT",
            "DISPATCH_POLICY",
            "SHOPS_SEED_FILE",
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
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.mail.is_none());
        assert_eq!(config.intake.dispatch_policy, DispatchPolicy::BestEffort);
        assert!(config.intake.shops_seed_file.is_none());
        assert!(matches!(
            config.require_mail(),
            Err(ConfigError::MissingMailCredentials)
        ));
    }

    #[test]
    fn reads_port_and_mail_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORT", "8080");
        env::set_var("MAIL_USER", "alerts@example.com");
        env::set_var("MAIL_PASS", "app-password");
        env::set_var("DISPATCH_POLICY", "strict");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.server.port, 8080);
        let mail = config.require_mail().expect("mail configured");
        assert_eq!(mail.smtp_host, "smtp.gmail.com");
        assert_eq!(mail.smtp_port, 465);
        assert_eq!(mail.username, "alerts@example.com");
        assert_eq!(config.intake.dispatch_policy, DispatchPolicy::Strict);
        assert!(!format!("{mail:?}").contains("app-password"));
        reset_env();
    }

    #[test]
    fn rejects_half_configured_mail_account() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MAIL_USER", "alerts@example.com");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingMailCredentials)
        ));
        reset_env();
    }

    #[test]
    fn rejects_unknown_dispatch_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DISPATCH_POLICY", "eventually");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDispatchPolicy(value)) if value == "eventually"
        ));
        reset_env();
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
}
