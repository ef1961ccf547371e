use std::env;
use std::net::SocketAddr;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_PAYSTACK_URL: &str = "https://api.paystack.co";
const DEFAULT_CALLBACK_URL: &str = "http://localhost:3001/payment-confirmed";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub listen_addr: SocketAddr,
    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    pub payment_callback_url: String,
    /// `None` disables real mail delivery.
    pub smtp: Option<SmtpConfig>,
    pub allowed_origins: Vec<String>,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
                from: required("MAIL_FROM")?,
            }),
            None => None,
        };

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            paystack_secret_key: required("PAYSTACK_SECRET_KEY")?,
            paystack_base_url: lookup("PAYSTACK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PAYSTACK_URL.to_string()),
            payment_callback_url: lookup("PAYMENT_CALLBACK_URL")
                .unwrap_or_else(|| DEFAULT_CALLBACK_URL.to_string()),
            smtp,
            allowed_origins,
            production: lookup("RUST_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/tickets"),
        ("PAYSTACK_SECRET_KEY", "sk_test_123"),
    ];

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.listen_addr.port(), DEFAULT_PORT);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.paystack_base_url, DEFAULT_PAYSTACK_URL);
        assert_eq!(config.payment_callback_url, DEFAULT_CALLBACK_URL);
        assert!(config.smtp.is_none());
        assert_eq!(config.allowed_origins.len(), 2);
        assert!(!config.production);
    }

    #[test]
    fn test_missing_secret_is_reported() {
        let err = Config::from_lookup(lookup(&BASE[..1])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PAYSTACK_SECRET_KEY")));
    }

    #[test]
    fn test_bad_port_is_reported() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_smtp_requires_credentials_once_host_is_set() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SMTP_HOST", "smtp.example.com"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SMTP_USERNAME")));

        pairs.extend([
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD", "secret"),
            ("MAIL_FROM", "Tickets <tickets@example.com>"),
            ("SMTP_PORT", "465"),
        ]);
        let smtp = Config::from_lookup(lookup(&pairs)).unwrap().smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 465);
    }
}
