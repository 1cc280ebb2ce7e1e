//! Runtime configuration, read from the environment (and `.env` via dotenvy).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default development secret. Override with `MASJID_JWT_SECRET` in any real deployment.
const DEV_JWT_SECRET: &str = "masjid_dev_secret_change_me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid {
                key: "MASJID_LOG_FORMAT",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Directory for daily-rolling log files. `None` logs to stdout only.
    pub directory: Option<PathBuf>,
    /// Fallback filter when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            directory: None,
            default_filter: "info,masjid_saas=debug".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued access tokens in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// Write demo tenants/users/rows on first start.
    pub seed_demo_data: bool,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 11111)),
            data_dir: PathBuf::from("masjid_data"),
            seed_demo_data: true,
            auth: AuthConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(raw) = lookup("MASJID_BIND") {
            config.bind_addr = parse_value("MASJID_BIND", &raw)?;
        }
        if let Some(raw) = lookup("MASJID_DATA_DIR") {
            config.data_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MASJID_SEED_DEMO") {
            config.seed_demo_data = parse_bool("MASJID_SEED_DEMO", &raw)?;
        }
        if let Some(raw) = lookup("MASJID_JWT_SECRET") {
            if raw.is_empty() {
                return Err(ConfigError::Invalid {
                    key: "MASJID_JWT_SECRET",
                    value: raw,
                });
            }
            config.auth.jwt_secret = raw;
        }
        if let Some(raw) = lookup("MASJID_TOKEN_TTL_SECS") {
            config.auth.token_ttl_secs = parse_value("MASJID_TOKEN_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("MASJID_LOG_FORMAT") {
            config.log.format = raw.parse()?;
        }
        if let Some(raw) = lookup("MASJID_LOG_DIR") {
            config.log.directory = Some(PathBuf::from(raw));
        }

        Ok(config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr.port(), 11111);
        assert_eq!(config.data_dir, PathBuf::from("masjid_data"));
        assert!(config.seed_demo_data);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("MASJID_BIND", "127.0.0.1:8080"),
            ("MASJID_DATA_DIR", "/var/lib/masjid"),
            ("MASJID_SEED_DEMO", "false"),
            ("MASJID_JWT_SECRET", "s3cret"),
            ("MASJID_TOKEN_TTL_SECS", "60"),
            ("MASJID_LOG_FORMAT", "JSON"),
            ("MASJID_LOG_DIR", "/var/log/masjid"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/masjid"));
        assert!(!config.seed_demo_data);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_secs, 60);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.directory, Some(PathBuf::from("/var/log/masjid")));
        assert!(!config.uses_dev_secret());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("MASJID_TOKEN_TTL_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("MASJID_TOKEN_TTL_SECS"));

        assert!(AppConfig::from_lookup(lookup_from(&[("MASJID_LOG_FORMAT", "xml")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("MASJID_SEED_DEMO", "maybe")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("MASJID_JWT_SECRET", "")])).is_err());
    }
}
