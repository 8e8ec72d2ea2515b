//! Configuration management for the search service.
//!
//! Settings come from environment variables, optionally seeded from a
//! `.env` file. Loading never prints to stdout, which the MCP transport owns.

use crate::backends::EngineSettings;
use crate::error::{ConfigError, ConfigResult};
use crate::models::ScoringConfig;
use crate::privacy::GdprConfig;
use std::collections::BTreeSet;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the search service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend active at startup (default: "relational")
    pub backend: String,

    /// sqlx SQLite URL of the record store (default: "sqlite::memory:")
    pub database_url: String,

    /// External engine connection
    pub engine: EngineSettings,

    /// HTTP listener address (default: 127.0.0.1:8080)
    pub http_bind: SocketAddr,

    /// Masking policy
    pub gdpr: GdprConfig,

    /// Ranking parameters; not read from the environment
    pub scoring: ScoringConfig,

    /// Log level used when RUST_LOG is unset (default: "info")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `SEARCH_BACKEND`: active backend name (default: relational)
    /// - `SEARCH_DATABASE_URL`: record store URL (default: sqlite::memory:)
    /// - `SEARCH_ENGINE_URL`: external engine base URL (unset: engines not configured)
    /// - `SEARCH_ENGINE_API_KEY`: engine credentials
    /// - `SEARCH_INDEX_PREFIX`: index name prefix (default: crm)
    /// - `SEARCH_REQUEST_TIMEOUT_MS`: per-call deadline (default: 5000)
    /// - `SEARCH_HTTP_BIND`: listener address (default: 127.0.0.1:8080)
    /// - `SEARCH_GDPR_*`: masking policy flags and bypass lists
    /// - `LOG_LEVEL`: logging level (default: info)
    pub fn from_env() -> ConfigResult<Self> {
        // Missing .env is fine; dotenvy never writes to stdout
        let _ = dotenvy::dotenv();

        let backend = env_string("SEARCH_BACKEND")
            .unwrap_or_else(|| "relational".to_string())
            .to_lowercase();
        let database_url =
            env_string("SEARCH_DATABASE_URL").unwrap_or_else(|| "sqlite::memory:".to_string());

        let engine_url = env_string("SEARCH_ENGINE_URL");
        if let Some(url) = &engine_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    var: "SEARCH_ENGINE_URL".to_string(),
                    reason: "Must start with http:// or https://".to_string(),
                });
            }
        }

        let timeout_ms = Self::parse_env_u64("SEARCH_REQUEST_TIMEOUT_MS", 5000)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SEARCH_REQUEST_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        let engine = EngineSettings {
            url: engine_url,
            api_key: env_string("SEARCH_ENGINE_API_KEY"),
            index_prefix: env_string("SEARCH_INDEX_PREFIX").unwrap_or_else(|| "crm".to_string()),
            timeout: Duration::from_millis(timeout_ms),
        };

        let bind = env_string("SEARCH_HTTP_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let http_bind = bind.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidValue {
            var: "SEARCH_HTTP_BIND".to_string(),
            reason: format!("Must be a socket address, got: {}", bind),
        })?;

        let defaults = GdprConfig::default();
        let gdpr = GdprConfig {
            enabled: Self::parse_env_bool("SEARCH_GDPR_ENABLED", defaults.enabled)?,
            mask_pii: Self::parse_env_bool("SEARCH_GDPR_MASK_PII", defaults.mask_pii)?,
            remove_pii: Self::parse_env_bool("SEARCH_GDPR_REMOVE_PII", defaults.remove_pii)?,
            mask_phi: Self::parse_env_bool("SEARCH_GDPR_MASK_PHI", defaults.mask_phi)?,
            remove_phi: Self::parse_env_bool("SEARCH_GDPR_REMOVE_PHI", defaults.remove_phi)?,
            mask_addresses: Self::parse_env_bool(
                "SEARCH_GDPR_MASK_ADDRESSES",
                defaults.mask_addresses,
            )?,
            allowed_users: Self::parse_env_list("SEARCH_GDPR_ALLOWED_USERS")
                .unwrap_or(defaults.allowed_users),
            allowed_roles: Self::parse_env_list("SEARCH_GDPR_ALLOWED_ROLES")
                .unwrap_or(defaults.allowed_roles),
        };
        gdpr.validate()?;

        let log_level = env_string("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Config {
            backend,
            database_url,
            engine,
            http_bind,
            gdpr,
            scoring: ScoringConfig::default(),
            log_level,
        })
    }

    /// Parse an environment variable as u64 with a default value.
    fn parse_env_u64(var_name: &str, default: u64) -> ConfigResult<u64> {
        match env_string(var_name) {
            Some(val) => val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            None => Ok(default),
        }
    }

    /// Parse an environment variable as a boolean with a default value.
    fn parse_env_bool(var_name: &str, default: bool) -> ConfigResult<bool> {
        match env_string(var_name) {
            Some(val) => match val.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    var: var_name.to_string(),
                    reason: format!("Must be true or false, got: {}", val),
                }),
            },
            None => Ok(default),
        }
    }

    /// Parse a comma-separated list; `None` when the variable is unset.
    fn parse_env_list(var_name: &str) -> Option<BTreeSet<String>> {
        env::var(var_name).ok().map(|val| {
            val.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Non-blank value of an environment variable.
fn env_string(var_name: &str) -> Option<String> {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: "relational".to_string(),
            database_url: "sqlite::memory:".to_string(),
            engine: EngineSettings::default(),
            http_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            gdpr: GdprConfig::default(),
            scoring: ScoringConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "SEARCH_BACKEND",
        "SEARCH_DATABASE_URL",
        "SEARCH_ENGINE_URL",
        "SEARCH_ENGINE_API_KEY",
        "SEARCH_INDEX_PREFIX",
        "SEARCH_REQUEST_TIMEOUT_MS",
        "SEARCH_HTTP_BIND",
        "SEARCH_GDPR_ENABLED",
        "SEARCH_GDPR_MASK_PII",
        "SEARCH_GDPR_REMOVE_PII",
        "SEARCH_GDPR_MASK_PHI",
        "SEARCH_GDPR_REMOVE_PHI",
        "SEARCH_GDPR_MASK_ADDRESSES",
        "SEARCH_GDPR_ALLOWED_USERS",
        "SEARCH_GDPR_ALLOWED_ROLES",
        "LOG_LEVEL",
    ];

    // Clears every search variable on creation and removes whatever was set on drop
    struct EnvGuard {
        vars: Vec<String>,
    }

    impl EnvGuard {
        fn new() -> Self {
            for var in VARS {
                env::remove_var(var);
            }
            EnvGuard { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            env::set_var(key, value);
            self.vars.push(key.to_string());
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, "relational");
        assert_eq!(config.engine.timeout, Duration::from_millis(5000));
        assert_eq!(config.engine.index_prefix, "crm");
        assert!(config.gdpr.enabled);
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        let _guard = EnvGuard::new();

        let config = Config::from_env().unwrap();
        assert_eq!(config.backend, "relational");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.engine.url, None);
        assert_eq!(config.http_bind.to_string(), "127.0.0.1:8080");
        assert!(config.gdpr.allowed_roles.contains("admin"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_config_from_env_valid() {
        let mut guard = EnvGuard::new();
        guard.set("SEARCH_BACKEND", "Meilisearch");
        guard.set("SEARCH_ENGINE_URL", "http://localhost:7700");
        guard.set("SEARCH_ENGINE_API_KEY", "master-key");
        guard.set("SEARCH_INDEX_PREFIX", "acme");
        guard.set("SEARCH_REQUEST_TIMEOUT_MS", "250");
        guard.set("SEARCH_GDPR_ALLOWED_ROLES", "admin, dpo");
        guard.set("SEARCH_GDPR_MASK_ADDRESSES", "yes");

        let config = Config::from_env().unwrap();
        assert_eq!(config.backend, "meilisearch");
        assert_eq!(config.engine.url.as_deref(), Some("http://localhost:7700"));
        assert_eq!(config.engine.api_key.as_deref(), Some("master-key"));
        assert_eq!(config.engine.index_prefix, "acme");
        assert_eq!(config.engine.timeout, Duration::from_millis(250));
        assert!(config.gdpr.allowed_roles.contains("dpo"));
        assert!(config.gdpr.mask_addresses);
    }

    #[test]
    #[serial]
    fn test_config_from_env_invalid_url() {
        let mut guard = EnvGuard::new();
        guard.set("SEARCH_ENGINE_URL", "localhost:7700");

        match Config::from_env() {
            Err(ConfigError::InvalidValue { var, .. }) => assert_eq!(var, "SEARCH_ENGINE_URL"),
            other => panic!("Expected InvalidValue error, got: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_config_conflicting_gdpr_flags() {
        let mut guard = EnvGuard::new();
        guard.set("SEARCH_GDPR_REMOVE_PII", "true");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue { .. })
        ));

        guard.set("SEARCH_GDPR_MASK_PII", "false");
        let config = Config::from_env().unwrap();
        assert!(config.gdpr.remove_pii);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bool_and_bind() {
        let mut guard = EnvGuard::new();
        guard.set("SEARCH_GDPR_ENABLED", "maybe");
        assert!(Config::from_env().is_err());

        env::remove_var("SEARCH_GDPR_ENABLED");
        guard.set("SEARCH_HTTP_BIND", "not-an-addr");
        match Config::from_env() {
            Err(ConfigError::InvalidValue { var, .. }) => assert_eq!(var, "SEARCH_HTTP_BIND"),
            other => panic!("Expected InvalidValue error, got: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_parse_env_u64() {
        let mut guard = EnvGuard::new();
        guard.set("TEST_U64", "42");

        assert_eq!(Config::parse_env_u64("TEST_U64", 10).unwrap(), 42);
        assert_eq!(Config::parse_env_u64("NONEXISTENT", 10).unwrap(), 10);

        guard.set("TEST_U64_INVALID", "not-a-number");
        assert!(Config::parse_env_u64("TEST_U64_INVALID", 10).is_err());
    }

    #[test]
    #[serial]
    fn test_zero_timeout_rejected() {
        let mut guard = EnvGuard::new();
        guard.set("SEARCH_REQUEST_TIMEOUT_MS", "0");
        assert!(Config::from_env().is_err());
    }
}
