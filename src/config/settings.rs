//! Application settings and configuration
//!
//! Settings are loaded from environment variables (and a `.env` file when
//! present) with sensible defaults. Command-line flags override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Connection parameters for the PostgreSQL source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub database: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub connect_timeout_seconds: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            user: "postgres".to_string(),
            database: "postgres".to_string(),
            password: None,
            connect_timeout_seconds: 30,
        }
    }
}

impl PostgresConfig {
    /// Read connection parameters from the libpq environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: env_or_default("PGHOST", "localhost"),
            port: env::var("PGPORT")
                .ok()
                .map(|p| p.parse())
                .transpose()
                .context("Invalid PGPORT value")?,
            user: env_or_default("PGUSER", "postgres"),
            database: env_or_default("PGDATABASE", "postgres"),
            password: env::var("PGPASSWORD").ok(),
            connect_timeout_seconds: env_or_default("PG_CONNECT_TIMEOUT", "30")
                .parse()
                .unwrap_or(30),
        };

        Ok(config)
    }

    /// Validate connection parameters
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("PostgreSQL host cannot be empty");
        }
        if self.port == Some(0) {
            anyhow::bail!("PostgreSQL port cannot be 0");
        }
        if self.connect_timeout_seconds == 0 {
            anyhow::bail!("PostgreSQL connect timeout must be > 0");
        }
        Ok(())
    }

    /// Set host and port from a `host[:port]` argument
    pub fn set_host_port(&mut self, host_arg: &str) -> Result<()> {
        let (host, port) = parse_host_port(host_arg)?;
        self.host = host;
        if port.is_some() {
            self.port = port;
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub log_level: String,

    // AWS settings
    pub aws_region: String,
    pub dynamodb_endpoint_url: Option<String>,

    /// Single table holding projects and tokens
    pub dynamodb_table: String,

    /// Source database, read from the environment only by `dump-postgres`
    pub postgres: PostgresConfig,
}

impl Settings {
    /// Load settings from environment variables with defaults.
    ///
    /// Nothing is validated here; callers apply CLI overrides first and then
    /// call [`Settings::validate`].
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            app_name: env_or_default("APP_NAME", "cello-migrate"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            aws_region: env_or_default("AWS_REGION", "us-east-1"),
            dynamodb_endpoint_url: env::var("DYNAMODB_ENDPOINT_URL").ok(),
            dynamodb_table: env_or_default("DYNAMODB_TABLE", "cello"),

            postgres: PostgresConfig::default(),
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.dynamodb_table.trim().is_empty() {
            anyhow::bail!("DynamoDB table name cannot be empty");
        }
        if self.aws_region.trim().is_empty() {
            anyhow::bail!("AWS region cannot be empty");
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "cello-migrate".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            aws_region: "us-east-1".to_string(),
            dynamodb_endpoint_url: None,
            dynamodb_table: "cello".to_string(),
            postgres: PostgresConfig::default(),
        }
    }
}

/// Split `host[:port]` into its parts
pub fn parse_host_port(host_arg: &str) -> Result<(String, Option<u16>)> {
    match host_arg.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("Invalid port number: {port}"))?;
            Ok((host.to_string(), Some(port)))
        }
        None => Ok((host_arg.to_string(), None)),
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "cello-migrate");
        assert_eq!(settings.dynamodb_table, "cello");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_host_port() {
        assert_eq!(
            parse_host_port("localhost").unwrap(),
            ("localhost".to_string(), None)
        );
        assert_eq!(
            parse_host_port("db.example.com:5433").unwrap(),
            ("db.example.com".to_string(), Some(5433))
        );
        assert!(parse_host_port("localhost:abc").is_err());
    }

    #[test]
    fn test_set_host_port_keeps_env_port_when_absent() {
        let mut pg = PostgresConfig {
            port: Some(6543),
            ..PostgresConfig::default()
        };
        pg.set_host_port("db").unwrap();
        assert_eq!(pg.host, "db");
        assert_eq!(pg.port, Some(6543));

        pg.set_host_port("db:5432").unwrap();
        assert_eq!(pg.port, Some(5432));
    }

    #[test]
    fn test_load_defers_validation_to_caller() {
        // Only this test sets these variables
        env::set_var("DYNAMODB_TABLE", "");
        env::set_var("PGPORT", "not-a-port");

        let mut settings = Settings::load().unwrap();
        assert!(settings.validate().is_err());

        settings.dynamodb_table = "cello-override".to_string();
        assert!(settings.validate().is_ok());

        assert!(PostgresConfig::from_env().is_err());

        env::remove_var("DYNAMODB_TABLE");
        env::remove_var("PGPORT");
    }

    #[test]
    fn test_postgres_validate() {
        assert!(PostgresConfig::default().validate().is_ok());

        let zero_port = PostgresConfig {
            port: Some(0),
            ..PostgresConfig::default()
        };
        assert!(zero_port.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_table() {
        let settings = Settings {
            dynamodb_table: " ".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
