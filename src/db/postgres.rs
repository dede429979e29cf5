//! PostgreSQL source
//!
//! Read-only access to the relational `projects` and `tokens` tables.
//! Rows are decoded by column name, and every column is cast to text so
//! timestamps keep the server's rendering (`2022-02-02 18:01:49.345261+00`).

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::PostgresConfig;

const PROJECTS_QUERY: &str = "\
    SELECT project::text AS project, COALESCE(repository::text, '') AS repository \
    FROM projects \
    ORDER BY project";

const TOKENS_QUERY: &str = "\
    SELECT token_id::text AS token_id, \
           COALESCE(created_at::text, '') AS created_at, \
           project::text AS project, \
           COALESCE(expires_at::text, '') AS expires_at \
    FROM tokens \
    ORDER BY project, token_id";

/// A row of the projects query
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProjectRow {
    pub project: String,
    pub repository: String,
}

/// A row of the tokens query
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TokenRow {
    pub token_id: String,
    pub created_at: String,
    pub project: String,
    pub expires_at: String,
}

/// Relational source of projects and tokens
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// All projects ordered by name
    async fn fetch_projects(&self) -> Result<Vec<ProjectRow>, ExtractError>;

    /// All tokens ordered by project, then token id
    async fn fetch_tokens(&self) -> Result<Vec<TokenRow>, ExtractError>;
}

/// PostgreSQL-backed source
#[derive(Clone)]
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Connect to the source database.
    ///
    /// The session time zone is pinned to UTC so timestamp columns render
    /// with a `+00` offset.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, ExtractError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .username(&config.user)
            .database(&config.database)
            .options([("TimeZone", "UTC")]);

        if let Some(port) = config.port {
            options = options.port(port);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| ExtractError::Connection(e.to_string()))?;

        tracing::info!(
            host = %config.host,
            port = ?config.port,
            database = %config.database,
            "Connected to PostgreSQL"
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl SourceStore for PostgresSource {
    async fn fetch_projects(&self) -> Result<Vec<ProjectRow>, ExtractError> {
        sqlx::query_as::<_, ProjectRow>(PROJECTS_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExtractError::Query(format!("projects: {e}")))
    }

    async fn fetch_tokens(&self) -> Result<Vec<TokenRow>, ExtractError> {
        sqlx::query_as::<_, TokenRow>(TOKENS_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExtractError::Query(format!("tokens: {e}")))
    }
}

/// Errors that can occur while reading the source database
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("PostgreSQL connection error: {0}")]
    Connection(String),

    #[error("PostgreSQL query error: {0}")]
    Query(String),
}
