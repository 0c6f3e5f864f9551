//! PostgreSQL query executor with connection pooling

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row as _;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::Query;

use crate::domain::LabError;
use crate::domain::storage::{Queryable, Row};

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/cost_lab".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// [`Queryable`] over a Postgres pool.
///
/// Each statement is wrapped as `WITH q AS (<sql>) SELECT row_to_json(q)`, so
/// it must produce rows: a SELECT, or a write with a RETURNING clause.
/// Parameters are bound as text, bigint, double or jsonb by JSON type; use
/// explicit casts in the SQL for other column types.
#[derive(Clone)]
pub struct PostgresQueryable {
    pool: PgPool,
}

impl Debug for PostgresQueryable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresQueryable").finish()
    }
}

impl PostgresQueryable {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pooled connection
    pub async fn connect(config: &PostgresConfig) -> Result<Self, LabError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| LabError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Queryable for PostgresQueryable {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, LabError> {
        let wrapped = wrap_statement(sql);
        let query = params
            .iter()
            .fold(sqlx::query(&wrapped), |query, param| bind_param(query, param));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LabError::storage(format!("Query failed: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                let value: Value = row
                    .try_get("row")
                    .map_err(|e| LabError::storage(format!("Failed to read row: {}", e)))?;

                match value {
                    Value::Object(map) => Ok(map),
                    other => Err(LabError::storage(format!(
                        "Expected a JSON object row, got {}",
                        other
                    ))),
                }
            })
            .collect()
    }
}

fn wrap_statement(sql: &str) -> String {
    let sql = sql.trim().trim_end_matches(';');
    format!("WITH q AS ({sql}) SELECT row_to_json(q) AS row FROM q")
}

fn bind_param<'q>(
    query: Query<'q, sqlx::Postgres, PgArguments>,
    param: &Value,
) -> Query<'q, sqlx::Postgres, PgArguments> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.clone()),
    }
}
