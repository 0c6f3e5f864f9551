//! Database migrations infrastructure

use sqlx::postgres::PgPool;

use crate::domain::LabError;

/// PostgreSQL migrator keeping applied versions in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), LabError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LabError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration unless it is already applied
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), LabError> {
        self.ensure_migrations_table().await?;

        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
                .bind(migration.version)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    LabError::storage(format!("Failed to check migration status: {}", e))
                })?;

        if applied {
            return Ok(());
        }

        sqlx::raw_sql(&migration.up)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                LabError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                LabError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tracing::info!(
            version = migration.version,
            description = %migration.description,
            "Applied migration"
        );

        Ok(())
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, LabError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations WHERE success = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LabError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
}

impl Migration {
    pub fn new(version: i64, description: impl Into<String>, up: impl Into<String>) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
        }
    }
}

/// Schema for tracked calls and baselines
pub fn lab_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create lab_api_calls table",
            r#"
            CREATE TABLE IF NOT EXISTS lab_api_calls (
                id UUID PRIMARY KEY,
                experiment_id UUID NOT NULL,
                session_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                input_tokens BIGINT NOT NULL DEFAULT 0,
                output_tokens BIGINT NOT NULL DEFAULT 0,
                system_tokens BIGINT NOT NULL DEFAULT 0,
                cost DOUBLE PRECISION NOT NULL DEFAULT 0,
                latency_ms BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_lab_api_calls_experiment
                ON lab_api_calls(experiment_id, created_at DESC);
            "#,
        ),
        Migration::new(
            2,
            "Create lab_baselines table",
            r#"
            CREATE TABLE IF NOT EXISTS lab_baselines (
                id UUID PRIMARY KEY,
                experiment_id UUID NOT NULL,
                scenario_name TEXT NOT NULL,
                avg_cost DOUBLE PRECISION NOT NULL,
                avg_tokens DOUBLE PRECISION NOT NULL,
                avg_latency_ms DOUBLE PRECISION NOT NULL,
                sample_size BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (experiment_id, scenario_name)
            );
            "#,
        ),
    ]
}

/// Runs all pending lab migrations
pub async fn run_lab_migrations(pool: &PgPool) -> Result<(), LabError> {
    let migrator = PostgresMigrator::new(pool.clone());

    for migration in lab_migrations() {
        migrator.run_migration(&migration).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_migrations_order() {
        let migrations = lab_migrations();

        assert_eq!(migrations.len(), 2);
        for i in 1..migrations.len() {
            assert!(
                migrations[i].version > migrations[i - 1].version,
                "Migrations should be in ascending order"
            );
        }
    }

    #[test]
    fn test_lab_migrations_create_both_tables() {
        let migrations = lab_migrations();

        assert!(migrations[0].up.contains("lab_api_calls"));
        assert!(migrations[1].up.contains("lab_baselines"));
        assert!(migrations[1].up.contains("UNIQUE (experiment_id, scenario_name)"));
    }
}
