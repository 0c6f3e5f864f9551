//! Storage infrastructure - Postgres query executor and schema

pub mod migrations;
mod postgres;

pub use migrations::{Migration, PostgresMigrator, lab_migrations, run_lab_migrations};
pub use postgres::{PostgresConfig, PostgresQueryable};
