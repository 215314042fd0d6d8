//! PostgreSQL adapters - Database implementations for the fee engine ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresCatalog` - Members, categories, enrollments, item types, configuration
//! - `PostgresRuleReader` - Manual adjustments, exemptions, discount rules
//! - `PostgresFeeReader` - Read-side fee queries
//! - `PostgresUnitOfWork` - Transactional fee writes

mod catalog;
mod fee_reader;
mod rows;
mod rule_reader;
mod unit_of_work;

pub use catalog::PostgresCatalog;
pub use fee_reader::PostgresFeeReader;
pub use rule_reader::PostgresRuleReader;
pub use unit_of_work::{PostgresTransaction, PostgresUnitOfWork};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Opens a connection pool sized by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::database("Failed to connect to database", e))
}

/// Applies the schema in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database("Failed to run migrations", e))
}
