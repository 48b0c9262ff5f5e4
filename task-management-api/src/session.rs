//! Database handle and schema setup.
//!
//! The connection returned by [`connect`] is a pool. Each storage call made
//! through it checks a connection out for the duration of that call only,
//! so no two requests ever share one. Multi-step operations open a
//! transaction with [`sea_orm::TransactionTrait::begin`], which rolls back
//! when dropped without a commit.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Opens the store named by `database_url`.
///
/// The embedded SQLite store allows one writer at a time, so its pool is
/// held to a single connection. This also keeps `sqlite::memory:` databases
/// alive for the life of the pool. Other backends use the driver defaults.
#[tracing::instrument(skip(database_url))]
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    if is_embedded(database_url) {
        options.max_connections(1).min_connections(1);
    }
    options.sqlx_logging(false);
    Database::connect(options).await
}

/// Creates the schema if it does not exist yet. Safe to call on every start.
#[tracing::instrument(skip(db))]
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await
}

fn is_embedded(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}
