//! Relational persistence for the back-office service

pub mod entities;
pub mod log_store;
pub mod migrator;

pub use log_store::SeaOrmLogStore;
pub use migrator::Migrator;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, info};

/// Open a connection pool for a `sqlite:`, `postgres:` or `mysql:` URL.
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(url.to_string());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    // Each sqlite::memory: connection is its own database
    if url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    debug!("Connecting to database");
    Database::connect(options).await
}

/// Apply every pending migration.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await?;
    info!("Database migrations applied");
    Ok(())
}
