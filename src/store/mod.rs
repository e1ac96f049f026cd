//! Persistence layer. One bounded SQLite pool shared process-wide;
//! storage structs hold a pool clone each.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{Result, StoreError};

pub mod enquiries;
pub mod products;
pub mod taxonomy;

pub use enquiries::EnquiryStorage;
pub use products::ProductStorage;
pub use taxonomy::TaxonomyStorage;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Connect and migrate. The pool is bounded and never held across a
/// user interaction.
pub async fn connect(database_uri: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_uri)
        .map_err(|e| StoreError::Fatal(format!("invalid DATABASE_URI: {e}")))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;
    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| StoreError::Fatal(format!("migration failed: {e}")))?;
    Ok(pool)
}
