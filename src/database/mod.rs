use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Pool, Sqlite};
use std::str::FromStr;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::models::DbStats;

pub mod import;
pub mod schema;

/// The single executor for the target store. Every statement the importer
/// issues goes through this pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connects to the target database, creating it first if it does not
    /// exist yet.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if !Sqlite::database_exists(&config.url).await? {
            Sqlite::create_database(&config.url).await?;
        }

        let options = SqliteConnectOptions::from_str(&config.url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(10))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> Pool<Sqlite> {
        self.pool.clone()
    }

    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count_rows(&self, table: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Row counts for the four fitment tables, or None when the store cannot
    /// be queried. The status surface stays available either way.
    pub async fn get_db_stats(&self) -> Option<DbStats> {
        let counts = futures::try_join!(
            self.count_rows("brands"),
            self.count_rows("models"),
            self.count_rows("kits"),
            self.count_rows("tyre_sizes"),
        );

        match counts {
            Ok((brands, models, kits, tyre_sizes)) => Some(DbStats {
                brands,
                models,
                kits,
                tyre_sizes,
            }),
            Err(e) => {
                warn!("Failed to read table counts: {}", e);
                None
            }
        }
    }
}
