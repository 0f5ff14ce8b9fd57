use anyhow::Result;
use tracing::{debug, info};

use super::Database;

/// Reverse dependency order, so the drops never trip a foreign key.
const DROP_TABLES: [&str; 4] = [
    "DROP TABLE IF EXISTS tyre_sizes",
    "DROP TABLE IF EXISTS kits",
    "DROP TABLE IF EXISTS models",
    "DROP TABLE IF EXISTS brands",
];

const CREATE_TABLES: [&str; 4] = [
    "CREATE TABLE brands (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE models (
        id INTEGER PRIMARY KEY,
        brand_id INTEGER NOT NULL REFERENCES brands(id),
        name TEXT NOT NULL
    )",
    "CREATE TABLE kits (
        id INTEGER PRIMARY KEY,
        model_id INTEGER NOT NULL REFERENCES models(id),
        year INTEGER NOT NULL,
        name TEXT NOT NULL,
        pcd REAL,
        bolt_count INTEGER,
        dia REAL,
        bolt_size REAL
    )",
    "CREATE TABLE tyre_sizes (
        id INTEGER PRIMARY KEY,
        kit_id INTEGER NOT NULL REFERENCES kits(id),
        width REAL NOT NULL,
        height REAL NOT NULL,
        diameter REAL NOT NULL,
        size_type TEXT NOT NULL CHECK (size_type IN ('oem', 'tuning')),
        axle TEXT NOT NULL CHECK (axle IN ('any', 'front', 'rear')),
        axle_group INTEGER
    )",
];

/// Built after the bulk load so inserts never pay index maintenance.
const CREATE_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_models_brand_id ON models(brand_id)",
    "CREATE INDEX IF NOT EXISTS idx_kits_model_id ON kits(model_id)",
    "CREATE INDEX IF NOT EXISTS idx_tyre_sizes_kit_id ON tyre_sizes(kit_id)",
    "CREATE INDEX IF NOT EXISTS idx_tyre_sizes_dimensions ON tyre_sizes(width, height, diameter)",
];

impl Database {
    /// Drops and recreates the four fitment tables. Safe to call on an empty
    /// database.
    pub async fn reset_tables(&self) -> Result<()> {
        for sql in DROP_TABLES {
            self.execute(sql).await?;
        }
        for sql in CREATE_TABLES {
            self.execute(sql).await?;
        }
        info!("Fitment tables dropped and recreated");
        Ok(())
    }

    pub async fn create_indexes(&self) -> Result<()> {
        for sql in CREATE_INDEXES {
            self.execute(sql).await?;
        }
        info!("Secondary indexes created");
        Ok(())
    }

    /// Best-effort WAL checkpoint after a large load.
    pub async fn checkpoint(&self) {
        debug!("Forcing WAL checkpoint after bulk load");
        let _ = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool())
            .await;
    }
}
