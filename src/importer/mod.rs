use anyhow::Result;
use tracing::{error, info};

pub mod csv_reader;
pub mod fields;
pub mod stages;
pub mod state_manager;

pub use state_manager::ImportStateManager;

use crate::config::{Config, SourcesConfig};
use crate::database::Database;
use crate::errors::types::ImportError;
use crate::models::{DbStats, ImportProgress, ImportStage};
use csv_reader::CsvFileReader;

/// Sequences the four import stages and guards the whole run behind a
/// single-flight check. At most one import is live per process; the check
/// is cooperative, not a lock.
pub struct ImportService {
    database: Database,
    state: ImportStateManager,
    sources: SourcesConfig,
    batch_size: usize,
    progress_update_interval: u64,
}

impl ImportService {
    pub fn new(database: Database, state: ImportStateManager, config: &Config) -> Self {
        Self {
            database,
            state,
            sources: config.sources.clone(),
            batch_size: config.import.batch_size.max(1),
            progress_update_interval: config.import.progress_update_interval,
        }
    }

    /// Runs a full import. Refuses immediately, without touching the
    /// progress record, when another run is still live. Resolves once the
    /// run reaches done or error; callers that want a background run spawn
    /// this future.
    pub async fn run_import(&self, min_year: i32) -> Result<()> {
        self.state.try_start().await?;

        match self.execute_stages(min_year).await {
            Ok(()) => {
                self.state.complete().await;
                Ok(())
            }
            Err(e) => {
                // Stages never swallow their own failures; this is the one
                // place progress learns about them before they propagate.
                error!("Import failed: {:#}", e);
                self.state.fail(format!("{:#}", e)).await;
                Err(e)
            }
        }
    }

    async fn execute_stages(&self, min_year: i32) -> Result<()> {
        info!("Starting fitment import (min year {})", min_year);

        // Preparing: a run always rebuilds from empty tables.
        self.database.reset_tables().await?;

        let brands = self
            .import_brands(&self.reader_for(&self.sources.brands_file)?)
            .await?;
        let models = self
            .import_models(&self.reader_for(&self.sources.models_file)?, &brands)
            .await?;
        let kits = self
            .import_kits(&self.reader_for(&self.sources.kits_file)?, &models, min_year)
            .await?;
        self.import_tyre_sizes(&self.reader_for(&self.sources.tyre_sizes_file)?, &kits)
            .await?;

        self.state
            .begin_stage(ImportStage::Indexing, None, 0)
            .await;
        self.database.create_indexes().await?;
        self.database.checkpoint().await;

        info!("Import completed");
        Ok(())
    }

    fn reader_for(&self, file_name: &str) -> Result<CsvFileReader, ImportError> {
        CsvFileReader::new(
            self.sources.dir.join(file_name),
            self.sources.delimiter_byte(),
            &self.sources.encoding,
        )
    }

    /// Destructive reset for use outside a run. Conflicts with a live run
    /// rather than queueing behind it.
    pub async fn reset_tables(&self) -> Result<()> {
        let progress = self.state.snapshot().await;
        if !progress.stage.is_terminal() {
            return Err(ImportError::reset_conflict(progress.stage.as_str()).into());
        }
        self.database.reset_tables().await
    }

    pub async fn get_progress(&self) -> ImportProgress {
        self.state.snapshot().await
    }

    pub async fn is_import_running(&self) -> bool {
        self.state.is_running().await
    }

    pub async fn get_db_stats(&self) -> Option<DbStats> {
        self.database.get_db_stats().await
    }
}
