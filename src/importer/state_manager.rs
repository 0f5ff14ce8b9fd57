use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::types::ImportError;
use crate::models::{ImportProgress, ImportStage, ImportStats};

/// Holds the one mutable progress record for the process. Pollers always get
/// a full copy; the running stage is the only writer.
#[derive(Clone)]
pub struct ImportStateManager {
    progress: Arc<RwLock<ImportProgress>>,
}

impl ImportStateManager {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(RwLock::new(ImportProgress::default())),
        }
    }

    pub async fn snapshot(&self) -> ImportProgress {
        self.progress.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        !self.progress.read().await.stage.is_terminal()
    }

    /// Atomic check-and-set that starts a run. Fails without touching the
    /// record when another run holds a non-terminal stage.
    pub async fn try_start(&self) -> Result<(), ImportError> {
        let mut progress = self.progress.write().await;
        if !progress.stage.is_terminal() {
            return Err(ImportError::already_running(progress.stage.as_str()));
        }

        *progress = ImportProgress {
            stage: ImportStage::Preparing,
            started_at: Some(Utc::now()),
            ..ImportProgress::default()
        };
        Ok(())
    }

    pub async fn begin_stage(&self, stage: ImportStage, table: Option<&str>, total_rows: u64) {
        let mut progress = self.progress.write().await;
        progress.stage = stage;
        progress.current_table = table.map(str::to_string);
        progress.processed_rows = 0;
        progress.total_rows = total_rows;
    }

    pub async fn set_processed(&self, processed: u64) {
        self.progress.write().await.processed_rows = processed;
    }

    pub async fn set_total(&self, total: u64) {
        self.progress.write().await.total_rows = total;
    }

    pub async fn update_stats<F>(&self, apply: F)
    where
        F: FnOnce(&mut ImportStats),
    {
        apply(&mut self.progress.write().await.stats);
    }

    pub async fn complete(&self) {
        let mut progress = self.progress.write().await;
        progress.stage = ImportStage::Done;
        progress.current_table = None;
        progress.completed_at = Some(Utc::now());
    }

    pub async fn fail(&self, message: String) {
        let mut progress = self.progress.write().await;
        progress.stage = ImportStage::Error;
        progress.error = Some(message);
        progress.completed_at = Some(Utc::now());
    }
}

impl Default for ImportStateManager {
    fn default() -> Self {
        Self::new()
    }
}
