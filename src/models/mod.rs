use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use tracing::debug;

/// A vehicle make. Root of the fitment tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Model {
    pub id: i64,
    pub brand_id: i64,
    pub name: String,
}

/// A trim/configuration of a model, carrying the model year and the
/// wheel-mounting parameters. Mounting attributes are null when the source
/// cell is absent or malformed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Kit {
    pub id: i64,
    pub model_id: i64,
    pub year: i32,
    pub name: String,
    pub pcd: Option<f64>,
    pub bolt_count: Option<i64>,
    pub dia: Option<f64>,
    pub bolt_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TyreSize {
    pub id: i64,
    pub kit_id: i64,
    pub width: f64,
    pub height: f64,
    pub diameter: f64,
    pub size_type: SizeType,
    pub axle: Axle,
    /// Correlates the front/rear halves of one staggered fitment.
    pub axle_group: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "size_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SizeType {
    Oem,
    Tuning,
}

impl SizeType {
    /// Decodes the numeric source code. Code 1 is a manufacturer-specified
    /// size; every other code is recorded as a tuning alternative.
    pub fn from_code(code: &str) -> Self {
        match code {
            "1" => SizeType::Oem,
            "2" => SizeType::Tuning,
            other => {
                debug!("Unknown size_type code '{}', recording as tuning", other);
                SizeType::Tuning
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeType::Oem => "oem",
            SizeType::Tuning => "tuning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "axle", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Axle {
    Any,
    Front,
    Rear,
}

impl Axle {
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => Axle::Any,
            "1" => Axle::Front,
            "2" => Axle::Rear,
            other => {
                debug!("Unknown axle code '{}', recording as any", other);
                Axle::Any
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axle::Any => "any",
            Axle::Front => "front",
            Axle::Rear => "rear",
        }
    }
}

/// Where a run currently is. A new run may only start from a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStage {
    Idle,
    Preparing,
    Brands,
    Models,
    Kits,
    Sizes,
    Indexing,
    Done,
    Error,
}

impl ImportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStage::Idle | ImportStage::Done | ImportStage::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Idle => "idle",
            ImportStage::Preparing => "preparing",
            ImportStage::Brands => "brands",
            ImportStage::Models => "models",
            ImportStage::Kits => "kits",
            ImportStage::Sizes => "sizes",
            ImportStage::Indexing => "indexing",
            ImportStage::Done => "done",
            ImportStage::Error => "error",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted-row counts per entity, plus the pre-filter totals for the two
/// stages that discard aggressively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub brands: u64,
    pub models: u64,
    pub kits: u64,
    pub tyre_sizes: u64,
    pub kits_filtered_from: u64,
    pub tyre_sizes_filtered_from: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProgress {
    pub stage: ImportStage,
    pub current_table: Option<String>,
    pub processed_rows: u64,
    /// 0 when the stage has no cheap way to know the total up front.
    pub total_rows: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub stats: ImportStats,
}

impl Default for ImportProgress {
    fn default() -> Self {
        Self {
            stage: ImportStage::Idle,
            current_table: None,
            processed_rows: 0,
            total_rows: 0,
            started_at: None,
            completed_at: None,
            error: None,
            stats: ImportStats::default(),
        }
    }
}

/// Row counts read straight from the target store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub brands: i64,
    pub models: i64,
    pub kits: i64,
    pub tyre_sizes: i64,
}
