//! The four cascading import stages.
//!
//! Every stage runs the same loop: stream rows, classify, batch, flush.
//! The accepted-ID set a stage returns is the only channel to the stage
//! below it; a row whose parent was rejected anywhere up the tree never
//! reaches the database.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::{debug, info};

use super::csv_reader::CsvFileReader;
use super::fields::{is_valid_name, parse_float, parse_id, parse_int, parse_year};
use super::ImportService;
use crate::models::{Axle, Brand, ImportStage, Kit, Model, SizeType, TyreSize};

/// A model stays in the dataset while its newest kit meets the year cutoff.
pub(crate) fn is_model_relevant(max_year: i32, min_year: i32) -> bool {
    max_year >= min_year
}

/// An individual kit must meet the cutoff on its own; belonging to a
/// relevant model is not enough.
pub(crate) fn is_kit_importable(year: i32, min_year: i32) -> bool {
    year >= min_year
}

fn relevant_model_ids(
    max_years: &HashMap<i64, i32>,
    valid_model_ids: &HashSet<i64>,
    min_year: i32,
) -> HashSet<i64> {
    max_years
        .iter()
        .filter(|(id, &max_year)| {
            is_model_relevant(max_year, min_year) && valid_model_ids.contains(id)
        })
        .map(|(&id, _)| id)
        .collect()
}

impl ImportService {
    pub(crate) async fn import_brands(&self, reader: &CsvFileReader) -> Result<HashSet<i64>> {
        self.state
            .begin_stage(ImportStage::Brands, Some("brands"), 0)
            .await;

        let mut stream = reader.open().await?;
        let id_col = stream.column("id")?;
        let name_col = stream.column("name")?;

        let interval = self.progress_update_interval.max(1);
        let mut accepted = HashSet::new();
        let mut batch: Vec<Brand> = Vec::with_capacity(self.batch_size);
        let mut processed = 0u64;
        let mut rejected = 0u64;

        while let Some(row) = stream.next_row().await? {
            processed += 1;
            if processed % interval == 0 {
                self.state.set_processed(processed).await;
            }

            let Some(id) = parse_id(row.get(id_col)) else {
                rejected += 1;
                continue;
            };
            let name = row.get(name_col).unwrap_or_default();
            if !is_valid_name(name) {
                rejected += 1;
                continue;
            }

            accepted.insert(id);
            batch.push(Brand {
                id,
                name: name.to_string(),
            });
            if batch.len() >= self.batch_size {
                self.database.insert_brands(&batch).await?;
                batch.clear();
            }
        }
        self.database.insert_brands(&batch).await?;

        self.state.set_processed(processed).await;
        self.state
            .update_stats(|stats| stats.brands = accepted.len() as u64)
            .await;
        info!(
            "Imported {} brands ({} rows rejected)",
            accepted.len(),
            rejected
        );
        Ok(accepted)
    }

    pub(crate) async fn import_models(
        &self,
        reader: &CsvFileReader,
        valid_brand_ids: &HashSet<i64>,
    ) -> Result<HashSet<i64>> {
        self.state
            .begin_stage(ImportStage::Models, Some("models"), 0)
            .await;

        let mut stream = reader.open().await?;
        let id_col = stream.column("id")?;
        let brand_col = stream.column("brand")?;
        let name_col = stream.column("name")?;

        let interval = self.progress_update_interval.max(1);
        let mut accepted = HashSet::new();
        let mut batch: Vec<Model> = Vec::with_capacity(self.batch_size);
        let mut processed = 0u64;
        let mut rejected = 0u64;

        while let Some(row) = stream.next_row().await? {
            processed += 1;
            if processed % interval == 0 {
                self.state.set_processed(processed).await;
            }

            let (Some(id), Some(brand_id)) =
                (parse_id(row.get(id_col)), parse_id(row.get(brand_col)))
            else {
                rejected += 1;
                continue;
            };
            let name = row.get(name_col).unwrap_or_default();
            // A model under a rejected brand goes with it, along with every
            // kit below.
            if !is_valid_name(name) || !valid_brand_ids.contains(&brand_id) {
                rejected += 1;
                continue;
            }

            accepted.insert(id);
            batch.push(Model {
                id,
                brand_id,
                name: name.to_string(),
            });
            if batch.len() >= self.batch_size {
                self.database.insert_models(&batch).await?;
                batch.clear();
            }
        }
        self.database.insert_models(&batch).await?;

        self.state.set_processed(processed).await;
        self.state
            .update_stats(|stats| stats.models = accepted.len() as u64)
            .await;
        info!(
            "Imported {} models ({} rows rejected)",
            accepted.len(),
            rejected
        );
        Ok(accepted)
    }

    /// Pass 1 over the kit file: the newest kit year seen per model, across
    /// all rows regardless of validity elsewhere. Whether a model is still
    /// current cannot be decided until the whole file has been read.
    async fn find_model_max_years(
        &self,
        reader: &CsvFileReader,
    ) -> Result<(HashMap<i64, i32>, u64)> {
        let mut stream = reader.open().await?;
        let model_col = stream.column("model")?;
        let year_col = stream.column("year")?;

        let mut max_years: HashMap<i64, i32> = HashMap::new();
        let mut rows = 0u64;

        while let Some(row) = stream.next_row().await? {
            rows += 1;
            let (Some(model_id), Some(year)) =
                (parse_id(row.get(model_col)), parse_year(row.get(year_col)))
            else {
                continue;
            };
            let entry = max_years.entry(model_id).or_insert(year);
            if year > *entry {
                *entry = year;
            }
        }

        Ok((max_years, rows))
    }

    pub(crate) async fn import_kits(
        &self,
        reader: &CsvFileReader,
        valid_model_ids: &HashSet<i64>,
        min_year: i32,
    ) -> Result<HashSet<i64>> {
        self.state
            .begin_stage(ImportStage::Kits, Some("kits"), 0)
            .await;

        let (max_years, total_rows) = self.find_model_max_years(reader).await?;
        let relevant = relevant_model_ids(&max_years, valid_model_ids, min_year);
        debug!(
            "{} of {} models have a kit from {} or later",
            relevant.len(),
            max_years.len(),
            min_year
        );

        // Pass 2 re-reads the same file; pass 1 already counted it.
        self.state.set_total(total_rows).await;

        let mut stream = reader.open().await?;
        let id_col = stream.column("id")?;
        let model_col = stream.column("model")?;
        let year_col = stream.column("year")?;
        let name_col = stream.column("name")?;
        let pcd_col = stream.optional_column("pcd");
        let bolt_count_col = stream.optional_column("bolt_count");
        let dia_col = stream.optional_column("dia");
        let bolt_size_col = stream.optional_column("bolt_size");

        let interval = self.progress_update_interval.max(1);
        let mut accepted = HashSet::new();
        let mut batch: Vec<Kit> = Vec::with_capacity(self.batch_size);
        let mut processed = 0u64;

        while let Some(row) = stream.next_row().await? {
            processed += 1;
            if processed % interval == 0 {
                self.state.set_processed(processed).await;
            }

            let (Some(id), Some(model_id), Some(year)) = (
                parse_id(row.get(id_col)),
                parse_id(row.get(model_col)),
                parse_year(row.get(year_col)),
            ) else {
                continue;
            };
            // An old kit of a still-current model is dropped too; relevance
            // keeps the model, not its back catalogue.
            if !relevant.contains(&model_id) || !is_kit_importable(year, min_year) {
                continue;
            }

            accepted.insert(id);
            batch.push(Kit {
                id,
                model_id,
                year,
                name: row.get(name_col).unwrap_or_default().to_string(),
                pcd: pcd_col.and_then(|col| parse_float(row.get(col))),
                bolt_count: bolt_count_col.and_then(|col| parse_int(row.get(col))),
                dia: dia_col.and_then(|col| parse_float(row.get(col))),
                bolt_size: bolt_size_col.and_then(|col| parse_float(row.get(col))),
            });
            if batch.len() >= self.batch_size {
                self.database.insert_kits(&batch).await?;
                batch.clear();
            }
        }
        self.database.insert_kits(&batch).await?;

        self.state.set_processed(processed).await;
        self.state
            .update_stats(|stats| {
                stats.kits = accepted.len() as u64;
                stats.kits_filtered_from = processed;
            })
            .await;
        info!(
            "Imported {} kits out of {} rows (min year {})",
            accepted.len(),
            processed,
            min_year
        );
        Ok(accepted)
    }

    pub(crate) async fn import_tyre_sizes(
        &self,
        reader: &CsvFileReader,
        valid_kit_ids: &HashSet<i64>,
    ) -> Result<u64> {
        self.state
            .begin_stage(ImportStage::Sizes, Some("tyre_sizes"), 0)
            .await;

        let mut stream = reader.open().await?;
        let id_col = stream.column("id")?;
        let kit_col = stream.column("kit")?;
        let width_col = stream.column("width")?;
        let height_col = stream.column("height")?;
        let diameter_col = stream.column("diameter")?;
        let type_col = stream.column("type")?;
        let axle_col = stream.column("axle")?;
        let axle_group_col = stream.optional_column("axle_group");

        let interval = self.progress_update_interval.max(1);
        let mut imported = 0u64;
        let mut batch: Vec<TyreSize> = Vec::with_capacity(self.batch_size);
        let mut processed = 0u64;

        while let Some(row) = stream.next_row().await? {
            processed += 1;
            if processed % interval == 0 {
                self.state.set_processed(processed).await;
            }

            let (Some(id), Some(kit_id)) = (parse_id(row.get(id_col)), parse_id(row.get(kit_col)))
            else {
                continue;
            };
            if !valid_kit_ids.contains(&kit_id) {
                continue;
            }
            // The three dimensions are mandatory; the coded columns always
            // decode to a closed enum value.
            let (Some(width), Some(height), Some(diameter)) = (
                parse_float(row.get(width_col)),
                parse_float(row.get(height_col)),
                parse_float(row.get(diameter_col)),
            ) else {
                continue;
            };

            imported += 1;
            batch.push(TyreSize {
                id,
                kit_id,
                width,
                height,
                diameter,
                size_type: SizeType::from_code(row.get(type_col).unwrap_or_default()),
                axle: Axle::from_code(row.get(axle_col).unwrap_or_default()),
                axle_group: axle_group_col.and_then(|col| parse_int(row.get(col))),
            });
            if batch.len() >= self.batch_size {
                self.database.insert_tyre_sizes(&batch).await?;
                batch.clear();
            }
        }
        self.database.insert_tyre_sizes(&batch).await?;

        self.state.set_processed(processed).await;
        self.state
            .update_stats(|stats| {
                stats.tyre_sizes = imported;
                stats.tyre_sizes_filtered_from = processed;
            })
            .await;
        info!("Imported {} tyre sizes out of {} rows", imported, processed);
        Ok(imported)
    }
}
