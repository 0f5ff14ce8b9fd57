use anyhow::Result;
use tracing::error;

use super::Database;
use crate::models::{Brand, Kit, Model, TyreSize};

// Batches for one table are awaited in production order by the stages; the
// kit table is read back between the two passes, so completion order matters.
impl Database {
    pub async fn insert_brands(&self, brands: &[Brand]) -> Result<()> {
        if brands.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        let mut query_builder = sqlx::QueryBuilder::new("INSERT INTO brands (id, name) ");
        query_builder.push_values(brands, |mut b, brand| {
            b.push_bind(brand.id).push_bind(&brand.name);
        });
        query_builder.build().execute(&mut *tx).await.map_err(|e| {
            error!("Failed to bulk insert {} brands: {}", brands.len(), e);
            e
        })?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn insert_models(&self, models: &[Model]) -> Result<()> {
        if models.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        let mut query_builder = sqlx::QueryBuilder::new("INSERT INTO models (id, brand_id, name) ");
        query_builder.push_values(models, |mut b, model| {
            b.push_bind(model.id)
                .push_bind(model.brand_id)
                .push_bind(&model.name);
        });
        query_builder.build().execute(&mut *tx).await.map_err(|e| {
            error!("Failed to bulk insert {} models: {}", models.len(), e);
            e
        })?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn insert_kits(&self, kits: &[Kit]) -> Result<()> {
        if kits.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO kits (id, model_id, year, name, pcd, bolt_count, dia, bolt_size) ",
        );
        query_builder.push_values(kits, |mut b, kit| {
            b.push_bind(kit.id)
                .push_bind(kit.model_id)
                .push_bind(kit.year)
                .push_bind(&kit.name)
                .push_bind(kit.pcd)
                .push_bind(kit.bolt_count)
                .push_bind(kit.dia)
                .push_bind(kit.bolt_size);
        });
        query_builder.build().execute(&mut *tx).await.map_err(|e| {
            error!("Failed to bulk insert {} kits: {}", kits.len(), e);
            e
        })?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn insert_tyre_sizes(&self, sizes: &[TyreSize]) -> Result<()> {
        if sizes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO tyre_sizes (id, kit_id, width, height, diameter, size_type, axle, axle_group) ",
        );
        query_builder.push_values(sizes, |mut b, size| {
            b.push_bind(size.id)
                .push_bind(size.kit_id)
                .push_bind(size.width)
                .push_bind(size.height)
                .push_bind(size.diameter)
                .push_bind(size.size_type)
                .push_bind(size.axle)
                .push_bind(size.axle_group);
        });
        query_builder.build().execute(&mut *tx).await.map_err(|e| {
            error!("Failed to bulk insert {} tyre sizes: {}", sizes.len(), e);
            e
        })?;
        tx.commit().await?;

        Ok(())
    }
}
