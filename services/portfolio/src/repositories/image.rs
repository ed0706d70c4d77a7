//! Image repository for database operations

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::image::{GalleryFilter, ImageRecord, NewImage};
use crate::pipeline::ImageStore;

/// Gallery image repository
#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List images, newest first, optionally constrained by category and
    /// orientation
    pub async fn list(&self, filter: GalleryFilter) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, image_url, media_id, category,
                   orientation, upload_method, uploaded_at, updated_at
            FROM images
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR orientation = $2)
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.orientation.map(|o| o.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_image).collect()
    }

    /// Distinct category values currently present in the gallery
    pub async fn distinct_categories(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT category
            FROM images
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("category")).collect())
    }
}

impl ImageStore for ImageRepository {
    async fn insert(&self, image: NewImage) -> Result<ImageRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO images
                (title, description, image_url, media_id, category, orientation, upload_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, description, image_url, media_id, category,
                      orientation, upload_method, uploaded_at, updated_at
            "#,
        )
        .bind(&image.title)
        .bind(&image.description)
        .bind(&image.image_url)
        .bind(&image.media_id)
        .bind(image.category.as_str())
        .bind(image.orientation.as_str())
        .bind(image.upload_method.as_str())
        .fetch_one(&self.pool)
        .await?;

        map_image(&row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, image_url, media_id, category,
                   orientation, upload_method, uploaded_at, updated_at
            FROM images
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_image).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_image(row: &sqlx::postgres::PgRow) -> Result<ImageRecord> {
    let category: String = row.get("category");
    let orientation: String = row.get("orientation");
    let upload_method: String = row.get("upload_method");

    Ok(ImageRecord {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        media_id: row.get("media_id"),
        category: category
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("stored category no longer parses")?,
        orientation: orientation
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("stored orientation no longer parses")?,
        upload_method: upload_method
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("stored upload method no longer parses")?,
        uploaded_at: row.get("uploaded_at"),
        updated_at: row.get("updated_at"),
    })
}
