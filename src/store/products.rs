//! Product persistence. Documents are stored whole in a JSON column;
//! id, slug, and timestamps are mirrored into indexed columns. The
//! unique slug index is the arbiter under concurrent writes — the probe
//! in `catalog::slug` just picks a candidate, and losers retry.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::catalog::slug::{slug_of, unique_slug};
use crate::domain::product::{Product, ProductInput};
use crate::error::{Result, StoreError};

const WRITE_RACE_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct ProductStorage {
    pool: SqlitePool,
}

impl ProductStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The full corpus, newest first. Documents that fail to decode are
    /// skipped with a warning, never surfaced.
    pub async fn all(&self) -> Result<Vec<Product>> {
        let docs: Vec<String> =
            sqlx::query_scalar("SELECT doc FROM products ORDER BY created_at DESC, id ASC")
                .fetch_all(&self.pool)
                .await?;
        let products = docs
            .iter()
            .filter_map(|doc| match serde_json::from_str::<Product>(doc) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable product document");
                    None
                }
            })
            .collect();
        Ok(products)
    }

    pub async fn get(&self, id_or_slug: &str) -> Result<Product> {
        let doc: Option<String> =
            sqlx::query_scalar("SELECT doc FROM products WHERE id = ? OR slug = ?")
                .bind(id_or_slug)
                .bind(id_or_slug)
                .fetch_optional(&self.pool)
                .await?;
        let doc = doc.ok_or_else(|| StoreError::not_found("product"))?;
        serde_json::from_str(&doc)
            .map_err(|e| StoreError::Fatal(format!("corrupt product document: {e}")))
    }

    pub async fn create(&self, input: ProductInput, image_hosts: &[String]) -> Result<Product> {
        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StoreError::validation("title is required"))?
            .to_string();

        let now = Utc::now();
        let mut product = Product {
            id: Uuid::new_v4().to_string(),
            title: title.clone(),
            slug: String::new(),
            summary: input.summary.unwrap_or_default(),
            description: input.description.unwrap_or_default(),
            primary_category_id: input.primary_category_id,
            additional_category_ids: input.additional_category_ids.unwrap_or_default(),
            primary_brand_id: input.primary_brand_id,
            additional_brand_ids: input.additional_brand_ids.unwrap_or_default(),
            business_type_slugs: input.business_type_slugs.unwrap_or_default(),
            brand_name: input.brand_name.unwrap_or_default(),
            price: input.price.unwrap_or(0.0),
            tags: input
                .tags
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            hero_image: input.hero_image.unwrap_or_default(),
            gallery: input.gallery.unwrap_or_default(),
            specifications: input.specifications.unwrap_or_default(),
            color_variants: input.color_variants.unwrap_or_default(),
            filters: input.filters.map(|f| f.normalize()).unwrap_or_default(),
            related_product_ids: input.related_product_ids.unwrap_or_default(),
            featured: input.featured.unwrap_or(false),
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        product.validate(image_hosts)?;

        for attempt in 0..WRITE_RACE_RETRIES {
            product.slug = self.free_slug(&product.title, None).await?;
            let doc = encode(&product)?;
            let inserted = sqlx::query(
                "INSERT INTO products (id, slug, title, created_at, updated_at, doc)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&product.id)
            .bind(&product.slug)
            .bind(&product.title)
            .bind(product.created_at)
            .bind(product.updated_at)
            .bind(&doc)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from);
            match inserted {
                Ok(_) => return Ok(product),
                Err(e) if e.is_unique_violation() && attempt + 1 < WRITE_RACE_RETRIES => continue,
                Err(e) if e.is_unique_violation() => {
                    return Err(StoreError::conflict("slug conflict, retries exhausted"))
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("slug insert loop always returns")
    }

    /// Slug re-derives only when the title changes; anything slug-like
    /// in the payload was never deserialized to begin with.
    pub async fn update(&self, id: &str, input: ProductInput, image_hosts: &[String]) -> Result<Product> {
        let mut product = self.get(id).await?;
        if product.id != id {
            // `get` also resolves slugs; updates address by id only.
            return Err(StoreError::not_found("product"));
        }
        let title_changed = product.apply(input);
        product.validate(image_hosts)?;

        for attempt in 0..WRITE_RACE_RETRIES {
            if title_changed {
                product.slug = self.free_slug(&product.title, Some(&product.id)).await?;
            }
            let doc = encode(&product)?;
            let updated = sqlx::query(
                "UPDATE products SET slug = ?, title = ?, updated_at = ?, doc = ? WHERE id = ?",
            )
            .bind(&product.slug)
            .bind(&product.title)
            .bind(product.updated_at)
            .bind(&doc)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from);
            match updated {
                Ok(done) if done.rows_affected() == 0 => {
                    return Err(StoreError::not_found("product"))
                }
                Ok(_) => return Ok(product),
                Err(e) if e.is_unique_violation() && title_changed && attempt + 1 < WRITE_RACE_RETRIES => {
                    continue
                }
                Err(e) if e.is_unique_violation() => {
                    return Err(StoreError::conflict("slug conflict, retries exhausted"))
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("slug update loop always returns")
    }

    /// Removes the row and returns the deleted document so the caller
    /// can hand its images to the purge collaborator.
    pub async fn delete(&self, id: &str) -> Result<Product> {
        let product = self.get(id).await?;
        if product.id != id {
            return Err(StoreError::not_found("product"));
        }
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(product)
    }

    async fn free_slug(&self, title: &str, exclude_id: Option<&str>) -> Result<String> {
        let base = slug_of(title);
        let pattern = if base.is_empty() { "%".to_string() } else { format!("{base}%") };
        let taken: Vec<String> = sqlx::query_scalar(
            "SELECT slug FROM products WHERE slug LIKE ? AND id != ?",
        )
        .bind(pattern)
        .bind(exclude_id.unwrap_or(""))
        .fetch_all(&self.pool)
        .await?;
        let taken: HashSet<String> = taken.into_iter().collect();
        unique_slug(title, &taken)
    }
}

fn encode(product: &Product) -> Result<String> {
    serde_json::to_string(product)
        .map_err(|e| StoreError::Fatal(format!("could not encode product document: {e}")))
}
