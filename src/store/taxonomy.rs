//! Category and brand stores. Both namespaces share one table and one
//! set of invariants: globally unique slugs per namespace, parents form
//! a forest, a child's level follows its parent by one step.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::catalog::slug::{slug_of, unique_slug};
use crate::domain::product::Product;
use crate::domain::taxonomy::{TaxonomyInput, TaxonomyKind, TaxonomyLevel, TaxonomyNode, MAX_TREE_DEPTH};
use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct TaxonomyStorage {
    pool: SqlitePool,
}

impl TaxonomyStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyNode>> {
        let nodes = sqlx::query_as::<_, TaxonomyNode>(
            "SELECT id, name, slug, level, parent_id, image, created_at
             FROM taxonomy WHERE kind = ? ORDER BY name",
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    pub async fn get(&self, kind: TaxonomyKind, id: &str) -> Result<TaxonomyNode> {
        sqlx::query_as::<_, TaxonomyNode>(
            "SELECT id, name, slug, level, parent_id, image, created_at
             FROM taxonomy WHERE kind = ? AND id = ?",
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(kind.noun()))
    }

    pub async fn create(&self, kind: TaxonomyKind, input: TaxonomyInput) -> Result<TaxonomyNode> {
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StoreError::validation("name is required"))?
            .to_string();

        let level = self.resolve_level(kind, input.parent.as_deref(), input.level).await?;
        let slug = self.free_slug(kind, &name).await?;

        let node = TaxonomyNode {
            id: Uuid::new_v4().to_string(),
            name,
            slug,
            level,
            parent: input.parent,
            image: input.image,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO taxonomy (id, kind, slug, name, level, parent_id, image, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&node.id)
        .bind(kind)
        .bind(&node.slug)
        .bind(&node.name)
        .bind(node.level)
        .bind(&node.parent)
        .bind(&node.image)
        .bind(node.created_at)
        .execute(&self.pool)
        .await?;
        Ok(node)
    }

    pub async fn update(&self, kind: TaxonomyKind, id: &str, input: TaxonomyInput) -> Result<TaxonomyNode> {
        let mut node = self.get(kind, id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(StoreError::validation("name must not be empty"));
            }
            node.name = name;
        }
        if let Some(parent) = &input.parent {
            if parent == id {
                return Err(StoreError::validation("a node cannot be its own parent"));
            }
            self.check_no_cycle(kind, id, parent).await?;
            node.parent = Some(parent.clone());
            node.level = self.resolve_level(kind, Some(parent), input.level).await?;
        } else if let Some(level) = input.level {
            node.level = level;
        }
        if input.image.is_some() {
            node.image = input.image;
        }

        sqlx::query(
            "UPDATE taxonomy SET name = ?, level = ?, parent_id = ?, image = ?
             WHERE kind = ? AND id = ?",
        )
        .bind(&node.name)
        .bind(node.level)
        .bind(&node.parent)
        .bind(&node.image)
        .bind(kind)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(node)
    }

    /// Deletable only when the node has no children and no product
    /// references it. The error names the blocking count.
    pub async fn delete(&self, kind: TaxonomyKind, id: &str) -> Result<()> {
        self.get(kind, id).await?;

        let children: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM taxonomy WHERE kind = ? AND parent_id = ?")
                .bind(kind)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if children > 0 {
            return Err(StoreError::conflict(format!(
                "cannot delete {}: {children} child node(s) still attached",
                kind.noun()
            )));
        }

        let referencing = self.referencing_products(kind, id).await?;
        if referencing > 0 {
            return Err(StoreError::conflict(format!(
                "cannot delete {}: {referencing} product(s) still reference it",
                kind.noun()
            )));
        }

        sqlx::query("DELETE FROM taxonomy WHERE kind = ? AND id = ?")
            .bind(kind)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn referencing_products(&self, kind: TaxonomyKind, id: &str) -> Result<usize> {
        let docs: Vec<String> = sqlx::query_scalar("SELECT doc FROM products")
            .fetch_all(&self.pool)
            .await?;
        let count = docs
            .iter()
            .filter_map(|doc| serde_json::from_str::<Product>(doc).ok())
            .filter(|p| match kind {
                TaxonomyKind::Category => {
                    p.primary_category_id.as_deref() == Some(id)
                        || p.additional_category_ids.iter().any(|c| c == id)
                }
                TaxonomyKind::Brand => {
                    p.primary_brand_id.as_deref() == Some(id)
                        || p.additional_brand_ids.iter().any(|b| b == id)
                }
            })
            .count();
        Ok(count)
    }

    /// With a parent, the child level is fixed one step below it; an
    /// explicit level must agree. Without one, the node is a root at the
    /// given level (department by default).
    async fn resolve_level(
        &self,
        kind: TaxonomyKind,
        parent: Option<&str>,
        level: Option<TaxonomyLevel>,
    ) -> Result<TaxonomyLevel> {
        match parent {
            Some(parent_id) => {
                let parent = self.get(kind, parent_id).await.map_err(|_| {
                    StoreError::validation(format!("parent {} does not exist", parent_id))
                })?;
                let expected = parent.level.child().ok_or_else(|| {
                    StoreError::validation("type-level nodes cannot have children")
                })?;
                if let Some(level) = level {
                    if level != expected {
                        return Err(StoreError::validation(
                            "level must be one step below the parent's",
                        ));
                    }
                }
                Ok(expected)
            }
            None => Ok(level.unwrap_or(TaxonomyLevel::Department)),
        }
    }

    /// Walking up from `new_parent` must terminate within the depth
    /// bound and never pass through `id`.
    async fn check_no_cycle(&self, kind: TaxonomyKind, id: &str, new_parent: &str) -> Result<()> {
        let mut current = Some(new_parent.to_string());
        for _ in 0..MAX_TREE_DEPTH {
            let Some(cursor) = current else { return Ok(()) };
            if cursor == id {
                return Err(StoreError::validation(
                    "parent change would create a cycle",
                ));
            }
            current = self.get(kind, &cursor).await?.parent;
        }
        Err(StoreError::validation("taxonomy too deep"))
    }

    async fn free_slug(&self, kind: TaxonomyKind, name: &str) -> Result<String> {
        let base = slug_of(name);
        let pattern = if base.is_empty() { "%".to_string() } else { format!("{base}%") };
        let taken: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM taxonomy WHERE kind = ? AND slug LIKE ?")
                .bind(kind)
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?;
        let taken: HashSet<String> = taken.into_iter().collect();
        unique_slug(name, &taken)
    }
}
