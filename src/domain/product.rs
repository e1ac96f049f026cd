//! Product documents.
//!
//! Products carry two kinds of attribute data: `specifications` are
//! descriptive only and never drive navigation; `filters` are the
//! filterable dimensions. Older documents stored `filters` as a map
//! keyed by dimension name; both shapes deserialize and normalize to
//! the sequence form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, StoreError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    #[default]
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Pre-Order")]
    PreOrder,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorVariant {
    pub color_name: String,
    pub color_hex: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEntry {
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Wire shape for `filters`: either the sequence form or the legacy map.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FiltersWire {
    Entries(Vec<FilterEntry>),
    Legacy(BTreeMap<String, Vec<String>>),
}

impl FiltersWire {
    pub fn normalize(self) -> Vec<FilterEntry> {
        match self {
            Self::Entries(entries) => normalize_filter_entries(entries),
            Self::Legacy(map) => normalize_filter_entries(
                map.into_iter()
                    .map(|(key, values)| FilterEntry { key, values })
                    .collect(),
            ),
        }
    }
}

fn deserialize_filters<'de, D>(deserializer: D) -> std::result::Result<Vec<FilterEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let wire = Option::<FiltersWire>::deserialize(deserializer)?;
    Ok(wire.map(FiltersWire::normalize).unwrap_or_default())
}

/// Filter keys have a fixed normalization: the well-known dimensions are
/// title-cased, anything else keeps its spelling with the first character
/// upper-cased. Empty value lists are dropped and duplicate keys merged.
pub fn normalize_filter_key(key: &str) -> String {
    let trimmed = key.trim();
    match trimmed.to_lowercase().as_str() {
        "material" => "Material".to_string(),
        "size" => "Size".to_string(),
        "color" => "Color".to_string(),
        "usage" => "Usage".to_string(),
        _ => {
            let mut chars = trimmed.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

pub fn normalize_filter_entries(entries: Vec<FilterEntry>) -> Vec<FilterEntry> {
    let mut out: Vec<FilterEntry> = Vec::new();
    for entry in entries {
        let key = normalize_filter_key(&entry.key);
        let values: Vec<String> = entry
            .values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if key.is_empty() || values.is_empty() {
            continue;
        }
        match out.iter_mut().find(|e| e.key == key) {
            Some(existing) => {
                for v in values {
                    if !existing.values.contains(&v) {
                        existing.values.push(v);
                    }
                }
            }
            None => out.push(FilterEntry { key, values }),
        }
    }
    out
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub primary_category_id: Option<String>,
    #[serde(default)]
    pub additional_category_ids: Vec<String>,
    #[serde(default)]
    pub primary_brand_id: Option<String>,
    #[serde(default)]
    pub additional_brand_ids: Vec<String>,
    #[serde(default)]
    pub business_type_slugs: Vec<String>,
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub hero_image: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
    #[serde(default)]
    pub color_variants: Vec<ColorVariant>,
    #[serde(default, deserialize_with = "deserialize_filters")]
    pub filters: Vec<FilterEntry>,
    #[serde(default)]
    pub related_product_ids: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. Every field is optional so the same shape
/// serves both; `create` enforces the required ones. Client-supplied
/// slugs are deliberately absent: slugs are always derived server-side.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub primary_category_id: Option<String>,
    pub additional_category_ids: Option<Vec<String>>,
    pub primary_brand_id: Option<String>,
    pub additional_brand_ids: Option<Vec<String>>,
    pub business_type_slugs: Option<Vec<String>>,
    pub brand_name: Option<String>,
    pub price: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub hero_image: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub specifications: Option<Vec<Specification>>,
    pub color_variants: Option<Vec<ColorVariant>>,
    pub filters: Option<FiltersWire>,
    pub related_product_ids: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub status: Option<ProductStatus>,
}

pub fn is_valid_hex_color(hex: &str) -> bool {
    let bytes = hex.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(|b| b.is_ascii_hexdigit())
}

/// Host portion of an image URL, without scheme, port, or path.
fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let host = rest.split(['/', '?', '#']).next()?;
    Some(host.split(':').next().unwrap_or(host))
}

impl Product {
    /// Boundary validation applied on every write. `image_hosts` is the
    /// content-delivery allowlist; an empty list allows any host.
    pub fn validate(&self, image_hosts: &[String]) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::validation("title is required"));
        }
        if self.hero_image.trim().is_empty() {
            return Err(StoreError::validation("heroImage is required"));
        }
        if self.price < 0.0 || !self.price.is_finite() {
            return Err(StoreError::validation("price must be a non-negative number"));
        }
        for variant in &self.color_variants {
            if !is_valid_hex_color(&variant.color_hex) {
                return Err(StoreError::validation(format!(
                    "colorHex '{}' is not a #RRGGBB color",
                    variant.color_hex
                )));
            }
        }
        for entry in &self.filters {
            for value in &entry.values {
                if value.contains(',') {
                    return Err(StoreError::validation(format!(
                        "filter value '{value}' must not contain commas"
                    )));
                }
            }
        }
        if !image_hosts.is_empty() {
            let images = std::iter::once(self.hero_image.as_str())
                .chain(self.gallery.iter().map(String::as_str))
                .chain(
                    self.color_variants
                        .iter()
                        .flat_map(|v| v.images.iter().map(String::as_str)),
                );
            for image in images {
                match url_host(image) {
                    Some(host) if image_hosts.iter().any(|h| h == host) => {}
                    _ => {
                        return Err(StoreError::validation(format!(
                            "image host not allowed: {image}"
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Every image URL the product references, for purge on delete.
    pub fn all_images(&self) -> Vec<String> {
        let mut images = vec![self.hero_image.clone()];
        images.extend(self.gallery.iter().cloned());
        for variant in &self.color_variants {
            images.extend(variant.images.iter().cloned());
        }
        images
    }

    /// Merge an update payload. Returns whether the title changed, which
    /// is the only thing that triggers slug re-derivation.
    pub fn apply(&mut self, input: ProductInput) -> bool {
        let mut title_changed = false;
        if let Some(title) = input.title {
            if title != self.title {
                title_changed = true;
            }
            self.title = title;
        }
        if let Some(v) = input.summary {
            self.summary = v;
        }
        if let Some(v) = input.description {
            self.description = v;
        }
        if input.primary_category_id.is_some() {
            self.primary_category_id = input.primary_category_id;
        }
        if let Some(v) = input.additional_category_ids {
            self.additional_category_ids = v;
        }
        if input.primary_brand_id.is_some() {
            self.primary_brand_id = input.primary_brand_id;
        }
        if let Some(v) = input.additional_brand_ids {
            self.additional_brand_ids = v;
        }
        if let Some(v) = input.business_type_slugs {
            self.business_type_slugs = v;
        }
        if let Some(v) = input.brand_name {
            self.brand_name = v;
        }
        if let Some(v) = input.price {
            self.price = v;
        }
        if let Some(v) = input.tags {
            self.tags = v.into_iter().map(|t| t.trim().to_lowercase()).collect();
        }
        if let Some(v) = input.hero_image {
            self.hero_image = v;
        }
        if let Some(v) = input.gallery {
            self.gallery = v;
        }
        if let Some(v) = input.specifications {
            self.specifications = v;
        }
        if let Some(v) = input.color_variants {
            self.color_variants = v;
        }
        if let Some(v) = input.filters {
            self.filters = v.normalize();
        }
        if let Some(v) = input.related_product_ids {
            self.related_product_ids = v;
        }
        if let Some(v) = input.featured {
            self.featured = v;
        }
        if let Some(v) = input.status {
            self.status = v;
        }
        self.updated_at = Utc::now();
        title_changed
    }
}
