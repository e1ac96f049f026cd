//! Filter selections: the transient, URL-encoded state of a catalog view.
//!
//! A selection splits into a *context* part (category, business type,
//! search) that decides which facet dimensions exist, and a *user facet*
//! part (price, colors, brands, named filters) that narrows results
//! within the context.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// The closed color palette. Variant colors outside this set never show
/// up in the Color facet.
pub const PREDEFINED_COLORS: [&str; 12] = [
    "Blue", "Green", "Red", "Yellow", "Purple", "Orange", "Pink", "Brown", "Gray", "Black",
    "White", "Silver",
];

/// Canonical term form: trimmed, first character upper, remainder lower.
/// Makes "porcelain", "Porcelain", and "PORCELAIN" interchangeable on
/// both the product side and the selection side.
pub fn normalize_term(term: &str) -> String {
    let trimmed = term.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str()
        }
        None => String::new(),
    }
}

pub fn is_predefined_color(name: &str) -> bool {
    let normalized = normalize_term(name);
    PREDEFINED_COLORS.contains(&normalized.as_str())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-desc")]
    PriceDesc,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(Self::Newest),
            "price-asc" => Some(Self::PriceAsc),
            "price-desc" => Some(Self::PriceDesc),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSelection {
    pub category_slug: Option<String>,
    pub business_slug: Option<String>,
    pub search: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub colors: BTreeSet<String>,
    pub brands: BTreeSet<String>,
    pub filters: BTreeMap<String, BTreeSet<String>>,
    pub sort: SortKey,
    pub page: u32,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self { page: 1, ..Default::default() }
    }

    /// Just the context dimensions, user facets stripped. Facet dimension
    /// sets are computed against this.
    pub fn context_only(&self) -> Self {
        Self {
            category_slug: self.category_slug.clone(),
            business_slug: self.business_slug.clone(),
            search: self.search.clone(),
            sort: self.sort,
            page: 1,
            ..Default::default()
        }
    }

    /// Stable key for the facet-read cache.
    pub fn context_key(&self) -> String {
        format!(
            "c={}|b={}|s={}",
            self.category_slug.as_deref().unwrap_or(""),
            self.business_slug.as_deref().unwrap_or(""),
            self.search.as_deref().unwrap_or("")
        )
    }

    pub fn has_user_facets(&self) -> bool {
        self.price_min.is_some()
            || self.price_max.is_some()
            || !self.colors.is_empty()
            || !self.brands.is_empty()
            || !self.filters.is_empty()
    }
}
