//! Product and facet handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::catalog::facets::FacetSummary;
use crate::catalog::{ListQuery, Paging, DEFAULT_LIMIT};
use crate::domain::product::{Product, ProductInput, ProductStatus};
use crate::domain::selection::{FilterSelection, SortKey};
use crate::error::{Result, StoreError};
use crate::http::response::cached_json;
use crate::http::AppState;

/// Query grammar shared by the catalog page and the admin listing. The
/// context params double as the facet-read params.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductParams {
    pub category: Option<String>,
    pub business: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub colors: Option<String>,
    pub brands: Option<String>,
    /// URL-encoded JSON object, key to value list.
    pub filters: Option<String>,
    pub page: Option<u32>,
    pub featured: Option<bool>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl ProductParams {
    fn selection(&self) -> Result<FilterSelection> {
        let mut sel = FilterSelection::new();
        sel.category_slug = self.category.clone();
        sel.business_slug = self.business.clone();
        sel.search = self.search.clone();
        if let Some(sort) = self.sort.as_deref() {
            sel.sort = SortKey::parse(sort)
                .ok_or_else(|| StoreError::validation(format!("unknown sort key '{sort}'")))?;
        }
        sel.price_min = self.price_min;
        sel.price_max = self.price_max;
        if let Some(colors) = self.colors.as_deref() {
            sel.colors = split_list(colors);
        }
        if let Some(brands) = self.brands.as_deref() {
            sel.brands = split_list(brands);
        }
        if let Some(filters) = self.filters.as_deref() {
            sel.filters = serde_json::from_str(filters)
                .map_err(|e| StoreError::validation(format!("malformed filters object: {e}")))?;
        }
        sel.page = self.page.unwrap_or(1);
        Ok(sel)
    }

    fn status(&self) -> Result<Option<ProductStatus>> {
        match self.status.as_deref() {
            None => Ok(None),
            Some(raw) => serde_json::from_value(serde_json::Value::String(raw.to_string()))
                .map(Some)
                .map_err(|_| StoreError::validation(format!("unknown status '{raw}'"))),
        }
    }

    fn paging(&self, sel: &FilterSelection) -> Paging {
        if self.page.is_some() {
            Paging::Page(sel.page)
        } else {
            Paging::Slice {
                limit: self.limit.unwrap_or(DEFAULT_LIMIT),
                skip: self.skip.unwrap_or(0),
            }
        }
    }
}

fn split_list(value: &str) -> std::collections::BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Serialize)]
struct ProductListBody {
    success: bool,
    products: Vec<Product>,
    total: usize,
    limit: usize,
    skip: usize,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductParams>,
) -> Result<Response> {
    let selection = params.selection()?;
    let query = ListQuery {
        paging: params.paging(&selection),
        featured: params.featured,
        status: params.status()?,
        selection,
    };
    let page = state.catalog.list(&query).await?;
    Ok(cached_json(ProductListBody {
        success: true,
        products: page.products,
        total: page.total,
        limit: page.limit,
        skip: page.skip,
    }))
}

#[derive(Serialize)]
struct FacetsBody {
    success: bool,
    facets: FacetSummary,
}

pub async fn product_facets(
    State(state): State<AppState>,
    Query(params): Query<ProductParams>,
) -> Result<Response> {
    let selection = params.selection()?;
    let facets = state.catalog.facets(&selection).await?;
    Ok(cached_json(FacetsBody { success: true, facets }))
}

#[derive(Serialize)]
struct ProductBody {
    success: bool,
    product: Product,
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Response> {
    let product = state.catalog.get(&id_or_slug).await?;
    Ok(Json(ProductBody { success: true, product }).into_response())
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<Response> {
    let product = state.catalog.create(input).await?;
    Ok((StatusCode::CREATED, Json(ProductBody { success: true, product })).into_response())
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Response> {
    let product = state.catalog.update(&id, input).await?;
    Ok(Json(ProductBody { success: true, product }).into_response())
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let product = state.catalog.delete(&id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("product '{}' deleted", product.title),
    })))
}
