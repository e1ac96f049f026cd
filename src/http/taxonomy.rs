//! Category and brand handlers. One set of functions serves both
//! namespaces; every write flushes the matching tree cache before the
//! response goes out.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::catalog::tree::CategoryTreeCache;
use crate::domain::taxonomy::{TaxonomyInput, TaxonomyKind};
use crate::error::Result;
use crate::http::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// `tree=true` returns the nested forest instead of the flat list.
    #[serde(default)]
    pub tree: bool,
}

fn cache_for(state: &AppState, kind: TaxonomyKind) -> &Arc<CategoryTreeCache> {
    match kind {
        TaxonomyKind::Category => &state.category_tree,
        TaxonomyKind::Brand => &state.brand_tree,
    }
}

async fn list(state: AppState, kind: TaxonomyKind, params: ListParams) -> Result<Response> {
    let key = match kind {
        TaxonomyKind::Category => "categories",
        TaxonomyKind::Brand => "brands",
    };
    let body = if params.tree {
        serde_json::json!({ "success": true, key: cache_for(&state, kind).tree().await })
    } else {
        serde_json::json!({ "success": true, key: state.taxonomy.list(kind).await? })
    };
    Ok(Json(body).into_response())
}

async fn get(state: AppState, kind: TaxonomyKind, id: String) -> Result<Response> {
    let node = state.taxonomy.get(kind, &id).await?;
    Ok(Json(serde_json::json!({ "success": true, (kind.noun()): node })).into_response())
}

async fn create(state: AppState, kind: TaxonomyKind, input: TaxonomyInput) -> Result<Response> {
    let node = state.taxonomy.create(kind, input).await?;
    cache_for(&state, kind).invalidate();
    let body = serde_json::json!({ "success": true, (kind.noun()): node });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update(state: AppState, kind: TaxonomyKind, id: String, input: TaxonomyInput) -> Result<Response> {
    let node = state.taxonomy.update(kind, &id, input).await?;
    cache_for(&state, kind).invalidate();
    Ok(Json(serde_json::json!({ "success": true, (kind.noun()): node })).into_response())
}

async fn delete(state: AppState, kind: TaxonomyKind, id: String) -> Result<Response> {
    state.taxonomy.delete(kind, &id).await?;
    cache_for(&state, kind).invalidate();
    let body = serde_json::json!({
        "success": true,
        "message": format!("{} deleted", kind.noun()),
    });
    Ok(Json(body).into_response())
}

pub async fn list_categories(State(state): State<AppState>, Query(p): Query<ListParams>) -> Result<Response> {
    list(state, TaxonomyKind::Category, p).await
}

pub async fn get_category(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    get(state, TaxonomyKind::Category, id).await
}

pub async fn create_category(State(state): State<AppState>, Json(input): Json<TaxonomyInput>) -> Result<Response> {
    create(state, TaxonomyKind::Category, input).await
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TaxonomyInput>,
) -> Result<Response> {
    update(state, TaxonomyKind::Category, id, input).await
}

pub async fn delete_category(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    delete(state, TaxonomyKind::Category, id).await
}

pub async fn list_brands(State(state): State<AppState>, Query(p): Query<ListParams>) -> Result<Response> {
    list(state, TaxonomyKind::Brand, p).await
}

pub async fn get_brand(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    get(state, TaxonomyKind::Brand, id).await
}

pub async fn create_brand(State(state): State<AppState>, Json(input): Json<TaxonomyInput>) -> Result<Response> {
    create(state, TaxonomyKind::Brand, input).await
}

pub async fn update_brand(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TaxonomyInput>,
) -> Result<Response> {
    update(state, TaxonomyKind::Brand, id, input).await
}

pub async fn delete_brand(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    delete(state, TaxonomyKind::Brand, id).await
}
