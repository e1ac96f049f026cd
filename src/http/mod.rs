//! HTTP surface: router, shared state, response envelope.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};

use crate::catalog::tree::CategoryTreeCache;
use crate::catalog::Catalog;
use crate::funnel::EnquiryFunnel;
use crate::leads::LeadProfileStore;
use crate::store::TaxonomyStorage;

pub mod enquiries;
pub mod products;
pub mod response;
pub mod taxonomy;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub taxonomy: TaxonomyStorage,
    pub category_tree: Arc<CategoryTreeCache>,
    pub brand_tree: Arc<CategoryTreeCache>,
    pub funnel: Arc<EnquiryFunnel>,
    pub leads: Arc<LeadProfileStore>,
    /// Digits of the staffed outbound channel; empty disables the
    /// handoff link.
    pub public_channel: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({"status": "healthy", "service": "supply-storefront"}))
            }),
        )
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/facets", get(products::product_facets))
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/categories", get(taxonomy::list_categories).post(taxonomy::create_category))
        .route(
            "/categories/:id",
            get(taxonomy::get_category)
                .put(taxonomy::update_category)
                .delete(taxonomy::delete_category),
        )
        .route("/brands", get(taxonomy::list_brands).post(taxonomy::create_brand))
        .route(
            "/brands/:id",
            get(taxonomy::get_brand).put(taxonomy::update_brand).delete(taxonomy::delete_brand),
        )
        .route("/enquiries", post(enquiries::create_enquiry))
        .route(
            "/enquiries/:id",
            get(enquiries::get_enquiry).put(enquiries::update_enquiry),
        )
        .route("/enquiries/:id/messages", post(enquiries::append_message))
        .with_state(state)
}
