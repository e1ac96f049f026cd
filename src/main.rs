//! Supply Storefront - catalog and enquiry service

use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use supply_storefront::catalog::tree::CategoryTreeCache;
use supply_storefront::catalog::Catalog;
use supply_storefront::domain::taxonomy::TaxonomyKind;
use supply_storefront::funnel::EnquiryFunnel;
use supply_storefront::http::{router, AppState};
use supply_storefront::leads::LeadProfileStore;
use supply_storefront::store::{self, EnquiryStorage, ProductStorage, TaxonomyStorage};
use supply_storefront::uploads::DetachedPurger;
use supply_storefront::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = store::connect(&config.database_uri).await?;

    let taxonomy = TaxonomyStorage::new(pool.clone());
    let category_tree = Arc::new(CategoryTreeCache::new(taxonomy.clone(), TaxonomyKind::Category));
    let brand_tree = Arc::new(CategoryTreeCache::new(taxonomy.clone(), TaxonomyKind::Brand));
    let catalog = Arc::new(Catalog::new(
        ProductStorage::new(pool.clone()),
        Arc::clone(&category_tree),
        Arc::new(DetachedPurger),
        config.image_host_allowlist.clone(),
    ));
    let funnel = Arc::new(EnquiryFunnel::new(EnquiryStorage::new(pool.clone())));
    let leads = Arc::new(LeadProfileStore::new(config.lead_profile_path.clone()));

    let state = AppState {
        catalog,
        taxonomy,
        category_tree,
        brand_tree,
        funnel,
        leads,
        public_channel: config.public_channel_number.clone(),
    };
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("supply-storefront listening on {addr}");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
