//! Catalog read and write paths.
//!
//! [`Catalog`] ties the product store to the tree cache, the filter and
//! facet engines, and the facet-read cache, and routes every product
//! write through cache invalidation and the image-purge boundary.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::product::{Product, ProductInput, ProductStatus};
use crate::domain::selection::FilterSelection;
use crate::error::Result;
use crate::store::ProductStorage;
use crate::uploads::ImagePurger;

pub mod facets;
pub mod filter;
pub mod slug;
pub mod tree;
pub mod url_state;

use facets::{FacetCache, FacetSummary};
use tree::CategoryTreeCache;

/// How a list read is sliced: catalog pages are fixed at
/// [`filter::PAGE_SIZE`], admin reads use an explicit window.
#[derive(Clone, Copy, Debug)]
pub enum Paging {
    Page(u32),
    Slice { limit: usize, skip: usize },
}

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 200;

#[derive(Clone, Debug)]
pub struct ListQuery {
    pub selection: FilterSelection,
    pub featured: Option<bool>,
    pub status: Option<ProductStatus>,
    pub paging: Paging,
}

#[derive(Clone, Debug)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: usize,
    pub limit: usize,
    pub skip: usize,
}

pub struct Catalog {
    products: ProductStorage,
    tree: Arc<CategoryTreeCache>,
    facet_cache: FacetCache,
    purger: Arc<dyn ImagePurger>,
    image_hosts: Vec<String>,
}

impl Catalog {
    pub fn new(
        products: ProductStorage,
        tree: Arc<CategoryTreeCache>,
        purger: Arc<dyn ImagePurger>,
        image_hosts: Vec<String>,
    ) -> Self {
        Self {
            products,
            tree,
            facet_cache: FacetCache::default(),
            purger,
            image_hosts,
        }
    }

    async fn scope(&self, sel: &FilterSelection) -> Option<HashSet<String>> {
        match sel.category_slug.as_deref() {
            Some(slug) => Some(self.tree.descendants(slug).await),
            None => None,
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ProductPage> {
        let scope = self.scope(&query.selection).await;
        let corpus = self.products.all().await?;
        let mut matched = filter::apply(corpus, &query.selection, scope.as_ref());
        if let Some(featured) = query.featured {
            matched.retain(|p| p.featured == featured);
        }
        if let Some(status) = query.status {
            matched.retain(|p| p.status == status);
        }
        filter::sort_products(&mut matched, query.selection.sort);

        let total = matched.len();
        let (items, limit, skip) = match query.paging {
            Paging::Page(page) => {
                let (items, _) = filter::paginate(matched, page);
                let skip = (page.max(1) as usize - 1) * filter::PAGE_SIZE;
                (items, filter::PAGE_SIZE, skip)
            }
            Paging::Slice { limit, skip } => {
                let limit = limit.clamp(1, MAX_LIMIT);
                let items = matched.into_iter().skip(skip).take(limit).collect();
                (items, limit, skip)
            }
        };
        Ok(ProductPage { products: items, total, limit, skip })
    }

    /// Facets over the context-filtered set. Cached by context key only
    /// while no user facets are selected — counts depend on the user
    /// selection, so those reads always compute fresh.
    pub async fn facets(&self, sel: &FilterSelection) -> Result<FacetSummary> {
        let cacheable = !sel.has_user_facets();
        let key = sel.context_key();
        if cacheable {
            if let Some(summary) = self.facet_cache.get(&key) {
                return Ok(summary);
            }
        }
        let scope = self.scope(sel).await;
        let corpus = self.products.all().await?;
        let context = filter::context_filter(corpus, sel, scope.as_ref());
        let summary = facets::facets(&context, sel);
        if cacheable {
            self.facet_cache.insert(key, summary.clone());
        }
        Ok(summary)
    }

    pub async fn get(&self, id_or_slug: &str) -> Result<Product> {
        self.products.get(id_or_slug).await
    }

    pub async fn create(&self, input: ProductInput) -> Result<Product> {
        let product = self.products.create(input, &self.image_hosts).await?;
        self.facet_cache.clear();
        Ok(product)
    }

    pub async fn update(&self, id: &str, input: ProductInput) -> Result<Product> {
        let product = self.products.update(id, input, &self.image_hosts).await?;
        self.facet_cache.clear();
        Ok(product)
    }

    /// Deletion succeeds independent of the purge outcome; the purge is
    /// handed off fire-and-forget.
    pub async fn delete(&self, id: &str) -> Result<Product> {
        let product = self.products.delete(id).await?;
        self.facet_cache.clear();
        self.purger.purge(product.all_images());
        Ok(product)
    }
}
