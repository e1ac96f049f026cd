//! Facet engine.
//!
//! Dimensions come from the *context-filtered* set (category, business,
//! search applied; user facets not), so selecting a value never removes
//! choices. The count beside each value is the number of products that
//! would remain with that value as the dimension's selection, all other
//! user facets kept.
//!
//! The golden rule: `filters` are facets, `specifications` are
//! descriptive and never surface here. `status` is not a facet either.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::filter::matches_user_facets;
use crate::domain::product::Product;
use crate::domain::selection::{is_predefined_color, normalize_term, FilterSelection};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FacetValue {
    pub value: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSummary {
    pub colors: Vec<FacetValue>,
    pub brands: Vec<FacetValue>,
    pub filters: BTreeMap<String, Vec<FacetValue>>,
    pub price_range: Option<PriceRange>,
    pub total: usize,
}

/// Alphabetical, except both-numeric values compare numerically.
fn value_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn count_with(context: &[Product], sel: &FilterSelection, patch: impl Fn(&mut FilterSelection)) -> usize {
    let mut probe = sel.clone();
    patch(&mut probe);
    context.iter().filter(|p| matches_user_facets(p, &probe)).count()
}

pub fn facets(context: &[Product], sel: &FilterSelection) -> FacetSummary {
    let mut color_names: BTreeSet<String> = BTreeSet::new();
    let mut brand_names: BTreeSet<String> = BTreeSet::new();
    let mut filter_dims: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut price_range: Option<PriceRange> = None;

    for product in context {
        for variant in &product.color_variants {
            if is_predefined_color(&variant.color_name) {
                color_names.insert(normalize_term(&variant.color_name));
            }
        }
        let brand = product.brand_name.trim();
        if !brand.is_empty() {
            brand_names.insert(brand.to_string());
        }
        for entry in &product.filters {
            let dim = filter_dims.entry(entry.key.clone()).or_default();
            for value in &entry.values {
                let value = normalize_term(value);
                if !value.is_empty() {
                    dim.insert(value);
                }
            }
        }
        let price = product.price;
        price_range = Some(match price_range {
            None => PriceRange { min: price, max: price },
            Some(r) => PriceRange { min: r.min.min(price), max: r.max.max(price) },
        });
    }

    let colors = color_names
        .into_iter()
        .map(|name| {
            let count = count_with(context, sel, |probe| {
                probe.colors = [name.clone()].into_iter().collect();
            });
            FacetValue { value: name, count }
        })
        .collect();

    let brands = brand_names
        .into_iter()
        .map(|name| {
            let count = count_with(context, sel, |probe| {
                probe.brands = [name.clone()].into_iter().collect();
            });
            FacetValue { value: name, count }
        })
        .collect();

    let filters = filter_dims
        .into_iter()
        .map(|(key, values)| {
            let mut values: Vec<FacetValue> = values
                .into_iter()
                .map(|value| {
                    let count = count_with(context, sel, |probe| {
                        probe
                            .filters
                            .insert(key.clone(), [value.clone()].into_iter().collect());
                    });
                    FacetValue { value, count }
                })
                .collect();
            values.sort_by(|a, b| value_order(&a.value, &b.value));
            (key, values)
        })
        .collect();

    FacetSummary {
        colors,
        brands,
        filters,
        price_range,
        total: context.len(),
    }
}

/// Short-TTL cache for facet reads, keyed by the serialized context
/// selection. Product writes clear it.
pub struct FacetCache {
    ttl: Duration,
    inner: Mutex<HashMap<String, (Instant, FacetSummary)>>,
}

impl FacetCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, inner: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<FacetSummary> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let (stored_at, summary) = inner.get(key)?;
        (stored_at.elapsed() < self.ttl).then(|| summary.clone())
    }

    pub fn insert(&self, key: String, summary: FacetSummary) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(key, (Instant::now(), summary));
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.clear();
    }
}

impl Default for FacetCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
