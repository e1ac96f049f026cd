//! Filter engine: pure predicates over a product set plus sorting and
//! pagination. Never fails — documents that don't carry a dimension
//! simply don't match it.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::product::Product;
use crate::domain::selection::{is_predefined_color, normalize_term, FilterSelection, SortKey};

/// Catalog pages are fixed-size.
pub const PAGE_SIZE: usize = 24;

/// Resolved category subtree for the current selection. `None` means no
/// category filter; an empty set means the slug resolved to nothing and
/// matches no product.
pub type CategoryScope<'a> = Option<&'a HashSet<String>>;

pub fn matches_search(product: &Product, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    product.title.to_lowercase().contains(&q)
        || product.brand_name.to_lowercase().contains(&q)
        || product.tags.iter().any(|t| t.to_lowercase().contains(&q))
}

pub fn matches_category(product: &Product, subtree: &HashSet<String>) -> bool {
    product
        .primary_category_id
        .as_deref()
        .is_some_and(|id| subtree.contains(id))
        || product
            .additional_category_ids
            .iter()
            .any(|id| subtree.contains(id))
}

pub fn matches_business(product: &Product, slug: &str) -> bool {
    product.business_type_slugs.iter().any(|s| s == slug)
}

pub fn matches_price(product: &Product, min: Option<f64>, max: Option<f64>) -> bool {
    if let Some(min) = min {
        if product.price < min {
            return false;
        }
    }
    if let Some(max) = max {
        if product.price > max {
            return false;
        }
    }
    true
}

/// Color match is restricted to the predefined palette: variant colors
/// outside it are invisible to the facet and to this predicate.
pub fn matches_colors(product: &Product, selected: &std::collections::BTreeSet<String>) -> bool {
    if selected.is_empty() {
        return true;
    }
    let wanted: HashSet<String> = selected.iter().map(|c| normalize_term(c)).collect();
    product.color_variants.iter().any(|v| {
        is_predefined_color(&v.color_name) && wanted.contains(&normalize_term(&v.color_name))
    })
}

pub fn matches_brands(product: &Product, selected: &std::collections::BTreeSet<String>) -> bool {
    if selected.is_empty() {
        return true;
    }
    let brand = product.brand_name.trim();
    !brand.is_empty() && selected.iter().any(|b| b.trim() == brand)
}

pub fn matches_filters(
    product: &Product,
    selected: &std::collections::BTreeMap<String, std::collections::BTreeSet<String>>,
) -> bool {
    selected.iter().all(|(key, values)| {
        if values.is_empty() {
            return true;
        }
        let key = normalize_term(key);
        let wanted: HashSet<String> = values.iter().map(|v| normalize_term(v)).collect();
        product.filters.iter().any(|entry| {
            normalize_term(&entry.key) == key
                && entry.values.iter().any(|v| wanted.contains(&normalize_term(v)))
        })
    })
}

/// Context predicates only: category subtree, business type, search.
pub fn matches_context(product: &Product, sel: &FilterSelection, scope: CategoryScope) -> bool {
    if let Some(subtree) = scope {
        if !matches_category(product, subtree) {
            return false;
        }
    }
    if let Some(business) = sel.business_slug.as_deref() {
        if !matches_business(product, business) {
            return false;
        }
    }
    if let Some(search) = sel.search.as_deref() {
        if !matches_search(product, search) {
            return false;
        }
    }
    true
}

/// User-facet predicates only: price range, colors, brands, named filters.
pub fn matches_user_facets(product: &Product, sel: &FilterSelection) -> bool {
    matches_price(product, sel.price_min, sel.price_max)
        && matches_colors(product, &sel.colors)
        && matches_brands(product, &sel.brands)
        && matches_filters(product, &sel.filters)
}

pub fn context_filter(products: Vec<Product>, sel: &FilterSelection, scope: CategoryScope) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| matches_context(p, sel, scope))
        .collect()
}

pub fn apply(products: Vec<Product>, sel: &FilterSelection, scope: CategoryScope) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| matches_context(p, sel, scope) && matches_user_facets(p, sel))
        .collect()
}

/// Total order: the chosen key, then createdAt desc, then id asc.
pub fn sort_products(products: &mut [Product], key: SortKey) {
    products.sort_by(|a, b| {
        let primary = match key {
            SortKey::Newest => Ordering::Equal,
            SortKey::PriceAsc => a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
            SortKey::PriceDesc => b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal),
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// 1-based fixed-size pages. Out-of-range pages (including page 0) yield
/// an empty slice; the total always reflects the unpaginated count.
pub fn paginate(products: Vec<Product>, page: u32) -> (Vec<Product>, usize) {
    let total = products.len();
    if page == 0 {
        return (Vec::new(), total);
    }
    let start = (page as usize - 1) * PAGE_SIZE;
    if start >= total {
        return (Vec::new(), total);
    }
    let items = products
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .collect();
    (items, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::{ColorVariant, FilterEntry, ProductStatus};
    use chrono::{TimeZone, Utc};

    fn product(id: &str, price: f64, day: u32) -> Product {
        Product {
            id: id.into(),
            title: format!("Product {id}"),
            slug: format!("product-{id}"),
            summary: String::new(),
            description: String::new(),
            primary_category_id: None,
            additional_category_ids: vec![],
            primary_brand_id: None,
            additional_brand_ids: vec![],
            business_type_slugs: vec![],
            brand_name: String::new(),
            price,
            tags: vec![],
            hero_image: "https://cdn.example.com/x.jpg".into(),
            gallery: vec![],
            specifications: vec![],
            color_variants: vec![],
            filters: vec![],
            related_product_ids: vec![],
            featured: false,
            status: ProductStatus::InStock,
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_search_matches_title_brand_and_tags() {
        let mut p = product("a", 10.0, 1);
        p.title = "Brass Dinner Plate".into();
        p.brand_name = "Regal".into();
        p.tags = vec!["tableware".into()];
        assert!(matches_search(&p, "DINNER"));
        assert!(matches_search(&p, "regal"));
        assert!(matches_search(&p, "table"));
        assert!(!matches_search(&p, "cutlery"));
    }

    #[test]
    fn test_filter_values_match_any_casing() {
        let mut p = product("a", 10.0, 1);
        p.filters = vec![FilterEntry {
            key: "Material".into(),
            values: vec!["PORCELAIN".into()],
        }];
        let mut selected = std::collections::BTreeMap::new();
        selected.insert(
            "material".to_string(),
            ["porcelain".to_string()].into_iter().collect(),
        );
        assert!(matches_filters(&p, &selected));

        selected.insert("material".to_string(), ["steel".to_string()].into_iter().collect());
        assert!(!matches_filters(&p, &selected));
    }

    #[test]
    fn test_colors_outside_palette_are_invisible() {
        let mut p = product("a", 10.0, 1);
        p.color_variants = vec![ColorVariant {
            color_name: "Turquoise".into(),
            color_hex: "#40E0D0".into(),
            images: vec![],
        }];
        let selected = ["Turquoise".to_string()].into_iter().collect();
        assert!(!matches_colors(&p, &selected));
    }

    #[test]
    fn test_sort_ties_break_by_created_desc_then_id() {
        let mut products = vec![product("b", 100.0, 1), product("a", 100.0, 1), product("c", 100.0, 2)];
        sort_products(&mut products, SortKey::PriceAsc);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);

        sort_products(&mut products, SortKey::Newest);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_pagination_totality() {
        let products: Vec<Product> = (0..50).map(|i| product(&format!("{i:02}"), 1.0, 1)).collect();
        let mut seen = 0;
        for page in 1..=3 {
            let (items, total) = paginate(products.clone(), page);
            assert_eq!(total, 50);
            assert!(items.len() <= PAGE_SIZE);
            seen += items.len();
        }
        assert_eq!(seen, 50);

        let (items, total) = paginate(products.clone(), 0);
        assert!(items.is_empty());
        assert_eq!(total, 50);
        let (items, _) = paginate(products, 4);
        assert!(items.is_empty());
    }

    #[test]
    fn test_empty_subtree_matches_nothing() {
        let p = product("a", 10.0, 1);
        let empty = HashSet::new();
        let sel = FilterSelection { category_slug: Some("ghost".into()), ..FilterSelection::new() };
        assert!(!matches_context(&p, &sel, Some(&empty)));
    }
}
