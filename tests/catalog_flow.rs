// Catalog read-path integration: subtree filtering, facets, slug
// uniqueness, taxonomy delete guards.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use supply_storefront::catalog::filter::PAGE_SIZE;
use supply_storefront::catalog::tree::CategoryTreeCache;
use supply_storefront::catalog::{Catalog, ListQuery, Paging};
use supply_storefront::domain::product::{ColorVariant, ProductInput};
use supply_storefront::domain::selection::{FilterSelection, SortKey};
use supply_storefront::domain::taxonomy::{TaxonomyInput, TaxonomyKind, TaxonomyLevel};
use supply_storefront::store::{ProductStorage, TaxonomyStorage, MIGRATOR};
use supply_storefront::uploads::RecordingPurger;
use supply_storefront::StoreError;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

struct Fixture {
    catalog: Catalog,
    taxonomy: TaxonomyStorage,
    tree: Arc<CategoryTreeCache>,
    purger: Arc<RecordingPurger>,
}

async fn fixture() -> Fixture {
    let pool = test_pool().await;
    let taxonomy = TaxonomyStorage::new(pool.clone());
    // Zero TTL so taxonomy writes are visible without waiting.
    let tree = Arc::new(CategoryTreeCache::with_ttl(
        taxonomy.clone(),
        TaxonomyKind::Category,
        Duration::from_secs(0),
    ));
    let purger = RecordingPurger::new();
    let catalog = Catalog::new(
        ProductStorage::new(pool),
        Arc::clone(&tree),
        purger.clone(),
        Vec::new(),
    );
    Fixture { catalog, taxonomy, tree, purger }
}

async fn category(f: &Fixture, name: &str, parent: Option<&str>) -> String {
    let input = TaxonomyInput {
        name: Some(name.to_string()),
        level: parent.is_none().then_some(TaxonomyLevel::Department),
        parent: parent.map(String::from),
        image: None,
    };
    f.taxonomy.create(TaxonomyKind::Category, input).await.unwrap().id
}

fn product_input(title: &str, category: &str, color: &str, price: f64) -> ProductInput {
    ProductInput {
        title: Some(title.to_string()),
        hero_image: Some(format!("https://cdn.example.com/{}.jpg", title.to_lowercase())),
        primary_category_id: Some(category.to_string()),
        price: Some(price),
        color_variants: Some(vec![ColorVariant {
            color_name: color.to_string(),
            color_hex: "#336699".to_string(),
            images: vec![],
        }]),
        ..Default::default()
    }
}

fn by_category(slug: &str) -> ListQuery {
    let mut selection = FilterSelection::new();
    selection.category_slug = Some(slug.to_string());
    ListQuery { selection, featured: None, status: None, paging: Paging::Page(1) }
}

#[tokio::test]
async fn subtree_filter_covers_descendants() {
    let f = fixture().await;
    let plates = category(&f, "Plates", None).await;
    let dinner = category(&f, "Dinner", Some(&plates)).await;
    let cups = category(&f, "Cups", None).await;

    f.catalog.create(product_input("Plate A", &plates, "Blue", 200.0)).await.unwrap();
    f.catalog.create(product_input("Plate B", &dinner, "Red", 400.0)).await.unwrap();
    f.catalog.create(product_input("Cup C", &cups, "Blue", 150.0)).await.unwrap();

    let page = f.catalog.list(&by_category("plates")).await.unwrap();
    let mut titles: Vec<&str> = page.products.iter().map(|p| p.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, ["Plate A", "Plate B"]);
    assert_eq!(page.total, 2);

    let page = f.catalog.list(&by_category("dinner")).await.unwrap();
    assert_eq!(page.total, 1);

    let page = f.catalog.list(&by_category("no-such-category")).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn facets_reflect_context_and_selection() {
    let f = fixture().await;
    let plates = category(&f, "Plates", None).await;
    let dinner = category(&f, "Dinner", Some(&plates)).await;
    let cups = category(&f, "Cups", None).await;

    f.catalog.create(product_input("Plate A", &plates, "Blue", 200.0)).await.unwrap();
    f.catalog.create(product_input("Plate B", &dinner, "Red", 400.0)).await.unwrap();
    f.catalog.create(product_input("Cup C", &cups, "Blue", 150.0)).await.unwrap();

    let mut sel = FilterSelection::new();
    sel.category_slug = Some("plates".to_string());
    let summary = f.catalog.facets(&sel).await.unwrap();
    let colors: Vec<&str> = summary.colors.iter().map(|v| v.value.as_str()).collect();
    assert_eq!(colors, ["Blue", "Red"]);
    let range = summary.price_range.unwrap();
    assert_eq!((range.min, range.max), (200.0, 400.0));
    assert_eq!(summary.total, 2);

    // Selecting Blue keeps both colors listed; results narrow to A.
    sel.colors.insert("Blue".to_string());
    let summary = f.catalog.facets(&sel).await.unwrap();
    let counts: Vec<(&str, usize)> =
        summary.colors.iter().map(|v| (v.value.as_str(), v.count)).collect();
    assert_eq!(counts, [("Blue", 1), ("Red", 1)]);

    let page = f.catalog.list(&ListQuery {
        selection: sel,
        featured: None,
        status: None,
        paging: Paging::Page(1),
    })
    .await
    .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.products[0].title, "Plate A");
}

#[tokio::test]
async fn slugs_stay_unique_and_follow_titles() {
    let f = fixture().await;
    let plates = category(&f, "Plates", None).await;

    let first = f.catalog.create(product_input("Brass Plate", &plates, "Blue", 100.0)).await.unwrap();
    let second = f.catalog.create(product_input("Brass Plate", &plates, "Red", 120.0)).await.unwrap();
    assert_eq!(first.slug, "brass-plate");
    assert_eq!(second.slug, "brass-plate-1");

    // Slug follows a title change; an unchanged title keeps it.
    let renamed = f
        .catalog
        .update(&first.id, ProductInput { title: Some("Royal Brass Plate".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(renamed.slug, "royal-brass-plate");

    let retouched = f
        .catalog
        .update(&first.id, ProductInput { price: Some(110.0), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(retouched.slug, "royal-brass-plate");

    // Lookup works by id and by slug.
    assert_eq!(f.catalog.get("royal-brass-plate").await.unwrap().id, first.id);
    assert_eq!(f.catalog.get(&second.id).await.unwrap().slug, "brass-plate-1");
}

#[tokio::test]
async fn pagination_totality_over_fixed_pages() {
    let f = fixture().await;
    let plates = category(&f, "Plates", None).await;
    for i in 0..30 {
        f.catalog
            .create(product_input(&format!("Plate {i:02}"), &plates, "Blue", 10.0 + i as f64))
            .await
            .unwrap();
    }

    let mut query = by_category("plates");
    query.selection.sort = SortKey::PriceAsc;
    let first = f.catalog.list(&query).await.unwrap();
    assert_eq!(first.products.len(), PAGE_SIZE);
    assert_eq!(first.total, 30);

    query.paging = Paging::Page(2);
    let second = f.catalog.list(&query).await.unwrap();
    assert_eq!(second.products.len(), 30 - PAGE_SIZE);

    query.paging = Paging::Page(3);
    let third = f.catalog.list(&query).await.unwrap();
    assert!(third.products.is_empty());
    assert_eq!(third.total, 30);
}

#[tokio::test]
async fn taxonomy_delete_guards_and_tree_flush() {
    let f = fixture().await;
    let plates = category(&f, "Plates", None).await;
    let dinner = category(&f, "Dinner", Some(&plates)).await;
    let product = f.catalog.create(product_input("Plate B", &dinner, "Red", 400.0)).await.unwrap();

    // Children block deletion.
    let err = f.taxonomy.delete(TaxonomyKind::Category, &plates).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref msg) if msg.contains("1 child")));

    // Referencing products block deletion.
    let err = f.taxonomy.delete(TaxonomyKind::Category, &dinner).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref msg) if msg.contains("1 product")));

    f.catalog.delete(&product.id).await.unwrap();
    f.taxonomy.delete(TaxonomyKind::Category, &dinner).await.unwrap();
    f.taxonomy.delete(TaxonomyKind::Category, &plates).await.unwrap();
    f.tree.invalidate();
    assert!(f.tree.descendants("plates").await.is_empty());
}

#[tokio::test]
async fn delete_hands_images_to_the_purger() {
    let f = fixture().await;
    let plates = category(&f, "Plates", None).await;
    let mut input = product_input("Plate A", &plates, "Blue", 200.0);
    input.gallery = Some(vec!["https://cdn.example.com/side.jpg".to_string()]);
    let product = f.catalog.create(input).await.unwrap();

    f.catalog.delete(&product.id).await.unwrap();
    assert_eq!(f.purger.request_count(), 1);
    let urls = f.purger.purged_urls();
    assert!(urls.contains(&"https://cdn.example.com/plate a.jpg".to_string()));
    assert!(urls.contains(&"https://cdn.example.com/side.jpg".to_string()));

    assert!(matches!(f.catalog.get(&product.id).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn image_host_allowlist_is_enforced() {
    let pool = test_pool().await;
    let taxonomy = TaxonomyStorage::new(pool.clone());
    let tree = Arc::new(CategoryTreeCache::with_ttl(
        taxonomy.clone(),
        TaxonomyKind::Category,
        Duration::from_secs(0),
    ));
    let catalog = Catalog::new(
        ProductStorage::new(pool),
        tree,
        RecordingPurger::new(),
        vec!["cdn.example.com".to_string()],
    );

    let ok = ProductInput {
        title: Some("Plate".into()),
        hero_image: Some("https://cdn.example.com/p.jpg".into()),
        ..Default::default()
    };
    catalog.create(ok).await.unwrap();

    let bad = ProductInput {
        title: Some("Bowl".into()),
        hero_image: Some("https://elsewhere.example.net/p.jpg".into()),
        ..Default::default()
    };
    assert!(matches!(catalog.create(bad).await, Err(StoreError::Validation(_))));
}
