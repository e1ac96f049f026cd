// Enquiry funnel integration: customer dedup, atomic submits, snapshot
// immutability, status transitions, communication log.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use supply_storefront::domain::enquiry::{
    CartLine, EnquirySource, EnquiryStatus, MessageChannel, MessageSender, UserType,
};
use supply_storefront::domain::product::ProductInput;
use supply_storefront::funnel::{EnquiryFunnel, SubmitRequest};
use supply_storefront::store::enquiries::{CustomerUpsert, EnquiryMetaPatch, NewEnquiry};
use supply_storefront::store::{EnquiryStorage, ProductStorage, MIGRATOR};
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

fn request(phone: &str, name: &str, cart: Vec<CartLine>) -> SubmitRequest {
    SubmitRequest {
        source: EnquirySource::Cart,
        user_type: UserType::Business,
        phone: phone.to_string(),
        name: Some(name.to_string()),
        email: None,
        company: None,
        message: Some("Need a quote for the new banquet hall".to_string()),
        categories: vec!["plates".to_string()],
        cart_items: cart,
    }
}

fn line(product_id: &str, product_name: &str, quantity: i64) -> CartLine {
    CartLine {
        product_id: product_id.to_string(),
        product_name: product_name.to_string(),
        quantity,
        notes: None,
    }
}

#[tokio::test]
async fn submit_persists_enquiry_with_snapshots() {
    let pool = test_pool().await;
    let funnel = EnquiryFunnel::new(EnquiryStorage::new(pool));

    let (enquiry, items, customer) = funnel
        .submit(request("98765 43210", "Asha", vec![line("p1", "Brass Plate", 40)]))
        .await
        .unwrap();

    assert!(enquiry.public_id.starts_with("ENQ-"));
    assert_eq!(enquiry.status, EnquiryStatus::New);
    assert_eq!(customer.phone.as_deref(), Some("9876543210"));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_name, "Brass Plate");
    assert_eq!(items[0].quantity, 40);

    let detail = funnel.read(&enquiry.id).await.unwrap();
    assert_eq!(detail.customer.id, customer.id);
    assert_eq!(detail.customer_enquiry_count, 1);
    assert_eq!(detail.items.len(), 1);
    assert!(detail.messages.is_empty());
}

#[tokio::test]
async fn repeat_contact_reuses_the_customer() {
    let pool = test_pool().await;
    let funnel = EnquiryFunnel::new(EnquiryStorage::new(pool));

    let (_, _, first) = funnel.submit(request("9876543210", "Asha", vec![])).await.unwrap();

    // Same phone, richer details: one customer record, updated in place.
    let mut second_req = request("98765-43210", "Asha Rao", vec![]);
    second_req.email = Some("ASHA@Example.com".to_string());
    second_req.company = Some("Rao Caterers".to_string());
    let (second_enq, _, second) = funnel.submit(second_req).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.name, "Asha Rao");
    assert_eq!(second.company_name, "Rao Caterers");
    assert_eq!(second.email.as_deref(), Some("asha@example.com"));

    // Matching by email alone also lands on the same record.
    let mut third_req = request("1112223334", "", vec![]);
    third_req.email = Some("asha@example.com".to_string());
    let (_, _, third) = funnel.submit(third_req).await.unwrap();
    assert_eq!(third.id, first.id);
    // An already-known phone is not overwritten.
    assert_eq!(third.phone.as_deref(), Some("9876543210"));

    let detail = funnel.read(&second_enq.id).await.unwrap();
    assert_eq!(detail.customer_enquiry_count, 3);
}

#[tokio::test]
async fn submit_rejects_malformed_leads() {
    let pool = test_pool().await;
    let funnel = EnquiryFunnel::new(EnquiryStorage::new(pool));

    let err = funnel.submit(request("12345", "Asha", vec![])).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(ref m) if m.contains("phone")));

    let mut bad_email = request("9876543210", "Asha", vec![]);
    bad_email.email = Some("asha@nodot".to_string());
    let err = funnel.submit(bad_email).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(ref m) if m.contains("email")));

    let err = funnel
        .submit(request("9876543210", "Asha", vec![line("p1", "Plate", 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(ref m) if m.contains("quantity")));
}

#[tokio::test]
async fn failed_submit_writes_nothing() {
    let pool = test_pool().await;
    let storage = EnquiryStorage::new(pool.clone());

    let lead = CustomerUpsert {
        name: Some("Asha".into()),
        company_name: None,
        email: None,
        phone: Some("9876543210".into()),
    };
    let new = NewEnquiry {
        source: EnquirySource::Cart,
        user_type: UserType::Unknown,
        categories: vec![],
        message: None,
    };
    // Second line is invalid; the whole submit must roll back.
    let cart = vec![line("p1", "Plate", 2), line("p2", "Bowl", 0)];
    assert!(storage.submit(&lead, &new, "ENQ-TEST-0001", &cart).await.is_err());

    let enquiries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enquiries")
        .fetch_one(&pool)
        .await
        .unwrap();
    let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(&pool)
        .await
        .unwrap();
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enquiry_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((enquiries, customers, items), (0, 0, 0));
}

#[tokio::test]
async fn concurrent_submits_converge_on_one_customer() {
    // File-backed pool with the production connection settings, so
    // submits genuinely contend for the write lock.
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("sqlite://{}", dir.path().join("store.db").display());
    let pool = supply_storefront::store::connect(&uri).await.unwrap();
    let funnel = Arc::new(EnquiryFunnel::new(EnquiryStorage::new(pool.clone())));

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let funnel = Arc::clone(&funnel);
            tokio::spawn(async move {
                funnel.submit(request("9876543210", &format!("Asha {i}"), vec![])).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(&pool)
        .await
        .unwrap();
    let enquiries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enquiries")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(customers, 1);
    assert_eq!(enquiries, 4);
}

#[tokio::test]
async fn item_snapshots_survive_product_renames() {
    let pool = test_pool().await;
    let products = ProductStorage::new(pool.clone());
    let funnel = EnquiryFunnel::new(EnquiryStorage::new(pool));

    let product = products
        .create(
            ProductInput {
                title: Some("Brass Plate".into()),
                hero_image: Some("https://cdn.example.com/p.jpg".into()),
                ..Default::default()
            },
            &[],
        )
        .await
        .unwrap();

    let (enquiry, _, _) = funnel
        .submit(request("9876543210", "Asha", vec![line(&product.id, &product.title, 12)]))
        .await
        .unwrap();

    products
        .update(
            &product.id,
            ProductInput { title: Some("Royal Brass Plate".into()), ..Default::default() },
            &[],
        )
        .await
        .unwrap();

    let detail = funnel.read(&enquiry.id).await.unwrap();
    assert_eq!(detail.items[0].product_name, "Brass Plate");
    assert_eq!(detail.items[0].product_id, product.id);
}

#[tokio::test]
async fn status_machine_is_enforced_on_update() {
    let pool = test_pool().await;
    let funnel = EnquiryFunnel::new(EnquiryStorage::new(pool));
    let (enquiry, _, _) = funnel.submit(request("9876543210", "Asha", vec![])).await.unwrap();

    let patch = |status| EnquiryMetaPatch { status: Some(status), ..Default::default() };

    let updated = funnel.update_meta(&enquiry.id, patch(EnquiryStatus::Closed)).await.unwrap();
    assert_eq!(updated.status, EnquiryStatus::Closed);

    // Closed reopens only to in-progress.
    let err = funnel.update_meta(&enquiry.id, patch(EnquiryStatus::New)).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    funnel.update_meta(&enquiry.id, patch(EnquiryStatus::InProgress)).await.unwrap();

    // Spam is terminal.
    funnel.update_meta(&enquiry.id, patch(EnquiryStatus::Spam)).await.unwrap();
    let err = funnel.update_meta(&enquiry.id, patch(EnquiryStatus::InProgress)).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    // Non-status fields still patch independently.
    let updated = funnel
        .update_meta(
            &enquiry.id,
            EnquiryMetaPatch { notes: Some("bulk buyer".into()), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(updated.notes.as_deref(), Some("bulk buyer"));
    assert_eq!(updated.status, EnquiryStatus::Spam);
}

#[tokio::test]
async fn message_log_appends_newest_first() {
    let pool = test_pool().await;
    let funnel = EnquiryFunnel::new(EnquiryStorage::new(pool));
    let (enquiry, _, _) = funnel.submit(request("9876543210", "Asha", vec![])).await.unwrap();

    let err = funnel
        .append_message(&enquiry.id, MessageSender::Admin, MessageChannel::InternalNote, "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    for (text, sender) in [
        ("Thanks for reaching out", MessageSender::Admin),
        ("What is the lead time?", MessageSender::Customer),
        ("Three weeks for 40 units", MessageSender::Admin),
    ] {
        funnel
            .append_message(&enquiry.id, sender, MessageChannel::Whatsapp, text, None)
            .await
            .unwrap();
        // Distinct timestamps keep the newest-first ordering observable.
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let detail = funnel.read(&enquiry.id).await.unwrap();
    let texts: Vec<&str> = detail.messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(
        texts,
        ["Three weeks for 40 units", "What is the lead time?", "Thanks for reaching out"]
    );

    let err = funnel
        .append_message("no-such-id", MessageSender::Admin, MessageChannel::Email, "hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}
