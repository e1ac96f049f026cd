//! Enquiry funnel persistence. An enquiry and its cart-line snapshots
//! are written in one transaction: both visible or neither.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{Connection, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::domain::enquiry::{
    CartLine, Customer, Enquiry, EnquiryItem, EnquiryMessage, EnquiryPriority, EnquirySource,
    EnquiryStatus, MessageChannel, MessageSender, UserType,
};
use crate::error::{Result, StoreError};

/// Customer identity fields already validated and normalized by the
/// funnel: phone digits-only, email lowercased.
#[derive(Clone, Debug)]
pub struct CustomerUpsert {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewEnquiry {
    pub source: EnquirySource,
    pub user_type: UserType,
    pub categories: Vec<String>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryMetaPatch {
    pub status: Option<EnquiryStatus>,
    pub priority: Option<EnquiryPriority>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct EnquiryStorage {
    pool: SqlitePool,
}

impl EnquiryStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert the customer by contact fingerprint, then write the
    /// enquiry and its item snapshots atomically.
    ///
    /// The transaction starts in immediate mode: a deferred begin would
    /// take a read lock on the fingerprint probe and deadlock against a
    /// concurrent submit when both upgrade to write. Immediate mode
    /// serializes writers at the door, within the busy timeout.
    pub async fn submit(
        &self,
        lead: &CustomerUpsert,
        new: &NewEnquiry,
        public_id: &str,
        cart: &[CartLine],
    ) -> Result<(Enquiry, Vec<EnquiryItem>, Customer)> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let customer = upsert_customer(&mut tx, lead).await?;
        let now = Utc::now();
        let enquiry = Enquiry {
            id: Uuid::new_v4().to_string(),
            public_id: public_id.to_string(),
            customer_id: customer.id.clone(),
            source: new.source,
            user_type: new.user_type,
            status: EnquiryStatus::New,
            priority: EnquiryPriority::Normal,
            assigned_to: None,
            notes: None,
            categories: Json(new.categories.clone()),
            message: new.message.clone(),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO enquiries (id, public_id, customer_id, source, user_type, status,
                                    priority, assigned_to, notes, categories, message,
                                    created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&enquiry.id)
        .bind(&enquiry.public_id)
        .bind(&enquiry.customer_id)
        .bind(enquiry.source)
        .bind(enquiry.user_type)
        .bind(enquiry.status)
        .bind(enquiry.priority)
        .bind(&enquiry.assigned_to)
        .bind(&enquiry.notes)
        .bind(&enquiry.categories)
        .bind(&enquiry.message)
        .bind(enquiry.created_at)
        .bind(enquiry.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(cart.len());
        for line in cart {
            if line.quantity <= 0 {
                return Err(StoreError::validation("quantity must be a positive integer"));
            }
            let item = EnquiryItem {
                id: Uuid::new_v4().to_string(),
                enquiry_id: enquiry.id.clone(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                notes: line.notes.clone(),
            };
            sqlx::query(
                "INSERT INTO enquiry_items (id, enquiry_id, product_id, product_name, quantity, notes)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&item.id)
            .bind(&item.enquiry_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;
        Ok((enquiry, items, customer))
    }

    pub async fn get(&self, id: &str) -> Result<Enquiry> {
        sqlx::query_as::<_, Enquiry>("SELECT * FROM enquiries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("enquiry"))
    }

    pub async fn update_meta(&self, id: &str, patch: EnquiryMetaPatch) -> Result<Enquiry> {
        let mut enquiry = self.get(id).await?;

        if let Some(status) = patch.status {
            if !enquiry.status.can_transition(status) {
                return Err(StoreError::validation(format!(
                    "cannot move enquiry from {} to {}",
                    serde_json::to_string(&enquiry.status).unwrap_or_default(),
                    serde_json::to_string(&status).unwrap_or_default(),
                )));
            }
            enquiry.status = status;
        }
        if let Some(priority) = patch.priority {
            enquiry.priority = priority;
        }
        if patch.assigned_to.is_some() {
            enquiry.assigned_to = patch.assigned_to;
        }
        if patch.notes.is_some() {
            enquiry.notes = patch.notes;
        }
        enquiry.updated_at = Utc::now();

        sqlx::query(
            "UPDATE enquiries SET status = ?, priority = ?, assigned_to = ?, notes = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(enquiry.status)
        .bind(enquiry.priority)
        .bind(&enquiry.assigned_to)
        .bind(&enquiry.notes)
        .bind(enquiry.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(enquiry)
    }

    pub async fn append_message(
        &self,
        enquiry_id: &str,
        sender: MessageSender,
        channel: MessageChannel,
        message: &str,
        created_by: Option<String>,
    ) -> Result<EnquiryMessage> {
        let text = message.trim();
        if text.is_empty() {
            return Err(StoreError::validation("message text is required"));
        }
        self.get(enquiry_id).await?;

        let record = EnquiryMessage {
            id: Uuid::new_v4().to_string(),
            enquiry_id: enquiry_id.to_string(),
            sender,
            channel,
            message: text.to_string(),
            created_by,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO enquiry_messages (id, enquiry_id, sender, channel, message, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.enquiry_id)
        .bind(record.sender)
        .bind(record.channel)
        .bind(&record.message)
        .bind(&record.created_by)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn items(&self, enquiry_id: &str) -> Result<Vec<EnquiryItem>> {
        let items = sqlx::query_as::<_, EnquiryItem>(
            "SELECT * FROM enquiry_items WHERE enquiry_id = ?",
        )
        .bind(enquiry_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Newest first.
    pub async fn messages(&self, enquiry_id: &str) -> Result<Vec<EnquiryMessage>> {
        let messages = sqlx::query_as::<_, EnquiryMessage>(
            "SELECT * FROM enquiry_messages WHERE enquiry_id = ? ORDER BY created_at DESC, id ASC",
        )
        .bind(enquiry_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn customer(&self, id: &str) -> Result<Customer> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("customer"))
    }

    pub async fn customer_enquiry_count(&self, customer_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enquiries WHERE customer_id = ?")
                .bind(customer_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Match by email OR phone. Name and company update only when the
/// incoming value is non-empty; a missing contact channel is filled in.
async fn upsert_customer(
    tx: &mut Transaction<'_, Sqlite>,
    lead: &CustomerUpsert,
) -> Result<Customer> {
    let existing = sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers
         WHERE (?1 IS NOT NULL AND email = ?1) OR (?2 IS NOT NULL AND phone = ?2)
         LIMIT 1",
    )
    .bind(&lead.email)
    .bind(&lead.phone)
    .fetch_optional(&mut **tx)
    .await?;

    match existing {
        Some(mut customer) => {
            if let Some(name) = lead.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                customer.name = name.to_string();
            }
            if let Some(company) = lead
                .company_name
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
            {
                customer.company_name = company.to_string();
            }
            if customer.email.is_none() {
                customer.email = lead.email.clone();
            }
            if customer.phone.is_none() {
                customer.phone = lead.phone.clone();
            }
            sqlx::query(
                "UPDATE customers SET name = ?, company_name = ?, email = ?, phone = ? WHERE id = ?",
            )
            .bind(&customer.name)
            .bind(&customer.company_name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.id)
            .execute(&mut **tx)
            .await?;
            Ok(customer)
        }
        None => {
            let customer = Customer {
                id: Uuid::new_v4().to_string(),
                name: lead.name.clone().unwrap_or_default().trim().to_string(),
                company_name: lead.company_name.clone().unwrap_or_default().trim().to_string(),
                email: lead.email.clone(),
                phone: lead.phone.clone(),
                tags: Json(Vec::new()),
                created_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO customers (id, name, company_name, email, phone, tags, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&customer.id)
            .bind(&customer.name)
            .bind(&customer.company_name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.tags)
            .bind(customer.created_at)
            .execute(&mut **tx)
            .await?;
            Ok(customer)
        }
    }
}
