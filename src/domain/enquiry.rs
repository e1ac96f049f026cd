//! Enquiry funnel records: customers, enquiries, cart-line snapshots,
//! and the append-only communication log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub company_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum EnquirySource {
    WebsiteForm,
    ProductCard,
    ProductDetail,
    Cart,
    WhomWeServe,
    Whatsapp,
    Phone,
    Email,
    Manual,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserType {
    Business,
    Customer,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum EnquiryStatus {
    #[default]
    New,
    InProgress,
    AwaitingCustomer,
    Closed,
    Spam,
}

impl EnquiryStatus {
    /// Any state may move to any other, except: `spam` is terminal and
    /// `closed` reopens only to `in-progress`.
    pub fn can_transition(self, to: EnquiryStatus) -> bool {
        if self == to {
            return true;
        }
        match self {
            Self::Spam => false,
            Self::Closed => to == Self::InProgress,
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EnquiryPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
    pub id: String,
    pub public_id: String,
    pub customer_id: String,
    pub source: EnquirySource,
    pub user_type: UserType,
    pub status: EnquiryStatus,
    pub priority: EnquiryPriority,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub categories: Json<Vec<String>>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enquiry {
    /// Whether this lead arrived with cart lines attached. Derived, never
    /// persisted.
    pub fn enquiry_type(item_count: usize) -> &'static str {
        if item_count > 0 {
            "cart+enquiry"
        } else {
            "enquiry-only"
        }
    }
}

/// Cart-line snapshot. `product_name` is copied at enquiry time and never
/// follows later product renames.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryItem {
    pub id: String,
    pub enquiry_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageSender {
    Customer,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum MessageChannel {
    Whatsapp,
    Phone,
    Email,
    InternalNote,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryMessage {
    pub id: String,
    pub enquiry_id: String,
    pub sender: MessageSender,
    pub channel: MessageChannel,
    pub message: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Incoming cart line on submit.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_quantity() -> i64 {
    1
}
