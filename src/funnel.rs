//! Enquiry funnel: converts a browsing cart into a persisted lead.
//!
//! The lead is validated before anything touches the store; the
//! customer upsert, the enquiry, and its item snapshots then land in a
//! single transaction with a freshly minted public identifier.

use chrono::Utc;

use crate::domain::enquiry::{
    CartLine, Customer, Enquiry, EnquiryItem, EnquiryMessage, EnquirySource, MessageChannel,
    MessageSender, UserType,
};
use crate::error::{Result, StoreError};
use crate::store::enquiries::{CustomerUpsert, EnquiryMetaPatch, EnquiryStorage, NewEnquiry};

const PUBLIC_ID_ATTEMPTS: u32 = 3;

/// Digits-only phone; the funnel accepts exactly 10 of them.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 10).then_some(digits)
}

/// Permissive address shape: something, an @, something, a dot,
/// something. Deliverability is not this system's problem.
pub fn is_valid_email(raw: &str) -> bool {
    let raw = raw.trim();
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.split_once('.').is_some_and(|(h, t)| !h.is_empty() && !t.is_empty())
        && !raw.contains(char::is_whitespace)
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// `ENQ-<base36 millis>-<base36 24-bit random>`, upper-case, random part
/// zero-padded to at least four characters.
pub fn generate_public_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let noise = rand::random::<u32>() & 0x00FF_FFFF;
    format!("ENQ-{}-{:0>4}", base36(millis), base36(noise as u64))
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub source: EnquirySource,
    #[serde(default)]
    pub user_type: UserType,
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub cart_items: Vec<CartLine>,
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryDetail {
    pub enquiry: Enquiry,
    pub items: Vec<EnquiryItem>,
    pub messages: Vec<EnquiryMessage>,
    pub customer: Customer,
    pub customer_enquiry_count: i64,
}

pub struct EnquiryFunnel {
    storage: EnquiryStorage,
}

impl EnquiryFunnel {
    pub fn new(storage: EnquiryStorage) -> Self {
        Self { storage }
    }

    pub async fn submit(&self, request: SubmitRequest) -> Result<(Enquiry, Vec<EnquiryItem>, Customer)> {
        let phone = normalize_phone(&request.phone)
            .ok_or_else(|| StoreError::validation("phone must contain exactly 10 digits"))?;
        let email = match request.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) if is_valid_email(email) => Some(email.to_lowercase()),
            Some(_) => return Err(StoreError::validation("email address is malformed")),
            None => None,
        };
        for line in &request.cart_items {
            if line.quantity <= 0 {
                return Err(StoreError::validation("quantity must be a positive integer"));
            }
            if line.product_id.trim().is_empty() {
                return Err(StoreError::validation("cart line is missing a product id"));
            }
        }

        let lead = CustomerUpsert {
            name: request.name,
            company_name: request.company,
            email,
            phone: Some(phone),
        };
        let new = NewEnquiry {
            source: request.source,
            user_type: request.user_type,
            categories: request.categories,
            message: request.message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()),
        };

        // Unique indexes (public_id, customer contact) decide
        // collisions; losers resubmit with a fresh id, and the rerun
        // re-probes the customer so racing submits converge on one
        // record.
        for attempt in 0..PUBLIC_ID_ATTEMPTS {
            let public_id = generate_public_id();
            match self.storage.submit(&lead, &new, &public_id, &request.cart_items).await {
                Err(e) if e.is_unique_violation() && attempt + 1 < PUBLIC_ID_ATTEMPTS => continue,
                Err(e) if e.is_unique_violation() => {
                    return Err(StoreError::conflict("could not allocate a unique public id"))
                }
                other => return other,
            }
        }
        unreachable!("public id loop always returns")
    }

    pub async fn update_meta(&self, id: &str, patch: EnquiryMetaPatch) -> Result<Enquiry> {
        self.storage.update_meta(id, patch).await
    }

    pub async fn append_message(
        &self,
        id: &str,
        sender: MessageSender,
        channel: MessageChannel,
        message: &str,
        created_by: Option<String>,
    ) -> Result<EnquiryMessage> {
        self.storage.append_message(id, sender, channel, message, created_by).await
    }

    pub async fn read(&self, id: &str) -> Result<EnquiryDetail> {
        let enquiry = self.storage.get(id).await?;
        let items = self.storage.items(id).await?;
        let messages = self.storage.messages(id).await?;
        let customer = self.storage.customer(&enquiry.customer_id).await?;
        let customer_enquiry_count =
            self.storage.customer_enquiry_count(&enquiry.customer_id).await?;
        Ok(EnquiryDetail { enquiry, items, messages, customer, customer_enquiry_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("98765 43210").as_deref(), Some("9876543210"));
        assert_eq!(normalize_phone("+91-98765-43210"), None); // 12 digits
        assert_eq!(normalize_phone("12345"), None);
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("asha@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.co"));
        assert!(!is_valid_email("asha@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("asha example@x.com"));
    }

    #[test]
    fn test_public_id_shape() {
        for _ in 0..100 {
            let id = generate_public_id();
            let mut parts = id.splitn(3, '-');
            assert_eq!(parts.next(), Some("ENQ"));
            let time = parts.next().unwrap();
            let noise = parts.next().unwrap();
            assert!(!time.is_empty());
            assert!(noise.len() >= 4);
            assert!(time.chars().chain(noise.chars()).all(|c| c.is_ascii_alphanumeric()
                && !c.is_ascii_lowercase()));
        }
    }
}
