//! Lead profile store: the single durable record of the most recent
//! {phone, name, userType} a visitor submitted, used to skip the
//! capture step on repeat enquiries. A UX hint, never authentication.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::enquiry::UserType;
use crate::error::{Result, StoreError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadProfile {
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub user_type: UserType,
    pub saved_at: DateTime<Utc>,
}

pub struct LeadProfileStore {
    path: PathBuf,
}

impl LeadProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The saved profile, or None. A missing file or a corrupt payload
    /// both resolve to None; this read never fails.
    pub fn get(&self) -> Option<LeadProfile> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn set(&self, phone: &str, name: Option<String>, user_type: UserType) -> Result<LeadProfile> {
        let profile = LeadProfile {
            phone: phone.to_string(),
            name,
            user_type,
            saved_at: Utc::now(),
        };
        let raw = serde_json::to_string(&profile)
            .map_err(|e| StoreError::Fatal(format!("could not encode lead profile: {e}")))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Fatal(format!("could not create profile dir: {e}")))?;
        }
        std::fs::write(&self.path, raw)
            .map_err(|e| StoreError::Fatal(format!("could not write lead profile: {e}")))?;
        Ok(profile)
    }

    pub fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }

    /// Whether the enquiry flow can skip the capture step.
    pub fn has_usable_profile(&self) -> bool {
        self.get().is_some_and(|p| !p.phone.trim().is_empty())
    }
}
