//! Environment configuration.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

#[derive(Clone, Debug)]
pub struct Config {
    /// sqlx database URI, e.g. `sqlite://storefront.db`. Required.
    pub database_uri: String,
    pub port: u16,
    /// E.164-digit string the outbound deep link targets.
    pub public_channel_number: String,
    /// Content-delivery hosts images may come from. Empty = any.
    pub image_host_allowlist: Vec<String>,
    /// Where the lead profile record lives.
    pub lead_profile_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_uri = std::env::var("DATABASE_URI")
            .map_err(|_| StoreError::Fatal("DATABASE_URI is not set".to_string()))?;
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| StoreError::Fatal(format!("PORT '{raw}' is not a port number")))?,
            Err(_) => 8080,
        };
        let public_channel_number = std::env::var("PUBLIC_CHANNEL_NUMBER").unwrap_or_default();
        let image_host_allowlist = std::env::var("IMAGE_HOST_ALLOWLIST")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();
        let lead_profile_path = std::env::var("LEAD_PROFILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".storefront/lead-profile.json"));
        Ok(Self {
            database_uri,
            port,
            public_channel_number,
            image_host_allowlist,
            lead_profile_path,
        })
    }
}
