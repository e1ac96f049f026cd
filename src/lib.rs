//! Supply Storefront
//!
//! Catalog and enquiry service for a hospitality-supply storefront.
//!
//! ## Features
//! - Faceted catalog navigation with category-subtree resolution
//! - Context-aware facet counts (choices never disappear, counts narrow)
//! - Canonical, shareable filter URLs
//! - Enquiry funnel with customer dedup by contact fingerprint
//! - Append-only enquiry communication log

pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod funnel;
pub mod http;
pub mod leads;
pub mod outbound;
pub mod store;
pub mod uploads;

pub use config::Config;
pub use error::{Result, StoreError};
