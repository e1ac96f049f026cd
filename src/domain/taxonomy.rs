//! Taxonomy nodes. Categories and brands share one shape and one set of
//! invariants; they live in separate namespaces keyed by [`TaxonomyKind`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum parent-walk depth enforced on writes. Parents form a forest,
/// never a DAG, and the walk must terminate within this bound.
pub const MAX_TREE_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Category,
    Brand,
}

impl TaxonomyKind {
    pub fn noun(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Brand => "brand",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TaxonomyLevel {
    Department,
    Category,
    Subcategory,
    Type,
}

impl TaxonomyLevel {
    /// The level a child of this node must carry.
    pub fn child(self) -> Option<Self> {
        match self {
            Self::Department => Some(Self::Category),
            Self::Category => Some(Self::Subcategory),
            Self::Subcategory => Some(Self::Type),
            Self::Type => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyNode {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub level: TaxonomyLevel,
    #[sqlx(rename = "parent_id")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyInput {
    pub name: Option<String>,
    pub level: Option<TaxonomyLevel>,
    pub parent: Option<String>,
    pub image: Option<String>,
}
