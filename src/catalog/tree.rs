//! Category tree cache. Holds the whole forest for a namespace with
//! time-based expiry; taxonomy writes flush it explicitly. Reads never
//! fail — an unknown slug or a storage hiccup resolves to "no match".

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::taxonomy::{TaxonomyKind, TaxonomyNode};
use crate::store::TaxonomyStorage;

pub const TREE_TTL: Duration = Duration::from_secs(600);

#[derive(Clone, Debug, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: TaxonomyNode,
    pub children: Vec<TreeNode>,
}

/// Nested forest, children ordered by name (input order).
pub fn build_forest(nodes: &[TaxonomyNode]) -> Vec<TreeNode> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut by_parent: HashMap<&str, Vec<&TaxonomyNode>> = HashMap::new();
    let mut roots: Vec<&TaxonomyNode> = Vec::new();
    for node in nodes {
        match node.parent.as_deref().filter(|p| ids.contains(p)) {
            Some(parent) => by_parent.entry(parent).or_default().push(node),
            None => roots.push(node),
        }
    }

    fn attach(node: &TaxonomyNode, by_parent: &HashMap<&str, Vec<&TaxonomyNode>>) -> TreeNode {
        let children = by_parent
            .get(node.id.as_str())
            .map(|kids| kids.iter().map(|k| attach(k, by_parent)).collect())
            .unwrap_or_default();
        TreeNode { node: node.clone(), children }
    }

    roots.iter().map(|r| attach(r, &by_parent)).collect()
}

/// Ids of the node matching `slug` plus every descendant. Empty set for
/// an unknown slug.
pub fn descendants_of(nodes: &[TaxonomyNode], slug: &str) -> HashSet<String> {
    let mut result = HashSet::new();
    let Some(root) = nodes.iter().find(|n| n.slug == slug) else {
        return result;
    };
    let mut by_parent: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent.as_deref() {
            by_parent.entry(parent).or_default().push(&node.id);
        }
    }
    let mut stack = vec![root.id.as_str()];
    while let Some(id) = stack.pop() {
        if !result.insert(id.to_string()) {
            continue;
        }
        if let Some(children) = by_parent.get(id) {
            stack.extend(children);
        }
    }
    result
}

pub struct CategoryTreeCache {
    storage: TaxonomyStorage,
    kind: TaxonomyKind,
    ttl: Duration,
    cached: Mutex<Option<(Instant, Arc<Vec<TaxonomyNode>>)>>,
}

impl CategoryTreeCache {
    pub fn new(storage: TaxonomyStorage, kind: TaxonomyKind) -> Self {
        Self::with_ttl(storage, kind, TREE_TTL)
    }

    pub fn with_ttl(storage: TaxonomyStorage, kind: TaxonomyKind, ttl: Duration) -> Self {
        Self { storage, kind, ttl, cached: Mutex::new(None) }
    }

    async fn snapshot(&self) -> Arc<Vec<TaxonomyNode>> {
        {
            let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((loaded_at, nodes)) = cached.as_ref() {
                if loaded_at.elapsed() < self.ttl {
                    return Arc::clone(nodes);
                }
            }
        }
        let nodes = match self.storage.list(self.kind).await {
            Ok(nodes) => Arc::new(nodes),
            Err(e) => {
                tracing::warn!(error = %e, "category tree load failed, resolving to empty");
                return Arc::new(Vec::new());
            }
        };
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = Some((Instant::now(), Arc::clone(&nodes)));
        nodes
    }

    pub async fn descendants(&self, slug: &str) -> HashSet<String> {
        descendants_of(&self.snapshot().await, slug)
    }

    pub async fn tree(&self) -> Vec<TreeNode> {
        build_forest(&self.snapshot().await)
    }

    pub fn invalidate(&self) {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::taxonomy::TaxonomyLevel;
    use chrono::Utc;

    fn node(id: &str, slug: &str, parent: Option<&str>) -> TaxonomyNode {
        TaxonomyNode {
            id: id.into(),
            name: slug.into(),
            slug: slug.into(),
            level: TaxonomyLevel::Category,
            parent: parent.map(String::from),
            image: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_descendants_include_self_and_whole_subtree() {
        let nodes = vec![
            node("1", "plates", None),
            node("2", "dinner", Some("1")),
            node("3", "side", Some("2")),
            node("4", "cups", None),
        ];
        let ids = descendants_of(&nodes, "plates");
        assert_eq!(ids, ["1", "2", "3"].into_iter().map(String::from).collect());
        assert!(descendants_of(&nodes, "ghost").is_empty());
    }

    #[test]
    fn test_forest_shape() {
        let nodes = vec![
            node("1", "plates", None),
            node("2", "dinner", Some("1")),
            node("4", "cups", None),
            node("5", "orphan", Some("missing")),
        ];
        let forest = build_forest(&nodes);
        let roots: Vec<&str> = forest.iter().map(|t| t.node.slug.as_str()).collect();
        // A node whose parent is gone surfaces as a root rather than vanishing.
        assert_eq!(roots, ["plates", "cups", "orphan"]);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].node.slug, "dinner");
    }
}
