//! Slug derivation. Slugs are always derived from titles server-side;
//! uniqueness is ultimately backed by a unique index, this probe just
//! picks the first free candidate.

use std::collections::HashSet;

use crate::error::{Result, StoreError};

/// Suffix probe bound before giving up with a conflict.
pub const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Lowercase, each maximal run of non-alphanumeric characters becomes a
/// single `-`, leading and trailing `-` stripped. Idempotent.
pub fn slug_of(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// First free slug among `base`, `base-1`, `base-2`, … `taken` holds the
/// slugs already occupied by *other* documents.
pub fn unique_slug(text: &str, taken: &HashSet<String>) -> Result<String> {
    let base = slug_of(text);
    let base = if base.is_empty() { "product".to_string() } else { base };
    if !taken.contains(&base) {
        return Ok(base);
    }
    for k in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = format!("{base}-{k}");
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(StoreError::conflict(format!(
        "could not find a free slug for '{base}' after {MAX_SLUG_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_of() {
        assert_eq!(slug_of("Royal Brass Plate"), "royal-brass-plate");
        assert_eq!(slug_of("  Café -- crème!  "), "caf-cr-me");
        assert_eq!(slug_of("100% Cotton"), "100-cotton");
        assert_eq!(slug_of("!!!"), "");
    }

    #[test]
    fn test_slug_of_idempotent() {
        for t in ["Royal Brass Plate", "a--b", "Δ plate 9\""] {
            let once = slug_of(t);
            assert_eq!(slug_of(&once), once);
        }
    }

    #[test]
    fn test_unique_slug_probes_suffixes() {
        let taken: HashSet<String> =
            ["brass-plate".to_string(), "brass-plate-1".to_string()].into_iter().collect();
        assert_eq!(unique_slug("Brass Plate", &taken).unwrap(), "brass-plate-2");
        assert_eq!(unique_slug("Steel Plate", &taken).unwrap(), "steel-plate");
    }

    #[test]
    fn test_unique_slug_exhaustion() {
        let mut taken = HashSet::new();
        taken.insert("x".to_string());
        for k in 1..=MAX_SLUG_ATTEMPTS {
            taken.insert(format!("x-{k}"));
        }
        assert!(unique_slug("x", &taken).is_err());
    }
}
