//! URL state binder: the bidirectional projection between a filter
//! selection and its canonical query string.
//!
//! Canonical means byte-for-byte reproducible: keys emit in a fixed
//! order, defaults never appear, set values are sorted, and the filters
//! object serializes with sorted keys. Toggling a value on and off
//! therefore restores the exact original string.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::domain::selection::{FilterSelection, SortKey};
use crate::error::{Result, StoreError};

/// Free-text inputs (search, price bounds) settle for this long before
/// the URL updates. Toggles update synchronously.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

pub fn parse_query(query: &str) -> Result<FilterSelection> {
    let mut sel = FilterSelection::new();
    for pair in query.trim_start_matches('?').split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value)
            .map_err(|e| StoreError::validation(format!("malformed query value: {e}")))?
            .into_owned();
        if value.is_empty() {
            continue;
        }
        match key {
            "category" => sel.category_slug = Some(value),
            "business" => sel.business_slug = Some(value),
            "search" => sel.search = Some(value),
            "sort" => {
                sel.sort = SortKey::parse(&value)
                    .ok_or_else(|| StoreError::validation(format!("unknown sort key '{value}'")))?
            }
            "priceMin" => sel.price_min = value.parse().ok(),
            "priceMax" => sel.price_max = value.parse().ok(),
            "colors" => sel.colors = split_list(&value),
            "brands" => sel.brands = split_list(&value),
            "filters" => {
                sel.filters = serde_json::from_str(&value).map_err(|e| {
                    StoreError::validation(format!("malformed filters object: {e}"))
                })?
            }
            "page" => sel.page = value.parse().unwrap_or(1),
            _ => {}
        }
    }
    Ok(sel)
}

fn split_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Canonical query string. Defaults (`sort=newest`, empty sets, absent
/// ranges, page 1) are omitted; an all-default selection yields "".
pub fn to_query(sel: &FilterSelection) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |key: &str, value: &str| {
        parts.push(format!("{key}={}", urlencoding::encode(value)));
    };
    if let Some(category) = sel.category_slug.as_deref() {
        push("category", category);
    }
    if let Some(business) = sel.business_slug.as_deref() {
        push("business", business);
    }
    if let Some(search) = sel.search.as_deref() {
        push("search", search);
    }
    if sel.sort != SortKey::Newest {
        push("sort", sel.sort.as_str());
    }
    if let Some(min) = sel.price_min {
        push("priceMin", &min.to_string());
    }
    if let Some(max) = sel.price_max {
        push("priceMax", &max.to_string());
    }
    if !sel.colors.is_empty() {
        let joined: Vec<&str> = sel.colors.iter().map(String::as_str).collect();
        push("colors", &joined.join(","));
    }
    if !sel.brands.is_empty() {
        let joined: Vec<&str> = sel.brands.iter().map(String::as_str).collect();
        push("brands", &joined.join(","));
    }
    if !sel.filters.is_empty() {
        push("filters", &serde_json::to_string(&sel.filters).unwrap_or_default());
    }
    if sel.page > 1 {
        push("page", &sel.page.to_string());
    }
    parts.join("&")
}

// Every selection mutation resets pagination: a changed dimension makes
// the old page offset meaningless.

pub fn toggle_color(sel: &mut FilterSelection, value: &str) {
    if !sel.colors.remove(value) {
        sel.colors.insert(value.to_string());
    }
    sel.page = 1;
}

pub fn toggle_brand(sel: &mut FilterSelection, value: &str) {
    if !sel.brands.remove(value) {
        sel.brands.insert(value.to_string());
    }
    sel.page = 1;
}

pub fn toggle_filter_value(sel: &mut FilterSelection, key: &str, value: &str) {
    let values = sel.filters.entry(key.to_string()).or_default();
    if !values.remove(value) {
        values.insert(value.to_string());
    }
    if values.is_empty() {
        sel.filters.remove(key);
    }
    sel.page = 1;
}

pub fn set_search(sel: &mut FilterSelection, search: Option<String>) {
    sel.search = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    sel.page = 1;
}

pub fn set_price_range(sel: &mut FilterSelection, min: Option<f64>, max: Option<f64>) {
    sel.price_min = min;
    sel.price_max = max;
    sel.page = 1;
}

pub fn set_sort(sel: &mut FilterSelection, sort: SortKey) {
    sel.sort = sort;
    sel.page = 1;
}

/// Debounce for free-text URL updates. Purely clock-driven so it can be
/// tested with injected instants.
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::with_delay(DEBOUNCE)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Record a keystroke; any earlier pending value is superseded.
    pub fn submit(&mut self, value: impl Into<String>, at: Instant) {
        self.pending = Some((value.into(), at));
    }

    /// The settled value, once `delay` has elapsed since the last input.
    pub fn flush_due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now.duration_since(*at) >= self.delay => {
                self.pending.take().map(|(v, _)| v)
            }
            _ => None,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter overlay on narrow viewports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlayState {
    #[default]
    Closed,
    Open,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayEvent {
    FilterTap,
    OverlayTap,
    CloseButton,
    /// Navigation to a URL with a different category, business, or search.
    ContextChange,
}

pub fn overlay_step(state: OverlayState, event: OverlayEvent) -> OverlayState {
    match (state, event) {
        (OverlayState::Closed, OverlayEvent::FilterTap) => OverlayState::Open,
        (OverlayState::Open, OverlayEvent::OverlayTap)
        | (OverlayState::Open, OverlayEvent::CloseButton)
        | (OverlayState::Open, OverlayEvent::ContextChange) => OverlayState::Closed,
        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_never_appear() {
        assert_eq!(to_query(&FilterSelection::new()), "");
        let mut sel = FilterSelection::new();
        sel.category_slug = Some("plates".into());
        sel.sort = SortKey::Newest;
        sel.page = 1;
        assert_eq!(to_query(&sel), "category=plates");
    }

    #[test]
    fn test_round_trip() {
        let mut sel = FilterSelection::new();
        sel.category_slug = Some("plates".into());
        sel.search = Some("brass plate".into());
        sel.sort = SortKey::PriceDesc;
        sel.price_min = Some(200.0);
        sel.colors.insert("Blue".into());
        sel.colors.insert("Red".into());
        toggle_filter_value(&mut sel, "Material", "Porcelain");
        sel.page = 3;

        let query = to_query(&sel);
        let parsed = parse_query(&query).unwrap();
        assert_eq!(parsed, sel);
    }

    #[test]
    fn test_toggle_commutes_byte_for_byte() {
        let mut sel = parse_query("category=plates&colors=Blue&brands=Regal").unwrap();
        let before = to_query(&sel);
        toggle_color(&mut sel, "Green");
        assert_ne!(to_query(&sel), before);
        toggle_color(&mut sel, "Green");
        assert_eq!(to_query(&sel), before);
    }

    #[test]
    fn test_toggle_off_resets_page() {
        // /catalog?category=plates&colors=Blue&page=3 with Blue toggled off.
        let mut sel = parse_query("category=plates&colors=Blue&page=3").unwrap();
        toggle_color(&mut sel, "Blue");
        assert_eq!(to_query(&sel), "category=plates");
    }

    #[test]
    fn test_unknown_sort_is_rejected() {
        assert!(parse_query("sort=cheapest").is_err());
        assert!(parse_query("sort=price-asc").is_ok());
    }

    #[test]
    fn test_debounce_settles_after_quiet_period() {
        let mut debouncer = Debouncer::new();
        let t0 = Instant::now();
        debouncer.submit("bra", t0);
        debouncer.submit("brass", t0 + Duration::from_millis(300));
        assert_eq!(debouncer.flush_due(t0 + Duration::from_millis(600)), None);
        assert_eq!(
            debouncer.flush_due(t0 + Duration::from_millis(800)),
            Some("brass".to_string())
        );
        assert_eq!(debouncer.flush_due(t0 + Duration::from_secs(2)), None);
    }

    #[test]
    fn test_overlay_transitions() {
        use OverlayEvent::*;
        use OverlayState::*;
        assert_eq!(overlay_step(Closed, FilterTap), Open);
        assert_eq!(overlay_step(Open, OverlayTap), Closed);
        assert_eq!(overlay_step(Open, ContextChange), Closed);
        assert_eq!(overlay_step(Closed, CloseButton), Closed);
        assert_eq!(overlay_step(Open, FilterTap), Open);
    }
}
