//! Ordered-fallback field lookup over heterogeneous vector metadata.
//!
//! Upstream feeds (job boards, hackathon listings, news) name the same field
//! differently, so every field is resolved through a fixed list of candidate keys.

use serde_json::{Map, Value};

pub const ID_KEYS: &[&str] = &["job_id", "supabase_id", "id"];
pub const TITLE_KEYS: &[&str] = &["title", "name", "headline"];
pub const ORGANIZATION_KEYS: &[&str] = &[
    "company",
    "company_name",
    "organization",
    "organizer",
    "source",
];
pub const DESCRIPTION_KEYS: &[&str] = &["summary", "description", "content", "text"];
pub const LINK_KEYS: &[&str] = &["link", "link_to_apply", "url", "apply_url"];

/// First non-empty value among `keys`, rendered as a string.
/// Numbers are accepted; integral floats lose their fraction (`113.0` → `"113"`).
pub fn resolve(metadata: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(render)
}

pub fn resolve_or(metadata: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    resolve(metadata, keys).unwrap_or_else(|| default.to_string())
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}
