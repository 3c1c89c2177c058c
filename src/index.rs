//! Remote index document.
//!
//! Each channel publishes `<prefix>/index.json`:
//!
//! ```json
//! {
//!   "generated_at": "2024-05-02T08:00:00+00:00",
//!   "count": 2,
//!   "prefix": "daily-news/reports",
//!   "items": [
//!     { "fileName": "2024-05-02 - X 日报.md", "objectName": "daily-news/reports/2024-05-02 - X 日报.md",
//!       "title": "...", "excerpt": "...", "date": "2024-05-02", "updatedAt": "...",
//!       "itemCount": 12, "themeCount": 4, "url": "https://..." }
//!   ]
//! }
//! ```
//!
//! Every item field is optional. Writers have used a few spellings over time,
//! so fields are read with a prioritized key list where the first present
//! key wins. Items are kept as raw JSON maps so a rewrite preserves fields
//! this crate does not know about.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use daily_digest_core::slug;
use serde::Serialize;
use serde_json::{Map, Value};

const FILE_NAME_KEYS: &[&str] = &["fileName", "file_name", "name"];
const OBJECT_NAME_KEYS: &[&str] = &["objectName", "object_name", "key"];
const URL_KEYS: &[&str] = &["url", "publicUrl", "public_url"];
const TITLE_KEYS: &[&str] = &["title"];
const EXCERPT_KEYS: &[&str] = &["excerpt", "summary"];
const DATE_KEYS: &[&str] = &["date"];
const UPDATED_AT_KEYS: &[&str] = &["updatedAt", "updated_at", "lastModified"];
const ITEM_COUNT_KEYS: &[&str] = &["itemCount", "item_count"];
const THEME_COUNT_KEYS: &[&str] = &["themeCount", "theme_count"];

/// First of `keys` present in `map` with a non-empty string value.
pub fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// First of `keys` holding a non-negative integer or an integer string.
pub fn first_u64(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().filter_map(|k| map.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// One entry of a remote index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexItem(pub Map<String, Value>);

impl IndexItem {
    /// Basename of the report: `fileName`, else the last segment of
    /// `objectName`.
    pub fn file_name(&self) -> Option<&str> {
        first_str(&self.0, FILE_NAME_KEYS)
            .or_else(|| first_str(&self.0, OBJECT_NAME_KEYS))
            .and_then(slug::basename)
    }

    pub fn object_name(&self) -> Option<&str> {
        first_str(&self.0, OBJECT_NAME_KEYS)
    }

    pub fn url(&self) -> Option<&str> {
        first_str(&self.0, URL_KEYS)
    }

    pub fn title(&self) -> Option<&str> {
        first_str(&self.0, TITLE_KEYS)
    }

    pub fn excerpt(&self) -> Option<&str> {
        first_str(&self.0, EXCERPT_KEYS)
    }

    pub fn date(&self) -> Option<&str> {
        first_str(&self.0, DATE_KEYS)
    }

    pub fn updated_at(&self) -> Option<&str> {
        first_str(&self.0, UPDATED_AT_KEYS)
    }

    pub fn item_count(&self) -> u64 {
        first_u64(&self.0, ITEM_COUNT_KEYS).unwrap_or(0)
    }

    pub fn theme_count(&self) -> u64 {
        first_u64(&self.0, THEME_COUNT_KEYS).unwrap_or(0)
    }
}

/// Parse an index document, keeping only object-shaped items.
///
/// Fails when the text is not JSON or has no `items` array.
pub fn parse_index(text: &str) -> Result<Vec<IndexItem>> {
    let value: Value = serde_json::from_str(text).context("index is not valid JSON")?;
    let Some(items) = value.get("items") else {
        bail!("index has no 'items' field");
    };
    let Some(items) = items.as_array() else {
        bail!("index 'items' is not an array");
    };
    Ok(items
        .iter()
        .filter_map(|v| v.as_object().cloned().map(IndexItem))
        .collect())
}

/// Index document as written back to the store.
#[derive(Debug, Serialize)]
pub struct IndexDocument {
    pub generated_at: String,
    pub count: usize,
    pub prefix: String,
    pub items: Vec<Map<String, Value>>,
}

impl IndexDocument {
    /// A fresh document stamped with the current time.
    pub fn new(prefix: &str, items: Vec<IndexItem>) -> Self {
        let items: Vec<Map<String, Value>> = items.into_iter().map(|i| i.0).collect();
        Self {
            generated_at: Utc::now().to_rfc3339(),
            count: items.len(),
            prefix: prefix.to_string(),
            items,
        }
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text.into_bytes())
    }
}

/// Sort items by file name descending (items without one sort last).
pub fn sort_items(items: &mut [IndexItem]) {
    items.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: Value) -> IndexItem {
        IndexItem(v.as_object().unwrap().clone())
    }

    #[test]
    fn test_prioritized_keys() {
        let i = item(json!({
            "file_name": "b.md",
            "fileName": "a.md",
            "object_name": "p/b.md",
            "updated_at": "2024-01-01T00:00:00Z",
            "itemCount": "12",
            "theme_count": 4,
        }));
        assert_eq!(i.file_name(), Some("a.md"));
        assert_eq!(i.object_name(), Some("p/b.md"));
        assert_eq!(i.updated_at(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(i.item_count(), 12);
        assert_eq!(i.theme_count(), 4);
    }

    #[test]
    fn test_empty_string_falls_through() {
        let i = item(json!({ "fileName": "  ", "objectName": "p/q/c 日报.md" }));
        assert_eq!(i.file_name(), Some("c 日报.md"));
    }

    #[test]
    fn test_file_name_is_basename() {
        let i = item(json!({ "fileName": "nested/dir/x.md" }));
        assert_eq!(i.file_name(), Some("x.md"));
        let none = item(json!({ "title": "t" }));
        assert_eq!(none.file_name(), None);
        assert_eq!(none.item_count(), 0);
    }

    #[test]
    fn test_parse_index() {
        let items = parse_index(r#"{"items":[{"fileName":"a.md"}, 3, "x", {"fileName":"b.md"}]}"#)
            .unwrap();
        assert_eq!(items.len(), 2);
        assert!(parse_index("not json").is_err());
        assert!(parse_index(r#"{"items": {}}"#).is_err());
        assert!(parse_index(r#"[1,2]"#).is_err());
    }

    #[test]
    fn test_document_round_trip_shape() {
        let doc = IndexDocument::new(
            "p",
            vec![item(json!({ "fileName": "a.md", "extra": true }))],
        );
        let bytes = doc.to_bytes().unwrap();
        assert_eq!(*bytes.last().unwrap(), b'\n');
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["count"], 1);
        assert_eq!(v["prefix"], "p");
        assert_eq!(v["items"][0]["extra"], true);
        assert!(v["generated_at"].as_str().is_some());
    }

    #[test]
    fn test_sort_items() {
        let mut items = vec![
            item(json!({ "fileName": "2024-01-01.md" })),
            item(json!({ "title": "no name" })),
            item(json!({ "fileName": "2024-01-03.md" })),
        ];
        sort_items(&mut items);
        assert_eq!(items[0].file_name(), Some("2024-01-03.md"));
        assert_eq!(items[1].file_name(), Some("2024-01-01.md"));
        assert_eq!(items[2].file_name(), None);
    }
}
