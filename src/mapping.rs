//! Keyword-to-category genre mapping.
//!
//! A `GenreMap` is an ordered list of lowercase keywords, each pointing at a
//! canonical category ("Pop", "Hip-Hop/Rap", ...). A raw genre string matches
//! the first keyword that occurs anywhere inside it, so the order of entries
//! is part of the configuration: put the specific keywords ("k-pop") before
//! the generic ones ("pop").

use anyhow::{Context, Result, bail};
use std::path::Path;

/// Built-in table. Used when no mapping file is configured.
/// Keys must be lowercase; first match in this order wins.
pub const DEFAULT_MAPPING: &[(&str, &str)] = &[
    ("r&b", "R&B/Soul"),
    ("soul", "R&B/Soul"),
    ("neo soul", "R&B/Soul"),
    ("contemporary r&b", "R&B/Soul"),
    ("hip hop", "Hip-Hop/Rap"),
    ("rap", "Hip-Hop/Rap"),
    ("trap", "Hip-Hop/Rap"),
    ("urban", "Hip-Hop/Rap"),
    ("k-pop", "K-Pop"),
    ("kpop", "K-Pop"),
    ("korean pop", "K-Pop"),
    ("pop", "Pop"),
    ("dance pop", "Pop"),
    ("electropop", "Pop"),
    ("electronic", "Electronic/Dance"),
    ("dance", "Electronic/Dance"),
    ("edm", "Electronic/Dance"),
    ("house", "Electronic/Dance"),
    ("techno", "Electronic/Dance"),
    ("rock", "Rock"),
    ("alternative rock", "Rock"),
    ("indie rock", "Rock"),
    ("jazz", "Jazz"),
    ("smooth jazz", "Jazz"),
    ("classical", "Classical"),
    ("orchestra", "Classical"),
];

/// Immutable keyword → canonical category table, matched in entry order.
#[derive(Debug, Clone)]
pub struct GenreMap {
    entries: Vec<(String, String)>,
}

impl Default for GenreMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_MAPPING
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl GenreMap {
    /// Load a mapping override from a JSON file. The file must be a flat
    /// object of `"keyword": "Category"` pairs; key order in the file is the
    /// match order.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid mapping file {}", path.display()))
    }

    /// Parse and validate the JSON object form. Rejects the inverted
    /// `"Category": ["keyword", ...]` layout some older mapping files used.
    pub fn from_json(raw: &str) -> Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(raw).context("Mapping must be a JSON object")?;

        let mut entries = Vec::with_capacity(object.len());
        for (keyword, value) in object {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                bail!("Mapping contains an empty keyword");
            }
            let category = match value {
                serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                serde_json::Value::Array(_) => bail!(
                    "Mapping entry \"{keyword}\" is a list; expected \"keyword\": \"Category\" pairs, \
                     not categories mapping to keyword lists"
                ),
                other => bail!("Mapping entry \"{keyword}\" must be a non-empty string, got {other}"),
            };
            entries.push((keyword, category));
        }

        if entries.is_empty() {
            bail!("Mapping contains no entries");
        }

        Ok(Self { entries })
    }

    /// Map a raw genre string to its canonical category: the first keyword
    /// (in table order) occurring anywhere in the lowercased, trimmed input
    /// wins. `None` means the caller needs an external lookup.
    pub fn normalize(&self, raw: &str) -> Option<&str> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(keyword, _)| needle.contains(keyword))
            .map(|(_, category)| category.as_str())
    }

    /// Map every raw genre string from a lookup to a category, collapse
    /// duplicates, and sort so the resulting join is deterministic.
    pub fn map_candidates(&self, raws: &[String]) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for raw in raws {
            if let Some(category) = self.normalize(raw) {
                if !categories.iter().any(|c| c == category) {
                    categories.push(category.to_string());
                }
            }
        }
        categories.sort();
        categories
    }

    /// Collect every keyword that occurs in a lowercased free-text blob, in
    /// table order. The web-search fallback feeds page text through this.
    pub fn scan_text(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        self.entries
            .iter()
            .filter(|(keyword, _)| haystack.contains(keyword))
            .map(|(keyword, _)| keyword.clone())
            .collect()
    }

    /// Whether `s` is exactly one of the table's canonical categories
    /// (ignoring ASCII case). Tags we wrote earlier pass this test, which is
    /// what makes a rerun over the same directory a no-op.
    pub fn is_category(&self, s: &str) -> bool {
        self.entries
            .iter()
            .any(|(_, category)| category.eq_ignore_ascii_case(s.trim()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
