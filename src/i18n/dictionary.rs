use crate::store::TranslationRow;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// The final flattened key→value map after applying layer precedence.
///
/// A value object: immutable once constructed, cheap to clone (the map is
/// shared behind an `Arc`), and safe to hand to any number of concurrent page
/// renders. This is the unit stored in the cache.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MergedDictionary {
    entries: Arc<HashMap<String, String>>,
}

impl MergedDictionary {
    /// Merge layers in strictly increasing precedence: later layers overwrite
    /// earlier ones on key collision. Within one layer, the last row observed
    /// for a key wins (bulk reads have unspecified order, and duplicate rows
    /// are the store's invariant to prevent, not ours).
    pub fn from_layers(layers: Vec<Vec<TranslationRow>>) -> Self {
        let mut entries = HashMap::new();
        for layer in layers {
            for row in layer {
                entries.insert(row.key, row.value);
            }
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Exact-key lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Resolve one key to its displayed string: exact match first, then the
    /// lower-cased key, then the raw key itself. Never fails, never returns
    /// nothing; an untranslated key stays visible in the UI.
    pub fn resolve_key<'a>(&'a self, key: &'a str) -> &'a str {
        if let Some(value) = self.get(key) {
            return value;
        }
        let lowered = key.to_lowercase();
        if lowered != key {
            if let Some(value) = self.get(&lowered) {
                return value;
            }
        }
        key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
