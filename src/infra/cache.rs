//! In-process cache for the announcement and featured-speaker summaries.

use dashmap::DashMap;

use crate::application::announcements::SummaryCache;

/// Process-local [`SummaryCache`] backed by a concurrent map. Entries
/// survive until overwritten, deleted, or the process exits.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SummaryCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete_round_trip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("a"), None);

        cache.set("a", "one".to_string());
        assert_eq!(cache.get("a").as_deref(), Some("one"));

        cache.set("a", "two".to_string());
        assert_eq!(cache.get("a").as_deref(), Some("two"));

        cache.delete("a");
        assert_eq!(cache.get("a"), None);
    }
}
