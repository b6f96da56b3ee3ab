use std::collections::HashSet;

use formant_core::{RecordId, RemoteRecord};

/// Per-field accumulation of fetched remote records. Unique by identifier,
/// insertion order is display order. Owned exclusively by its field
/// instance; merges are idempotent so overlapping or out-of-order pages
/// cannot duplicate entries.
#[derive(Debug, Default)]
pub struct OptionCache {
    entries: Vec<RemoteRecord>,
    seen: HashSet<RecordId>,
}

impl OptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records, skipping identifiers already present. Returns the
    /// number actually added.
    pub fn merge(&mut self, records: Vec<RemoteRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if self.seen.insert(record.id.clone()) {
                self.entries.push(record);
                added += 1;
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    pub fn get(&self, id: &RecordId) -> Option<&RemoteRecord> {
        self.entries.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.seen.contains(id)
    }

    pub fn entries(&self) -> &[RemoteRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(pk: i64, name: &str) -> RemoteRecord {
        RemoteRecord::from_payload(json!({"pk": pk, "name": name})).unwrap()
    }

    #[test]
    fn merge_is_idempotent_by_identifier() {
        let mut cache = OptionCache::new();
        assert_eq!(cache.merge(vec![rec(1, "a"), rec(2, "b")]), 2);
        // Overlapping page: 2 again plus a new 3.
        assert_eq!(cache.merge(vec![rec(2, "b"), rec(3, "c")]), 1);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.merge(vec![rec(1, "a")]), 0);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn insertion_order_is_display_order() {
        let mut cache = OptionCache::new();
        cache.merge(vec![rec(9, "z"), rec(1, "a"), rec(5, "m")]);
        let names: Vec<_> = cache
            .entries()
            .iter()
            .map(|r| r.text("name").unwrap().to_string())
            .collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn clear_forgets_seen_identifiers() {
        let mut cache = OptionCache::new();
        cache.merge(vec![rec(1, "a")]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.merge(vec![rec(1, "a")]), 1);
        assert!(cache.contains(&RecordId::Int(1)));
    }
}
