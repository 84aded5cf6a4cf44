use super::{TokenRecord, TokenStore};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::trace;

/// In-process token store keyed by identifier
#[derive(Debug)]
pub struct MemoryTokenStore {
    rows: RwLock<HashMap<String, TokenRecord>>,
    next_id: AtomicI32,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Snapshot of every stored record
    pub fn records(&self) -> Vec<TokenRecord> {
        self.rows.read().values().cloned().collect()
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<TokenRecord>> {
        Ok(self.rows.read().get(identifier).cloned())
    }

    async fn save(&self, record: TokenRecord) -> Result<TokenRecord> {
        let mut rows = self.rows.write();

        // The id is immutable once assigned; only the value changes.
        if let Some(existing) = rows.get_mut(&record.identifier) {
            existing.value = record.value;
            trace!(id = ?existing.id, "Updated token record");
            return Ok(existing.clone());
        }

        // An id already held by another identifier is replaced from the sequence.
        let id = match record.id {
            Some(id) if !rows.values().any(|row| row.id == Some(id)) => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                id
            }
            _ => self.next_id.fetch_add(1, Ordering::SeqCst),
        };

        let saved = TokenRecord {
            id: Some(id),
            identifier: record.identifier,
            value: record.value,
        };
        rows.insert(saved.identifier.clone(), saved.clone());
        trace!(id, "Inserted token record");

        Ok(saved)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_absent_is_none() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.find_by_identifier("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = MemoryTokenStore::new();
        let first = store.save(TokenRecord::new("a", "t1")).await.unwrap();
        let second = store.save(TokenRecord::new("b", "t2")).await.unwrap();

        assert!(first.is_persisted());
        assert_ne!(first.id, second.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_id() {
        let store = MemoryTokenStore::new();
        let mut record = store.save(TokenRecord::new("a", "t1")).await.unwrap();
        let id = record.id;

        record.value = "t2".to_string();
        let updated = store.save(record).await.unwrap();

        assert_eq!(updated.id, id);
        assert_eq!(updated.value, "t2");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_updates_existing_row() {
        let store = MemoryTokenStore::new();
        let first = store.save(TokenRecord::new("a", "t1")).await.unwrap();
        let second = store.save(TokenRecord::new("a", "t2")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(
            store.find_by_identifier("a").await.unwrap().unwrap().value,
            "t2"
        );
    }

    #[tokio::test]
    async fn test_explicit_id_advances_sequence() {
        let store = MemoryTokenStore::new();
        let mut seeded = TokenRecord::new("a", "t1");
        seeded.id = Some(41);
        store.save(seeded).await.unwrap();

        let next = store.save(TokenRecord::new("b", "t2")).await.unwrap();
        assert_eq!(next.id, Some(42));
    }

    #[tokio::test]
    async fn test_explicit_id_of_other_row_is_reassigned() {
        let store = MemoryTokenStore::new();
        let first = store.save(TokenRecord::new("a", "t1")).await.unwrap();

        let mut stolen = TokenRecord::new("b", "t2");
        stolen.id = first.id;
        let second = store.save(stolen).await.unwrap();

        assert_ne!(second.id, first.id);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.find_by_identifier("a").await.unwrap().unwrap().id, first.id);

        let mut ids: Vec<_> = store.records().into_iter().filter_map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 2);
    }
}
