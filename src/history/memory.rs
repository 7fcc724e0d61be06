//! In-memory history store

use super::{newest_first, HistoryError, HistoryItem, HistoryRepository};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// History kept for the life of the process
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    items: RwLock<Vec<HistoryItem>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistory {
    async fn save(&self, item: HistoryItem) -> Result<String, HistoryError> {
        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(HistoryError::DuplicateId(item.id));
        }
        let id = item.id.clone();
        items.push(item);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<HistoryItem>, HistoryError> {
        Ok(newest_first(self.items.read().await.clone()))
    }

    async fn get(&self, id: &str) -> Result<Option<HistoryItem>, HistoryError> {
        Ok(self.items.read().await.iter().find(|i| i.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| i.id != id);
        Ok(items.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::item_at;
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_save_get_delete() {
        let history = InMemoryHistory::new();
        let item = item_at(Utc::now(), "ORB");

        let id = history.save(item.clone()).await.unwrap();
        assert_eq!(id, item.id);
        assert_eq!(history.get(&id).await.unwrap(), Some(item));

        assert!(history.delete(&id).await.unwrap());
        assert!(!history.delete(&id).await.unwrap());
        assert!(history.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let history = InMemoryHistory::new();
        let item = item_at(Utc::now(), "ORB");
        history.save(item.clone()).await.unwrap();

        let err = history.save(item).await.unwrap_err();
        assert!(matches!(err, HistoryError::DuplicateId(_)));
        assert_eq!(history.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let history = InMemoryHistory::new();
        let now = Utc::now();
        let older = item_at(now - Duration::days(1), "old");
        let newer = item_at(now, "new");
        history.save(newer.clone()).await.unwrap();
        history.save(older.clone()).await.unwrap();

        let listed = history.list().await.unwrap();
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
    }
}
