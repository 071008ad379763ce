//! In-process log store
//!
//! Keeps records in memory with the same filter, ordering and soft-delete
//! behaviour as the database store. Contents are lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::record::LogRecord;
use crate::store::{LogFilter, LogPage, LogSink, LogStore, PageRequest, StoredLog};

#[derive(Default)]
struct Inner {
    next_id: i32,
    rows: Vec<Row>,
}

struct Row {
    log: StoredLog,
    deleted: bool,
}

#[derive(Default)]
pub struct MemoryLogStore {
    inner: RwLock<Inner>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (not deleted) records
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.iter().filter(|r| !r.deleted).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LogSink for MemoryLogStore {
    async fn persist_batch(&self, records: Vec<LogRecord>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        for record in records {
            inner.next_id += 1;
            let id = inner.next_id;
            inner.rows.push(Row {
                log: StoredLog {
                    id,
                    record,
                    updated_at: now,
                },
                deleted: false,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn get(&self, id: i32) -> Result<Option<StoredLog>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .iter()
            .find(|r| !r.deleted && r.log.id == id)
            .map(|r| r.log.clone()))
    }

    async fn list(&self, page: PageRequest, filter: &LogFilter) -> Result<LogPage, StoreError> {
        let inner = self.inner.read().await;

        let mut matching: Vec<&StoredLog> = inner
            .rows
            .iter()
            .filter(|r| !r.deleted && filter.matches(&r.log.record))
            .map(|r| &r.log)
            .collect();
        matching.sort_by(|a, b| {
            b.record
                .timestamp
                .cmp(&a.record.timestamp)
                .then(b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .cloned()
            .collect();

        Ok(LogPage { rows, total })
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner
            .rows
            .iter_mut()
            .find(|r| !r.deleted && r.log.id == id)
        {
            Some(row) => {
                row.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(&self, ids: &[i32]) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        for row in inner
            .rows
            .iter_mut()
            .filter(|r| !r.deleted && ids.contains(&r.log.id))
        {
            row.deleted = true;
            removed += 1;
        }
        Ok(removed)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        for row in inner.rows.iter_mut().filter(|r| !r.deleted) {
            row.deleted = true;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample_record;
    use chrono::Duration;

    async fn seeded(count: usize) -> MemoryLogStore {
        let store = MemoryLogStore::new();
        let base = Utc::now();
        let records = (0..count)
            .map(|i| {
                let mut record = sample_record(&format!("/api/items/{}", i));
                record.timestamp = base + Duration::seconds(i as i64);
                record.status = if i % 2 == 0 { 200 } else { 404 };
                record
            })
            .collect();
        store.persist_batch(records).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paged() {
        let store = seeded(25).await;

        let page = store
            .list(PageRequest::new(1, 10), &LogFilter::default())
            .await
            .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.rows[0].record.path, "/api/items/24");

        let last = store
            .list(PageRequest::new(3, 10), &LogFilter::default())
            .await
            .unwrap();
        assert_eq!(last.rows.len(), 5);
        assert_eq!(last.rows[4].record.path, "/api/items/0");
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let store = seeded(3).await;

        let page = store
            .list(PageRequest::new(u64::MAX, 1000), &LogFilter::default())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.rows.is_empty());
    }

    #[tokio::test]
    async fn test_list_applies_filter() {
        let store = seeded(10).await;
        let filter = LogFilter {
            status: Some(404),
            ..Default::default()
        };

        let page = store.list(PageRequest::default(), &filter).await.unwrap();
        assert_eq!(page.total, 5);
        assert!(page.rows.iter().all(|r| r.record.status == 404));
    }

    #[tokio::test]
    async fn test_deletes_are_soft_and_hidden() {
        let store = seeded(5).await;

        assert!(store.delete(1).await.unwrap());
        assert!(!store.delete(1).await.unwrap());
        assert!(store.get(1).await.unwrap().is_none());

        assert_eq!(store.delete_many(&[2, 3, 99]).await.unwrap(), 2);
        assert_eq!(store.len().await, 2);

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert!(store.is_empty().await);
    }
}
