//! Storage seams for log records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::LogRecord;

/// Largest page a list call will return
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Highest page number; keeps every offset within a signed 64-bit SQL OFFSET
pub const MAX_PAGE_NUMBER: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

/// Write side: where the batch consumer sends flushed records.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Persist every record in one call. Any error counts for the whole batch.
    async fn persist_batch(&self, records: Vec<LogRecord>) -> Result<(), StoreError>;
}

/// Read and delete side used by the log endpoints.
#[async_trait]
pub trait LogStore: LogSink {
    async fn get(&self, id: i32) -> Result<Option<StoredLog>, StoreError>;

    /// Newest first.
    async fn list(&self, page: PageRequest, filter: &LogFilter) -> Result<LogPage, StoreError>;

    /// Returns false when no live record had this id.
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;

    async fn delete_many(&self, ids: &[i32]) -> Result<u64, StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;
}

/// A persisted record with its storage identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLog {
    pub id: i32,
    #[serde(flatten)]
    pub record: LogRecord,
    pub updated_at: DateTime<Utc>,
}

/// One page of stored records plus the total matching count
#[derive(Debug, Clone, Default)]
pub struct LogPage {
    pub rows: Vec<StoredLog>,
    pub total: u64,
}

/// Inclusive time window, both ends in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Filters accepted by [`LogStore::list`]. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    /// Exact match, compared upper-case
    pub method: Option<String>,
    /// Literal substring of the request path, ASCII case-insensitive
    pub path: Option<String>,
    pub status: Option<u16>,
    /// Exact client IP
    pub ip: Option<String>,
    /// Literal substring of the handler identifier, ASCII case-insensitive
    pub handler: Option<String>,
    pub time_range: Option<TimeRange>,
}

impl LogFilter {
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(method) = &self.method {
            if !record.method.eq_ignore_ascii_case(method) {
                return false;
            }
        }
        if let Some(path) = &self.path {
            if !contains_ignore_ascii_case(&record.path, path) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(ip) = &self.ip {
            if &record.ip != ip {
                return false;
            }
        }
        if let Some(handler) = &self.handler {
            if !contains_ignore_ascii_case(&record.handler, handler) {
                return false;
            }
        }
        if let Some(range) = &self.time_range {
            if record.timestamp < range.start || record.timestamp > range.end {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// 1-based page number and page size, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE_NUMBER),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based page index
    pub fn index(&self) -> u64 {
        self.page - 1
    }

    pub fn offset(&self) -> u64 {
        self.index().saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}
