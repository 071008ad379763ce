//! Asynchronous HTTP request-log pipeline
//!
//! The capture layer builds one [`LogRecord`] per request and hands it to a
//! bounded [`LogSender`] without waiting. A single [`BatchConsumer`] drains the
//! channel and writes batches to a [`LogSink`] on size or on a timer.

pub mod capture;
pub mod channel;
pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod record;
pub mod store;

pub use capture::{capture_body, BodyCapture, TRUNCATION_SUFFIX};
pub use channel::{log_channel, ChannelStats, Enqueued, LogReceiver, LogSender};
pub use config::{LogStoreKind, PipelineConfig};
pub use consumer::{BatchConsumer, ConsumerConfig, ConsumerHandle, ConsumerState};
pub use error::{ConsumerError, StoreError};
pub use memory::MemoryLogStore;
pub use record::{CapturedBody, LogRecord};
pub use store::{LogFilter, LogPage, LogSink, LogStore, PageRequest, StoredLog, TimeRange};

// Re-export useful types
pub use async_trait::async_trait;
