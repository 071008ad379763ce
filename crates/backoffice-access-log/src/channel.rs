//! Bounded, drop-on-full queue between the capture layer and the batch consumer
//!
//! Producers never wait: when the queue is at capacity the record is discarded
//! on the spot. The single consumer receives in FIFO order and sees `None` once
//! the channel has been closed and everything buffered has been handed out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::record::LogRecord;

/// Default number of pending records the channel holds
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Result of a single enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Record is queued for the consumer
    Accepted,
    /// Queue was full, record discarded
    Dropped,
    /// Channel was closed, record discarded
    Closed,
}

/// Snapshot of the channel counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub accepted: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    dropped: AtomicU64,
}

/// Create a log channel holding at most `capacity` pending records.
pub fn log_channel(capacity: usize) -> (LogSender, LogReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shutdown = CancellationToken::new();

    let sender = LogSender {
        tx,
        shutdown: shutdown.clone(),
        counters: Arc::new(Counters::default()),
    };
    let receiver = LogReceiver {
        rx,
        shutdown,
        closing: false,
    };

    (sender, receiver)
}

/// Producer half, cloned into every request.
#[derive(Debug, Clone)]
pub struct LogSender {
    tx: mpsc::Sender<LogRecord>,
    shutdown: CancellationToken,
    counters: Arc<Counters>,
}

impl LogSender {
    /// Try to queue a record without waiting.
    pub fn enqueue(&self, record: LogRecord) -> Enqueued {
        if self.shutdown.is_cancelled() {
            return Enqueued::Closed;
        }

        match self.tx.try_send(record) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                Enqueued::Accepted
            }
            Err(TrySendError::Full(record)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(path = %record.path, "Log channel full, dropping record");
                Enqueued::Dropped
            }
            Err(TrySendError::Closed(_)) => Enqueued::Closed,
        }
    }

    /// Stop accepting records. The receiver drains what is already queued.
    ///
    /// Safe to call more than once.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Consumer half, owned by the batch consumer.
#[derive(Debug)]
pub struct LogReceiver {
    rx: mpsc::Receiver<LogRecord>,
    shutdown: CancellationToken,
    closing: bool,
}

impl LogReceiver {
    /// Wait for the next record.
    ///
    /// Returns `None` once the channel is closed and drained, or once every
    /// sender is gone. Cancel safe.
    pub async fn dequeue(&mut self) -> Option<LogRecord> {
        if !self.closing {
            tokio::select! {
                record = self.rx.recv() => return record,
                _ = self.shutdown.cancelled() => {
                    self.rx.close();
                    self.closing = true;
                }
            }
        }

        self.rx.recv().await
    }
}
