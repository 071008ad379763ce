//! Background worker that batches log records and flushes them to storage
//!
//! A flush happens when the buffer reaches the batch size or when the flush
//! timer fires with a non-empty buffer, whichever comes first. When the channel
//! closes, whatever is buffered is flushed once and the worker stops. Failed
//! flushes are logged and the batch is dropped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::channel::LogReceiver;
use crate::error::ConsumerError;
use crate::record::LogRecord;
use crate::store::LogSink;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Lifecycle of the consumer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    /// Channel closed and drained, flushing the remainder
    Draining,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

pub struct BatchConsumer {
    receiver: LogReceiver,
    sink: Arc<dyn LogSink>,
    config: ConsumerConfig,
    state: watch::Sender<ConsumerState>,
}

impl BatchConsumer {
    pub fn new(receiver: LogReceiver, sink: Arc<dyn LogSink>, config: ConsumerConfig) -> Self {
        let (state, _) = watch::channel(ConsumerState::Running);
        Self {
            receiver,
            sink,
            config: ConsumerConfig {
                batch_size: config.batch_size.max(1),
                flush_interval: config.flush_interval.max(Duration::from_millis(1)),
            },
            state,
        }
    }

    /// Run the consumer on its own task.
    pub fn spawn(self) -> ConsumerHandle {
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run());
        ConsumerHandle { state, task }
    }

    /// Drive the consumer until the channel is closed and drained.
    pub async fn run(self) {
        let Self {
            mut receiver,
            sink,
            config,
            state,
        } = self;

        info!(
            batch_size = config.batch_size,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            "Log consumer started"
        );

        let mut buffer: Vec<LogRecord> = Vec::with_capacity(config.batch_size);
        let mut ticker = time::interval_at(
            Instant::now() + config.flush_interval,
            config.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                record = receiver.dequeue() => match record {
                    Some(record) => {
                        buffer.push(record);
                        if buffer.len() >= config.batch_size {
                            flush(sink.as_ref(), &mut buffer, config.batch_size).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        flush(sink.as_ref(), &mut buffer, config.batch_size).await;
                    }
                }
            }
        }

        state.send_replace(ConsumerState::Draining);
        if !buffer.is_empty() {
            flush(sink.as_ref(), &mut buffer, config.batch_size).await;
        }
        state.send_replace(ConsumerState::Stopped);

        info!("Log consumer stopped");
    }
}

async fn flush(sink: &dyn LogSink, buffer: &mut Vec<LogRecord>, batch_size: usize) {
    let batch = std::mem::replace(buffer, Vec::with_capacity(batch_size));
    let count = batch.len();

    match sink.persist_batch(batch).await {
        Ok(()) => debug!(count, "Flushed log batch"),
        Err(e) => error!(count, error = %e, "Failed to persist log batch, records discarded"),
    }
}

/// Handle to a spawned [`BatchConsumer`]
pub struct ConsumerHandle {
    state: watch::Receiver<ConsumerState>,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Wait for the consumer to reach [`ConsumerState::Stopped`].
    ///
    /// Only returns after the channel has been closed (or every sender dropped).
    pub async fn join(self) -> Result<(), ConsumerError> {
        self.task.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::log_channel;
    use crate::error::StoreError;
    use crate::record::sample_record;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<LogRecord>>>,
    }

    impl RecordingSink {
        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn persist_batch(&self, records: Vec<LogRecord>) -> Result<(), StoreError> {
            self.batches.lock().unwrap().push(records);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl LogSink for FailingSink {
        async fn persist_batch(&self, _records: Vec<LogRecord>) -> Result<(), StoreError> {
            Err(StoreError::Backend("database unavailable".to_string()))
        }
    }

    fn config(batch_size: usize, flush_interval: Duration) -> ConsumerConfig {
        ConsumerConfig {
            batch_size,
            flush_interval,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_size_triggers_flush() {
        let (sender, receiver) = log_channel(64);
        let sink = Arc::new(RecordingSink::default());
        let handle = BatchConsumer::new(
            receiver,
            sink.clone(),
            config(4, Duration::from_secs(3600)),
        )
        .spawn();

        for i in 0..4 {
            sender.enqueue(sample_record(&format!("/r/{}", i)));
        }
        // Well short of the flush interval
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(sink.batch_sizes(), vec![4]);
        assert_eq!(handle.state(), ConsumerState::Running);

        sender.close();
        handle.join().await.unwrap();
        assert_eq!(sink.batch_sizes(), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_partial_batch() {
        let (sender, receiver) = log_channel(64);
        let sink = Arc::new(RecordingSink::default());
        let _handle = BatchConsumer::new(receiver, sink.clone(), config(100, Duration::from_secs(5)))
            .spawn();

        for i in 0..3 {
            sender.enqueue(sample_record(&format!("/r/{}", i)));
        }

        time::sleep(Duration::from_secs(4)).await;
        assert!(sink.batch_sizes().is_empty());

        time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(sink.batch_sizes(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_skips_empty_buffer() {
        let (_sender, receiver) = log_channel(64);
        let sink = Arc::new(RecordingSink::default());
        let _handle = BatchConsumer::new(receiver, sink.clone(), config(100, Duration::from_secs(1)))
            .spawn();

        time::sleep(Duration::from_secs(10)).await;
        assert!(sink.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_close_flushes_remainder_once_and_stops() {
        let (sender, receiver) = log_channel(64);
        let sink = Arc::new(RecordingSink::default());
        let handle = BatchConsumer::new(
            receiver,
            sink.clone(),
            config(100, Duration::from_secs(3600)),
        )
        .spawn();

        for i in 0..7 {
            sender.enqueue(sample_record(&format!("/r/{}", i)));
        }
        sender.close();

        handle.join().await.unwrap();
        assert_eq!(sink.batch_sizes(), vec![7]);
    }

    #[tokio::test]
    async fn test_state_reaches_stopped() {
        let (sender, receiver) = log_channel(8);
        let sink = Arc::new(RecordingSink::default());
        let consumer = BatchConsumer::new(receiver, sink, ConsumerConfig::default());
        let mut state = consumer.state.subscribe();
        let handle = consumer.spawn();

        assert_eq!(handle.state(), ConsumerState::Running);
        sender.close();

        state
            .wait_for(|s| *s == ConsumerState::Stopped)
            .await
            .unwrap();
        handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_flush_is_discarded_and_consumer_keeps_going() {
        let (sender, receiver) = log_channel(64);
        let handle = BatchConsumer::new(
            receiver,
            Arc::new(FailingSink),
            config(2, Duration::from_secs(3600)),
        )
        .spawn();

        for i in 0..5 {
            sender.enqueue(sample_record(&format!("/r/{}", i)));
        }
        sender.close();

        // Every flush fails, yet the consumer drains and stops cleanly
        handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_records_keep_fifo_order_within_batches() {
        let (sender, receiver) = log_channel(64);
        let sink = Arc::new(RecordingSink::default());
        let handle = BatchConsumer::new(
            receiver,
            sink.clone(),
            config(3, Duration::from_secs(3600)),
        )
        .spawn();

        for i in 0..8 {
            sender.enqueue(sample_record(&format!("/r/{}", i)));
        }
        sender.close();
        handle.join().await.unwrap();

        let paths: Vec<String> = sink
            .batches
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|r| r.path.clone())
            .collect();
        let expected: Vec<String> = (0..8).map(|i| format!("/r/{}", i)).collect();
        assert_eq!(paths, expected);
        assert_eq!(sink.batch_sizes(), vec![3, 3, 2]);
    }
}
