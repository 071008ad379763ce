//! End-to-end behaviour of channel + consumer + store

use backoffice_access_log::{
    async_trait, log_channel, BatchConsumer, ConsumerConfig, ConsumerState, Enqueued, LogFilter,
    LogRecord, LogSink, LogStore, MemoryLogStore, PageRequest, StoreError,
};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn record(i: usize) -> LogRecord {
    let now = Utc::now();
    LogRecord {
        timestamp: now,
        method: "GET".to_string(),
        path: format!("/api/items/{}", i),
        query: String::new(),
        ip: "10.1.2.3".to_string(),
        user_agent: "pipeline-test".to_string(),
        status: 200,
        latency: Duration::from_millis(3),
        handler: "GET /api/items/{id}".to_string(),
        request: None,
        response: None,
        errors: String::new(),
        content_length: -1,
        truncated: false,
        created_at: now,
    }
}

#[derive(Default)]
struct CountingSink {
    batches: Mutex<Vec<usize>>,
}

#[async_trait]
impl LogSink for CountingSink {
    async fn persist_batch(&self, records: Vec<LogRecord>) -> Result<(), StoreError> {
        self.batches.lock().unwrap().push(records.len());
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enqueue_never_exceeds_capacity() {
    const CAPACITY: usize = 50;
    const EXTRA: usize = 30;

    let (sender, mut receiver) = log_channel(CAPACITY);

    let mut tasks = Vec::new();
    for i in 0..CAPACITY + EXTRA {
        let sender = sender.clone();
        tasks.push(tokio::spawn(async move { sender.enqueue(record(i)) }));
    }

    let mut accepted = 0;
    let mut dropped = 0;
    for task in tasks {
        match task.await.unwrap() {
            Enqueued::Accepted => accepted += 1,
            Enqueued::Dropped => dropped += 1,
            Enqueued::Closed => panic!("channel closed unexpectedly"),
        }
    }
    assert_eq!(accepted, CAPACITY);
    assert_eq!(dropped, EXTRA);

    sender.close();
    let mut retained = 0;
    while receiver.dequeue().await.is_some() {
        retained += 1;
    }
    assert_eq!(retained, CAPACITY);

    let stats = sender.stats();
    assert_eq!(stats.accepted, CAPACITY as u64);
    assert_eq!(stats.dropped, EXTRA as u64);
}

#[tokio::test]
async fn test_no_records_lost_across_batch_boundaries() {
    for total in [0usize, 1, 99, 100, 101, 250, 1000] {
        let (sender, receiver) = log_channel(2000);
        let sink = Arc::new(CountingSink::default());
        let handle = BatchConsumer::new(
            receiver,
            sink.clone(),
            ConsumerConfig {
                batch_size: 100,
                flush_interval: Duration::from_secs(3600),
            },
        )
        .spawn();

        for i in 0..total {
            assert_eq!(sender.enqueue(record(i)), Enqueued::Accepted);
        }
        sender.close();
        handle.join().await.unwrap();

        let batches = sink.batches.lock().unwrap().clone();
        assert_eq!(batches.iter().sum::<usize>(), total, "total {}", total);
        assert!(batches.iter().all(|&n| n > 0 && n <= 100));
    }
}

#[tokio::test]
async fn test_shutdown_drain_persists_everything_then_rejects() {
    let (sender, receiver) = log_channel(500);
    let store = Arc::new(MemoryLogStore::new());
    let handle = BatchConsumer::new(
        receiver,
        store.clone(),
        ConsumerConfig {
            batch_size: 100,
            flush_interval: Duration::from_secs(3600),
        },
    )
    .spawn();

    for i in 0..42 {
        sender.enqueue(record(i));
    }
    assert_eq!(handle.state(), ConsumerState::Running);

    sender.close();
    handle.join().await.unwrap();

    assert_eq!(store.len().await, 42);
    assert_eq!(sender.enqueue(record(99)), Enqueued::Closed);

    let page = store
        .list(PageRequest::new(1, 100), &LogFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 42);
}
