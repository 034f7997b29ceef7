//! Fire-and-forget diff recorder
//!
//! `record` runs on the request path and only takes a short queue lock. A
//! detached consumer task moves records from the bounded queue into the
//! [`DiffStore`]; dropping the caller's future never cancels it.

use crate::store::DiffStore;
use dualstore_core::{ComparisonResult, DiffRecord, DiffRecordId, Operation};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// What to do when the queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the incoming record
    #[default]
    DropNewest,
    /// Evict the oldest pending record
    DropOldest,
}

/// Recorder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub store_timeout_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            overflow_policy: OverflowPolicy::DropNewest,
            store_timeout_ms: 5000,
        }
    }
}

impl RecorderConfig {
    #[inline]
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Counter snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderStats {
    pub enqueued: u64,
    pub dropped: u64,
    pub persisted: u64,
    pub failed: u64,
}

/// Result of a `record` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Comparison was equivalent; nothing to record
    Skipped,
    /// Queued for persistence
    Enqueued(DiffRecordId),
    /// Queue full or recorder shut down
    Dropped,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    persisted: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug)]
struct Shared {
    config: RecorderConfig,
    store: Arc<dyn DiffStore>,
    queue: Mutex<VecDeque<DiffRecord>>,
    /// Records popped by the consumer but not yet stored
    in_flight: AtomicUsize,
    closed: AtomicBool,
    wake: Notify,
    drained: Notify,
    counters: Counters,
}

impl Shared {
    fn is_idle(&self) -> bool {
        let queue = self.queue.lock();
        queue.is_empty() && self.in_flight.load(Ordering::Acquire) == 0
    }

    fn drop_record(&self, record: &DiffRecord, reason: &'static str) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dualstore_diffs_dropped_total", "reason" => reason).increment(1);
        tracing::warn!(
            id = %record.id,
            endpoint = %record.endpoint(),
            severity = %record.severity,
            reason,
            "dropping diff record"
        );
    }

    async fn persist(&self, record: DiffRecord) {
        let outcome =
            tokio::time::timeout(self.config.store_timeout(), self.store.append(&record)).await;
        match outcome {
            Ok(Ok(())) => {
                self.counters.persisted.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("dualstore_diffs_persisted_total").increment(1);
            }
            Ok(Err(e)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("dualstore_diffs_failed_total", "cause" => "store").increment(1);
                tracing::warn!(id = %record.id, endpoint = %record.endpoint(), error = %e, "diff record not persisted");
            }
            Err(_) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("dualstore_diffs_failed_total", "cause" => "timeout").increment(1);
                tracing::warn!(
                    id = %record.id,
                    endpoint = %record.endpoint(),
                    timeout_ms = self.config.store_timeout_ms,
                    "diff store timed out"
                );
            }
        }
    }
}

/// Bounded, asynchronous diff recorder
#[derive(Debug)]
pub struct DiffRecorder {
    shared: Arc<Shared>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl DiffRecorder {
    /// Create recorder and spawn its consumer on the current runtime
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(store: Arc<dyn DiffStore>, config: RecorderConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let shared = Arc::new(Shared {
            config: RecorderConfig {
                queue_capacity: capacity,
                ..config
            },
            store,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            wake: Notify::new(),
            drained: Notify::new(),
            counters: Counters::default(),
        });
        let consumer = tokio::spawn(run_consumer(Arc::clone(&shared)));
        Self {
            shared,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &RecorderConfig {
        &self.shared.config
    }

    /// Record the outcome of a dual call
    ///
    /// Never blocks on the store and never fails.
    pub fn record(&self, operation: &Operation, comparison: ComparisonResult) -> RecordOutcome {
        match DiffRecord::from_comparison(operation, comparison) {
            Some(record) => self.enqueue(record),
            None => RecordOutcome::Skipped,
        }
    }

    /// Queue a prepared record
    pub fn enqueue(&self, record: DiffRecord) -> RecordOutcome {
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) {
            shared.drop_record(&record, "shutdown");
            return RecordOutcome::Dropped;
        }

        let id = record.id;
        let severity = record.severity;
        let evicted = {
            let mut queue = shared.queue.lock();
            if queue.len() >= shared.config.queue_capacity {
                match shared.config.overflow_policy {
                    OverflowPolicy::DropNewest => {
                        drop(queue);
                        shared.drop_record(&record, "queue_full");
                        return RecordOutcome::Dropped;
                    }
                    OverflowPolicy::DropOldest => {
                        let evicted = queue.pop_front();
                        queue.push_back(record);
                        evicted
                    }
                }
            } else {
                queue.push_back(record);
                None
            }
        };
        if let Some(old) = evicted {
            shared.drop_record(&old, "evicted");
        }

        shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dualstore_diffs_enqueued_total", "severity" => severity.as_str())
            .increment(1);
        shared.wake.notify_one();
        RecordOutcome::Enqueued(id)
    }

    /// Number of records waiting for the consumer
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len() + self.shared.in_flight.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn stats(&self) -> RecorderStats {
        let c = &self.shared.counters;
        RecorderStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            persisted: c.persisted.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }

    /// Wait until every queued record has been persisted or failed
    pub async fn flush(&self) {
        loop {
            let drained = self.shared.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();
            if self.shared.is_idle() || self.is_stopped() {
                return;
            }
            drained.await;
        }
    }

    /// Drain the queue and stop the consumer
    ///
    /// Records offered after shutdown are dropped and counted.
    pub async fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.wake.notify_one();
        let handle = self.consumer.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "diff recorder consumer aborted");
            }
        }
        tracing::info!(stats = ?self.stats(), "diff recorder stopped");
    }

    fn is_stopped(&self) -> bool {
        self.consumer
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for DiffRecorder {
    fn drop(&mut self) {
        // Let the consumer finish the backlog and exit on its own
        self.shared.closed.store(true, Ordering::Release);
        self.shared.wake.notify_one();
    }
}

async fn run_consumer(shared: Arc<Shared>) {
    loop {
        let next = {
            let mut queue = shared.queue.lock();
            let next = queue.pop_front();
            if next.is_some() {
                shared.in_flight.fetch_add(1, Ordering::AcqRel);
            }
            next
        };

        match next {
            Some(record) => {
                shared.persist(record).await;
                {
                    let _queue = shared.queue.lock();
                    shared.in_flight.fetch_sub(1, Ordering::AcqRel);
                }
                if shared.is_idle() {
                    shared.drained.notify_waiters();
                }
            }
            None if shared.closed.load(Ordering::Acquire) => {
                shared.drained.notify_waiters();
                break;
            }
            None => shared.wake.notified().await,
        }
    }
}
