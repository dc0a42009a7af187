//! In-process partitioned log.
//!
//! Behaves like a broker from the pipelines' point of view: keyed records
//! hash to a partition, each consumer group keeps its own auto-committed
//! position, a drained partition reports end-of-partition once, and delivery
//! reports arrive on a spawned task. Faults can be injected for tests.

use super::{
    DeliveryOutcome, DeliveryReceipt, LogConsumer, LogPosition, LogProducer, LogRecord,
    TransportError,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
struct StoredRecord {
    key: Option<Bytes>,
    value: Option<Bytes>,
}

struct Inner {
    partitions: i32,
    topics: RwLock<HashMap<String, Vec<Vec<StoredRecord>>>>,
    /// (group, topic, partition) → next offset to read
    committed: Mutex<HashMap<(String, String, i32), i64>>,
    /// group → errors its next polls return
    injected_errors: Mutex<HashMap<String, VecDeque<TransportError>>>,
    failing_publishes: Mutex<VecDeque<String>>,
    round_robin: AtomicU64,
}

impl Inner {
    fn partition_for(&self, key: Option<&Bytes>) -> i32 {
        let slot = match key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                hasher.finish()
            }
            None => self.round_robin.fetch_add(1, Ordering::Relaxed),
        };
        (slot % self.partitions as u64) as i32
    }

    async fn append(&self, topic: &str, partition: i32, record: StoredRecord) -> i64 {
        let mut topics = self.topics.write().await;
        let partitions = topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); self.partitions as usize]);
        let log = &mut partitions[partition as usize];
        log.push(record);
        (log.len() - 1) as i64
    }
}

/// Shared in-memory log; clone it to hand producers and consumers the same log.
#[derive(Clone)]
pub struct MemoryLog {
    inner: Arc<Inner>,
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLog {
    /// Single partition per topic.
    pub fn new() -> Self {
        Self::with_partitions(1)
    }

    /// `partitions` per topic; values below one are treated as one.
    pub fn with_partitions(partitions: i32) -> Self {
        Self {
            inner: Arc::new(Inner {
                partitions: partitions.max(1),
                topics: RwLock::new(HashMap::new()),
                committed: Mutex::new(HashMap::new()),
                injected_errors: Mutex::new(HashMap::new()),
                failing_publishes: Mutex::new(VecDeque::new()),
                round_robin: AtomicU64::new(0),
            }),
        }
    }

    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn consumer(&self, group_id: impl Into<String>) -> MemoryConsumer {
        MemoryConsumer {
            inner: Arc::clone(&self.inner),
            group_id: group_id.into(),
            topics: Vec::new(),
            eof_pending: HashSet::new(),
            cursor: 0,
            closed: false,
        }
    }

    /// Append raw bytes, bypassing any encoding. Returns the offset.
    pub async fn append_raw(&self, topic: &str, partition: i32, value: impl Into<Bytes>) -> i64 {
        let partition = partition.clamp(0, self.inner.partitions - 1);
        self.inner
            .append(
                topic,
                partition,
                StoredRecord {
                    key: None,
                    value: Some(value.into()),
                },
            )
            .await
    }

    /// Deliver `error` to the next poll of a consumer in `group_id`.
    pub async fn inject_error(&self, group_id: &str, error: TransportError) {
        self.inner
            .injected_errors
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .push_back(error);
    }

    /// Make the next publish report `Failed(reason)`.
    pub async fn fail_next_publish(&self, reason: impl Into<String>) {
        self.inner
            .failing_publishes
            .lock()
            .await
            .push_back(reason.into());
    }

    /// Every record of `topic`, partition by partition.
    pub async fn records(&self, topic: &str) -> Vec<LogRecord> {
        let topics = self.inner.topics.read().await;
        let Some(partitions) = topics.get(topic) else {
            return Vec::new();
        };
        partitions
            .iter()
            .enumerate()
            .flat_map(|(partition, log)| {
                log.iter().enumerate().map(move |(offset, record)| LogRecord {
                    topic: topic.to_string(),
                    partition: partition as i32,
                    offset: offset as i64,
                    key: record.key.clone(),
                    value: record.value.clone(),
                })
            })
            .collect()
    }

    /// Next offset `group_id` will read from a partition.
    pub async fn committed_offset(&self, group_id: &str, topic: &str, partition: i32) -> Option<i64> {
        self.inner
            .committed
            .lock()
            .await
            .get(&(group_id.to_string(), topic.to_string(), partition))
            .copied()
    }
}

/// Producer half of a [`MemoryLog`]
#[derive(Clone)]
pub struct MemoryProducer {
    inner: Arc<Inner>,
}

#[async_trait]
impl LogProducer for MemoryProducer {
    async fn publish(
        &self,
        topic: &str,
        key: Option<Bytes>,
        payload: Bytes,
    ) -> Result<DeliveryReceipt, TransportError> {
        let (sender, receipt) = DeliveryReceipt::channel();

        let outcome = match self.inner.failing_publishes.lock().await.pop_front() {
            Some(reason) => DeliveryOutcome::Failed(reason),
            None => {
                let partition = self.inner.partition_for(key.as_ref());
                let offset = self
                    .inner
                    .append(
                        topic,
                        partition,
                        StoredRecord {
                            key,
                            value: Some(payload),
                        },
                    )
                    .await;
                DeliveryOutcome::Delivered { partition, offset }
            }
        };

        tokio::spawn(async move {
            let _ = sender.send(outcome);
        });
        Ok(receipt)
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), TransportError> {
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// Consumer half of a [`MemoryLog`], bound to one group
pub struct MemoryConsumer {
    inner: Arc<Inner>,
    group_id: String,
    topics: Vec<String>,
    eof_pending: HashSet<(String, i32)>,
    cursor: usize,
    closed: bool,
}

impl MemoryConsumer {
    async fn take_injected_error(&self) -> Option<TransportError> {
        self.inner
            .injected_errors
            .lock()
            .await
            .get_mut(&self.group_id)?
            .pop_front()
    }

    async fn next_record(&mut self) -> Option<Result<LogRecord, TransportError>> {
        let inner = Arc::clone(&self.inner);
        let topics = inner.topics.read().await;
        let assigned: Vec<(String, i32)> = self
            .topics
            .iter()
            .filter(|topic| topics.contains_key(*topic))
            .flat_map(|topic| (0..inner.partitions).map(move |p| (topic.clone(), p)))
            .collect();

        let mut committed = inner.committed.lock().await;
        for step in 0..assigned.len() {
            let idx = (self.cursor + step) % assigned.len();
            let (topic, partition) = &assigned[idx];
            let key = (self.group_id.clone(), topic.clone(), *partition);
            let position = committed.get(&key).copied().unwrap_or(0);

            let log = &topics[topic][*partition as usize];
            if let Some(stored) = log.get(position as usize) {
                committed.insert(key, position + 1);
                self.cursor = idx + 1;
                self.eof_pending.insert((topic.clone(), *partition));
                return Some(Ok(LogRecord {
                    topic: topic.clone(),
                    partition: *partition,
                    offset: position,
                    key: stored.key.clone(),
                    value: stored.value.clone(),
                }));
            }
        }

        let drained = self.eof_pending.iter().next().cloned()?;
        self.eof_pending.remove(&drained);
        let (topic, partition) = drained;
        let offset = committed
            .get(&(self.group_id.clone(), topic.clone(), partition))
            .copied()
            .unwrap_or(0);
        Some(Err(TransportError::partition_eof(LogPosition {
            topic,
            partition,
            offset,
        })))
    }
}

#[async_trait]
impl LogConsumer for MemoryConsumer {
    async fn subscribe(&mut self, topics: &[String]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::fatal("consumer is closed"));
        }
        self.topics = topics.to_vec();
        self.eof_pending.clear();
        self.cursor = 0;
        tracing::debug!(group_id = %self.group_id, topics = ?self.topics, "Subscribed");
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Option<Result<LogRecord, TransportError>> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.closed {
                return Some(Err(TransportError::fatal("consumer is closed")));
            }
            if let Some(error) = self.take_injected_error().await {
                return Some(Err(error));
            }
            if let Some(next) = self.next_record().await {
                return Some(next);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep((deadline - now).min(POLL_INTERVAL)).await;
        }
    }

    async fn close(&mut self) {
        self.closed = true;
        self.topics.clear();
        tracing::debug!(group_id = %self.group_id, "Consumer closed");
    }
}
