use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::record::Record;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1_000;

#[derive(Debug)]
struct Shared {
    queue: Mutex<VecDeque<Record>>,
    capacity: usize,
    dropped: AtomicU64,
}

/// Consumer half of the bounded ingestion channel.
///
/// The lock is only held for a push or a swap of the queue, so neither side
/// waits on the other doing real work.
#[derive(Debug)]
pub struct IngestQueue {
    shared: Arc<Shared>,
}

/// Producer half. Cheap to clone; every feed thread holds one.
#[derive(Debug, Clone)]
pub struct IngestSender {
    shared: Arc<Shared>,
}

impl IngestQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    pub fn sender(&self) -> IngestSender {
        IngestSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Takes every pending record in arrival order.
    pub fn drain_all(&self) -> Vec<Record> {
        let pending = {
            let mut queue = self.shared.queue.lock();
            if queue.is_empty() {
                return Vec::new();
            }
            std::mem::replace(&mut *queue, VecDeque::with_capacity(self.shared.capacity))
        };
        pending.into()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Records discarded because the queue was full when they arrived.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl IngestSender {
    /// Enqueues without blocking; evicts the oldest undrained record when full.
    pub fn push(&self, record: Record) {
        let mut queue = self.shared.queue.lock();
        if queue.len() >= self.shared.capacity {
            let _ = queue.pop_front();
            let total = self.shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if total.is_power_of_two() {
                tracing::debug!(dropped = total, "ingest queue full, dropping oldest records");
            }
        }
        queue.push_back(record);
    }
}
