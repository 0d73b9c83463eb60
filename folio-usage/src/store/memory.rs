use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{UsageWindowStore, WindowGuard};
use crate::error::{UsageError, UsageResult};
use crate::window::{UsageWindowRecord, WindowKey};

type Slot = Arc<Mutex<Option<UsageWindowRecord>>>;

/// In-memory usage store: one async mutex per (tenant, window) key.
///
/// A slot is created on first lock and removed by
/// [`UsageWindowStore::delete_older_than`] once it is expired or empty and
/// nobody holds or awaits it.
#[derive(Default)]
pub struct MemoryWindowStore {
    slots: DashMap<WindowKey, Slot>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` as-is, replacing whatever its window held.
    ///
    /// Fails if the window is currently locked.
    pub fn insert(&self, record: UsageWindowRecord) -> UsageResult<()> {
        let slot = self.slot(record.key());
        let mut stored = slot.try_lock().map_err(|_| {
            UsageError::Store(format!(
                "usage window {} for tenant {} is locked",
                record.window_start, record.tenant_id
            ))
        })?;
        *stored = Some(record);
        Ok(())
    }

    /// Number of lock slots currently tracked, including empty ones.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, key: WindowKey) -> Slot {
        if let Some(slot) = self.slots.get(&key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(key).or_default().value())
    }
}

enum Sweep {
    Expired,
    Idle,
}

/// Whether an unreferenced, unlocked slot can go, and why.
fn sweepable(key: &WindowKey, slot: &Slot, cutoff: NaiveDate) -> Option<Sweep> {
    if Arc::strong_count(slot) > 1 {
        return None;
    }
    let stored = slot.try_lock().ok()?;
    match stored.as_ref() {
        Some(_) if key.window_start < cutoff => Some(Sweep::Expired),
        Some(_) => None,
        None => Some(Sweep::Idle),
    }
}

struct MemoryWindowGuard {
    key: WindowKey,
    guard: OwnedMutexGuard<Option<UsageWindowRecord>>,
}

impl WindowGuard for MemoryWindowGuard {
    fn record(&self) -> Option<&UsageWindowRecord> {
        self.guard.as_ref()
    }

    fn commit(self: Box<Self>, record: UsageWindowRecord) -> UsageResult<()> {
        let MemoryWindowGuard { key, mut guard } = *self;
        if record.key() != key {
            return Err(UsageError::Store(format!(
                "record for window {} of tenant {} committed under window {} of tenant {}",
                record.window_start, record.tenant_id, key.window_start, key.tenant_id
            )));
        }
        *guard = Some(record);
        Ok(())
    }
}

#[async_trait]
impl UsageWindowStore for MemoryWindowStore {
    async fn lock_window(&self, key: WindowKey, wait: Duration) -> UsageResult<Box<dyn WindowGuard>> {
        let slot = self.slot(key);
        let started = Instant::now();
        match tokio::time::timeout(wait, slot.lock_owned()).await {
            Ok(guard) => Ok(Box::new(MemoryWindowGuard { key, guard })),
            Err(_) => Err(UsageError::LockContention {
                tenant_id: key.tenant_id,
                window_start: key.window_start,
                waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn find(&self, key: WindowKey) -> UsageResult<Option<UsageWindowRecord>> {
        let slot = self.slots.get(&key).map(|entry| Arc::clone(entry.value()));
        match slot {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(None),
        }
    }

    async fn delete_older_than(&self, cutoff: NaiveDate) -> UsageResult<usize> {
        // Read-only pass first; live lookups only need shard read locks.
        let candidates: Vec<WindowKey> = self
            .slots
            .iter()
            .filter(|entry| sweepable(entry.key(), entry.value(), cutoff).is_some())
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        let mut evicted = 0;
        for key in candidates {
            // Re-checked under the key's shard lock: the slot may have been
            // picked up since the scan.
            let mut outcome = None;
            self.slots.remove_if(&key, |key, slot| {
                outcome = sweepable(key, slot, cutoff);
                outcome.is_some()
            });
            match outcome {
                Some(Sweep::Expired) => removed += 1,
                Some(Sweep::Idle) => evicted += 1,
                None => {}
            }
        }

        if evicted > 0 {
            debug!("Evicted {} idle usage window lock slot(s)", evicted);
        }
        Ok(removed)
    }
}
