//! Durable usage window storage.
//!
//! A store must offer get-or-create under a lock scoped to one
//! [`WindowKey`]. Two keys never wait on each other.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::UsageResult;
use crate::window::{UsageWindowRecord, WindowKey};

pub use memory::MemoryWindowStore;

/// Exclusive hold on one usage window.
///
/// Dropping the guard without calling [`WindowGuard::commit`] releases the
/// lock and leaves the stored record untouched.
pub trait WindowGuard: Send {
    /// Stored record, `None` if the window has no record yet.
    fn record(&self) -> Option<&UsageWindowRecord>;

    /// Persist `record` for this window and release the lock.
    fn commit(self: Box<Self>, record: UsageWindowRecord) -> UsageResult<()>;
}

#[async_trait]
pub trait UsageWindowStore: Send + Sync {
    /// Lock the window, waiting at most `wait`.
    ///
    /// Fails with `UsageError::LockContention` when the wait runs out.
    async fn lock_window(&self, key: WindowKey, wait: Duration) -> UsageResult<Box<dyn WindowGuard>>;

    /// Read-only lookup. Waits while the window is locked; callers bound
    /// the wait themselves.
    async fn find(&self, key: WindowKey) -> UsageResult<Option<UsageWindowRecord>>;

    /// Delete records whose window starts before `cutoff`. Returns how many
    /// were removed. Windows currently locked by a caller are skipped.
    async fn delete_older_than(&self, cutoff: NaiveDate) -> UsageResult<usize>;
}
