//! Request-scoped tenant context.
//!
//! The tenant is stored in a tokio task-local slot. A slot only exists
//! inside [`TenantContext::scope`] (or [`TenantContext::sync_scope`]) and
//! is torn down when that future ends, however it ends. A worker thread
//! never carries a tenant from one request into the next.
//!
//! Spawned tasks and `spawn_blocking` closures start without a tenant.
//! Use [`TenantContext::bind`] / [`TenantContext::bind_blocking`] to hand
//! the current tenant over explicitly.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use tokio::task::futures::TaskLocalFuture;

use crate::tenant::TenantDescriptor;

type Slot = RefCell<Option<Arc<TenantDescriptor>>>;

tokio::task_local! {
    static CURRENT_TENANT: Slot;
}

/// Accessors for the tenant bound to the current execution.
pub struct TenantContext;

impl TenantContext {
    /// Run `fut` with `descriptor` bound. The binding ends with the future.
    pub fn scope<F>(descriptor: Arc<TenantDescriptor>, fut: F) -> TaskLocalFuture<Slot, F>
    where
        F: Future,
    {
        CURRENT_TENANT.scope(RefCell::new(Some(descriptor)), fut)
    }

    /// Synchronous counterpart of [`TenantContext::scope`].
    pub fn sync_scope<R>(descriptor: Arc<TenantDescriptor>, f: impl FnOnce() -> R) -> R {
        CURRENT_TENANT.sync_scope(RefCell::new(Some(descriptor)), f)
    }

    /// The tenant bound to this execution, if any.
    pub fn current() -> Option<Arc<TenantDescriptor>> {
        CURRENT_TENANT
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    /// Replace the tenant inside an active scope.
    ///
    /// Returns `false` (and binds nothing) when called outside a scope:
    /// without a scope there is nothing that would release the binding.
    pub fn set(descriptor: Arc<TenantDescriptor>) -> bool {
        let bound = CURRENT_TENANT
            .try_with(|slot| {
                *slot.borrow_mut() = Some(descriptor);
            })
            .is_ok();
        if !bound {
            tracing::warn!("TenantContext::set called outside a tenant scope; ignoring");
        }
        bound
    }

    /// Drop the binding for the rest of the current scope.
    pub fn clear() {
        let _ = CURRENT_TENANT.try_with(|slot| slot.borrow_mut().take());
    }

    /// Capture the caller's tenant now and re-bind it around `fut`.
    ///
    /// ```rust,no_run
    /// # use folio_core::TenantContext;
    /// # async fn audit() {}
    /// tokio::spawn(TenantContext::bind(async move { audit().await }));
    /// ```
    pub fn bind<F>(fut: F) -> TaskLocalFuture<Slot, F>
    where
        F: Future,
    {
        CURRENT_TENANT.scope(RefCell::new(Self::current()), fut)
    }

    /// Capture the caller's tenant now and re-bind it around a blocking closure.
    pub fn bind_blocking<R>(f: impl FnOnce() -> R) -> impl FnOnce() -> R {
        let captured = Self::current();
        move || CURRENT_TENANT.sync_scope(RefCell::new(captured), f)
    }
}
