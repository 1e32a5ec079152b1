//! Registry of running effects that can be cancelled by id.
//!
//! Every task spawned under [`Effect::Cancellable`](storefront_core::effect::Effect::Cancellable)
//! holds a [`Registration`]. The registration removes itself from the registry
//! when the task finishes (or is aborted), so the registry only ever holds
//! tasks that are still alive.
//!
//! # Example
//!
//! ```rust
//! use storefront_core::effect::EffectId;
//! use storefront_runtime::cancellation::CancellationRegistry;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! const TIMER: EffectId = EffectId::new("timer");
//!
//! let registry = CancellationRegistry::new();
//! let registration = registry.reserve(TIMER);
//! let token = registration.token();
//! let handle = tokio::spawn(async move {
//!     let _registration = registration;
//!     tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
//! });
//! registry.attach(TIMER, token, handle.abort_handle());
//!
//! assert_eq!(registry.cancel(TIMER), 1);
//! assert!(handle.await.is_err_and(|e| e.is_cancelled()));
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storefront_core::effect::EffectId;
use tokio::task::AbortHandle;

type Slots = HashMap<EffectId, HashMap<u64, Option<AbortHandle>>>;

/// Tracks abort handles of running effects, grouped by [`EffectId`]
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    slots: Arc<Mutex<Slots>>,
    next_token: Arc<AtomicU64>,
}

impl CancellationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // The map stays consistent even if a holder panicked mid-update.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a slot under `id` for a task about to be spawned
    ///
    /// Move the returned [`Registration`] into the task; dropping it frees the slot.
    #[must_use]
    pub fn reserve(&self, id: EffectId) -> Registration {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.lock().entry(id).or_default().insert(token, None);

        Registration {
            registry: self.clone(),
            id,
            token,
        }
    }

    /// Attach the spawned task's abort handle to its reserved slot
    ///
    /// If the slot is gone the id was cancelled between reservation and spawn
    /// (or the task already finished), so the task is aborted right away.
    pub fn attach(&self, id: EffectId, token: u64, handle: AbortHandle) {
        let mut slots = self.lock();
        match slots.get_mut(&id).and_then(|tasks| tasks.get_mut(&token)) {
            Some(slot) => *slot = Some(handle),
            None => {
                drop(slots);
                handle.abort();
            },
        }
    }

    /// Abort every task registered under `id`
    ///
    /// Returns the number of tasks that were aborted. Cancelling an unknown id
    /// returns 0.
    pub fn cancel(&self, id: EffectId) -> usize {
        let removed = self.lock().remove(&id);
        let Some(tasks) = removed else {
            return 0;
        };

        let mut aborted = 0;
        for handle in tasks.into_values().flatten() {
            handle.abort();
            aborted += 1;
        }
        aborted
    }

    /// Abort every registered task
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<EffectId> = self.lock().keys().copied().collect();
        ids.into_iter().map(|id| self.cancel(id)).sum()
    }

    /// Number of live tasks registered under `id`
    #[must_use]
    pub fn running(&self, id: EffectId) -> usize {
        self.lock().get(&id).map_or(0, HashMap::len)
    }

    fn release(&self, id: EffectId, token: u64) {
        let mut slots = self.lock();
        if let Some(tasks) = slots.get_mut(&id) {
            tasks.remove(&token);
            if tasks.is_empty() {
                slots.remove(&id);
            }
        }
    }
}

/// Slot held by a running cancellable task
///
/// Dropping it deregisters the task.
#[derive(Debug)]
pub struct Registration {
    registry: CancellationRegistry,
    id: EffectId,
    token: u64,
}

impl Registration {
    /// Token identifying this slot, passed to [`CancellationRegistry::attach`]
    #[must_use]
    pub const fn token(&self) -> u64 {
        self.token
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.release(self.id, self.token);
    }
}
