//! # Storefront Runtime
//!
//! Runtime implementation for the storefront engine.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Cancellation Registry**: Tracks timers so they can be stopped as a group
//!
//! ## Example
//!
//! ```ignore
//! use storefront_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! // Send an action
//! store.send(StorefrontAction::StartPromotions).await?;
//!
//! // Read state
//! let summary = store.state(|s| s.summary().clone()).await;
//! ```

use std::sync::Arc;
use storefront_core::{effect::Effect, reducer::Reducer};
use tokio::sync::RwLock;

/// Cancellation of running effects by id
pub mod cancellation;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use cancellation::CancellationRegistry;
pub use error::StoreError;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use storefront_runtime::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_poll_interval(Duration::from_millis(10));
/// assert_eq!(config.broadcast_capacity, 64);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for observers
    pub broadcast_capacity: usize,
    /// How often `shutdown` re-checks pending effects
    pub shutdown_poll_interval: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the shutdown poll interval
    #[must_use]
    pub const fn with_shutdown_poll_interval(mut self, interval: Duration) -> Self {
        self.shutdown_poll_interval = interval;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            shutdown_poll_interval: Duration::from_millis(100),
        }
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
///
/// Aborted tasks drop their future, so the counter is released on cancellation too.
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, CancellationRegistry, Duration, Effect,
        Ordering, Reducer, RwLock, StoreConfig, StoreError,
    };
    use std::future::Future;
    use storefront_core::effect::EffectId;
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer runs under the write lock, so
    ///    actions from timers and from callers never interleave)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        cancellations: CancellationRegistry,
        /// Actions produced by effects (timer ticks, futures), for observers.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: CancellationRegistry::new(),
                action_broadcast,
            }
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Cancels every registered (cancellable) effect, e.g. repeating timers
        /// 3. Waits for the remaining effects to complete (with timeout)
        ///
        /// Calling it again after a completed shutdown returns `Ok(())` immediately.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            // Stored before cancel_all so late spawns see it
            self.shutdown.store(true, Ordering::SeqCst);

            let cancelled = self.cancellations.cancel_all();
            if cancelled > 0 {
                tracing::debug!(cancelled, "Cancelled registered effects");
            }

            let start = tokio::time::Instant::now();

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(self.config.shutdown_poll_interval).await;
            }
        }

        /// Whether `shutdown` has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Releases the lock and starts the returned effects
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// `send()` returns once the state transition is applied; effects such as
        /// timers keep running in spawned tasks.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.actions.processed").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect, None);
            }

            Ok(())
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let total = store.state(|s| s.summary().discount.final_total).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Subscribe to actions produced by effects
        ///
        /// Every action fed back by a `Delay` or `Future` effect is broadcast
        /// before it reaches the reducer.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Number of live effects registered under a cancellation id
        #[must_use]
        pub fn running_effects(&self, id: EffectId) -> usize {
            self.cancellations.running(id)
        }

        /// Number of effects currently executing in spawned tasks
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Execute an effect
        ///
        /// `scope` is the cancellation id the effect was started under, if any.
        #[tracing::instrument(skip(self, effect), name = "execute_effect")]
        fn execute_effect(&self, effect: Effect<A>, scope: Option<EffectId>) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    let store = self.clone();
                    self.spawn_tracked(scope, async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.broadcast(&action);
                            if let Err(error) = store.send(action).await {
                                tracing::debug!(%error, "Dropped effect action");
                            }
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);

                    let store = self.clone();
                    self.spawn_tracked(scope, async move {
                        tokio::time::sleep(duration).await;
                        tracing::trace!("Effect::Delay completed, sending action");
                        store.broadcast(&action);
                        if let Err(error) = store.send(*action).await {
                            tracing::debug!(%error, "Dropped effect action");
                        }
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    for effect in effects {
                        self.execute_effect(effect, scope);
                    }
                },
                Effect::Cancellable { id, effect } => {
                    tracing::trace!(%id, "Executing Effect::Cancellable");
                    self.execute_effect(*effect, Some(id));
                },
                Effect::Cancel(id) => {
                    let cancelled = self.cancellations.cancel(id);
                    tracing::debug!(%id, cancelled, "Cancelled effects");
                    metrics::counter!("store.effects.cancelled").increment(cancelled as u64);
                },
            }
        }

        /// Spawn an effect task, counting it for shutdown and registering it
        /// under its cancellation scope
        fn spawn_tracked<F>(&self, scope: Option<EffectId>, task: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            // An action already inside `send` when shutdown began still
            // reaches here; its effects are dropped.
            if self.is_shutting_down() {
                tracing::debug!(?scope, "Store shutting down, effect not started");
                return;
            }

            match scope {
                None => {
                    let pending_guard = self.track_pending();
                    tokio::spawn(async move {
                        let _pending_guard = pending_guard;
                        task.await;
                    });
                },
                Some(id) => {
                    let registration = self.cancellations.reserve(id);
                    // A reservation made before `cancel_all` is aborted on
                    // attach; one made after must see the flag here.
                    if self.is_shutting_down() {
                        tracing::debug!(%id, "Store shutting down, effect not started");
                        return;
                    }
                    let pending_guard = self.track_pending();
                    let token = registration.token();
                    let handle = tokio::spawn(async move {
                        let _pending_guard = pending_guard;
                        let _registration = registration;
                        task.await;
                    });
                    self.cancellations.attach(id, token, handle.abort_handle());
                },
            }
        }

        fn track_pending(&self) -> AtomicCounterGuard {
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            AtomicCounterGuard(Arc::clone(&self.pending_effects))
        }

        /// Publish an effect-produced action to observers
        fn broadcast(&self, action: &A) {
            // No receivers is not an error
            let _ = self.action_broadcast.send(action.clone());
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: self.cancellations.clone(),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }

}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::effect::EffectId;
    use storefront_core::{SmallVec, cancel_all, delay, smallvec};

    const TICKER: EffectId = EffectId::new("ticker");

    #[derive(Debug, Clone)]
    struct Shelf {
        reserved: u32,
        ticks: u32,
    }

    #[derive(Debug, Clone)]
    enum ShelfAction {
        Reserve,
        Browse,
        ReserveAsync,
        ReserveAfterLeadTime,
        ReserveFromThreeSuppliers,
        StartTicker,
        Tick,
        StopTicker,
    }

    #[derive(Debug, Clone)]
    struct Supplier;

    #[derive(Debug, Clone)]
    struct ShelfReducer;

    impl Reducer for ShelfReducer {
        type State = Shelf;
        type Action = ShelfAction;
        type Environment = Supplier;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                ShelfAction::Reserve => {
                    state.reserved += 1;
                    smallvec![Effect::None]
                },
                ShelfAction::Browse => smallvec![Effect::None],
                ShelfAction::ReserveAsync => {
                    smallvec![Effect::Future(Box::pin(async { Some(ShelfAction::Reserve) }))]
                },
                ShelfAction::ReserveAfterLeadTime => smallvec![Effect::Delay {
                    duration: Duration::from_millis(10),
                    action: Box::new(ShelfAction::Reserve),
                }],
                ShelfAction::ReserveFromThreeSuppliers => smallvec![Effect::Parallel(vec![
                    Effect::Future(Box::pin(async { Some(ShelfAction::Reserve) })),
                    Effect::Future(Box::pin(async { Some(ShelfAction::Reserve) })),
                    Effect::Future(Box::pin(async { Some(ShelfAction::Reserve) })),
                ])],
                ShelfAction::StartTicker => smallvec![
                    Effect::Cancel(TICKER),
                    delay! { id: TICKER, after: Duration::from_secs(1), send: ShelfAction::Tick },
                ],
                ShelfAction::Tick => {
                    state.ticks += 1;
                    smallvec![delay! { id: TICKER, after: Duration::from_secs(1), send: ShelfAction::Tick }]
                },
                ShelfAction::StopTicker => smallvec![cancel_all![TICKER]],
            }
        }
    }

    fn new_store() -> Store<Shelf, ShelfAction, Supplier, ShelfReducer> {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        Store::new(Shelf { reserved: 0, ticks: 0 }, ShelfReducer, Supplier)
    }

    #[tokio::test]
    async fn test_send_reduces_in_order() {
        let store = new_store();

        let _ = store.send(ShelfAction::Reserve).await;
        let _ = store.send(ShelfAction::Browse).await;

        assert_eq!(store.state(|s| s.reserved).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_result_is_sent_back() {
        let store = new_store();

        let _ = store.send(ShelfAction::ReserveAsync).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(store.state(|s| s.reserved).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_fires_after_lead_time() {
        let store = new_store();

        let _ = store.send(ShelfAction::ReserveAfterLeadTime).await;
        assert_eq!(store.state(|s| s.reserved).await, 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.state(|s| s.reserved).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_futures_all_feed_back() {
        let store = new_store();

        let _ = store.send(ShelfAction::ReserveFromThreeSuppliers).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(store.state(|s| s.reserved).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_effect_actions_are_broadcast() {
        let store = new_store();
        let mut actions = store.subscribe_actions();

        let _ = store.send(ShelfAction::ReserveAfterLeadTime).await;

        let received = actions.recv().await;
        assert!(matches!(received, Ok(ShelfAction::Reserve)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_timer_runs_until_cancelled() {
        let store = new_store();

        let _ = store.send(ShelfAction::StartTicker).await;
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(store.state(|s| s.ticks).await, 3);

        let _ = store.send(ShelfAction::StopTicker).await;
        assert_eq!(store.running_effects(TICKER), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.state(|s| s.ticks).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_timer() {
        let store = new_store();

        let _ = store.send(ShelfAction::StartTicker).await;
        let _ = store.send(ShelfAction::StartTicker).await;
        let _ = store.send(ShelfAction::StartTicker).await;
        assert_eq!(store.running_effects(TICKER), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.state(|s| s.ticks).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_already_stopped() {
        let store = new_store();

        let _ = store.send(ShelfAction::StopTicker).await;
        let _ = store.send(ShelfAction::StopTicker).await;

        assert_eq!(store.running_effects(TICKER), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_timers_and_rejects_actions() -> Result<(), StoreError> {
        let store = new_store();
        let _ = store.send(ShelfAction::StartTicker).await;

        store.shutdown(Duration::from_secs(1)).await?;

        assert!(store.is_shutting_down());
        assert_eq!(store.pending_effects(), 0);
        assert!(matches!(
            store.send(ShelfAction::Reserve).await,
            Err(StoreError::ShutdownInProgress)
        ));

        // Idempotent
        store.shutdown(Duration::from_secs(1)).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_timeout() {
        let store = new_store();

        // An uncancellable delay keeps an effect pending past the timeout
        let _ = store.send(ShelfAction::ReserveAfterLeadTime).await;
        let result = store.shutdown(Duration::ZERO).await;

        assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
    }
}
