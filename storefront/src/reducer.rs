//! Storefront reducer.
//!
//! Every input to the engine (cart edits from the view, promotion timer ticks)
//! is a [`StorefrontAction`]. The reducer applies it to [`StorefrontState`] and
//! returns the timer effects the runtime should start or cancel. Rejected
//! actions are logged, leave state untouched and return no effects.

use crate::catalog::ProductId;
use crate::error::StorefrontError;
use crate::promotions::{FLASH_SALE_TIMER, PromotionKind, SUGGESTED_SALE_TIMER};
use crate::state::{Notice, StorefrontState};
use std::sync::Arc;
use std::time::Duration;
use storefront_core::effect::Effect;
use storefront_core::environment::{Clock, RandomSource, SystemClock, ThreadRandom};
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, cancel_all, delay, smallvec};

/// Inputs to the storefront
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorefrontAction {
    /// Reserve units of a product (partially if stock runs short)
    AddItem {
        /// Product to add
        product_id: ProductId,
        /// Units requested
        quantity: u32,
    },
    /// Set a line to an exact quantity
    UpdateQuantity {
        /// Product in the cart
        product_id: ProductId,
        /// New quantity (must be positive)
        quantity: u32,
    },
    /// Adjust a line by a signed amount; reaching zero removes it
    ChangeQuantity {
        /// Product in the cart
        product_id: ProductId,
        /// Units to add (positive) or take away (negative)
        delta: i32,
    },
    /// Remove a line
    RemoveItem {
        /// Product to remove
        product_id: ProductId,
    },
    /// Empty the cart
    ClearCart,
    /// Record the product currently selected in the view
    SelectProduct {
        /// Selected product
        product_id: ProductId,
    },
    /// Put a product on flash sale
    ApplyFlashSale {
        /// Product to discount
        product_id: ProductId,
    },
    /// Put a product on suggested sale
    ApplySuggestedSale {
        /// Product to discount
        product_id: ProductId,
    },
    /// Restore a product's list price
    RemoveDiscount {
        /// Product to reset
        product_id: ProductId,
    },
    /// Restore every list price
    RemoveAllDiscounts,
    /// Start (or restart) both promotion timers
    StartPromotions,
    /// Stop both promotion timers
    StopPromotions,
    /// A promotion timer fired
    PromotionTick {
        /// Which promotion
        kind: PromotionKind,
        /// Timer run the tick belongs to
        generation: u64,
    },
    /// Recompute the summary (e.g. after the calendar day changed)
    Refresh,
    /// Clear all notices
    DismissNotices,
}

/// Environment for the storefront
#[derive(Clone)]
pub struct StorefrontEnvironment {
    /// Clock deciding the calendar day
    pub clock: Arc<dyn Clock>,
    /// Randomness for promotion delays and picks
    pub random: Arc<dyn RandomSource>,
}

impl StorefrontEnvironment {
    /// Creates a new storefront environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self { clock, random }
    }

    /// System clock and thread-local RNG
    #[must_use]
    pub fn production() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(ThreadRandom))
    }
}

/// Reducer implementing the storefront's business logic
#[derive(Clone, Copy, Debug, Default)]
pub struct StorefrontReducer;

impl StorefrontReducer {
    /// Creates a new storefront reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Timer effect for the next tick of `kind`
    fn schedule_tick(
        kind: PromotionKind,
        generation: u64,
        after: Duration,
    ) -> Effect<StorefrontAction> {
        delay! {
            id: kind.timer_id(),
            after: after,
            send: StorefrontAction::PromotionTick { kind, generation }
        }
    }

    fn start_promotions(
        state: &mut StorefrontState,
        env: &StorefrontEnvironment,
    ) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        let restarting = state.promotions().is_running();
        let generation = state.start_promotions();
        tracing::info!(generation, restarting, "Promotions started");

        let mut effects: SmallVec<[Effect<StorefrontAction>; 4]> =
            smallvec![cancel_all![FLASH_SALE_TIMER, SUGGESTED_SALE_TIMER]];
        for kind in PromotionKind::ALL {
            let schedule = state.config().promotions.schedule(kind);
            let first = schedule.first_delay(env.random.as_ref());
            tracing::debug!(%kind, ?first, "Scheduling first promotion tick");
            effects.push(Self::schedule_tick(kind, generation, first));
        }
        effects
    }

    fn promotion_tick(
        state: &mut StorefrontState,
        kind: PromotionKind,
        generation: u64,
        env: &StorefrontEnvironment,
    ) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        if !state.promotions().accepts(generation) {
            tracing::debug!(%kind, generation, "Ignoring stale promotion tick");
            return smallvec![Effect::None];
        }

        state.refresh(env.clock.now());
        match state.run_promotion(kind, env.random.as_ref()) {
            Some(product_id) => tracing::info!(%kind, %product_id, "Promotion applied"),
            None => tracing::debug!(%kind, "No eligible product for promotion"),
        }

        let interval = state.config().promotions.schedule(kind).interval;
        smallvec![Self::schedule_tick(kind, generation, interval)]
    }

    /// Logs a rejected action, surfacing stock shortages as a notice
    fn reject(state: &mut StorefrontState, action: &str, error: &StorefrontError) {
        tracing::warn!("{action} rejected: {error}");
        if let StorefrontError::InsufficientStock {
            product_id,
            requested,
            available,
        } = error
        {
            let product = state
                .catalog()
                .find_product(product_id)
                .map_or_else(|| product_id.to_string(), |p| p.name.clone());
            state.push_notice(Notice::InsufficientStock {
                product,
                requested: *requested,
                available: *available,
            });
        }
    }

    /// Applies a cart or catalog operation, then refreshes the summary on success
    fn apply<T>(
        state: &mut StorefrontState,
        env: &StorefrontEnvironment,
        action: &str,
        operation: impl FnOnce(&mut StorefrontState) -> Result<T, StorefrontError>,
    ) -> Option<T> {
        match operation(state) {
            Ok(value) => {
                state.refresh(env.clock.now());
                Some(value)
            },
            Err(error) => {
                Self::reject(state, action, &error);
                None
            },
        }
    }
}

impl Reducer for StorefrontReducer {
    type State = StorefrontState;
    type Action = StorefrontAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            StorefrontAction::AddItem {
                product_id,
                quantity,
            } => {
                if let Some(outcome) = Self::apply(state, env, "AddItem", |s| s.add_item(&product_id, quantity)) {
                    tracing::debug!(%product_id, requested = outcome.requested, added = outcome.added, "Item added");
                }
            },
            StorefrontAction::UpdateQuantity {
                product_id,
                quantity,
            } => {
                Self::apply(state, env, "UpdateQuantity", |s| {
                    s.update_quantity(&product_id, quantity)
                });
            },
            StorefrontAction::ChangeQuantity { product_id, delta } => {
                Self::apply(state, env, "ChangeQuantity", |s| {
                    s.change_quantity(&product_id, delta)
                });
            },
            StorefrontAction::RemoveItem { product_id } => {
                Self::apply(state, env, "RemoveItem", |s| s.remove_item(&product_id));
            },
            StorefrontAction::ClearCart => {
                state.clear_cart();
                state.refresh(env.clock.now());
            },
            StorefrontAction::SelectProduct { product_id } => {
                Self::apply(state, env, "SelectProduct", |s| s.select_product(&product_id));
            },
            StorefrontAction::ApplyFlashSale { product_id } => {
                Self::apply(state, env, "ApplyFlashSale", |s| s.apply_flash_sale(&product_id));
            },
            StorefrontAction::ApplySuggestedSale { product_id } => {
                Self::apply(state, env, "ApplySuggestedSale", |s| {
                    s.apply_suggested_sale(&product_id)
                });
            },
            StorefrontAction::RemoveDiscount { product_id } => {
                Self::apply(state, env, "RemoveDiscount", |s| s.remove_discount(&product_id));
            },
            StorefrontAction::RemoveAllDiscounts => {
                state.remove_all_discounts();
                state.refresh(env.clock.now());
            },
            StorefrontAction::StartPromotions => return Self::start_promotions(state, env),
            StorefrontAction::StopPromotions => {
                state.stop_promotions();
                tracing::info!("Promotions stopped");
                return smallvec![cancel_all![FLASH_SALE_TIMER, SUGGESTED_SALE_TIMER]];
            },
            StorefrontAction::PromotionTick { kind, generation } => {
                return Self::promotion_tick(state, kind, generation, env);
            },
            StorefrontAction::Refresh => state.refresh(env.clock.now()),
            StorefrontAction::DismissNotices => state.dismiss_notices(),
        }

        smallvec![Effect::None]
    }
}
