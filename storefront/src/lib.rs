//! # Storefront
//!
//! Pricing, stock and loyalty engine for a five-product storefront cart.
//!
//! The engine:
//! - keeps authoritative stock levels (units are reserved when they enter the
//!   cart and released when they leave),
//! - resolves per-line, bulk and Tuesday discounts,
//! - awards loyalty points from the discounted total plus bonus rules,
//! - runs two randomized promotion timers that lower catalog prices.
//!
//! ## Architecture
//!
//! All state lives in one [`StorefrontState`]. Inputs are
//! [`StorefrontAction`]s applied by [`StorefrontReducer`]; promotion timers are
//! returned as cancellable effects and executed by the runtime `Store`. The
//! [`OrderSummary`] read model is recomputed after every mutation.
//!
//! ## Example
//!
//! ```no_run
//! use storefront::{ProductId, StorefrontAction, StorefrontEnvironment, StorefrontReducer, StorefrontState};
//! use storefront_runtime::Store;
//!
//! # async fn example() -> Result<(), storefront_runtime::StoreError> {
//! let env = StorefrontEnvironment::production();
//! let state = StorefrontState::default().as_of(env.clock.now());
//! let store = Store::new(state, StorefrontReducer::new(), env);
//!
//! store
//!     .send(StorefrontAction::AddItem { product_id: ProductId::new("p1"), quantity: 10 })
//!     .await?;
//! let total = store.state(|s| s.order_summary().final_total()).await;
//! println!("Total: {total}");
//! # Ok(())
//! # }
//! ```

pub mod cart;
pub mod catalog;
pub mod config;
pub mod discount;
pub mod error;
pub mod money;
pub mod points;
pub mod promotions;
pub mod reducer;
pub mod state;
pub mod summary;

pub use cart::{Cart, CartLine};
pub use catalog::{Catalog, Product, ProductId, ProductOption, StockReport};
pub use config::StorefrontConfig;
pub use discount::{DiscountPolicy, DiscountSummary};
pub use error::StorefrontError;
pub use money::{Money, Rate};
pub use points::{PointsCalculation, PointsPolicy};
pub use promotions::{PromotionConfig, PromotionKind};
pub use reducer::{StorefrontAction, StorefrontEnvironment, StorefrontReducer};
pub use state::{AddOutcome, Notice, StorefrontState};
pub use summary::OrderSummary;

/// Type alias for the storefront store
pub type StorefrontStore =
    storefront_runtime::Store<StorefrontState, StorefrontAction, StorefrontEnvironment, StorefrontReducer>;
