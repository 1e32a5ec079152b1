//! The storefront state and its operations.
//!
//! [`StorefrontState`] is the single owner of the catalog, the cart and the
//! derived [`OrderSummary`]. Every operation either succeeds and recomputes
//! the summary, or fails and leaves the state exactly as it was. Stock moves
//! between the catalog and the cart in pairs, so for every product
//! `stock + quantity in cart` stays constant.

use crate::cart::Cart;
use crate::catalog::{Catalog, ProductId};
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};
use crate::promotions::{self, PromotionKind, PromotionStatus};
use crate::summary::OrderSummary;
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use storefront_core::environment::RandomSource;

/// Something the view should show as a blocking alert
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// A reservation ran into the stock limit
    InsufficientStock {
        /// Product name
        product: String,
        /// Units asked for
        requested: u32,
        /// Units that were available
        available: u32,
    },
    /// A flash sale started on a product
    FlashSale {
        /// Product name
        product: String,
        /// Percent off
        percent: u32,
    },
    /// A product is being suggested at a discount
    SuggestedSale {
        /// Product name
        product: String,
        /// Percent off
        percent: u32,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientStock {
                product,
                requested,
                available,
            } => write!(
                f,
                "Not enough stock for {product}: requested {requested}, {available} available."
            ),
            Self::FlashSale { product, percent } => {
                write!(f, "⚡Flash sale! {product} is {percent}% off!")
            },
            Self::SuggestedSale { product, percent } => {
                write!(f, "💝 How about {product}? Buy now for an extra {percent}% off!")
            },
        }
    }
}

/// Result of [`StorefrontState::add_item`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    /// Units asked for
    pub requested: u32,
    /// Units actually reserved
    pub added: u32,
}

impl AddOutcome {
    /// Whether fewer units were added than requested
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.added < self.requested
    }
}

/// Storefront state: catalog, cart, promotions and the derived summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontState {
    config: StorefrontConfig,
    catalog: Catalog,
    cart: Cart,
    last_selected: Option<ProductId>,
    promotions: PromotionStatus,
    notices: Vec<Notice>,
    is_tuesday: bool,
    summary: OrderSummary,
}

impl Default for StorefrontState {
    fn default() -> Self {
        Self::new(StorefrontConfig::default())
    }
}

impl StorefrontState {
    /// State over the standard catalog
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        Self::with_catalog(config, Catalog::standard())
    }

    /// State over a custom catalog
    #[must_use]
    pub fn with_catalog(config: StorefrontConfig, catalog: Catalog) -> Self {
        let mut state = Self {
            config,
            catalog,
            cart: Cart::new(),
            last_selected: None,
            promotions: PromotionStatus::default(),
            notices: Vec::new(),
            is_tuesday: false,
            summary: OrderSummary::default(),
        };
        state.recompute();
        state
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// The stock ledger
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The cart
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Product most recently selected or added
    #[must_use]
    pub const fn last_selected(&self) -> Option<&ProductId> {
        self.last_selected.as_ref()
    }

    /// Promotion timer status
    #[must_use]
    pub const fn promotions(&self) -> PromotionStatus {
        self.promotions
    }

    /// Notices not yet dismissed, oldest first
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Whether Tuesday rules are in effect
    #[must_use]
    pub const fn is_tuesday(&self) -> bool {
        self.is_tuesday
    }

    /// The current order summary (read-only snapshot)
    #[must_use]
    pub const fn order_summary(&self) -> &OrderSummary {
        &self.summary
    }

    /// Projects a fresh summary from the current state
    #[must_use]
    pub fn project(&self) -> OrderSummary {
        OrderSummary::project(
            &self.catalog,
            &self.cart,
            &self.config.discounts,
            &self.config.points,
            self.is_tuesday,
        )
    }

    fn recompute(&mut self) {
        self.summary = self.project();
    }

    /// This state with its calendar day taken from `now`
    ///
    /// Use when building a store so the first summary already reflects the
    /// current day.
    #[must_use]
    pub fn as_of(mut self, now: DateTime<Utc>) -> Self {
        self.refresh(now);
        self
    }

    /// Re-reads the calendar day from `now` and recomputes the summary
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.is_tuesday = now.weekday() == Weekday::Tue;
        self.recompute();
    }

    fn product_name(&self, product_id: &ProductId) -> String {
        self.catalog
            .find_product(product_id)
            .map_or_else(|| product_id.to_string(), |p| p.name.clone())
    }

    /// Reserves up to `quantity` units of a product
    ///
    /// If fewer units are in stock, all remaining units are added and the
    /// outcome reports the shortfall (a notice is recorded too).
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::InvalidQuantity`] for a zero quantity
    /// - [`StorefrontError::ProductNotFound`] for an unknown id
    /// - [`StorefrontError::InsufficientStock`] if the product has no stock left
    pub fn add_item(&mut self, product_id: &ProductId, quantity: u32) -> Result<AddOutcome> {
        if quantity == 0 {
            return Err(StorefrontError::InvalidQuantity(0));
        }
        let available = self.catalog.get(product_id)?.stock;
        if available == 0 {
            return Err(StorefrontError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available,
            });
        }

        let added = quantity.min(available);
        self.catalog.decrease_stock(product_id, added)?;
        let in_cart = self.cart.quantity_of(product_id);
        self.cart.set_quantity(product_id, in_cart + added);
        self.last_selected = Some(product_id.clone());

        let outcome = AddOutcome {
            requested: quantity,
            added,
        };
        if outcome.is_partial() {
            self.notices.push(Notice::InsufficientStock {
                product: self.product_name(product_id),
                requested: quantity,
                available,
            });
        }

        self.recompute();
        Ok(outcome)
    }

    /// Sets a line's quantity, reserving or releasing the difference
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::InvalidQuantity`] for zero (use
    ///   [`remove_item`](Self::remove_item) instead)
    /// - [`StorefrontError::ProductNotFound`] for an unknown id
    /// - [`StorefrontError::InsufficientStock`] if the increase exceeds stock
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(StorefrontError::InvalidQuantity(0));
        }
        self.catalog.get(product_id)?;

        let current = self.cart.quantity_of(product_id);
        if quantity > current {
            self.catalog.decrease_stock(product_id, quantity - current)?;
        } else {
            self.catalog.increase_stock(product_id, current - quantity)?;
        }
        self.cart.set_quantity(product_id, quantity);

        self.recompute();
        Ok(())
    }

    /// Adjusts a line by `delta` units (the ± buttons)
    ///
    /// A result of zero or less removes the line.
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::InvalidQuantity`] for a zero delta
    /// - [`StorefrontError::ProductNotFound`] for an unknown id
    /// - [`StorefrontError::InsufficientStock`] if an increase exceeds stock
    pub fn change_quantity(&mut self, product_id: &ProductId, delta: i32) -> Result<()> {
        if delta == 0 {
            return Err(StorefrontError::InvalidQuantity(0));
        }
        self.catalog.get(product_id)?;

        let current = i64::from(self.cart.quantity_of(product_id));
        let target = current + i64::from(delta);
        if target <= 0 {
            self.remove_item(product_id)?;
            return Ok(());
        }

        let target = u32::try_from(target).map_err(|_| StorefrontError::InvalidQuantity(target))?;
        self.update_quantity(product_id, target)
    }

    /// Removes a line, releasing its units back to stock
    ///
    /// Returns the number of units released (0 if the product was not in the cart).
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<u32> {
        self.catalog.get(product_id)?;

        let released = self.cart.quantity_of(product_id);
        self.catalog.increase_stock(product_id, released)?;
        self.cart.set_quantity(product_id, 0);

        self.recompute();
        Ok(released)
    }

    /// Empties the cart, releasing every unit back to stock
    pub fn clear_cart(&mut self) {
        for line in self.cart.drain() {
            if let Err(error) = self.catalog.increase_stock(&line.product_id, line.quantity) {
                tracing::warn!(%error, "Dropped cart line for unknown product");
            }
        }
        self.recompute();
    }

    /// Records the product the user selected
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn select_product(&mut self, product_id: &ProductId) -> Result<()> {
        self.catalog.get(product_id)?;
        self.last_selected = Some(product_id.clone());
        Ok(())
    }

    /// Puts a product on flash sale; `Ok(false)` if it is not eligible
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn apply_flash_sale(&mut self, product_id: &ProductId) -> Result<bool> {
        let rate = self.config.promotions.flash_sale.rate;
        let applied = self.catalog.apply_flash_sale(product_id, rate)?;
        if applied {
            self.recompute();
        }
        Ok(applied)
    }

    /// Puts a product on suggested sale; `Ok(false)` if it is not eligible
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn apply_suggested_sale(&mut self, product_id: &ProductId) -> Result<bool> {
        let rate = self.config.promotions.suggested_sale.rate;
        let applied = self.catalog.apply_suggested_sale(product_id, rate)?;
        if applied {
            self.recompute();
        }
        Ok(applied)
    }

    /// Restores a product's list price
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn remove_discount(&mut self, product_id: &ProductId) -> Result<()> {
        self.catalog.remove_discount(product_id)?;
        self.recompute();
        Ok(())
    }

    /// Restores list prices across the catalog
    pub fn remove_all_discounts(&mut self) {
        self.catalog.remove_all_discounts();
        self.recompute();
    }

    /// Runs one promotion tick, returning the product it applied to
    ///
    /// A tick with no eligible product changes nothing.
    pub fn run_promotion(&mut self, kind: PromotionKind, random: &dyn RandomSource) -> Option<ProductId> {
        let target = match kind {
            PromotionKind::FlashSale => promotions::pick_flash_sale(&self.catalog, random),
            PromotionKind::SuggestedSale => {
                promotions::pick_suggested_sale(&self.catalog, self.last_selected.as_ref())
            },
        }?;

        let applied = match kind {
            PromotionKind::FlashSale => self.apply_flash_sale(&target),
            PromotionKind::SuggestedSale => self.apply_suggested_sale(&target),
        };
        if !matches!(applied, Ok(true)) {
            return None;
        }

        let product = self.product_name(&target);
        let percent = self.config.promotions.schedule(kind).rate.percent();
        self.notices.push(match kind {
            PromotionKind::FlashSale => Notice::FlashSale { product, percent },
            PromotionKind::SuggestedSale => Notice::SuggestedSale { product, percent },
        });
        Some(target)
    }

    /// Marks the promotion timers as running under a new generation
    pub(crate) const fn start_promotions(&mut self) -> u64 {
        self.promotions.start()
    }

    /// Marks the promotion timers as stopped
    pub(crate) const fn stop_promotions(&mut self) {
        self.promotions.stop();
    }

    /// Clears every notice
    pub fn dismiss_notices(&mut self) {
        self.notices.clear();
    }

    /// Records a notice
    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ids;
    use crate::discount::DiscountKind;
    use crate::money::Money;
    use storefront_core::environment::Clock;
    use storefront_testing::{FixedClock, ScriptedRandom};

    fn id(raw: &str) -> ProductId {
        ProductId::new(raw)
    }

    fn stock_of(state: &StorefrontState, raw: &str) -> u32 {
        state.catalog().find_product(&id(raw)).map_or(0, |p| p.stock)
    }

    #[test]
    fn test_state_built_on_a_tuesday_reports_tuesday() {
        let clock = FixedClock::tuesday();
        let state = StorefrontState::default().as_of(clock.now());

        assert!(state.is_tuesday());
        assert!(state.order_summary().discount.is_tuesday);
        assert_eq!(state.order_summary(), &state.project());

        let wednesday = state.as_of(FixedClock::wednesday().now());
        assert!(!wednesday.order_summary().discount.is_tuesday);
    }

    #[test]
    fn test_add_item_reserves_stock() {
        let mut state = StorefrontState::default();

        let outcome = state.add_item(&id(ids::KEYBOARD), 3);

        assert_eq!(outcome, Ok(AddOutcome { requested: 3, added: 3 }));
        assert_eq!(stock_of(&state, ids::KEYBOARD), 47);
        assert_eq!(state.cart().quantity_of(&id(ids::KEYBOARD)), 3);
        assert_eq!(state.last_selected(), Some(&id(ids::KEYBOARD)));
        assert_eq!(state.order_summary().discount.subtotal, Money::new(30_000));
    }

    #[test]
    fn test_add_item_partial_fulfilment() {
        let mut state = StorefrontState::default();

        let outcome = state.add_item(&id(ids::SPEAKER), 12);

        assert_eq!(outcome, Ok(AddOutcome { requested: 12, added: 10 }));
        assert!(outcome.is_ok_and(|o| o.is_partial()));
        assert_eq!(stock_of(&state, ids::SPEAKER), 0);
        assert_eq!(
            state.notices(),
            [Notice::InsufficientStock {
                product: "Lo-Fi Coding Speaker".to_string(),
                requested: 12,
                available: 10,
            }]
        );
    }

    #[test]
    fn test_add_item_rejections_leave_state_untouched() {
        let mut state = StorefrontState::default();
        let before = state.clone();

        assert_eq!(
            state.add_item(&id(ids::LAPTOP_POUCH), 1),
            Err(StorefrontError::InsufficientStock {
                product_id: id(ids::LAPTOP_POUCH),
                requested: 1,
                available: 0,
            })
        );
        assert_eq!(state.add_item(&id(ids::KEYBOARD), 0), Err(StorefrontError::InvalidQuantity(0)));
        assert_eq!(state.add_item(&id("p9"), 1), Err(StorefrontError::ProductNotFound(id("p9"))));

        assert_eq!(state, before);
    }

    #[test]
    fn test_update_quantity_moves_difference() {
        let mut state = StorefrontState::default();
        let mouse = id(ids::MOUSE);
        assert!(state.add_item(&mouse, 5).is_ok());

        assert!(state.update_quantity(&mouse, 8).is_ok());
        assert_eq!(stock_of(&state, ids::MOUSE), 22);

        assert!(state.update_quantity(&mouse, 2).is_ok());
        assert_eq!(stock_of(&state, ids::MOUSE), 28);
        assert_eq!(state.cart().quantity_of(&mouse), 2);
    }

    #[test]
    fn test_update_quantity_beyond_stock_fails_whole() {
        let mut state = StorefrontState::default();
        let arm = id(ids::MONITOR_ARM);
        assert!(state.add_item(&arm, 5).is_ok());
        let before = state.clone();

        assert_eq!(
            state.update_quantity(&arm, 26),
            Err(StorefrontError::InsufficientStock {
                product_id: arm.clone(),
                requested: 21,
                available: 15,
            })
        );
        assert_eq!(state.update_quantity(&arm, 0), Err(StorefrontError::InvalidQuantity(0)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_change_quantity_to_zero_removes_line() {
        let mut state = StorefrontState::default();
        let keyboard = id(ids::KEYBOARD);
        assert!(state.add_item(&keyboard, 2).is_ok());

        assert!(state.change_quantity(&keyboard, 1).is_ok());
        assert_eq!(state.cart().quantity_of(&keyboard), 3);

        assert!(state.change_quantity(&keyboard, -5).is_ok());
        assert!(state.cart().is_empty());
        assert_eq!(stock_of(&state, ids::KEYBOARD), 50);
        assert_eq!(state.change_quantity(&keyboard, 0), Err(StorefrontError::InvalidQuantity(0)));
    }

    #[test]
    fn test_remove_and_clear_release_stock() {
        let mut state = StorefrontState::default();
        assert!(state.add_item(&id(ids::KEYBOARD), 4).is_ok());
        assert!(state.add_item(&id(ids::SPEAKER), 2).is_ok());

        assert_eq!(state.remove_item(&id(ids::KEYBOARD)), Ok(4));
        assert_eq!(state.remove_item(&id(ids::KEYBOARD)), Ok(0));
        assert_eq!(stock_of(&state, ids::KEYBOARD), 50);

        state.clear_cart();
        assert!(state.cart().is_empty());
        assert_eq!(state.catalog(), &Catalog::standard());
        assert!(!state.order_summary().should_show_points);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let mut state = StorefrontState::default();
        assert!(state.add_item(&id(ids::KEYBOARD), 10).is_ok());
        assert!(state.apply_flash_sale(&id(ids::MOUSE)).is_ok());

        assert_eq!(state.project(), state.project());
        assert_eq!(&state.project(), state.order_summary());
    }

    #[test]
    fn test_ten_keyboards_summary() {
        let mut state = StorefrontState::default();
        state.refresh(FixedClock::wednesday().now());
        assert!(state.add_item(&id(ids::KEYBOARD), 10).is_ok());

        let summary = state.order_summary();
        assert_eq!(summary.discount.subtotal, Money::new(100_000));
        assert_eq!(summary.final_total(), Money::new(90_000));
        assert_eq!(summary.points.base_points, 90);
        assert_eq!(summary.points.tuesday_bonus, 0);
        assert_eq!(summary.lines[0].discount.kind, DiscountKind::Individual);
        assert!(summary.should_show_points);
    }

    #[test]
    fn test_refresh_applies_tuesday() {
        let mut state = StorefrontState::default();
        assert!(state.add_item(&id(ids::KEYBOARD), 10).is_ok());

        state.refresh(FixedClock::tuesday().now());

        assert!(state.is_tuesday());
        let summary = state.order_summary();
        assert_eq!(summary.final_total(), Money::new(81_000));
        assert_eq!(summary.points.base_points, 81);
        assert_eq!(summary.points.tuesday_bonus, 81);
    }

    #[test]
    fn test_promotion_prices_flow_into_summary() {
        let mut state = StorefrontState::default();
        assert!(state.add_item(&id(ids::KEYBOARD), 1).is_ok());

        assert_eq!(state.apply_flash_sale(&id(ids::KEYBOARD)), Ok(true));
        assert_eq!(state.order_summary().discount.subtotal, Money::new(8_000));

        assert!(state.remove_discount(&id(ids::KEYBOARD)).is_ok());
        assert_eq!(state.order_summary().discount.subtotal, Money::new(10_000));
    }

    #[test]
    fn test_run_flash_sale_records_notice() {
        let mut state = StorefrontState::default();
        let random = ScriptedRandom::new().with_indices([1, 1]);

        assert_eq!(state.run_promotion(PromotionKind::FlashSale, &random), Some(id(ids::MOUSE)));
        assert_eq!(state.run_promotion(PromotionKind::FlashSale, &random), None);
        assert_eq!(
            state.notices(),
            [Notice::FlashSale {
                product: "Productivity Mouse".to_string(),
                percent: 20,
            }]
        );
        assert_eq!(
            state.notices()[0].to_string(),
            "⚡Flash sale! Productivity Mouse is 20% off!"
        );
    }

    #[test]
    fn test_run_suggested_sale_avoids_last_selected() {
        let mut state = StorefrontState::default();
        let random = ScriptedRandom::new();
        assert_eq!(state.run_promotion(PromotionKind::SuggestedSale, &random), None);

        assert!(state.select_product(&id(ids::KEYBOARD)).is_ok());
        assert_eq!(
            state.run_promotion(PromotionKind::SuggestedSale, &random),
            Some(id(ids::MOUSE))
        );
        let mouse = state.catalog().find_product(&id(ids::MOUSE)).cloned();
        assert!(mouse.is_some_and(|p| p.current_price == Money::new(19_000) && p.on_suggested_sale));
    }

    #[test]
    fn test_dismiss_notices() {
        let mut state = StorefrontState::default();
        let _ = state.add_item(&id(ids::SPEAKER), 11);
        assert_eq!(state.notices().len(), 1);

        state.dismiss_notices();
        assert!(state.notices().is_empty());
    }
}
