//! Promotional event scheduler.
//!
//! Two independent recurring timers mutate catalog prices:
//!
//! - **Flash sale**: picks one product uniformly at random from the whole
//!   catalog; applies only if it is in stock and not already on flash sale.
//! - **Suggested sale**: needs a last-selected product; takes the first product
//!   in catalog order that is not the last-selected one, is in stock and is
//!   not already suggested.
//!
//! Each timer fires for the first time after a random initial delay plus one
//! interval, then every interval. The timers themselves are
//! [`Effect`](storefront_core::effect::Effect) descriptions built by the
//! reducer; this module holds the selection rules and timing.

use crate::catalog::{Catalog, ProductId};
use crate::money::Rate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use storefront_core::effect::EffectId;
use storefront_core::environment::RandomSource;

/// Cancellation id of the flash sale timer
pub const FLASH_SALE_TIMER: EffectId = EffectId::new("flash-sale-timer");

/// Cancellation id of the suggested sale timer
pub const SUGGESTED_SALE_TIMER: EffectId = EffectId::new("suggested-sale-timer");

/// The two promotions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromotionKind {
    /// Random product, 20% off list price
    FlashSale,
    /// Product other than the last selection, 5% off current price
    SuggestedSale,
}

impl PromotionKind {
    /// Both kinds, in start order
    pub const ALL: [Self; 2] = [Self::FlashSale, Self::SuggestedSale];

    /// Cancellation id of this promotion's timer
    #[must_use]
    pub const fn timer_id(self) -> EffectId {
        match self {
            Self::FlashSale => FLASH_SALE_TIMER,
            Self::SuggestedSale => SUGGESTED_SALE_TIMER,
        }
    }
}

impl fmt::Display for PromotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlashSale => write!(f, "flash sale"),
            Self::SuggestedSale => write!(f, "suggested sale"),
        }
    }
}

/// Timing and rate of one promotion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSchedule {
    /// Upper bound of the random initial delay
    pub max_initial_delay: Duration,
    /// Time between ticks
    pub interval: Duration,
    /// Price reduction
    pub rate: Rate,
}

impl SaleSchedule {
    /// Delay before the first tick: a random share of the initial delay bound,
    /// then one interval
    #[must_use]
    pub fn first_delay(&self, random: &dyn RandomSource) -> Duration {
        let fraction = random.unit_fraction();
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.max_initial_delay.mul_f64(fraction) + self.interval
    }
}

/// Configuration of both promotions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionConfig {
    /// Flash sale timer
    pub flash_sale: SaleSchedule,
    /// Suggested sale timer
    pub suggested_sale: SaleSchedule,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            flash_sale: SaleSchedule {
                max_initial_delay: Duration::from_secs(10),
                interval: Duration::from_secs(30),
                rate: Rate::from_percent(20),
            },
            suggested_sale: SaleSchedule {
                max_initial_delay: Duration::from_secs(20),
                interval: Duration::from_secs(60),
                rate: Rate::from_percent(5),
            },
        }
    }
}

impl PromotionConfig {
    /// Schedule of one promotion
    #[must_use]
    pub const fn schedule(&self, kind: PromotionKind) -> &SaleSchedule {
        match kind {
            PromotionKind::FlashSale => &self.flash_sale,
            PromotionKind::SuggestedSale => &self.suggested_sale,
        }
    }
}

/// Whether the timers run, and which run a tick belongs to
///
/// Every start or stop bumps the generation, so a tick from an earlier run
/// (already in flight when the timers were stopped) is recognised and ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionStatus {
    running: bool,
    generation: u64,
}

impl PromotionStatus {
    /// Whether the timers are running
    #[must_use]
    pub const fn is_running(self) -> bool {
        self.running
    }

    /// Current generation
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }

    /// Whether a tick from `generation` should be applied
    #[must_use]
    pub const fn accepts(self, generation: u64) -> bool {
        self.running && self.generation == generation
    }

    /// Begins a new run, returning its generation
    pub(crate) const fn start(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.running = true;
        self.generation
    }

    /// Ends the current run
    pub(crate) const fn stop(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.running = false;
    }
}

/// Flash sale target: a uniformly random product, if eligible
#[must_use]
pub fn pick_flash_sale(catalog: &Catalog, random: &dyn RandomSource) -> Option<ProductId> {
    if catalog.is_empty() {
        return None;
    }
    let product = catalog.products().get(random.pick_index(catalog.len()))?;
    (!product.is_out_of_stock() && !product.on_flash_sale).then(|| product.id.clone())
}

/// Suggested sale target: first eligible product other than `last_selected`
#[must_use]
pub fn pick_suggested_sale(catalog: &Catalog, last_selected: Option<&ProductId>) -> Option<ProductId> {
    let last_selected = last_selected?;
    catalog
        .products()
        .iter()
        .find(|p| &p.id != last_selected && !p.is_out_of_stock() && !p.on_suggested_sale)
        .map(|p| p.id.clone())
}
