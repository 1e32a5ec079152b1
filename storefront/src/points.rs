//! Loyalty points engine.
//!
//! Points are computed from the *discounted* final total plus independent
//! bonus rules. Every component that contributes appears in `details`, in the
//! fixed order base, Tuesday, set, full set, quantity.

use crate::cart::Cart;
use crate::catalog::{ProductId, ids};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Bonus awarded once the cart holds `threshold` units
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityTier {
    /// Units required
    pub threshold: u32,
    /// Bonus points
    pub bonus: u64,
}

/// Point rates and bonus rules
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsPolicy {
    /// Won spent per base point (1000 won = 1 point, i.e. a 0.1% rate)
    pub won_per_point: i64,
    /// Base points are multiplied by this on Tuesdays
    pub tuesday_multiplier: u64,
    /// Products that make up the basic set
    pub set_products: Vec<ProductId>,
    /// Bonus for holding the whole basic set
    pub set_bonus: u64,
    /// Product that completes the full set
    pub full_set_product: ProductId,
    /// Extra bonus for the full set
    pub full_set_bonus: u64,
    /// Quantity tiers; only the highest one reached applies
    pub quantity_tiers: Vec<QuantityTier>,
}

impl Default for PointsPolicy {
    fn default() -> Self {
        Self {
            won_per_point: 1_000,
            tuesday_multiplier: 2,
            set_products: vec![ProductId::new(ids::KEYBOARD), ProductId::new(ids::MOUSE)],
            set_bonus: 50,
            full_set_product: ProductId::new(ids::MONITOR_ARM),
            full_set_bonus: 100,
            quantity_tiers: vec![
                QuantityTier { threshold: 10, bonus: 20 },
                QuantityTier { threshold: 20, bonus: 50 },
                QuantityTier { threshold: 30, bonus: 100 },
            ],
        }
    }
}

/// Point award with its breakdown
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsCalculation {
    /// Points from the final total
    pub base_points: u64,
    /// Extra points on Tuesdays
    pub tuesday_bonus: u64,
    /// Basic set bonus
    pub set_bonus: u64,
    /// Full set bonus
    pub full_set_bonus: u64,
    /// Quantity tier bonus
    pub quantity_bonus: u64,
    /// Sum of every component
    pub total_points: u64,
    /// Human-readable components
    pub details: Vec<String>,
}

impl PointsCalculation {
    /// Display line, e.g. `Loyalty points: 180p (Base: 90p, Tuesday 2x)`
    #[must_use]
    pub fn display(&self) -> String {
        if self.total_points == 0 {
            return "Loyalty points: 0p".to_string();
        }
        format!(
            "Loyalty points: {}p ({})",
            self.total_points,
            self.details.join(", ")
        )
    }
}

impl PointsPolicy {
    /// Points for a purchase of `final_total`
    #[must_use]
    pub fn calculate(&self, final_total: Money, cart: &Cart, is_tuesday: bool) -> PointsCalculation {
        let mut points = PointsCalculation::default();

        let won_per_point = self.won_per_point.max(1);
        points.base_points = u64::try_from(final_total.won().div_euclid(won_per_point)).unwrap_or(0);
        if points.base_points > 0 {
            points.details.push(format!("Base: {}p", points.base_points));
        }

        if is_tuesday && points.base_points > 0 && self.tuesday_multiplier > 1 {
            points.tuesday_bonus = points.base_points * (self.tuesday_multiplier - 1);
            points.details.push(format!("Tuesday {}x", self.tuesday_multiplier));
        }

        let has_set = !self.set_products.is_empty() && self.set_products.iter().all(|id| cart.contains(id));
        if has_set {
            points.set_bonus = self.set_bonus;
            points.details.push(format!("Keyboard+mouse set +{}p", self.set_bonus));

            if cart.contains(&self.full_set_product) {
                points.full_set_bonus = self.full_set_bonus;
                points.details.push(format!("Full set purchase +{}p", self.full_set_bonus));
            }
        }

        let total_quantity = cart.total_quantity();
        if let Some(tier) = self
            .quantity_tiers
            .iter()
            .filter(|tier| total_quantity >= tier.threshold)
            .max_by_key(|tier| tier.threshold)
        {
            points.quantity_bonus = tier.bonus;
            points
                .details
                .push(format!("Bulk purchase ({}+) +{}p", tier.threshold, tier.bonus));
        }

        points.total_points = points.base_points
            + points.tuesday_bonus
            + points.set_bonus
            + points.full_set_bonus
            + points.quantity_bonus;
        points
    }
}
