//! Discount engine.
//!
//! Discounts are resolved in two steps:
//!
//! 1. Per line, an individual rate from the policy table applies once the line
//!    reaches the individual threshold. When the whole cart reaches the bulk
//!    threshold, a flat bulk rate on the subtotal replaces *all* individual
//!    discounts (a hard override, not the larger of the two).
//! 2. On Tuesdays a further rate comes off whatever step 1 produced, as long as
//!    that total is positive.
//!
//! Promotional prices are already part of each line total.

use crate::catalog::{ProductId, ids};
use crate::money::{Money, Rate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rates and thresholds of the discount engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Per-product rate applied at `individual_threshold` units
    pub individual_rates: BTreeMap<ProductId, Rate>,
    /// Line quantity that unlocks the individual rate
    pub individual_threshold: u32,
    /// Cart quantity that unlocks the bulk rate
    pub bulk_threshold: u32,
    /// Rate on the whole subtotal in bulk
    pub bulk_rate: Rate,
    /// Extra rate taken off on Tuesdays
    pub tuesday_rate: Rate,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        let individual_rates = [
            (ids::KEYBOARD, 10),
            (ids::MOUSE, 15),
            (ids::MONITOR_ARM, 20),
            (ids::LAPTOP_POUCH, 5),
            (ids::SPEAKER, 25),
        ]
        .into_iter()
        .map(|(id, percent)| (ProductId::new(id), Rate::from_percent(percent)))
        .collect();

        Self {
            individual_rates,
            individual_threshold: 10,
            bulk_threshold: 30,
            bulk_rate: Rate::from_percent(25),
            tuesday_rate: Rate::from_percent(10),
        }
    }
}

/// Which discount a line received
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Per-product rate
    Individual,
    /// Cart-wide bulk rate
    Bulk,
    /// No discount
    None,
}

/// Discount on one line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiscount {
    /// Rate applied
    pub rate: Rate,
    /// Amount taken off the line total
    pub amount: Money,
    /// Discount kind
    pub kind: DiscountKind,
}

impl LineDiscount {
    /// No discount
    pub const NONE: Self = Self {
        rate: Rate::ZERO,
        amount: Money::ZERO,
        kind: DiscountKind::None,
    };
}

/// An individual discount that was actually applied
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    /// Product name
    pub name: String,
    /// Whole percent
    pub rate_percent: u32,
}

/// Input line for the discount engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricedLine {
    /// Product id
    pub product_id: ProductId,
    /// Product name
    pub name: String,
    /// Units in the line
    pub quantity: u32,
    /// Current unit price times quantity
    pub line_total: Money,
}

/// Cart-level discount result
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSummary {
    /// Sum of line totals at current prices
    pub subtotal: Money,
    /// `subtotal - final_total`
    pub total_discount: Money,
    /// Amount payable
    pub final_total: Money,
    /// Amount taken by the Tuesday step
    pub tuesday_discount: Money,
    /// Individual discounts applied, in cart order
    pub per_line_discounts: Vec<AppliedDiscount>,
    /// Whether the Tuesday rule was in effect
    pub is_tuesday: bool,
    /// Whether the bulk rate replaced individual discounts
    pub has_bulk_discount: bool,
}

impl DiscountSummary {
    /// Share of the subtotal saved, between 0 and 1
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // won amounts are far below 2^52
    pub fn savings_rate(&self) -> f64 {
        if self.subtotal.is_positive() {
            self.total_discount.won() as f64 / self.subtotal.won() as f64
        } else {
            0.0
        }
    }
}

/// Per-line results plus the cart summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscountOutcome {
    /// One entry per input line, same order
    pub lines: Vec<LineDiscount>,
    /// Cart totals
    pub summary: DiscountSummary,
}

impl DiscountPolicy {
    /// Individual rate for a line of `quantity` units (0% below the threshold)
    #[must_use]
    pub fn individual_rate(&self, product_id: &ProductId, quantity: u32) -> Rate {
        if quantity < self.individual_threshold {
            return Rate::ZERO;
        }
        self.individual_rates
            .get(product_id)
            .copied()
            .unwrap_or(Rate::ZERO)
    }

    /// Whether `total_quantity` reaches the bulk threshold
    #[must_use]
    pub const fn is_bulk(&self, total_quantity: u32) -> bool {
        total_quantity >= self.bulk_threshold
    }

    /// Resolves every discount for the cart
    ///
    /// An empty cart yields an all-zero summary.
    #[must_use]
    pub fn evaluate(&self, lines: &[PricedLine], is_tuesday: bool) -> DiscountOutcome {
        let subtotal: Money = lines.iter().map(|line| line.line_total).sum();
        let total_quantity: u32 = lines.iter().map(|line| line.quantity).sum();
        let has_bulk_discount = self.is_bulk(total_quantity);

        let mut per_line_discounts = Vec::new();
        let mut line_discounts: Vec<LineDiscount> = lines
            .iter()
            .map(|line| {
                if has_bulk_discount {
                    return LineDiscount {
                        rate: self.bulk_rate,
                        amount: line.line_total.portion(self.bulk_rate),
                        kind: DiscountKind::Bulk,
                    };
                }

                let rate = self.individual_rate(&line.product_id, line.quantity);
                if rate.is_zero() {
                    return LineDiscount::NONE;
                }
                per_line_discounts.push(AppliedDiscount {
                    name: line.name.clone(),
                    rate_percent: rate.percent(),
                });
                LineDiscount {
                    rate,
                    amount: line.line_total.portion(rate),
                    kind: DiscountKind::Individual,
                }
            })
            .collect();

        let after_tiers = if has_bulk_discount {
            // Line amounts must add up to the cart-wide rounding
            let bulk_discount = subtotal.portion(self.bulk_rate);
            if let Some((last, rest)) = line_discounts.split_last_mut() {
                last.amount = bulk_discount - rest.iter().map(|d| d.amount).sum::<Money>();
            }
            subtotal - bulk_discount
        } else {
            subtotal - line_discounts.iter().map(|d| d.amount).sum::<Money>()
        };

        let tuesday_discount = if is_tuesday && after_tiers.is_positive() {
            after_tiers.portion(self.tuesday_rate)
        } else {
            Money::ZERO
        };
        let final_total = after_tiers - tuesday_discount;

        DiscountOutcome {
            lines: line_discounts,
            summary: DiscountSummary {
                subtotal,
                total_discount: subtotal - final_total,
                final_total,
                tuesday_discount,
                per_line_discounts,
                is_tuesday,
                has_bulk_discount,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, name: &str, unit_price: i64, quantity: u32) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(id),
            name: name.to_string(),
            quantity,
            line_total: Money::new(unit_price).times(quantity),
        }
    }

    #[test]
    fn test_bulk_line_amounts_add_up_to_total_discount() {
        // Both lines have a half-won bulk portion; rounded separately they
        // would overshoot the cart-wide amount by one won
        let lines = [
            line(ids::SPEAKER, "Speaker", 23_750, 1),
            line(ids::MOUSE, "Mouse", 10_002, 29),
        ];
        let outcome = DiscountPolicy::default().evaluate(&lines, false);

        assert!(outcome.summary.has_bulk_discount);
        assert_eq!(outcome.summary.total_discount, Money::new(78_452));
        assert_eq!(outcome.lines[0].amount, Money::new(5_938));
        assert_eq!(outcome.lines[1].amount, Money::new(72_514));
        let line_sum: Money = outcome.lines.iter().map(|d| d.amount).sum();
        assert_eq!(line_sum, outcome.summary.total_discount);
    }

    #[test]
    fn test_ten_keyboards_get_individual_discount() {
        let outcome = DiscountPolicy::default().evaluate(&[line(ids::KEYBOARD, "Keyboard", 10_000, 10)], false);

        assert_eq!(outcome.summary.subtotal, Money::new(100_000));
        assert_eq!(outcome.summary.final_total, Money::new(90_000));
        assert_eq!(outcome.summary.total_discount, Money::new(10_000));
        assert_eq!(outcome.lines[0].kind, DiscountKind::Individual);
        assert_eq!(
            outcome.summary.per_line_discounts,
            vec![AppliedDiscount {
                name: "Keyboard".to_string(),
                rate_percent: 10
            }]
        );
    }

    #[test]
    fn test_ten_speakers() {
        let outcome = DiscountPolicy::default().evaluate(&[line(ids::SPEAKER, "Speaker", 25_000, 10)], false);

        assert_eq!(outcome.summary.subtotal, Money::new(250_000));
        assert_eq!(outcome.summary.final_total, Money::new(187_500));
    }

    #[test]
    fn test_below_threshold_has_no_discount() {
        let outcome = DiscountPolicy::default().evaluate(&[line(ids::SPEAKER, "Speaker", 25_000, 9)], false);

        assert_eq!(outcome.lines, vec![LineDiscount::NONE]);
        assert_eq!(outcome.summary.final_total, outcome.summary.subtotal);
        assert!(outcome.summary.per_line_discounts.is_empty());
    }

    #[test]
    fn test_bulk_overrides_individual_discounts() {
        let lines = [
            line(ids::KEYBOARD, "Keyboard", 10_000, 15),
            line(ids::MOUSE, "Mouse", 20_000, 15),
        ];
        let outcome = DiscountPolicy::default().evaluate(&lines, false);

        assert!(outcome.summary.has_bulk_discount);
        assert_eq!(outcome.summary.subtotal, Money::new(450_000));
        assert_eq!(outcome.summary.final_total, Money::new(337_500));
        assert!(outcome.summary.per_line_discounts.is_empty());
        assert!(outcome.lines.iter().all(|d| d.kind == DiscountKind::Bulk));
    }

    #[test]
    fn test_bulk_replaces_even_larger_individual_rate() {
        // The speaker's 25% equals bulk; the keyboard's 10% would be smaller.
        let lines = [
            line(ids::SPEAKER, "Speaker", 25_000, 20),
            line(ids::KEYBOARD, "Keyboard", 10_000, 10),
        ];
        let outcome = DiscountPolicy::default().evaluate(&lines, false);

        assert_eq!(outcome.summary.final_total, Money::new(600_000).discounted(Rate::from_percent(25)));
        assert!(outcome.summary.per_line_discounts.is_empty());
    }

    #[test]
    fn test_tuesday_stacks_after_tiers() {
        let outcome = DiscountPolicy::default().evaluate(&[line(ids::KEYBOARD, "Keyboard", 10_000, 10)], true);

        assert!(outcome.summary.is_tuesday);
        assert_eq!(outcome.summary.tuesday_discount, Money::new(9_000));
        assert_eq!(outcome.summary.final_total, Money::new(81_000));
        assert_eq!(outcome.summary.total_discount, Money::new(19_000));
    }

    #[test]
    fn test_tuesday_rounds_half_up() {
        let outcome = DiscountPolicy::default().evaluate(&[line("x", "Sticker", 15, 1)], true);
        assert_eq!(outcome.summary.tuesday_discount, Money::new(2));
        assert_eq!(outcome.summary.final_total, Money::new(13));
    }

    #[test]
    fn test_empty_cart() {
        let outcome = DiscountPolicy::default().evaluate(&[], true);

        assert_eq!(outcome.summary.subtotal, Money::ZERO);
        assert_eq!(outcome.summary.final_total, Money::ZERO);
        assert_eq!(outcome.summary.tuesday_discount, Money::ZERO);
        assert!(outcome.summary.savings_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_savings_rate() {
        let outcome = DiscountPolicy::default().evaluate(&[line(ids::SPEAKER, "Speaker", 25_000, 10)], false);
        assert!((outcome.summary.savings_rate() - 0.25).abs() < 1e-9);
    }
}
