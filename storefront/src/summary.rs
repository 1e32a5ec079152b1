//! Order summary projection.
//!
//! [`OrderSummary::project`] is a pure function of the catalog, the cart, the
//! policies and the calendar day. It is recomputed wholesale after every
//! mutation, so two projections with no mutation in between are identical.

use crate::cart::Cart;
use crate::catalog::{Catalog, Product, ProductOption, StockReport};
use crate::discount::{DiscountPolicy, DiscountSummary, LineDiscount, PricedLine};
use crate::money::Money;
use crate::points::{PointsCalculation, PointsPolicy};
use serde::{Deserialize, Serialize};

/// One cart line as displayed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    /// Product snapshot at projection time
    pub product: Product,
    /// Units in the line
    pub quantity: u32,
    /// Current unit price times quantity, before discounts
    pub line_total: Money,
    /// Discount attributed to this line
    pub discount: LineDiscount,
}

/// Read model consumed by the view layer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Cart lines in cart order
    pub lines: Vec<SummaryLine>,
    /// Units across all lines
    pub total_quantity: u32,
    /// Discount totals
    pub discount: DiscountSummary,
    /// Loyalty points for the final total
    pub points: PointsCalculation,
    /// Points are shown only for a non-empty cart
    pub should_show_points: bool,
    /// Stock levels
    pub stock: StockReport,
    /// Product selector entries
    pub options: Vec<ProductOption>,
}

impl OrderSummary {
    /// Projects the summary: line totals, then discounts, then points
    #[must_use]
    pub fn project(
        catalog: &Catalog,
        cart: &Cart,
        discounts: &DiscountPolicy,
        points: &PointsPolicy,
        is_tuesday: bool,
    ) -> Self {
        let products: Vec<(&Product, u32)> = cart
            .lines()
            .iter()
            .filter_map(|line| {
                catalog
                    .find_product(&line.product_id)
                    .map(|product| (product, line.quantity))
            })
            .collect();

        let priced: Vec<PricedLine> = products
            .iter()
            .map(|&(product, quantity)| PricedLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity,
                line_total: product.current_price.times(quantity),
            })
            .collect();

        let outcome = discounts.evaluate(&priced, is_tuesday);
        let points = points.calculate(outcome.summary.final_total, cart, is_tuesday);

        let lines = products
            .into_iter()
            .zip(priced)
            .zip(outcome.lines)
            .map(|(((product, _), priced), discount)| SummaryLine {
                product: product.clone(),
                quantity: priced.quantity,
                line_total: priced.line_total,
                discount,
            })
            .collect();

        Self {
            lines,
            total_quantity: cart.total_quantity(),
            discount: outcome.summary,
            points,
            should_show_points: !cart.is_empty(),
            stock: catalog.stock_report(),
            options: catalog.options(),
        }
    }

    /// Whether the cart was empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Amount payable
    #[must_use]
    pub const fn final_total(&self) -> Money {
        self.discount.final_total
    }
}
