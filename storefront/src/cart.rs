//! Cart lines.
//!
//! The cart only records quantities. Stock moves are done by
//! [`StorefrontState`](crate::state::StorefrontState), which pairs every
//! change here with the matching change in the catalog.

use crate::catalog::ProductId;
use serde::{Deserialize, Serialize};

/// One product in the cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product in this line
    pub product_id: ProductId,
    /// Units reserved, always positive
    pub quantity: u32,
}

/// Cart lines in the order products were first added
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Units of `product_id` in the cart (0 if absent)
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| &line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Whether the cart holds `product_id`
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.lines.iter().any(|line| &line.product_id == product_id)
    }

    /// Units across all lines
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Number of lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sets the quantity of a line, adding or dropping it as needed
    pub(crate) fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) {
        let position = self.lines.iter().position(|line| &line.product_id == product_id);
        match (position, quantity) {
            (Some(index), 0) => {
                self.lines.remove(index);
            },
            (Some(index), quantity) => self.lines[index].quantity = quantity,
            (None, 0) => {},
            (None, quantity) => self.lines.push(CartLine {
                product_id: product_id.clone(),
                quantity,
            }),
        }
    }

    /// Removes every line, returning them
    pub(crate) fn drain(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }
}
