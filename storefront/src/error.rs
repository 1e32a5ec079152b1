//! Error types for storefront operations.

use crate::catalog::ProductId;
use thiserror::Error;

/// Errors returned by catalog and cart operations
///
/// A failed operation never changes state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorefrontError {
    /// The reservation exceeds the product's available stock
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product that ran short
        product_id: ProductId,
        /// Units asked for
        requested: u32,
        /// Units left in stock
        available: u32,
    },

    /// No product with this id exists in the catalog
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Zero quantity (or a zero delta) where a change was required
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),
}

/// Result alias for storefront operations
pub type Result<T> = std::result::Result<T, StorefrontError>;
