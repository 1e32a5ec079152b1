//! Catalog and stock ledger.
//!
//! The [`Catalog`] owns every product's stock count and prices. Stock is
//! reserved (decremented) when units move into the cart and released
//! (incremented) when they move out; nothing else touches it.

use crate::error::{Result, StorefrontError};
use crate::money::{Money, Rate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A product is "low stock" below this many units (and above zero)
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// Total catalog stock below this many units is reported as low
pub const TOTAL_STOCK_WARNING: u32 = 50;

/// Identifiers of the standard catalog
pub mod ids {
    /// Bug-Free Keyboard
    pub const KEYBOARD: &str = "p1";
    /// Productivity Mouse
    pub const MOUSE: &str = "p2";
    /// Posture Monitor Arm
    pub const MONITOR_ARM: &str = "p3";
    /// Error-Proof Laptop Pouch
    pub const LAPTOP_POUCH: &str = "p4";
    /// Lo-Fi Coding Speaker
    pub const SPEAKER: &str = "p5";
}

/// Unique identifier for a product
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new `ProductId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A product with its live stock and prices
///
/// `current_price == original_price` whenever neither sale flag is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product id
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Price after promotions
    pub current_price: Money,
    /// List price
    pub original_price: Money,
    /// Units left (not reserved by the cart)
    pub stock: u32,
    /// Flash sale applied
    pub on_flash_sale: bool,
    /// Suggested sale applied
    pub on_suggested_sale: bool,
}

impl Product {
    /// Creates a product at list price with no promotions
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            current_price: price,
            original_price: price,
            stock,
            on_flash_sale: false,
            on_suggested_sale: false,
        }
    }

    /// `0 < stock < 5`
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock < LOW_STOCK_THRESHOLD
    }

    /// `stock == 0`
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }

    /// Promotion badge, if any promotion is applied
    #[must_use]
    pub const fn badge(&self) -> Option<Badge> {
        match (self.on_flash_sale, self.on_suggested_sale) {
            (true, true) => Some(Badge::SuperSale),
            (true, false) => Some(Badge::Flash),
            (false, true) => Some(Badge::Suggested),
            (false, false) => None,
        }
    }

    /// Label shown in the product selector
    #[must_use]
    pub fn option_label(&self) -> String {
        if self.is_out_of_stock() {
            let mut label = format!("{} - {} (sold out)", self.name, self.current_price);
            if self.on_flash_sale {
                label.push_str(" ⚡SALE");
            }
            if self.on_suggested_sale {
                label.push_str(" 💝PICK");
            }
            return label;
        }

        let (name, original, price) = (&self.name, self.original_price, self.current_price);
        match self.badge() {
            Some(Badge::SuperSale) => format!("⚡💝{name} - {original} → {price} (25% SUPER SALE!)"),
            Some(Badge::Flash) => format!("⚡{name} - {original} → {price} (20% SALE!)"),
            Some(Badge::Suggested) => format!("💝{name} - {original} → {price} (5% PICK!)"),
            None => format!("{name} - {price}"),
        }
    }

    fn reset_price(&mut self) {
        self.current_price = self.original_price;
        self.on_flash_sale = false;
        self.on_suggested_sale = false;
    }
}

/// Promotion badge on a selector entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    /// Flash sale only
    Flash,
    /// Suggested sale only
    Suggested,
    /// Both promotions
    SuperSale,
}

/// Entry of the product selector
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Product id
    pub id: ProductId,
    /// Rendered label
    pub label: String,
    /// Current price
    pub price: Money,
    /// List price
    pub original_price: Money,
    /// Promotion badge
    pub badge: Option<Badge>,
    /// Out of stock entries cannot be selected
    pub disabled: bool,
}

impl From<&Product> for ProductOption {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            label: product.option_label(),
            price: product.current_price,
            original_price: product.original_price,
            badge: product.badge(),
            disabled: product.is_out_of_stock(),
        }
    }
}

/// A product running low
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    /// Product name
    pub name: String,
    /// Units left
    pub stock: u32,
}

/// Stock levels as shown under the selector
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    /// Units left across the catalog
    pub total_stock: u32,
    /// Products with `0 < stock < 5`
    pub low_stock: Vec<LowStockItem>,
    /// Names of products with no stock
    pub out_of_stock: Vec<String>,
    /// Total stock below the warning level
    pub is_total_stock_low: bool,
    /// One message per low or out-of-stock product, in catalog order
    pub messages: Vec<String>,
}

/// The stock ledger: products in catalog order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Creates a catalog from products in display order
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// The five-product storefront catalog
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Product::new(ids::KEYBOARD, "Bug-Free Keyboard", Money::new(10_000), 50),
            Product::new(ids::MOUSE, "Productivity Mouse", Money::new(20_000), 30),
            Product::new(ids::MONITOR_ARM, "Posture Monitor Arm", Money::new(30_000), 20),
            Product::new(ids::LAPTOP_POUCH, "Error-Proof Laptop Pouch", Money::new(15_000), 0),
            Product::new(ids::SPEAKER, "Lo-Fi Coding Speaker", Money::new(25_000), 10),
        ])
    }

    /// Products in catalog order
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Number of products
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Looks up a product
    #[must_use]
    pub fn find_product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Looks up a product, failing with `ProductNotFound`
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn get(&self, id: &ProductId) -> Result<&Product> {
        self.find_product(id)
            .ok_or_else(|| StorefrontError::ProductNotFound(id.clone()))
    }

    fn get_mut(&mut self, id: &ProductId) -> Result<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StorefrontError::ProductNotFound(id.clone()))
    }

    /// Checks that `quantity` units can be reserved
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id and
    /// [`StorefrontError::InsufficientStock`] if `quantity` exceeds the stock.
    pub fn check_availability(&self, id: &ProductId, quantity: u32) -> Result<()> {
        let product = self.get(id)?;
        if quantity > product.stock {
            return Err(StorefrontError::InsufficientStock {
                product_id: id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }
        Ok(())
    }

    /// Reserves `quantity` units; all or nothing
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::check_availability`]; stock is unchanged on error.
    pub fn decrease_stock(&mut self, id: &ProductId, quantity: u32) -> Result<()> {
        self.check_availability(id, quantity)?;
        let product = self.get_mut(id)?;
        product.stock -= quantity;
        Ok(())
    }

    /// Releases `quantity` units back to stock
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn increase_stock(&mut self, id: &ProductId, quantity: u32) -> Result<()> {
        let product = self.get_mut(id)?;
        product.stock = product.stock.saturating_add(quantity);
        Ok(())
    }

    /// Units left across the catalog
    #[must_use]
    pub fn total_stock(&self) -> u32 {
        self.products.iter().map(|p| p.stock).sum()
    }

    /// Low and out-of-stock products plus the total stock warning
    #[must_use]
    pub fn stock_report(&self) -> StockReport {
        let mut report = StockReport {
            total_stock: self.total_stock(),
            ..StockReport::default()
        };
        report.is_total_stock_low = report.total_stock < TOTAL_STOCK_WARNING;

        for product in &self.products {
            if product.is_out_of_stock() {
                report.out_of_stock.push(product.name.clone());
                report.messages.push(format!("{}: out of stock", product.name));
            } else if product.is_low_stock() {
                report.low_stock.push(LowStockItem {
                    name: product.name.clone(),
                    stock: product.stock,
                });
                report
                    .messages
                    .push(format!("{}: low stock ({} left)", product.name, product.stock));
            }
        }
        report
    }

    /// Selector entries in catalog order
    #[must_use]
    pub fn options(&self) -> Vec<ProductOption> {
        self.products.iter().map(ProductOption::from).collect()
    }

    /// Marks a product as flash-discounted at `rate` off its list price
    ///
    /// Returns `false` (and changes nothing) if the product is out of stock or
    /// already on flash sale.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn apply_flash_sale(&mut self, id: &ProductId, rate: Rate) -> Result<bool> {
        let product = self.get_mut(id)?;
        if product.is_out_of_stock() || product.on_flash_sale {
            return Ok(false);
        }
        product.current_price = product.original_price.portion(rate.complement());
        product.on_flash_sale = true;
        Ok(true)
    }

    /// Takes a further `rate` off a product's current price
    ///
    /// Returns `false` (and changes nothing) if the product is out of stock or
    /// already suggested.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn apply_suggested_sale(&mut self, id: &ProductId, rate: Rate) -> Result<bool> {
        let product = self.get_mut(id)?;
        if product.is_out_of_stock() || product.on_suggested_sale {
            return Ok(false);
        }
        product.current_price = product.current_price.portion(rate.complement());
        product.on_suggested_sale = true;
        Ok(true)
    }

    /// Restores the list price and clears both sale flags
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::ProductNotFound`] for an unknown id.
    pub fn remove_discount(&mut self, id: &ProductId) -> Result<()> {
        self.get_mut(id)?.reset_price();
        Ok(())
    }

    /// Restores list prices across the catalog
    pub fn remove_all_discounts(&mut self) {
        self.products.iter_mut().for_each(Product::reset_price);
    }
}
