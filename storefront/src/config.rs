//! Configuration management for the storefront engine.
//!
//! Defaults are the canonical storefront values. Promotion timing can be
//! overridden from environment variables. Missing or unparsable values keep
//! their default, as does a zero interval.

use crate::discount::DiscountPolicy;
use crate::points::PointsPolicy;
use crate::promotions::{PromotionConfig, SaleSchedule};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Upper bound of the flash sale's random initial delay, in milliseconds
pub const FLASH_SALE_MAX_DELAY_MS: &str = "STOREFRONT_FLASH_SALE_MAX_DELAY_MS";
/// Flash sale interval, in milliseconds
pub const FLASH_SALE_INTERVAL_MS: &str = "STOREFRONT_FLASH_SALE_INTERVAL_MS";
/// Upper bound of the suggested sale's random initial delay, in milliseconds
pub const SUGGESTED_SALE_MAX_DELAY_MS: &str = "STOREFRONT_SUGGESTED_SALE_MAX_DELAY_MS";
/// Suggested sale interval, in milliseconds
pub const SUGGESTED_SALE_INTERVAL_MS: &str = "STOREFRONT_SUGGESTED_SALE_INTERVAL_MS";

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Promotion timers and rates
    pub promotions: PromotionConfig,
    /// Discount rates and thresholds
    pub discounts: DiscountPolicy,
    /// Loyalty point rules
    pub points: PointsPolicy,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str, default: Duration| {
            let Some(raw) = lookup(key) else {
                return default;
            };
            match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(error) => {
                    tracing::warn!(key, value = %raw, %error, "Ignoring malformed duration, using default");
                    default
                }
            }
        };
        // A zero interval would re-arm the timer without ever waiting
        let interval = |key: &str, default: Duration| {
            let value = millis(key, default);
            if value.is_zero() {
                tracing::warn!(key, "Ignoring zero promotion interval, using default");
                return default;
            }
            value
        };

        let defaults = PromotionConfig::default();
        let promotions = PromotionConfig {
            flash_sale: SaleSchedule {
                max_initial_delay: millis(FLASH_SALE_MAX_DELAY_MS, defaults.flash_sale.max_initial_delay),
                interval: interval(FLASH_SALE_INTERVAL_MS, defaults.flash_sale.interval),
                rate: defaults.flash_sale.rate,
            },
            suggested_sale: SaleSchedule {
                max_initial_delay: millis(
                    SUGGESTED_SALE_MAX_DELAY_MS,
                    defaults.suggested_sale.max_initial_delay,
                ),
                interval: interval(SUGGESTED_SALE_INTERVAL_MS, defaults.suggested_sale.interval),
                rate: defaults.suggested_sale.rate,
            },
        };

        Self {
            promotions,
            ..Self::default()
        }
    }
}
