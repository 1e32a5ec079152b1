//! # Storefront Testing
//!
//! Testing utilities and helpers for the storefront engine.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, randomness)
//! - A Given-When-Then builder for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use storefront_testing::{FixedClock, ScriptedRandom};
//!
//! #[test]
//! fn tuesday_discount_applies() {
//!     let env = StorefrontEnvironment::new(
//!         Arc::new(FixedClock::tuesday()),
//!         Arc::new(ScriptedRandom::new()),
//!     );
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use storefront_core::environment::{Clock, RandomSource};


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, RandomSource, Utc};
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Noon on Tuesday 2024-12-31 (UTC)
        ///
        /// # Panics
        ///
        /// Only if the built-in timestamp stops parsing.
        #[must_use]
        pub fn tuesday() -> Self {
            Self::new(parse("2024-12-31T12:00:00Z"))
        }

        /// Midnight on Wednesday 2025-01-01 (UTC)
        ///
        /// # Panics
        ///
        /// Only if the built-in timestamp stops parsing.
        #[must_use]
        pub fn wednesday() -> Self {
            Self::new(parse("2025-01-01T00:00:00Z"))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    #[allow(clippy::expect_used)]
    fn parse(timestamp: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(timestamp)
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Random source that replays scripted values
    ///
    /// Indices and fractions are consumed in the order they were pushed. Once a
    /// queue runs dry it keeps answering `0` (or `0.0`), so an unscripted draw
    /// is still deterministic. Scripted indices are clamped into `0..len`.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_core::environment::RandomSource;
    /// use storefront_testing::mocks::ScriptedRandom;
    ///
    /// let random = ScriptedRandom::new().with_indices([2, 9]).with_fractions([0.5]);
    /// assert_eq!(random.pick_index(5), 2);
    /// assert_eq!(random.pick_index(5), 4);
    /// assert_eq!(random.pick_index(5), 0);
    /// assert!((random.unit_fraction() - 0.5).abs() < f64::EPSILON);
    /// ```
    #[derive(Debug, Default)]
    pub struct ScriptedRandom {
        indices: Mutex<VecDeque<usize>>,
        fractions: Mutex<VecDeque<f64>>,
    }

    impl ScriptedRandom {
        /// Create a random source with nothing scripted
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue indices returned by `pick_index`
        #[must_use]
        pub fn with_indices(self, indices: impl IntoIterator<Item = usize>) -> Self {
            self.push_indices(indices);
            self
        }

        /// Queue fractions returned by `unit_fraction`
        #[must_use]
        pub fn with_fractions(self, fractions: impl IntoIterator<Item = f64>) -> Self {
            self.fractions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(fractions);
            self
        }

        /// Queue more indices on a source that is already shared
        pub fn push_indices(&self, indices: impl IntoIterator<Item = usize>) {
            self.indices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(indices);
        }
    }

    impl RandomSource for ScriptedRandom {
        fn pick_index(&self, len: usize) -> usize {
            let next = self
                .indices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or(0);
            next.min(len.saturating_sub(1))
        }

        fn unit_fraction(&self) -> f64 {
            self.fractions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or(0.0)
        }
    }
}

/// Install a test-friendly tracing subscriber
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("storefront=debug,storefront_runtime=debug")
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ScriptedRandom};
