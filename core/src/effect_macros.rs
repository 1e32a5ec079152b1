//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating timer effects, which are
//! always a `Delay` wrapped in a `Cancellable` so they can be stopped as a group.

/// Create a cancellable `Effect::Delay`
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use storefront_core::{delay, effect::{Effect, EffectId}};
///
/// const TICK: EffectId = EffectId::new("tick");
///
/// let effect: Effect<&str> = delay! {
///     id: TICK,
///     after: Duration::from_secs(30),
///     send: "tick"
/// };
/// assert!(matches!(effect, Effect::Cancellable { id, .. } if id == TICK));
/// ```
#[macro_export]
macro_rules! delay {
    (
        id: $id:expr,
        after: $duration:expr,
        send: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
        .cancellable($id)
    };
}

/// Create an `Effect::Parallel` of `Effect::Cancel` for every listed id
///
/// # Example
///
/// ```rust
/// use storefront_core::{cancel_all, effect::{Effect, EffectId}};
///
/// const A: EffectId = EffectId::new("a");
/// const B: EffectId = EffectId::new("b");
///
/// let effect: Effect<()> = cancel_all![A, B];
/// assert!(matches!(effect, Effect::Parallel(ref effects) if effects.len() == 2));
/// ```
#[macro_export]
macro_rules! cancel_all {
    ($($id:expr),+ $(,)?) => {
        $crate::effect::Effect::Parallel(::std::vec![
            $($crate::effect::Effect::Cancel($id)),+
        ])
    };
}
