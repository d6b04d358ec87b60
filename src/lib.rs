#![forbid(unsafe_code)]
//! Lazy collection values for build configuration.
//!
//! A [`CollectionProperty`] records how a list or set is assembled (literal
//! elements, elements from [`Provider`]s, unions, differences and filters)
//! without evaluating anything. The assembled tree can then be asked whether
//! it has a value, what that value is, or whether it can already be frozen
//! before execution starts ([`ExecutionTimeValue`]).
//!
//! Values carry deferred [`SideEffect`]s. They run only when a consumer commits
//! to a value through a [`SideEffectGuard`], and at most once per guard.

mod core;
mod error;
mod execution;
mod producer;
mod property;
mod provider;
mod sanitize;
mod value;

pub mod collector;

pub use crate::collector::Collector;
pub use crate::core::{Element, ElementType, Hash32, ValueConsumer};
pub use crate::error::{CollectorError, SideEffectError};
pub use crate::execution::ExecutionTimeValue;
pub use crate::producer::ValueProducer;
#[cfg(feature = "rayon")]
pub use crate::property::calculate_all;
pub use crate::property::{CollectionProperty, CollectorProvider};
pub use crate::provider::{
    Absent, Just, Lazy, Mapped, Provider, ProviderId, ProviderRef, WithSideEffect, shared,
};
pub use crate::sanitize::{
    Accumulator, BuilderFactory, CollectionKind, PlainCollector, UniqueAccumulator,
    UniqueCollector, ValueCollector, collector_for,
};
pub use crate::value::{Missing, SideEffect, SideEffectGuard, SideEffectId, SideEffects, Value};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Calling it more than once, or after another subscriber was installed, is a
/// no-op.
#[cfg(feature = "logging")]
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
