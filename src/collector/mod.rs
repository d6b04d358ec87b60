//! Lazy collection combinators.
//!
//! A [`Collector`] is an immutable node describing how to produce zero or more
//! elements of a collection. Trees of collectors are built while a collection
//! is being configured and queried later for presence, content, or an
//! execution-time snapshot. Nothing is evaluated until one of those queries
//! runs, and no query mutates the tree, so a tree can be queried repeatedly
//! and from several threads.

mod elements;
mod filter;
mod minus;
mod plus;
mod provided;
mod typed;

use std::sync::Arc;

use crate::core::{Element, ElementType, Hash32, ValueConsumer};
use crate::error::CollectorError;
use crate::execution::ExecutionTimeValue;
use crate::producer::ValueProducer;
use crate::provider::{ProviderId, ProviderRef};
use crate::sanitize::{Accumulator, BuilderFactory, CollectionKind, ValueCollector};
use crate::value::Value;

pub use elements::{ElementsFromArray, ElementsFromCollection, SingleElement};
pub use filter::{FilteringCollector, Predicate};
pub use minus::MinusCollector;
pub use plus::PlusCollector;
pub use provided::{ElementFromProvider, ElementsFromCollectionProvider};
pub use typed::TypedCollector;

/// Push-style receiver of execution-time snapshots. Combinators may call it
/// zero, one or several times, once per partial collection.
pub type Visitor<'a, T> = dyn FnMut(ExecutionTimeValue<Vec<T>>) + 'a;

/// A node of a lazy collection tree.
///
/// Equality and hashing are structural: literals compare by value, providers,
/// predicates and factories by identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Collector<T> {
    SingleElement(SingleElement<T>),
    ElementFromProvider(ElementFromProvider<T>),
    ElementsFromCollection(ElementsFromCollection<T>),
    ElementsFromCollectionProvider(ElementsFromCollectionProvider<T>),
    ElementsFromArray(ElementsFromArray<T>),
    Typed(TypedCollector<T>),
    Filtering(FilteringCollector<T>),
    Plus(PlusCollector<T>),
    Minus(MinusCollector<T>),
}

impl<T: Element> Collector<T> {
    pub fn single(element: T) -> Self {
        Collector::SingleElement(SingleElement::new(element))
    }

    pub fn from_provider(provider: ProviderRef<T>) -> Self {
        Collector::ElementFromProvider(ElementFromProvider::new(provider))
    }

    pub fn from_collection(elements: impl IntoIterator<Item = T>) -> Self {
        Collector::ElementsFromCollection(ElementsFromCollection::new(elements))
    }

    pub fn from_collection_provider(provider: ProviderRef<Vec<T>>) -> Self {
        Collector::ElementsFromCollectionProvider(ElementsFromCollectionProvider::new(provider))
    }

    pub fn from_array(elements: impl Into<Box<[T]>>) -> Self {
        Collector::ElementsFromArray(ElementsFromArray::new(elements))
    }

    pub fn typed(
        element_type: Option<ElementType>,
        delegate: impl Into<Arc<Collector<T>>>,
        kind: CollectionKind,
    ) -> Result<Self, CollectorError> {
        TypedCollector::new(element_type, delegate.into(), kind).map(Collector::Typed)
    }

    pub fn filtering<F>(
        upstream: impl Into<Arc<Collector<T>>>,
        predicate: F,
        factory: BuilderFactory<T>,
    ) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Collector::Filtering(FilteringCollector::new(
            upstream.into(),
            Arc::new(predicate),
            factory,
        ))
    }

    pub fn plus(
        left: impl Into<Arc<Collector<T>>>,
        right: impl Into<Arc<Collector<T>>>,
        pruning: bool,
    ) -> Self {
        Collector::Plus(PlusCollector::new(left.into(), right.into(), pruning))
    }

    pub fn minus(
        left: impl Into<Arc<Collector<T>>>,
        right: impl Into<Arc<Collector<T>>>,
        pruning: bool,
        factory: BuilderFactory<T>,
    ) -> Self {
        Collector::Minus(MinusCollector::new(
            left.into(),
            right.into(),
            pruning,
            factory,
        ))
    }

    /// Name of the variant, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Collector::SingleElement(_) => "SingleElement",
            Collector::ElementFromProvider(_) => "ElementFromProvider",
            Collector::ElementsFromCollection(_) => "ElementsFromCollection",
            Collector::ElementsFromCollectionProvider(_) => "ElementsFromCollectionProvider",
            Collector::ElementsFromArray(_) => "ElementsFromArray",
            Collector::Typed(_) => "TypedCollector",
            Collector::Filtering(_) => "FilteringCollector",
            Collector::Plus(_) => "PlusCollector",
            Collector::Minus(_) => "MinusCollector",
        }
    }

    /// Whether the collection currently has a value. Never materializes
    /// content and never triggers side effects.
    pub fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        match self {
            Collector::SingleElement(c) => c.calculate_presence(consumer),
            Collector::ElementFromProvider(c) => c.calculate_presence(consumer),
            Collector::ElementsFromCollection(c) => c.calculate_presence(consumer),
            Collector::ElementsFromCollectionProvider(c) => c.calculate_presence(consumer),
            Collector::ElementsFromArray(c) => c.calculate_presence(consumer),
            Collector::Typed(c) => c.delegate.calculate_presence(consumer),
            Collector::Filtering(c) => c.calculate_presence(consumer),
            Collector::Plus(c) => c.calculate_presence(consumer),
            Collector::Minus(c) => c.calculate_presence(consumer),
        }
    }

    /// Appends the elements into `dest` through `collector`.
    ///
    /// The returned value carries no payload, only presence and the side
    /// effects the caller becomes responsible for. When it is missing, the
    /// content of `dest` is unspecified and should be discarded.
    pub fn collect_entries(
        &self,
        consumer: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        match self {
            Collector::SingleElement(c) => c.collect_entries(consumer, collector, dest),
            Collector::ElementFromProvider(c) => c.collect_entries(consumer, collector, dest),
            Collector::ElementsFromCollection(c) => c.collect_entries(consumer, collector, dest),
            Collector::ElementsFromCollectionProvider(c) => {
                c.collect_entries(consumer, collector, dest)
            }
            Collector::ElementsFromArray(c) => c.collect_entries(consumer, collector, dest),
            Collector::Typed(c) => c.delegate.collect_entries(consumer, collector, dest),
            Collector::Filtering(c) => c.collect_entries(consumer, collector, dest),
            Collector::Plus(c) => c.collect_entries(consumer, collector, dest),
            Collector::Minus(c) => c.collect_entries(consumer, collector, dest),
        }
    }

    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        match self {
            Collector::SingleElement(c) => c.calculate_execution_time_value(visitor),
            Collector::ElementFromProvider(c) => c.calculate_execution_time_value(visitor),
            Collector::ElementsFromCollection(c) => c.calculate_execution_time_value(visitor),
            Collector::ElementsFromCollectionProvider(c) => {
                c.calculate_execution_time_value(visitor)
            }
            Collector::ElementsFromArray(c) => c.calculate_execution_time_value(visitor),
            Collector::Typed(c) => c.delegate.calculate_execution_time_value(visitor),
            Collector::Filtering(c) => c.calculate_execution_time_value(visitor),
            Collector::Plus(c) => c.calculate_execution_time_value(visitor),
            Collector::Minus(c) => c.calculate_execution_time_value(visitor),
        }
    }

    pub fn producer(&self) -> ValueProducer {
        match self {
            Collector::SingleElement(c) => c.producer(),
            Collector::ElementFromProvider(c) => c.producer(),
            Collector::ElementsFromCollection(c) => c.producer(),
            Collector::ElementsFromCollectionProvider(c) => c.producer(),
            Collector::ElementsFromArray(c) => c.producer(),
            Collector::Typed(c) => c.delegate.producer(),
            Collector::Filtering(c) => c.producer(),
            Collector::Plus(c) => c.producer(),
            Collector::Minus(c) => c.producer(),
        }
    }

    /// Number of elements, when it can be known without evaluating filters
    /// or subtractions. A difference reports its left size as an upper bound.
    pub fn size(&self) -> Result<usize, CollectorError> {
        match self {
            Collector::SingleElement(c) => Ok(c.size()),
            Collector::ElementFromProvider(c) => Ok(c.size()),
            Collector::ElementsFromCollection(c) => Ok(c.size()),
            Collector::ElementsFromCollectionProvider(c) => c.size(),
            Collector::ElementsFromArray(c) => Ok(c.size()),
            Collector::Typed(c) => c.delegate.size(),
            Collector::Filtering(_) => Err(CollectorError::UnsupportedSize(self.name())),
            Collector::Plus(c) => c.size(),
            Collector::Minus(c) => c.size(),
        }
    }

    /// Whether this node is fed directly by `provider`.
    ///
    /// Only provider-backed nodes, and typed wrappers around them, answer
    /// `true`; combinators are never considered to be provided by anything.
    pub fn is_provided_by(&self, provider: ProviderId) -> bool {
        match self {
            Collector::ElementFromProvider(c) => c.is_provided_by(provider),
            Collector::ElementsFromCollectionProvider(c) => c.is_provided_by(provider),
            Collector::Typed(c) => c.delegate.is_provided_by(provider),
            Collector::SingleElement(_)
            | Collector::ElementsFromCollection(_)
            | Collector::ElementsFromArray(_)
            | Collector::Filtering(_)
            | Collector::Plus(_)
            | Collector::Minus(_) => false,
        }
    }

    /// Structural BLAKE3 fingerprint, equal for trees that compare equal.
    pub fn fingerprint(&self) -> Hash32 {
        Hash32::of(self)
    }
}
