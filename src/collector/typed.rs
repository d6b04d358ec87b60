use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::{Element, ElementType, ValueConsumer};
use crate::error::CollectorError;
use crate::sanitize::{Accumulator, CollectionKind, ValueCollector, collector_for};
use crate::value::Value;

use super::Collector;

/// Pass-through collector that remembers the element type it was declared
/// for, together with the collection strategy picked for that type and kind.
///
/// The kind takes part in equality: a list and a set over the same delegate
/// hold different content.
#[derive(Clone)]
pub struct TypedCollector<T> {
    element_type: Option<ElementType>,
    kind: CollectionKind,
    pub(crate) delegate: Arc<Collector<T>>,
    value_collector: Arc<dyn ValueCollector<T>>,
}

impl<T: Element> TypedCollector<T> {
    pub fn new(
        element_type: Option<ElementType>,
        delegate: Arc<Collector<T>>,
        kind: CollectionKind,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            value_collector: collector_for::<T>(element_type, kind)?,
            element_type,
            kind,
            delegate,
        })
    }

    /// Typed wrapper tagged with `T` itself, which cannot mismatch.
    pub(crate) fn for_element(delegate: Arc<Collector<T>>, kind: CollectionKind) -> Self {
        Self {
            element_type: Some(ElementType::of::<T>()),
            kind,
            delegate,
            value_collector: kind.collector(),
        }
    }

    pub fn element_type(&self) -> Option<ElementType> {
        self.element_type
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn delegate(&self) -> &Arc<Collector<T>> {
        &self.delegate
    }

    pub fn value_collector(&self) -> &dyn ValueCollector<T> {
        self.value_collector.as_ref()
    }

    /// Collects the delegate with the strategy selected for the element type.
    pub fn collect(&self, consumer: ValueConsumer, dest: &mut dyn Accumulator<T>) -> Value<()> {
        self.delegate
            .collect_entries(consumer, self.value_collector.as_ref(), dest)
    }

    pub fn collect_into(&self, dest: &mut dyn Accumulator<T>) -> Value<()> {
        self.collect(ValueConsumer::IgnoreUnsafeRead, dest)
    }
}

impl<T: PartialEq> PartialEq for TypedCollector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type
            && self.kind == other.kind
            && self.delegate == other.delegate
    }
}

impl<T: Eq> Eq for TypedCollector<T> {}

impl<T: Hash> Hash for TypedCollector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element_type.hash(state);
        self.kind.hash(state);
        self.delegate.hash(state);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TypedCollector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCollector")
            .field("element_type", &self.element_type)
            .field("kind", &self.kind)
            .field("delegate", &self.delegate)
            .finish()
    }
}
