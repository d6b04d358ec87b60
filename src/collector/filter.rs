use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::{Element, ValueConsumer, address_of};
use crate::execution::ExecutionTimeValue;
use crate::producer::ValueProducer;
use crate::sanitize::{Accumulator, BuilderFactory, ValueCollector};
use crate::value::Value;

use super::{Collector, Visitor};

pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Keeps the upstream elements that satisfy a predicate.
///
/// A filtered collection is present whenever its upstream is, even if the
/// predicate rejects every element.
#[derive(Clone)]
pub struct FilteringCollector<T> {
    upstream: Arc<Collector<T>>,
    predicate: Predicate<T>,
    factory: BuilderFactory<T>,
}

impl<T: Element> FilteringCollector<T> {
    pub fn new(
        upstream: Arc<Collector<T>>,
        predicate: Predicate<T>,
        factory: BuilderFactory<T>,
    ) -> Self {
        Self {
            upstream,
            predicate,
            factory,
        }
    }

    pub fn upstream(&self) -> &Arc<Collector<T>> {
        &self.upstream
    }

    pub fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.upstream.calculate_presence(consumer)
    }

    pub fn collect_entries(
        &self,
        consumer: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        let mut scratch = (self.factory)();
        let base = self
            .upstream
            .collect_entries(consumer, collector, scratch.as_mut());

        if base.is_missing() {
            tracing::trace!("upstream of filter is missing, discarding scratch buffer");
            return base;
        }

        for element in scratch.into_elements() {
            if (self.predicate)(&element) {
                collector.add(element, dest);
            }
        }

        base
    }

    /// Forwards the last snapshot reported by the upstream, unfiltered.
    // TODO: apply the predicate to fixed snapshots.
    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        let mut last: Option<ExecutionTimeValue<Vec<T>>> = None;
        self.upstream
            .calculate_execution_time_value(&mut |value| last = Some(value));

        if let Some(value) = last {
            visitor(value);
        }
    }

    pub fn producer(&self) -> ValueProducer {
        self.upstream.producer()
    }
}

impl<T: PartialEq> PartialEq for FilteringCollector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.upstream == other.upstream
            && address_of(&self.predicate) == address_of(&other.predicate)
            && address_of(&self.factory) == address_of(&other.factory)
    }
}

impl<T: Eq> Eq for FilteringCollector<T> {}

impl<T: Hash> Hash for FilteringCollector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.upstream.hash(state);
        address_of(&self.predicate).hash(state);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for FilteringCollector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteringCollector")
            .field("upstream", &self.upstream)
            .finish_non_exhaustive()
    }
}
