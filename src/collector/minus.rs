use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::{Element, ValueConsumer, address_of};
use crate::error::CollectorError;
use crate::producer::ValueProducer;
use crate::sanitize::{Accumulator, BuilderFactory, ValueCollector};
use crate::value::{SideEffect, Value};

use super::{Collector, Visitor};

/// Elements of the left collector that are not equal to any element of the
/// right one, in left order.
///
/// Presence follows the left operand only, and only the left operand's side
/// effects are carried by the result.
#[derive(Clone)]
pub struct MinusCollector<T> {
    left: Arc<Collector<T>>,
    right: Arc<Collector<T>>,
    pruning: bool,
    factory: BuilderFactory<T>,
}

impl<T: Element> MinusCollector<T> {
    pub fn new(
        left: Arc<Collector<T>>,
        right: Arc<Collector<T>>,
        pruning: bool,
        factory: BuilderFactory<T>,
    ) -> Self {
        Self {
            left,
            right,
            pruning,
            factory,
        }
    }

    pub fn left(&self) -> &Arc<Collector<T>> {
        &self.left
    }

    pub fn right(&self) -> &Arc<Collector<T>> {
        &self.right
    }

    pub fn is_pruning(&self) -> bool {
        self.pruning
    }

    pub fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.left.calculate_presence(consumer)
    }

    pub fn collect_entries(
        &self,
        consumer: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        let mut kept = (self.factory)();
        let left = self.left.collect_entries(consumer, collector, kept.as_mut());
        if left.is_missing() && !self.pruning {
            tracing::trace!("left operand of difference is missing, skipping right operand");
            return left;
        }

        let mut removed = (self.factory)();
        let right = self.right.collect_entries(consumer, collector, removed.as_mut());
        if right.is_missing() && (!self.pruning || left.is_missing()) {
            // A strict difference with a missing right operand is missing as a
            // whole, even though the left operand was collected.
            return right;
        }

        let removed_elements = removed.into_elements();
        let removed: HashSet<&T> = removed_elements.iter().collect();
        for element in kept.into_elements() {
            if !removed.contains(&element) {
                collector.add(element, dest);
            }
        }

        Value::present().with_side_effects(SideEffect::fixed_from(&left))
    }

    /// Reports both operands' snapshots without subtracting them.
    // TODO: subtract fixed right snapshots from fixed left snapshots.
    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        self.left.calculate_execution_time_value(visitor);
        self.right.calculate_execution_time_value(visitor);
    }

    pub fn producer(&self) -> ValueProducer {
        self.left.producer().plus(self.right.producer())
    }

    /// Upper bound: the size of the left operand.
    pub fn size(&self) -> Result<usize, CollectorError> {
        self.left.size()
    }
}

impl<T: PartialEq> PartialEq for MinusCollector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left
            && self.right == other.right
            && self.pruning == other.pruning
            && address_of(&self.factory) == address_of(&other.factory)
    }
}

impl<T: Eq> Eq for MinusCollector<T> {}

impl<T: Hash> Hash for MinusCollector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.left.hash(state);
        self.right.hash(state);
        self.pruning.hash(state);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MinusCollector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinusCollector")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("pruning", &self.pruning)
            .finish_non_exhaustive()
    }
}
