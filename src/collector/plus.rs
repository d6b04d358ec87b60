use std::sync::Arc;

use crate::core::{Element, ValueConsumer};
use crate::error::CollectorError;
use crate::producer::ValueProducer;
use crate::sanitize::{Accumulator, ValueCollector};
use crate::value::{SideEffect, Value};

use super::{Collector, Visitor};

/// Union of two collectors, left elements first.
///
/// A pruning union is present when either side is, and skips a missing side.
/// A strict union is present only when both sides are. Elements are never
/// de-duplicated here; that is up to the destination's strategy.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlusCollector<T> {
    left: Arc<Collector<T>>,
    right: Arc<Collector<T>>,
    pruning: bool,
}

impl<T: Element> PlusCollector<T> {
    pub fn new(left: Arc<Collector<T>>, right: Arc<Collector<T>>, pruning: bool) -> Self {
        Self {
            left,
            right,
            pruning,
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
        if self.pruning {
            self.left.calculate_presence(consumer) || self.right.calculate_presence(consumer)
        } else {
            self.left.calculate_presence(consumer) && self.right.calculate_presence(consumer)
        }
    }

    pub fn collect_entries(
        &self,
        consumer: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        let left = self.left.collect_entries(consumer, collector, dest);
        if left.is_missing() && !self.pruning {
            tracing::trace!("left operand of union is missing, skipping right operand");
            return left;
        }

        let right = self.right.collect_entries(consumer, collector, dest);
        if right.is_missing() && (!self.pruning || left.is_missing()) {
            return right;
        }

        Value::present()
            .with_side_effects(SideEffect::fixed_from(&left))
            .with_side_effects(SideEffect::fixed_from(&right))
    }

    /// Reports the left snapshot, then the right one. The caller concatenates
    /// them.
    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        self.left.calculate_execution_time_value(visitor);
        self.right.calculate_execution_time_value(visitor);
    }

    pub fn producer(&self) -> ValueProducer {
        self.left.producer().plus(self.right.producer())
    }

    pub fn size(&self) -> Result<usize, CollectorError> {
        Ok(self.left.size()? + self.right.size()?)
    }
}
