use crate::core::{Element, ValueConsumer};
use crate::execution::ExecutionTimeValue;
use crate::producer::ValueProducer;
use crate::sanitize::{Accumulator, ValueCollector};
use crate::value::Value;

use super::Visitor;

/// A single literal element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SingleElement<T> {
    element: T,
}

impl<T: Element> SingleElement<T> {
    pub fn new(element: T) -> Self {
        Self { element }
    }

    pub fn calculate_presence(&self, _: ValueConsumer) -> bool {
        true
    }

    pub fn collect_entries(
        &self,
        _: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        collector.add(self.element.clone(), dest);
        Value::present()
    }

    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        visitor(ExecutionTimeValue::fixed_value(vec![self.element.clone()]));
    }

    pub fn producer(&self) -> ValueProducer {
        ValueProducer::unknown()
    }

    pub fn size(&self) -> usize {
        1
    }
}

/// An eagerly held collection of literal elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementsFromCollection<T> {
    elements: Vec<T>,
}

impl<T: Element> ElementsFromCollection<T> {
    pub fn new(elements: impl IntoIterator<Item = T>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
        }
    }

    pub fn calculate_presence(&self, _: ValueConsumer) -> bool {
        true
    }

    pub fn collect_entries(
        &self,
        _: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        collector.add_all(&self.elements, dest);
        Value::present()
    }

    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        visitor(ExecutionTimeValue::fixed_value(self.elements.clone()));
    }

    pub fn producer(&self) -> ValueProducer {
        ValueProducer::unknown()
    }

    pub fn size(&self) -> usize {
        self.elements.len()
    }
}

/// A fixed array of literal elements, appended one at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementsFromArray<T> {
    elements: Box<[T]>,
}

impl<T: Element> ElementsFromArray<T> {
    pub fn new(elements: impl Into<Box<[T]>>) -> Self {
        Self {
            elements: elements.into(),
        }
    }

    pub fn calculate_presence(&self, _: ValueConsumer) -> bool {
        true
    }

    pub fn collect_entries(
        &self,
        _: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        for element in self.elements.iter() {
            collector.add(element.clone(), dest);
        }
        Value::present()
    }

    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        visitor(ExecutionTimeValue::fixed_value(self.elements.to_vec()));
    }

    pub fn producer(&self) -> ValueProducer {
        ValueProducer::unknown()
    }

    pub fn size(&self) -> usize {
        self.elements.len()
    }
}
