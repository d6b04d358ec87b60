use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::{ValueConsumer, address_of};
use crate::execution::ExecutionTimeValue;
use crate::producer::ValueProducer;
use crate::value::{SideEffect, Value};

/// A lazy computation of a single value.
///
/// Collectors wrap providers and delegate presence, content and lineage to
/// them. Implementations may block; collectors simply wait for the call to
/// return.
pub trait Provider<T>: Send + Sync {
    fn display_name(&self) -> &str {
        "provider"
    }

    fn calculate_presence(&self, consumer: ValueConsumer) -> bool;

    fn calculate_value(&self, consumer: ValueConsumer) -> Value<T>;

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<T>;

    fn producer(&self) -> ValueProducer {
        ValueProducer::unknown()
    }

    /// Number of elements, for providers of collections that can tell without
    /// being evaluated. `None` means the capability is absent.
    fn size(&self) -> Option<usize> {
        None
    }
}

pub type ProviderRef<T> = Arc<dyn Provider<T>>;

/// Wraps a provider into a shared, type-erased [`ProviderRef`].
pub fn shared<T, P>(provider: P) -> ProviderRef<T>
where
    P: Provider<T> + 'static,
{
    Arc::new(provider)
}

/// Identity of a shared provider instance, independent of its value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProviderId(usize);

impl ProviderId {
    pub fn of<P: ?Sized>(provider: &Arc<P>) -> Self {
        ProviderId(address_of(provider))
    }
}

/// Provider of a fixed value.
#[derive(Clone, Debug)]
pub struct Just<T> {
    value: T,
    size: Option<usize>,
    producer: ValueProducer,
}

impl<T> Just<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            size: None,
            producer: ValueProducer::unknown(),
        }
    }

    pub fn produced_by(mut self, producer: ValueProducer) -> Self {
        self.producer = producer;
        self
    }
}

impl<U> Just<Vec<U>> {
    /// A fixed collection that can report its size without being evaluated.
    pub fn collection(values: Vec<U>) -> Self {
        Self {
            size: Some(values.len()),
            value: values,
            producer: ValueProducer::unknown(),
        }
    }
}

impl<T> Provider<T> for Just<T>
where
    T: Clone + Send + Sync,
{
    fn display_name(&self) -> &str {
        "fixed value"
    }

    fn calculate_presence(&self, _: ValueConsumer) -> bool {
        true
    }

    fn calculate_value(&self, _: ValueConsumer) -> Value<T> {
        Value::of(self.value.clone())
    }

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<T> {
        ExecutionTimeValue::fixed_value(self.value.clone())
    }

    fn producer(&self) -> ValueProducer {
        self.producer.clone()
    }

    fn size(&self) -> Option<usize> {
        self.size
    }
}

/// Provider that never has a value.
pub struct Absent<T> {
    reason: Arc<str>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Absent<T> {
    pub fn new(reason: impl Into<Arc<str>>) -> Self {
        Self {
            reason: reason.into(),
            _phantom: PhantomData,
        }
    }
}

impl<T> Provider<T> for Absent<T> {
    fn display_name(&self) -> &str {
        &self.reason
    }

    fn calculate_presence(&self, _: ValueConsumer) -> bool {
        false
    }

    fn calculate_value(&self, _: ValueConsumer) -> Value<T> {
        Value::missing_because(self.reason.clone())
    }

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<T> {
        ExecutionTimeValue::missing()
    }
}

type Compute<T> = Arc<dyn Fn(ValueConsumer) -> Option<T> + Send + Sync>;

/// Provider backed by a closure, evaluated on every read.
///
/// Its execution-time value is always changing, because nothing is known about
/// the closure until it runs.
pub struct Lazy<T> {
    name: Arc<str>,
    compute: Compute<T>,
    producer: ValueProducer,
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            compute: self.compute.clone(),
            producer: self.producer.clone(),
        }
    }
}

impl<T> Lazy<T> {
    pub fn new<F>(name: impl Into<Arc<str>>, compute: F) -> Self
    where
        F: Fn(ValueConsumer) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            compute: Arc::new(compute),
            producer: ValueProducer::unknown(),
        }
    }

    pub fn produced_by(mut self, producer: ValueProducer) -> Self {
        self.producer = producer;
        self
    }
}

impl<T> Provider<T> for Lazy<T>
where
    T: Send + Sync + 'static,
{
    fn display_name(&self) -> &str {
        &self.name
    }

    fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        (self.compute)(consumer).is_some()
    }

    fn calculate_value(&self, consumer: ValueConsumer) -> Value<T> {
        match (self.compute)(consumer) {
            Some(value) => Value::of(value),
            None => Value::missing_because(self.name.clone()),
        }
    }

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<T> {
        ExecutionTimeValue::changing_value(Arc::new(self.clone()))
    }

    fn producer(&self) -> ValueProducer {
        self.producer.clone()
    }
}

/// Lazily applies a transform to another provider's value.
pub struct Mapped<S, T> {
    source: ProviderRef<S>,
    transform: Arc<dyn Fn(S) -> T + Send + Sync>,
}

impl<S, T> Mapped<S, T> {
    pub fn new<F>(source: ProviderRef<S>, transform: F) -> Self
    where
        F: Fn(S) -> T + Send + Sync + 'static,
    {
        Self::from_shared(source, Arc::new(transform))
    }

    pub(crate) fn from_shared(
        source: ProviderRef<S>,
        transform: Arc<dyn Fn(S) -> T + Send + Sync>,
    ) -> Self {
        Self { source, transform }
    }
}

impl<S, T> Provider<T> for Mapped<S, T>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn display_name(&self) -> &str {
        self.source.display_name()
    }

    fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.source.calculate_presence(consumer)
    }

    fn calculate_value(&self, consumer: ValueConsumer) -> Value<T> {
        self.source
            .calculate_value(consumer)
            .transform(|value| (self.transform)(value))
    }

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<T> {
        self.source
            .calculate_execution_time_value()
            .transform_shared(self.transform.clone())
    }

    fn producer(&self) -> ValueProducer {
        self.source.producer()
    }
}

/// Attaches a side effect to every value another provider produces.
pub struct WithSideEffect<T> {
    inner: ProviderRef<T>,
    effect: SideEffect,
}

impl<T> WithSideEffect<T> {
    pub fn new(inner: ProviderRef<T>, effect: SideEffect) -> Self {
        Self { inner, effect }
    }
}

impl<T> Provider<T> for WithSideEffect<T>
where
    T: Send + Sync + 'static,
{
    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.inner.calculate_presence(consumer)
    }

    fn calculate_value(&self, consumer: ValueConsumer) -> Value<T> {
        self.inner
            .calculate_value(consumer)
            .with_side_effect(self.effect.clone())
    }

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<T> {
        match self.inner.calculate_execution_time_value() {
            ExecutionTimeValue::Missing => ExecutionTimeValue::Missing,
            ExecutionTimeValue::Fixed {
                value,
                mut side_effects,
            } => {
                side_effects.push(self.effect.clone());
                ExecutionTimeValue::Fixed {
                    value,
                    side_effects,
                }
            }
            ExecutionTimeValue::Changing(inner) => ExecutionTimeValue::Changing(Arc::new(
                WithSideEffect::new(inner, self.effect.clone()),
            )),
        }
    }

    fn producer(&self) -> ValueProducer {
        self.inner.producer()
    }

    fn size(&self) -> Option<usize> {
        self.inner.size()
    }
}
