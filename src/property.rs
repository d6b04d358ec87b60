use std::sync::Arc;

use crate::collector::{Collector, TypedCollector, Visitor};
use crate::core::{Element, Hash32, ValueConsumer};
use crate::error::CollectorError;
use crate::execution::ExecutionTimeValue;
use crate::producer::ValueProducer;
use crate::provider::{Absent, Provider, ProviderId, ProviderRef};
use crate::sanitize::{BuilderFactory, CollectionKind};
use crate::value::{SideEffectGuard, SideEffects, Value};

/// Provider over a fixed collector tree.
///
/// This is what a [`CollectionProperty`] hands out when its execution-time
/// value is still changing: the tree as it was at that moment, evaluated again
/// whenever it is read.
#[derive(Clone)]
pub struct CollectorProvider<T> {
    display_name: Arc<str>,
    root: TypedCollector<T>,
    factory: BuilderFactory<T>,
}

impl<T: Element> CollectorProvider<T> {
    fn new(display_name: Arc<str>, root: TypedCollector<T>, factory: BuilderFactory<T>) -> Self {
        Self {
            display_name,
            root,
            factory,
        }
    }

    pub fn collector(&self) -> &TypedCollector<T> {
        &self.root
    }
}

impl<T: Element> Provider<Vec<T>> for CollectorProvider<T> {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.root.delegate().calculate_presence(consumer)
    }

    fn calculate_value(&self, consumer: ValueConsumer) -> Value<Vec<T>> {
        tracing::debug!(property = %self.display_name, "calculating value");

        let mut dest = (self.factory)();
        let collected = self.root.collect(consumer, dest.as_mut());
        match collected.into_parts() {
            Ok(((), side_effects)) => {
                Value::of(dest.into_elements()).with_side_effects(side_effects)
            }
            Err(missing) => Value::Missing(missing.pushing(self.display_name.clone())),
        }
    }

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<Vec<T>> {
        tracing::debug!(property = %self.display_name, "calculating execution time value");

        let mut sources = Vec::new();
        visit_sources(self.root.delegate(), &mut |value| sources.push(value));

        if sources.iter().any(ExecutionTimeValue::has_changing_content) {
            return ExecutionTimeValue::changing_value(Arc::new(self.clone()));
        }

        if !concatenates(self.root.delegate()) {
            // Every input is fixed, so evaluating now gives the frozen result.
            return ExecutionTimeValue::value(
                self.calculate_value(ValueConsumer::IgnoreUnsafeRead),
            );
        }

        let mut dest = (self.factory)();
        let mut side_effects = SideEffects::new();

        for partial in sources {
            match partial {
                ExecutionTimeValue::Fixed {
                    value,
                    side_effects: partial_effects,
                } => {
                    self.root.value_collector().add_all(&value, dest.as_mut());
                    side_effects.extend(partial_effects);
                }
                ExecutionTimeValue::Missing => return ExecutionTimeValue::missing(),
                ExecutionTimeValue::Changing(_) => {
                    return ExecutionTimeValue::changing_value(Arc::new(self.clone()));
                }
            }
        }

        ExecutionTimeValue::Fixed {
            value: dest.into_elements(),
            side_effects,
        }
    }

    fn producer(&self) -> ValueProducer {
        self.root.delegate().producer()
    }

    fn size(&self) -> Option<usize> {
        self.root.delegate().size().ok()
    }
}

/// Reports the snapshot of every leaf of the tree, left to right.
///
/// Unlike [`Collector::calculate_execution_time_value`], filters report their
/// whole upstream and differences both operands, so no changing source is
/// hidden. For a tree that [`concatenates`], both walks report the same
/// snapshots.
fn visit_sources<T: Element>(collector: &Collector<T>, visitor: &mut Visitor<'_, T>) {
    match collector {
        Collector::Typed(typed) => visit_sources(typed.delegate(), visitor),
        Collector::Filtering(filter) => visit_sources(filter.upstream(), visitor),
        Collector::Plus(plus) => {
            visit_sources(plus.left(), visitor);
            visit_sources(plus.right(), visitor);
        }
        Collector::Minus(minus) => {
            visit_sources(minus.left(), visitor);
            visit_sources(minus.right(), visitor);
        }
        leaf => leaf.calculate_execution_time_value(visitor),
    }
}

/// Whether the snapshots a tree reports, concatenated in order, equal the
/// tree's content.
///
/// Filters and differences report their operands unprocessed, and a pruning
/// union may report a missing operand that does not make the union missing.
fn concatenates<T: Element>(collector: &Collector<T>) -> bool {
    match collector {
        Collector::SingleElement(_)
        | Collector::ElementFromProvider(_)
        | Collector::ElementsFromCollection(_)
        | Collector::ElementsFromCollectionProvider(_)
        | Collector::ElementsFromArray(_) => true,
        Collector::Typed(typed) => concatenates(typed.delegate()),
        Collector::Plus(plus) => {
            !plus.is_pruning() && concatenates(plus.left()) && concatenates(plus.right())
        }
        Collector::Filtering(_) | Collector::Minus(_) => false,
    }
}

/// A lazily assembled list or set.
///
/// Every mutation wraps the current collector tree in a new node; nothing is
/// evaluated until the value, the presence or an execution-time snapshot is
/// requested. A new property holds an empty collection.
///
/// # Example
///
/// ```rust
/// use lazy_collectors::{CollectionProperty, SideEffectGuard};
///
/// let mut sources = CollectionProperty::list("sources");
/// sources.add_all([1, 2]);
/// sources.add(3);
/// sources.exclude([2]);
///
/// let mut guard = SideEffectGuard::new();
/// assert_eq!(sources.get(&mut guard).unwrap(), vec![1, 3]);
/// ```
#[derive(Clone)]
pub struct CollectionProperty<T> {
    kind: CollectionKind,
    supplier: CollectorProvider<T>,
}

impl<T: Element> CollectionProperty<T> {
    pub fn new(display_name: impl Into<Arc<str>>, kind: CollectionKind) -> Self {
        let root = TypedCollector::for_element(
            Arc::new(Collector::from_collection(Vec::new())),
            kind,
        );

        Self {
            kind,
            supplier: CollectorProvider::new(display_name.into(), root, kind.factory()),
        }
    }

    pub fn list(display_name: impl Into<Arc<str>>) -> Self {
        Self::new(display_name, CollectionKind::List)
    }

    pub fn set(display_name: impl Into<Arc<str>>) -> Self {
        Self::new(display_name, CollectionKind::Set)
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.supplier.display_name
    }

    /// The collector tree currently backing this property.
    pub fn collector(&self) -> Collector<T> {
        Collector::Typed(self.supplier.root.clone())
    }

    fn replace(&mut self, collector: Collector<T>) {
        self.supplier.root = TypedCollector::for_element(Arc::new(collector), self.kind);
    }

    fn grow(&mut self, contribution: Collector<T>, pruning: bool) -> &mut Self {
        let current = self.supplier.root.delegate().clone();
        self.replace(Collector::plus(current, contribution, pruning));
        self
    }

    pub fn add(&mut self, element: T) -> &mut Self {
        self.grow(Collector::single(element), false)
    }

    pub fn add_all(&mut self, elements: impl IntoIterator<Item = T>) -> &mut Self {
        self.grow(Collector::from_collection(elements), false)
    }

    /// Adds the elements of a fixed array, appended one by one.
    pub fn add_array(&mut self, elements: impl Into<Box<[T]>>) -> &mut Self {
        self.grow(Collector::from_array(elements), false)
    }

    pub fn add_from(&mut self, provider: ProviderRef<T>) -> &mut Self {
        self.grow(Collector::from_provider(provider), false)
    }

    pub fn add_all_from(&mut self, provider: ProviderRef<Vec<T>>) -> &mut Self {
        self.grow(Collector::from_collection_provider(provider), false)
    }

    /// Like [`add`](Self::add), but also turns a property without a value into
    /// one holding just this element.
    pub fn append(&mut self, element: T) -> &mut Self {
        self.grow(Collector::single(element), true)
    }

    /// Adds the provider's element when it has one, and nothing otherwise.
    pub fn append_from(&mut self, provider: ProviderRef<T>) -> &mut Self {
        self.grow(Collector::from_provider(provider), true)
    }

    pub fn append_all_from(&mut self, provider: ProviderRef<Vec<T>>) -> &mut Self {
        self.grow(Collector::from_collection_provider(provider), true)
    }

    /// Removes every element equal to one of `elements`.
    pub fn exclude(&mut self, elements: impl IntoIterator<Item = T>) -> &mut Self {
        self.subtract(Collector::from_collection(elements))
    }

    pub fn exclude_from(&mut self, provider: ProviderRef<Vec<T>>) -> &mut Self {
        self.subtract(Collector::from_collection_provider(provider))
    }

    fn subtract(&mut self, removed: Collector<T>) -> &mut Self {
        let current = self.supplier.root.delegate().clone();
        let factory = self.supplier.factory.clone();
        self.replace(Collector::minus(current, removed, false, factory));
        self
    }

    /// Keeps only the elements satisfying `predicate`.
    pub fn retain<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let current = self.supplier.root.delegate().clone();
        let factory = self.supplier.factory.clone();
        self.replace(Collector::filtering(current, predicate, factory));
        self
    }

    /// Discards the current contributions and holds exactly `elements`.
    pub fn set_elements(&mut self, elements: impl IntoIterator<Item = T>) -> &mut Self {
        self.replace(Collector::from_collection(elements));
        self
    }

    pub fn set_from(&mut self, provider: ProviderRef<Vec<T>>) -> &mut Self {
        self.replace(Collector::from_collection_provider(provider));
        self
    }

    /// Leaves the property without a value.
    pub fn unset(&mut self) -> &mut Self {
        let absent: ProviderRef<Vec<T>> = Arc::new(Absent::new("no value set"));
        self.replace(Collector::from_collection_provider(absent));
        self
    }

    pub fn is_present(&self, consumer: ValueConsumer) -> bool {
        self.supplier.calculate_presence(consumer)
    }

    pub fn calculate_value(&self, consumer: ValueConsumer) -> Value<Vec<T>> {
        self.supplier.calculate_value(consumer)
    }

    /// Evaluates the property and runs its pending side effects through `guard`.
    pub fn get(&self, guard: &mut SideEffectGuard) -> Result<Vec<T>, CollectorError> {
        self.calculate_value(ValueConsumer::IgnoreUnsafeRead)
            .commit(guard)
    }

    pub fn calculate_execution_time_value(&self) -> ExecutionTimeValue<Vec<T>> {
        self.supplier.calculate_execution_time_value()
    }

    pub fn producer(&self) -> ValueProducer {
        self.supplier.producer()
    }

    pub fn size(&self) -> Result<usize, CollectorError> {
        self.supplier.root.delegate().size()
    }

    pub fn is_provided_by(&self, provider: ProviderId) -> bool {
        self.supplier.root.delegate().is_provided_by(provider)
    }

    /// Structural fingerprint of the current tree.
    pub fn fingerprint(&self) -> Hash32 {
        Hash32::of(&self.supplier.root)
    }

    /// A provider over the tree as it is now, unaffected by later mutations.
    pub fn snapshot(&self) -> ProviderRef<Vec<T>> {
        Arc::new(self.supplier.clone())
    }
}

impl<T: Element> Provider<Vec<T>> for CollectionProperty<T> {
    fn display_name(&self) -> &str {
        self.supplier.display_name()
    }

    fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.supplier.calculate_presence(consumer)
    }

    fn calculate_value(&self, consumer: ValueConsumer) -> Value<Vec<T>> {
        self.supplier.calculate_value(consumer)
    }

    fn calculate_execution_time_value(&self) -> ExecutionTimeValue<Vec<T>> {
        self.supplier.calculate_execution_time_value()
    }

    fn producer(&self) -> ValueProducer {
        self.supplier.producer()
    }

    fn size(&self) -> Option<usize> {
        Provider::size(&self.supplier)
    }
}

/// Evaluates independent properties in parallel, keeping their order.
#[cfg(feature = "rayon")]
pub fn calculate_all<T: Element>(
    properties: &[&CollectionProperty<T>],
    consumer: ValueConsumer,
) -> Vec<Value<Vec<T>>> {
    use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

    properties
        .par_iter()
        .map(|property| property.calculate_value(consumer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Just, Lazy, WithSideEffect, shared};
    use crate::value::SideEffect;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const READ: ValueConsumer = ValueConsumer::IgnoreUnsafeRead;

    fn counting(label: &str) -> (SideEffect, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let effect = SideEffect::new(label, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (effect, runs)
    }

    #[test]
    fn test_new_property_is_empty_and_present() {
        let property: CollectionProperty<i32> = CollectionProperty::list("srcs");
        assert!(property.is_present(READ));
        assert_eq!(property.get(&mut SideEffectGuard::new()).unwrap(), Vec::<i32>::new());
        assert_eq!(property.size().unwrap(), 0);
    }

    #[test]
    fn test_add_add_all_then_exclude() {
        let (all_effect, all_runs) = counting("add_all");
        let (one_effect, one_runs) = counting("add");
        let (minus_effect, minus_runs) = counting("minus");

        let mut property = CollectionProperty::list("srcs");
        property
            .add_all_from(shared(WithSideEffect::new(
                shared(Just::collection(vec![1, 2])),
                all_effect,
            )))
            .add_from(shared(WithSideEffect::new(shared(Just::new(3)), one_effect)))
            .exclude_from(shared(WithSideEffect::new(
                shared(Just::collection(vec![2])),
                minus_effect,
            )));

        assert!(property.is_present(READ));

        let value = property.calculate_value(READ);
        let labels: Vec<_> = value
            .side_effects()
            .unwrap()
            .iter()
            .map(|e| e.label().to_string())
            .collect();
        assert_eq!(labels, vec!["add_all", "add"]);

        let mut guard = SideEffectGuard::new();
        assert_eq!(value.commit(&mut guard).unwrap(), vec![1, 3]);
        assert_eq!(all_runs.load(Ordering::SeqCst), 1);
        assert_eq!(one_runs.load(Ordering::SeqCst), 1);
        assert_eq!(minus_runs.load(Ordering::SeqCst), 0);

        assert_eq!(property.get(&mut guard).unwrap(), vec![1, 3]);
        assert_eq!(all_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_property_drops_duplicates() {
        let mut property = CollectionProperty::set("flags");
        property.add_all(["-g", "-O2"]).add("-g").add_array(["-Wall", "-O2"]);
        assert_eq!(
            property.get(&mut SideEffectGuard::new()).unwrap(),
            vec!["-g", "-O2", "-Wall"]
        );
        assert_eq!(property.size().unwrap(), 5);
    }

    #[test]
    fn test_unset_then_add_is_missing() {
        let mut property = CollectionProperty::list("srcs");
        property.unset().add(1);
        assert!(!property.is_present(READ));

        let value = property.calculate_value(READ);
        let reasons: Vec<&str> = value
            .missing_reason()
            .unwrap()
            .reasons()
            .iter()
            .map(|reason| reason.as_ref())
            .collect();
        assert_eq!(reasons, vec!["no value set", "srcs"]);

        let err = property.get(&mut SideEffectGuard::new()).unwrap_err();
        assert!(matches!(err, CollectorError::MissingValue(_)));
    }

    #[test]
    fn test_unset_then_append_is_present() {
        let mut property = CollectionProperty::list("srcs");
        property.unset().append(1).append_from(shared(Absent::new("optional")));
        assert!(property.is_present(READ));
        assert_eq!(property.get(&mut SideEffectGuard::new()).unwrap(), vec![1]);
    }

    #[test]
    fn test_retain() {
        let mut property = CollectionProperty::list("numbers");
        property.add_all(1..=6).retain(|v| v % 3 == 0);
        assert_eq!(property.get(&mut SideEffectGuard::new()).unwrap(), vec![3, 6]);
        assert!(matches!(property.size(), Err(CollectorError::UnsupportedSize(_))));
    }

    #[test]
    fn test_fixed_execution_time_value_concatenates() {
        let (effect, runs) = counting("generated");
        let mut property = CollectionProperty::list("srcs");
        property
            .add(1)
            .add_all_from(shared(WithSideEffect::new(shared(Just::new(vec![2, 3])), effect)));

        match property.calculate_execution_time_value() {
            ExecutionTimeValue::Fixed {
                value,
                side_effects,
            } => {
                assert_eq!(value, vec![1, 2, 3]);
                assert_eq!(side_effects.len(), 1);
            }
            other => panic!("expected fixed value, got {other:?}"),
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_execution_time_value_applies_exclusions() {
        let mut property = CollectionProperty::list("srcs");
        property.add_all([1, 2, 3]).exclude([2]);
        assert_eq!(
            property.calculate_execution_time_value().fixed(),
            Some(&vec![1, 3])
        );
    }

    #[test]
    fn test_changing_execution_time_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut property = CollectionProperty::list("srcs");
        property.add(1).add_from(shared(Lazy::new("late", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Some(2)
        })));

        let snapshot = property.calculate_execution_time_value();
        assert!(snapshot.has_changing_content());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        property.add(3);
        let value = snapshot.to_value();
        assert_eq!(value.get_without_side_effect(), Some(&vec![1, 2]));
    }

    fn late<V>(value: V) -> (ProviderRef<V>, Arc<AtomicUsize>)
    where
        V: Clone + Send + Sync + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let provider = shared(Lazy::new("late", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Some(value.clone())
        }));
        (provider, calls)
    }

    #[test]
    fn test_filtered_changing_source_stays_changing() {
        let (provider, calls) = late(2);
        let mut property = CollectionProperty::list("srcs");
        property.add_from(provider).add(3).retain(|v| *v > 2);

        let snapshot = property.calculate_execution_time_value();
        assert!(snapshot.has_changing_content());
        assert!(!snapshot.has_fixed_value());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(snapshot.to_value().without_side_effect(), Some(vec![3]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_changing_exclusions_stay_changing() {
        let (provider, calls) = late(vec![2]);
        let mut property = CollectionProperty::list("srcs");
        property.add_all([1, 2, 3]).exclude_from(provider);

        let snapshot = property.calculate_execution_time_value();
        assert!(snapshot.has_changing_content());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(snapshot.to_value().without_side_effect(), Some(vec![1, 3]));
    }

    #[test]
    fn test_fixed_filter_and_exclusion_are_frozen() {
        let mut property = CollectionProperty::list("numbers");
        property
            .add_all(1..=6)
            .add_all_from(shared(Just::new(vec![7, 8])))
            .retain(|v| v % 2 == 0)
            .exclude([4]);

        let snapshot = property.calculate_execution_time_value();
        assert!(snapshot.has_fixed_value());
        assert_eq!(snapshot.fixed(), Some(&vec![2, 6, 8]));
    }

    #[test]
    fn test_set_execution_time_value_drops_duplicates() {
        let mut property = CollectionProperty::set("flags");
        property
            .add_all([1, 2])
            .add(1)
            .add_all_from(shared(Just::new(vec![2, 3])));

        let snapshot = property.calculate_execution_time_value();
        assert!(snapshot.has_fixed_value());
        assert_eq!(snapshot.fixed(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_list_and_set_fingerprints_differ() {
        let mut list = CollectionProperty::list("values");
        list.add_all([1, 1]);
        let mut set = CollectionProperty::set("values");
        set.add_all([1, 1]);

        let mut guard = SideEffectGuard::new();
        assert_eq!(list.get(&mut guard).unwrap(), vec![1, 1]);
        assert_eq!(set.get(&mut guard).unwrap(), vec![1]);
        assert_ne!(list.collector(), set.collector());
        assert_ne!(list.fingerprint(), set.fingerprint());
    }

    #[test]
    fn test_missing_execution_time_value() {
        let mut property: CollectionProperty<i32> = CollectionProperty::list("srcs");
        property.unset();
        assert!(property.calculate_execution_time_value().is_missing());
    }

    #[test]
    fn test_property_feeds_another_property() {
        let mut common = CollectionProperty::list("common");
        common.add_all(["a", "b"]);

        let mut all = CollectionProperty::list("all");
        let provider = common.snapshot();
        all.add_all_from(provider.clone()).add("c");

        assert_eq!(all.get(&mut SideEffectGuard::new()).unwrap(), vec!["a", "b", "c"]);
        assert_eq!(all.size().unwrap(), 3);

        let mut direct = CollectionProperty::list("direct");
        direct.set_from(provider.clone());
        assert!(direct.is_provided_by(ProviderId::of(&provider)));
        assert!(!all.is_provided_by(ProviderId::of(&provider)));
    }

    #[test]
    fn test_producer_and_fingerprint() {
        let generated = shared(Just::new(vec![1]).produced_by(ValueProducer::task("generate")));

        let mut a = CollectionProperty::list("a");
        a.add_all_from(generated.clone());
        let mut b = CollectionProperty::list("b");
        b.add_all_from(generated);

        assert_eq!(a.producer(), ValueProducer::task("generate"));
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.add(2);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_calculate_all_keeps_order() {
        let properties: Vec<_> = (0..8)
            .map(|i| {
                let mut property = CollectionProperty::list(format!("p{i}"));
                property.add_all(0..i);
                property
            })
            .collect();
        let refs: Vec<_> = properties.iter().collect();

        let values = calculate_all(&refs, READ);
        for (i, value) in values.into_iter().enumerate() {
            assert_eq!(value.without_side_effect(), Some((0..i as i32).collect::<Vec<_>>()));
        }
    }
}
