use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::core::ElementType;
use crate::error::CollectorError;

/// A growable destination that collectors append elements into.
pub trait Accumulator<T>: Send {
    fn push(&mut self, element: T);

    fn contains(&self, element: &T) -> bool;

    fn len(&self) -> usize;

    fn into_elements(self: Box<Self>) -> Vec<T>;
}

impl<T: PartialEq + Send> Accumulator<T> for Vec<T> {
    fn push(&mut self, element: T) {
        Vec::push(self, element);
    }

    fn contains(&self, element: &T) -> bool {
        self.as_slice().contains(element)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn into_elements(self: Box<Self>) -> Vec<T> {
        *self
    }
}

/// Insertion-ordered destination that ignores elements it already holds.
#[derive(Debug, Clone)]
pub struct UniqueAccumulator<T> {
    elements: IndexSet<T>,
}

impl<T> UniqueAccumulator<T> {
    pub fn new() -> Self {
        Self {
            elements: IndexSet::new(),
        }
    }
}

impl<T> Default for UniqueAccumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Send> Accumulator<T> for UniqueAccumulator<T> {
    fn push(&mut self, element: T) {
        self.elements.insert(element);
    }

    fn contains(&self, element: &T) -> bool {
        self.elements.contains(element)
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn into_elements(self: Box<Self>) -> Vec<T> {
        self.elements.into_iter().collect()
    }
}

/// Produces fresh, empty scratch destinations for combinators that need to
/// materialize an operand before combining it.
pub type BuilderFactory<T> = Arc<dyn Fn() -> Box<dyn Accumulator<T>> + Send + Sync>;

/// Strategy that appends elements into a destination, applying the
/// destination's own semantics.
pub trait ValueCollector<T: Clone>: Send + Sync {
    fn add(&self, element: T, dest: &mut dyn Accumulator<T>);

    fn add_all(&self, elements: &[T], dest: &mut dyn Accumulator<T>) {
        for element in elements {
            self.add(element.clone(), dest);
        }
    }
}

/// Appends every element as it comes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCollector;

impl<T: Clone> ValueCollector<T> for PlainCollector {
    fn add(&self, element: T, dest: &mut dyn Accumulator<T>) {
        dest.push(element);
    }
}

/// Appends an element only if the destination does not hold an equal one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueCollector;

impl<T: Clone> ValueCollector<T> for UniqueCollector {
    fn add(&self, element: T, dest: &mut dyn Accumulator<T>) {
        if !dest.contains(&element) {
            dest.push(element);
        }
    }
}

/// Destination semantics of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Keeps duplicates, in insertion order.
    List,
    /// Drops duplicates, keeping the first occurrence.
    Set,
}

impl CollectionKind {
    pub fn collector<T>(self) -> Arc<dyn ValueCollector<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self {
            CollectionKind::List => Arc::new(PlainCollector),
            CollectionKind::Set => Arc::new(UniqueCollector),
        }
    }

    pub fn factory<T>(self) -> BuilderFactory<T>
    where
        T: Hash + Eq + Send + 'static,
    {
        match self {
            CollectionKind::List => Arc::new(|| Box::new(Vec::new()) as Box<dyn Accumulator<T>>),
            CollectionKind::Set => {
                Arc::new(|| Box::new(UniqueAccumulator::new()) as Box<dyn Accumulator<T>>)
            }
        }
    }
}

/// Selects the collection strategy for elements tagged with `element_type`.
///
/// The tag is checked against the static element type, so a collector declared
/// for one type can never be fed another one silently.
pub fn collector_for<T>(
    element_type: Option<ElementType>,
    kind: CollectionKind,
) -> Result<Arc<dyn ValueCollector<T>>, CollectorError>
where
    T: Clone + Send + Sync + 'static,
{
    match element_type {
        Some(tag) if !tag.is::<T>() => Err(CollectorError::TypeMismatch {
            expected: tag.name(),
            found: std::any::type_name::<T>(),
        }),
        _ => Ok(kind.collector()),
    }
}
