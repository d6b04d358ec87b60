use std::sync::Arc;

/// Lineage of a value: which tasks have to run before it can be read.
///
/// Combinators that merge two operands merge their producers with
/// [`ValueProducer::plus`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValueProducer {
    /// No traceable source, e.g. a literal.
    #[default]
    Unknown,
    /// Output of the named task.
    Task(Arc<str>),
    Plus(Arc<ValueProducer>, Arc<ValueProducer>),
}

impl ValueProducer {
    pub fn unknown() -> Self {
        ValueProducer::Unknown
    }

    pub fn task(name: impl Into<Arc<str>>) -> Self {
        ValueProducer::Task(name.into())
    }

    /// Combines two producers. Unknown operands are absorbed.
    pub fn plus(self, other: ValueProducer) -> Self {
        match (self, other) {
            (ValueProducer::Unknown, other) => other,
            (this, ValueProducer::Unknown) => this,
            (this, other) => ValueProducer::Plus(Arc::new(this), Arc::new(other)),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ValueProducer::Unknown)
    }

    /// Visits every producing task, left to right.
    pub fn visit_tasks(&self, visitor: &mut impl FnMut(&str)) {
        match self {
            ValueProducer::Unknown => {}
            ValueProducer::Task(name) => visitor(name),
            ValueProducer::Plus(left, right) => {
                left.visit_tasks(visitor);
                right.visit_tasks(visitor);
            }
        }
    }

    pub fn tasks(&self) -> Vec<Arc<str>> {
        let mut tasks: Vec<Arc<str>> = Vec::new();
        self.visit_tasks(&mut |name| {
            if !tasks.iter().any(|known| known.as_ref() == name) {
                tasks.push(name.into());
            }
        });
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_absorbed() {
        let task = ValueProducer::task("compile");
        assert_eq!(ValueProducer::unknown().plus(task.clone()), task);
        assert_eq!(task.clone().plus(ValueProducer::unknown()), task);
        assert!(!ValueProducer::unknown().plus(ValueProducer::unknown()).is_known());
    }

    #[test]
    fn test_plus_keeps_order() {
        let producer = ValueProducer::task("a")
            .plus(ValueProducer::task("b"))
            .plus(ValueProducer::task("a"));
        let tasks = producer.tasks();
        assert_eq!(tasks.iter().map(|t| t.as_ref()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
