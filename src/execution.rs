use std::sync::Arc;

use crate::core::ValueConsumer;
use crate::provider::{Mapped, ProviderRef};
use crate::value::{SideEffects, Value};

/// Snapshot classification used when deciding whether a computation can be
/// cached as it is.
///
/// A [`Value`] is the result of evaluating right now. An `ExecutionTimeValue`
/// says whether the whole computation can be frozen (`Fixed`) or still
/// depends on something that must be resolved later (`Changing`).
pub enum ExecutionTimeValue<T> {
    Missing,
    Fixed { value: T, side_effects: SideEffects },
    Changing(ProviderRef<T>),
}

impl<T> ExecutionTimeValue<T> {
    pub fn missing() -> Self {
        ExecutionTimeValue::Missing
    }

    pub fn fixed_value(value: T) -> Self {
        ExecutionTimeValue::Fixed {
            value,
            side_effects: SideEffects::new(),
        }
    }

    pub fn changing_value(provider: ProviderRef<T>) -> Self {
        ExecutionTimeValue::Changing(provider)
    }

    /// Freezes an already calculated value, keeping its side effects.
    pub fn value(value: Value<T>) -> Self {
        match value {
            Value::Missing(_) => ExecutionTimeValue::Missing,
            Value::Present {
                value,
                side_effects,
            } => ExecutionTimeValue::Fixed {
                value,
                side_effects,
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ExecutionTimeValue::Missing)
    }

    pub fn has_fixed_value(&self) -> bool {
        matches!(self, ExecutionTimeValue::Fixed { .. })
    }

    pub fn has_changing_content(&self) -> bool {
        matches!(self, ExecutionTimeValue::Changing(_))
    }

    pub fn fixed(&self) -> Option<&T> {
        match self {
            ExecutionTimeValue::Fixed { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Converts the snapshot back into a [`Value`].
    ///
    /// Fixed snapshots keep their side effects. Changing snapshots are
    /// evaluated now, with [`ValueConsumer::IgnoreUnsafeRead`].
    pub fn to_value(self) -> Value<T> {
        match self {
            ExecutionTimeValue::Missing => Value::missing(),
            ExecutionTimeValue::Fixed {
                value,
                side_effects,
            } => Value::Present {
                value,
                side_effects,
            },
            ExecutionTimeValue::Changing(provider) => {
                provider.calculate_value(ValueConsumer::IgnoreUnsafeRead)
            }
        }
    }
}

impl<T> ExecutionTimeValue<T>
where
    T: Send + Sync + 'static,
{
    /// Maps the payload while keeping fixed/changing-ness and side effects.
    ///
    /// Changing snapshots are mapped lazily through their provider.
    pub fn transform<U, F>(self, f: F) -> ExecutionTimeValue<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.transform_shared(Arc::new(f))
    }

    pub(crate) fn transform_shared<U>(
        self,
        f: Arc<dyn Fn(T) -> U + Send + Sync>,
    ) -> ExecutionTimeValue<U>
    where
        U: Send + Sync + 'static,
    {
        match self {
            ExecutionTimeValue::Missing => ExecutionTimeValue::Missing,
            ExecutionTimeValue::Fixed {
                value,
                side_effects,
            } => ExecutionTimeValue::Fixed {
                value: f(value),
                side_effects,
            },
            ExecutionTimeValue::Changing(provider) => {
                ExecutionTimeValue::Changing(Arc::new(Mapped::from_shared(provider, f)))
            }
        }
    }
}

impl<T: Clone> Clone for ExecutionTimeValue<T> {
    fn clone(&self) -> Self {
        match self {
            ExecutionTimeValue::Missing => ExecutionTimeValue::Missing,
            ExecutionTimeValue::Fixed {
                value,
                side_effects,
            } => ExecutionTimeValue::Fixed {
                value: value.clone(),
                side_effects: side_effects.clone(),
            },
            ExecutionTimeValue::Changing(provider) => {
                ExecutionTimeValue::Changing(provider.clone())
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ExecutionTimeValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionTimeValue::Missing => write!(f, "Missing"),
            ExecutionTimeValue::Fixed {
                value,
                side_effects,
            } => f
                .debug_struct("Fixed")
                .field("value", value)
                .field("side_effects", side_effects)
                .finish(),
            ExecutionTimeValue::Changing(provider) => {
                write!(f, "Changing({})", provider.display_name())
            }
        }
    }
}
