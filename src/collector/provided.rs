use std::hash::{Hash, Hasher};

use crate::core::{Element, ValueConsumer, address_of};
use crate::error::CollectorError;
use crate::execution::ExecutionTimeValue;
use crate::producer::ValueProducer;
use crate::provider::{ProviderId, ProviderRef};
use crate::sanitize::{Accumulator, ValueCollector};
use crate::value::Value;

use super::Visitor;

/// A single element supplied by a provider.
pub struct ElementFromProvider<T> {
    provider: ProviderRef<T>,
}

impl<T: Element> ElementFromProvider<T> {
    pub fn new(provider: ProviderRef<T>) -> Self {
        Self { provider }
    }

    pub fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.provider.calculate_presence(consumer)
    }

    pub fn collect_entries(
        &self,
        consumer: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        let (element, side_effects) = match self.provider.calculate_value(consumer).into_parts() {
            Ok(parts) => parts,
            Err(missing) => return Value::Missing(missing),
        };

        collector.add(element, dest);
        Value::present().with_side_effects(side_effects)
    }

    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        let value = self.provider.calculate_execution_time_value();
        visitor(value.transform(|element| vec![element]));
    }

    pub fn producer(&self) -> ValueProducer {
        self.provider.producer()
    }

    pub fn size(&self) -> usize {
        1
    }

    pub fn is_provided_by(&self, provider: ProviderId) -> bool {
        ProviderId::of(&self.provider) == provider
    }
}

/// A collection supplied by a provider.
pub struct ElementsFromCollectionProvider<T> {
    provider: ProviderRef<Vec<T>>,
}

impl<T: Element> ElementsFromCollectionProvider<T> {
    pub fn new(provider: ProviderRef<Vec<T>>) -> Self {
        Self { provider }
    }

    pub fn calculate_presence(&self, consumer: ValueConsumer) -> bool {
        self.provider.calculate_presence(consumer)
    }

    pub fn collect_entries(
        &self,
        consumer: ValueConsumer,
        collector: &dyn ValueCollector<T>,
        dest: &mut dyn Accumulator<T>,
    ) -> Value<()> {
        let (elements, side_effects) = match self.provider.calculate_value(consumer).into_parts() {
            Ok(parts) => parts,
            Err(missing) => return Value::Missing(missing),
        };

        collector.add_all(&elements, dest);
        Value::present().with_side_effects(side_effects)
    }

    pub fn calculate_execution_time_value(&self, visitor: &mut Visitor<'_, T>) {
        visitor(self.provider.calculate_execution_time_value());
    }

    pub fn producer(&self) -> ValueProducer {
        self.provider.producer()
    }

    pub fn size(&self) -> Result<usize, CollectorError> {
        self.provider
            .size()
            .ok_or(CollectorError::UnsupportedSize("ElementsFromCollectionProvider"))
    }

    pub fn is_provided_by(&self, provider: ProviderId) -> bool {
        ProviderId::of(&self.provider) == provider
    }
}

macro_rules! impl_provider_identity {
    ($($name:ident),*) => {
        $(
            impl<T> Clone for $name<T> {
                fn clone(&self) -> Self {
                    Self {
                        provider: self.provider.clone(),
                    }
                }
            }

            impl<T> PartialEq for $name<T> {
                fn eq(&self, other: &Self) -> bool {
                    address_of(&self.provider) == address_of(&other.provider)
                }
            }

            impl<T> Eq for $name<T> {}

            impl<T> Hash for $name<T> {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    address_of(&self.provider).hash(state);
                }
            }

            impl<T> std::fmt::Debug for $name<T> {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.debug_tuple(stringify!($name))
                        .field(&self.provider.display_name())
                        .finish()
                }
            }
        )*
    };
}

impl_provider_identity!(ElementFromProvider, ElementsFromCollectionProvider);
