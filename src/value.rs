use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CollectorError, SideEffectError};

/// Explanation attached to a missing value.
///
/// Each layer that observes the absence may push its own display name, so the
/// reasons read from the innermost source to the outermost consumer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Missing {
    reasons: Vec<Arc<str>>,
}

impl Missing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn because(reason: impl Into<Arc<str>>) -> Self {
        Self {
            reasons: vec![reason.into()],
        }
    }

    /// Appends the display name of an outer layer that saw this absence.
    pub fn pushing(mut self, name: impl Into<Arc<str>>) -> Self {
        self.reasons.push(name.into());
        self
    }

    pub fn reasons(&self) -> &[Arc<str>] {
        &self.reasons
    }
}

impl Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reasons.is_empty() {
            return write!(f, "  - no value");
        }

        for (i, reason) in self.reasons.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {reason}")?;
        }

        Ok(())
    }
}

static NEXT_SIDE_EFFECT: AtomicU64 = AtomicU64::new(0);

/// Identity of a [`SideEffect`]. Clones of one side effect share the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SideEffectId(u64);

type Action = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A deferred action bound to a value.
///
/// The action runs only when a consumer commits to the value it is attached
/// to, and at most once per [`SideEffectGuard`], however many times the value
/// was merged into larger results.
#[derive(Clone)]
pub struct SideEffect {
    id: SideEffectId,
    label: Arc<str>,
    action: Action,
}

impl SideEffect {
    pub fn new<F>(label: impl Into<Arc<str>>, action: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: SideEffectId(NEXT_SIDE_EFFECT.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
            action: Arc::new(action),
        }
    }

    /// Captures the side effects already attached to `value`, so that they can
    /// be reattached to a derived value without evaluating anything again.
    pub fn fixed_from<T>(value: &Value<T>) -> SideEffects {
        value.side_effects().cloned().unwrap_or_default()
    }

    pub fn id(&self) -> SideEffectId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn execute(&self) -> Result<(), SideEffectError> {
        (self.action)().map_err(|cause| SideEffectError::new(self.label.clone(), cause))
    }
}

impl PartialEq for SideEffect {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SideEffect {}

impl Debug for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffect")
            .field("id", &self.id.0)
            .field("label", &self.label)
            .finish()
    }
}

/// Ordered list of pending side effects, unique by identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SideEffects(Vec<SideEffect>);

impl SideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `effect` unless an effect with the same identity is already
    /// listed.
    pub fn push(&mut self, effect: SideEffect) {
        if !self.contains(effect.id) {
            self.0.push(effect);
        }
    }

    pub fn extend(&mut self, other: SideEffects) {
        for effect in other.0 {
            self.push(effect);
        }
    }

    pub fn contains(&self, id: SideEffectId) -> bool {
        self.0.iter().any(|effect| effect.id == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SideEffect> {
        self.0.iter()
    }
}

impl FromIterator<SideEffect> for SideEffects {
    fn from_iter<I: IntoIterator<Item = SideEffect>>(iter: I) -> Self {
        let mut effects = SideEffects::new();
        for effect in iter {
            effects.push(effect);
        }
        effects
    }
}

/// One-shot guard held by the ultimate consumer of values.
///
/// A side effect whose id has been seen by this guard is never run again
/// through it, which keeps structurally shared subtrees from firing twice.
#[derive(Debug, Default)]
pub struct SideEffectGuard {
    executed: HashSet<SideEffectId>,
}

impl SideEffectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_run(&self, id: SideEffectId) -> bool {
        self.executed.contains(&id)
    }

    /// Runs every effect not yet seen by this guard, in list order.
    ///
    /// An effect is marked as seen before it runs, so a failing effect is not
    /// retried by a later call.
    pub fn run(&mut self, effects: &SideEffects) -> Result<(), CollectorError> {
        for effect in effects.iter() {
            if !self.executed.insert(effect.id) {
                tracing::debug!(label = %effect.label, "side effect already executed, skipping");
                continue;
            }

            tracing::debug!(label = %effect.label, "running side effect");
            effect.execute()?;
        }

        Ok(())
    }
}

/// Result of evaluating a lazy computation right now.
#[derive(Clone, Debug)]
pub enum Value<T> {
    Missing(Missing),
    Present { value: T, side_effects: SideEffects },
}

impl Value<()> {
    /// Present value used by collectors, whose payload lives in the destination.
    pub fn present() -> Self {
        Value::of(())
    }
}

impl<T> Value<T> {
    pub fn of(value: T) -> Self {
        Value::Present {
            value,
            side_effects: SideEffects::new(),
        }
    }

    pub fn missing() -> Self {
        Value::Missing(Missing::new())
    }

    pub fn missing_because(reason: impl Into<Arc<str>>) -> Self {
        Value::Missing(Missing::because(reason))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing(_))
    }

    pub fn is_present(&self) -> bool {
        !self.is_missing()
    }

    pub fn missing_reason(&self) -> Option<&Missing> {
        match self {
            Value::Missing(missing) => Some(missing),
            Value::Present { .. } => None,
        }
    }

    /// Returns a value with `effect` appended. Missing values carry no side
    /// effects and are returned unchanged.
    pub fn with_side_effect(self, effect: SideEffect) -> Self {
        match self {
            Value::Missing(missing) => Value::Missing(missing),
            Value::Present {
                value,
                mut side_effects,
            } => {
                side_effects.push(effect);
                Value::Present {
                    value,
                    side_effects,
                }
            }
        }
    }

    pub fn with_side_effects(self, effects: SideEffects) -> Self {
        match self {
            Value::Missing(missing) => Value::Missing(missing),
            Value::Present {
                value,
                mut side_effects,
            } => {
                side_effects.extend(effects);
                Value::Present {
                    value,
                    side_effects,
                }
            }
        }
    }

    pub fn side_effects(&self) -> Option<&SideEffects> {
        match self {
            Value::Missing(_) => None,
            Value::Present { side_effects, .. } => Some(side_effects),
        }
    }

    /// Pushes an outer display name onto the explanation of a missing value.
    pub fn pushing(self, name: impl Into<Arc<str>>) -> Self {
        match self {
            Value::Missing(missing) => Value::Missing(missing.pushing(name)),
            present => present,
        }
    }

    /// Peeks at the payload. Never runs side effects.
    pub fn get_without_side_effect(&self) -> Option<&T> {
        match self {
            Value::Missing(_) => None,
            Value::Present { value, .. } => Some(value),
        }
    }

    /// Takes the payload and drops the pending side effects.
    pub fn without_side_effect(self) -> Option<T> {
        match self {
            Value::Missing(_) => None,
            Value::Present { value, .. } => Some(value),
        }
    }

    /// Takes the payload together with the side effects the caller is now
    /// responsible for running.
    pub fn into_parts(self) -> Result<(T, SideEffects), Missing> {
        match self {
            Value::Missing(missing) => Err(missing),
            Value::Present {
                value,
                side_effects,
            } => Ok((value, side_effects)),
        }
    }

    /// Takes the payload and runs its pending side effects through `guard`.
    pub fn commit(self, guard: &mut SideEffectGuard) -> Result<T, CollectorError> {
        let (value, side_effects) = self.into_parts().map_err(CollectorError::MissingValue)?;
        guard.run(&side_effects)?;
        Ok(value)
    }

    /// Maps the payload, keeping side effects and missing reasons intact.
    pub fn transform<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Value::Missing(missing) => Value::Missing(missing),
            Value::Present {
                value,
                side_effects,
            } => Value::Present {
                value: f(value),
                side_effects,
            },
        }
    }
}
