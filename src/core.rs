use std::any::{TypeId, type_name};
use std::fmt::{Debug, Display, Write};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Bound shared by every element type a collector can hold.
///
/// Elements are compared by value (for difference and unique collection),
/// hashed (for structural fingerprints) and shared across threads.
pub trait Element: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Address of a shared allocation, used as the identity of providers,
/// predicates and factories.
pub(crate) fn address_of<P: ?Sized>(shared: &Arc<P>) -> usize {
    Arc::as_ptr(shared).cast::<()>() as usize
}

/// Read-mode marker passed through every presence and value calculation.
///
/// Collectors never interpret it, they hand it to the providers they wrap,
/// which decide whether a read is allowed from the calling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueConsumer {
    /// Reads that might observe a value which changes later are allowed.
    #[default]
    IgnoreUnsafeRead,
    /// Reads that might observe a value which changes later should fail.
    DisallowUnsafeRead,
}

/// Runtime tag naming the element type a collector is expected to produce.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
}

impl ElementType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl Debug for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ElementType({})", self.name)
    }
}

/// Structural fingerprint of a collector tree, 32 bytes of keyed BLAKE3.
///
/// Two trees with the same fingerprint are built from the same literals and
/// the same provider instances, so a snapshot taken for one can be reused for
/// the other. Provider identity is an address, which makes fingerprints valid
/// only within the process that computed them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash32([u8; 32]);

impl Hash32 {
    /// Fingerprints anything hashable.
    pub fn of<H: Hash + ?Sized>(value: &H) -> Self {
        let mut hasher = FingerprintHasher::new();
        value.hash(&mut hasher);
        hasher.fingerprint()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        self.0.iter().fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
    }
}

impl Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Hash32").field(&self.to_hex()).finish()
    }
}

/// Short form, the first 8 bytes in hex.
impl Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0[..8].iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

const FINGERPRINT_CONTEXT: &str = "lazy-collectors 2026 collector tree fingerprint";

/// [`Hasher`] over a BLAKE3 hasher in key derivation mode.
pub(crate) struct FingerprintHasher(blake3::Hasher);

impl FingerprintHasher {
    pub(crate) fn new() -> Self {
        Self(blake3::Hasher::new_derive_key(FINGERPRINT_CONTEXT))
    }

    pub(crate) fn fingerprint(&self) -> Hash32 {
        Hash32(*self.0.finalize().as_bytes())
    }
}

impl Hasher for FingerprintHasher {
    fn finish(&self) -> u64 {
        let [a, b, c, d, e, f, g, h, ..] = *self.0.finalize().as_bytes();
        u64::from_le_bytes([a, b, c, d, e, f, g, h])
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}
