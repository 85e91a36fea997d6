//! The capability record for key types (Design Notes: "Dynamic dispatch
//! over key types"). Replaces a runtime "is K orderable" type probe with an
//! explicit, caller-supplied capability bit: equality and hashing are
//! mandatory, a total order is optional and, when present, may still fail
//! to compare two particular keys (a partial order smuggled in as `Ord`,
//! or a comparator that panics on some inputs).

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};

use hashbrown::hash_map::DefaultHashBuilder;

use crate::error::Error;

/// Equality, hashing, and an optional total order over `K`.
///
/// `try_cmp` returning `Err(Error::ComparisonFailed)` (or panicking, which
/// `Index::new`'s ordering probe catches and converts to the same error)
/// is how a "total order that secretly isn't" announces itself: the caller
/// never crashes, the index is simply treated as unordered from that point
/// on.
pub trait KeyOps<K> {
    fn eq(&self, a: &K, b: &K) -> bool;
    fn hash(&self, k: &K) -> u64;
    fn try_cmp(&self, a: &K, b: &K) -> Result<Ordering, Error>;
    /// Whether this `KeyOps` is even capable of ordering keys at all. A
    /// `KeyOps` for a key type with no usable order (Design Notes: "for
    /// key types with no usable order, `false`") returns `false`
    /// unconditionally rather than ever calling `try_cmp`.
    fn is_orderable(&self) -> bool;
}

/// Catches a panicking comparator and reports it as `ComparisonFailed`
/// instead of unwinding past the crate boundary. Used by any `KeyOps`
/// impl (including [`OrdKeyOps`]) whose `Ord`/`PartialOrd` call could
/// itself panic, e.g. a tuple with a `NaN` float component.
pub(crate) fn catch_cmp<F>(f: F) -> Result<Ordering, Error>
where
    F: FnOnce() -> Ordering,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|_| Error::ComparisonFailed)
}

/// The default `KeyOps` for key types that already implement `Ord + Hash +
/// Eq`. Most callers use this; it is what `Index::new_ordered` and
/// friends plug in implicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrdKeyOps;

impl<K: Ord + Hash + Eq> KeyOps<K> for OrdKeyOps {
    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }

    fn hash(&self, k: &K) -> u64 {
        let mut hasher = DefaultHashBuilder::default().build_hasher();
        k.hash(&mut hasher);
        hasher.finish()
    }

    fn try_cmp(&self, a: &K, b: &K) -> Result<Ordering, Error> {
        catch_cmp(|| a.cmp(b))
    }

    fn is_orderable(&self) -> bool {
        true
    }
}

/// A `KeyOps` for key types with equality and hashing but no usable total
/// order (Design Notes: "for key types with no usable order, `false`").
/// `try_cmp` is never called because `is_orderable` is `false`; it exists
/// only to satisfy the trait and always reports failure if it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnorderedKeyOps;

impl<K: Hash + Eq> KeyOps<K> for UnorderedKeyOps {
    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }

    fn hash(&self, k: &K) -> u64 {
        let mut hasher = DefaultHashBuilder::default().build_hasher();
        k.hash(&mut hasher);
        hasher.finish()
    }

    fn try_cmp(&self, _a: &K, _b: &K) -> Result<Ordering, Error> {
        Err(Error::ComparisonFailed)
    }

    fn is_orderable(&self) -> bool {
        false
    }
}

/// A `KeyOps` built from a plain comparator closure, for callers who have
/// neither `Ord` nor want the panic-catching ceremony spelled out
/// themselves, e.g. tests exercising the "comparator panics on some
/// tuples" scenario (spec S3) construct one of these around a closure
/// that panics on purpose.
pub struct ComparatorKeyOps<K, H, C> {
    hash_fn: H,
    cmp_fn: C,
    _marker: std::marker::PhantomData<K>,
}

impl<K, H, C> ComparatorKeyOps<K, H, C>
where
    H: Fn(&K) -> u64,
    C: Fn(&K, &K) -> Ordering,
{
    pub fn new(hash_fn: H, cmp_fn: C) -> Self {
        Self {
            hash_fn,
            cmp_fn,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<K, H, C> KeyOps<K> for ComparatorKeyOps<K, H, C>
where
    K: Eq,
    H: Fn(&K) -> u64,
    C: Fn(&K, &K) -> Ordering,
{
    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }

    fn hash(&self, k: &K) -> u64 {
        (self.hash_fn)(k)
    }

    fn try_cmp(&self, a: &K, b: &K) -> Result<Ordering, Error> {
        catch_cmp(|| (self.cmp_fn)(a, b))
    }

    fn is_orderable(&self) -> bool {
        true
    }
}
