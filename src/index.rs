//! The `Index<K>` value: a bijection between keys and a contiguous address
//! range, plus lazy ordering detection and nearest-key lookup.
//!
//! Grounded on `algebra/checked.rs`'s `Checked<T>` newtype pattern (wrap a
//! primitive, keep every operation on it total) for [`Address`](crate::address::Address)
//! and on the teacher's own lazy-field idiom: `once_cell::sync::OnceCell`
//! is already a teacher dependency, used the same "compute once, publish"
//! way here for `is_ordered` and the reversed-key index (§5's "safe for
//! concurrent first readers").

use once_cell::sync::OnceCell;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::address::Address;
use crate::error::Error;
use crate::key::KeyOps;
use crate::types::Semantics;

/// The outcome of [`Index::lookup`]. The returned key can differ from the
/// queried one under `NearestSmaller`/`NearestGreater` semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult<K> {
    Present(K, Address),
    Missing,
}

impl<K> LookupResult<K> {
    pub fn is_present(&self) -> bool {
        matches!(self, LookupResult::Present(..))
    }

    pub fn into_option(self) -> Option<(K, Address)> {
        match self {
            LookupResult::Present(k, a) => Some((k, a)),
            LookupResult::Missing => None,
        }
    }
}

/// A bijection between a key space and the contiguous address range
/// `[0, len)`. Immutable once built; every transformation in
/// [`crate::builder`] returns a fresh one.
pub struct Index<K> {
    keys: Vec<K>,
    buckets: hashbrown::HashMap<u64, Vec<usize>>,
    ops: Arc<dyn KeyOps<K>>,
    ordered: OnceCell<bool>,
    reversed: OnceCell<Vec<usize>>,
}

impl<K: Clone> Clone for Index<K> {
    fn clone(&self) -> Self {
        let ordered = OnceCell::new();
        if let Some(v) = self.ordered.get() {
            let _ = ordered.set(*v);
        }
        Self {
            keys: self.keys.clone(),
            buckets: self.buckets.clone(),
            ops: self.ops.clone(),
            ordered,
            reversed: OnceCell::new(),
        }
    }
}

impl<K: std::fmt::Debug> std::fmt::Debug for Index<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("keys", &self.keys)
            .field("ordered", &self.ordered.get())
            .finish()
    }
}

impl<K> Index<K> {
    /// Build an index over `keys`. Rejects duplicates with
    /// [`Error::DuplicateKey`] (spec scenario S1). `ordered` pins
    /// `is_ordered` when the caller already knows it; `None` defers to
    /// lazy detection on first access. `ops` is an `Arc` rather than a
    /// `Box` so every index the builder derives from this one can share
    /// the same capability record instead of re-wrapping a fresh copy.
    pub fn new(keys: Vec<K>, ordered: Option<bool>, ops: Arc<dyn KeyOps<K>>) -> Result<Self, Error> {
        let mut buckets: hashbrown::HashMap<u64, Vec<usize>> = hashbrown::HashMap::with_capacity(keys.len());
        for (idx, key) in keys.iter().enumerate() {
            let h = ops.hash(key);
            let bucket = buckets.entry(h).or_insert_with(Vec::new);
            if bucket.iter().any(|&i| ops.eq(&keys[i], key)) {
                log::warn!("rejecting index with duplicate key at address {idx}");
                return Err(Error::DuplicateKey(format!(
                    "duplicate key at address {idx}"
                )));
            }
            bucket.push(idx);
        }

        let ordered_cell = OnceCell::new();
        if let Some(v) = ordered {
            let _ = ordered_cell.set(v);
        }

        Ok(Self {
            keys,
            buckets,
            ops,
            ordered: ordered_cell,
            reversed: OnceCell::new(),
        })
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn range(&self) -> Option<(Address, Address)> {
        crate::address::range_of(self.keys.len())
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&K, Address)> + '_ {
        self.keys.iter().enumerate().map(|(i, k)| (k, Address::new(i)))
    }

    pub fn key_at(&self, addr: Address) -> Option<&K> {
        self.keys.get(addr.get())
    }

    pub fn comparer(&self) -> &dyn KeyOps<K> {
        self.ops.as_ref()
    }

    /// Share this index's capability record with a derived index. Every
    /// `IndexBuilder` operation that produces a new `Index<K>` from an
    /// existing one goes through this rather than requiring the caller
    /// to rebuild a `KeyOps<K>` from scratch.
    pub fn ops_arc(&self) -> Arc<dyn KeyOps<K>> {
        self.ops.clone()
    }

    /// Whether `keys` is non-decreasing under `comparer`, computed at most
    /// once. A comparator that panics or fails mid-scan degrades the
    /// index to unordered rather than propagating.
    pub fn is_ordered(&self) -> bool {
        *self.ordered.get_or_init(|| compute_is_ordered(&self.keys, self.ops.as_ref()))
    }

    /// `(first_key, last_key)`. Fails with [`Error::UnorderedIndex`] when
    /// the index is not ordered; `Ok(None)` for an ordered-but-empty index.
    pub fn key_range(&self) -> Result<Option<(&K, &K)>, Error> {
        if !self.is_ordered() {
            return Err(Error::UnorderedIndex);
        }
        Ok(match (self.keys.first(), self.keys.last()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
    }

    /// Key indices in descending address order, memoized once. Not needed
    /// by `lookup` (binary search over `keys` already runs in both
    /// directions), but kept as a second "compute once, publish" field
    /// alongside `is_ordered` per the concurrency model.
    fn reversed_indices(&self) -> &[usize] {
        self.reversed.get_or_init(|| (0..self.keys.len()).rev().collect())
    }

    pub fn keys_reversed(&self) -> impl Iterator<Item = &K> + '_ {
        self.reversed_indices().iter().map(move |&i| &self.keys[i])
    }

    fn address_of(&self, key: &K) -> Option<Address> {
        let h = self.ops.hash(key);
        self.buckets
            .get(&h)?
            .iter()
            .find(|&&i| self.ops.eq(&self.keys[i], key))
            .map(|&i| Address::new(i))
    }

    /// First index `i` with `keys[i] >= target` under `comparer` (a
    /// lower-bound binary search). Only meaningful when `is_ordered`.
    fn lower_bound(&self, target: &K) -> Result<usize, Error> {
        let mut lo = 0usize;
        let mut hi = self.keys.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.ops.try_cmp(&self.keys[mid], target)? {
                Ordering::Less => lo = mid + 1,
                Ordering::Equal | Ordering::Greater => hi = mid,
            }
        }
        Ok(lo)
    }

    fn nearest_smaller(&self, target: &K, check: &dyn Fn(Address) -> bool) -> Result<LookupResult<K>, Error>
    where
        K: Clone,
    {
        let lb = self.lower_bound(target)?;
        let mut cursor = if lb < self.keys.len() && self.ops.try_cmp(&self.keys[lb], target)? == Ordering::Equal {
            Some(lb)
        } else if lb > 0 {
            Some(lb - 1)
        } else {
            None
        };
        while let Some(i) = cursor {
            let addr = Address::new(i);
            if check(addr) {
                return Ok(LookupResult::Present(self.keys[i].clone(), addr));
            }
            cursor = if i == 0 { None } else { Some(i - 1) };
        }
        Ok(LookupResult::Missing)
    }

    fn nearest_greater(&self, target: &K, check: &dyn Fn(Address) -> bool) -> Result<LookupResult<K>, Error>
    where
        K: Clone,
    {
        let lb = self.lower_bound(target)?;
        let mut cursor = if lb < self.keys.len() { Some(lb) } else { None };
        while let Some(i) = cursor {
            let addr = Address::new(i);
            if check(addr) {
                return Ok(LookupResult::Present(self.keys[i].clone(), addr));
            }
            cursor = if i + 1 < self.keys.len() { Some(i + 1) } else { None };
        }
        Ok(LookupResult::Missing)
    }

    /// Resolve `key` under `semantics`, skipping any address `check`
    /// rejects. `check` is interpreted literally per the specification's
    /// rule 1 (`check(addr)` true means "accept this address"); the
    /// source's inverted `hasNot` helper is not replicated here.
    pub fn lookup(
        &self,
        key: &K,
        semantics: Semantics,
        check: &dyn Fn(Address) -> bool,
    ) -> Result<LookupResult<K>, Error>
    where
        K: Clone,
    {
        if let Some(addr) = self.address_of(key) {
            if matches!(semantics, Semantics::Exact) {
                return Ok(LookupResult::Present(key.clone(), addr));
            }
            if check(addr) {
                return Ok(LookupResult::Present(key.clone(), addr));
            }
        } else if matches!(semantics, Semantics::Exact) {
            return Ok(LookupResult::Missing);
        }

        if matches!(semantics, Semantics::Exact) {
            return Ok(LookupResult::Missing);
        }
        if !self.is_ordered() {
            return Ok(LookupResult::Missing);
        }

        match semantics {
            Semantics::NearestSmaller => self.nearest_smaller(key, check),
            Semantics::NearestGreater => self.nearest_greater(key, check),
            Semantics::Exact => unreachable!("handled above"),
        }
    }
}

fn compute_is_ordered<K>(keys: &[K], ops: &dyn KeyOps<K>) -> bool {
    if !ops.is_orderable() {
        return false;
    }
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        for w in keys.windows(2) {
            match ops.try_cmp(&w[0], &w[1]) {
                Ok(Ordering::Greater) | Err(_) => return false,
                _ => {}
            }
        }
        true
    }))
    .unwrap_or(false)
}
