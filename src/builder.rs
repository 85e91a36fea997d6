//! `IndexBuilder`: dispatches every index transformation in the
//! specification onto the alignment/chunking kernels and assembles the
//! matching relocation plan(s).
//!
//! Grounded on `operator/index.rs`: the teacher's `Index` operator is a
//! thin `PhantomData`-only struct whose whole job is dispatching into the
//! reusable `layers::Trie`/`Builder` machinery rather than implementing
//! any algorithm itself. `IndexBuilder` plays the same role here over
//! `align`/`chunk`/`Index::lookup`.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::address::Address;
use crate::align;
use crate::chunk;
use crate::error::Error;
use crate::index::{Index, LookupResult};
use crate::key::KeyOps;
use crate::plan::{Transform, VectorPlan};
use crate::types::{Aggregation, BoundaryBehavior, Direction, Semantics, WindowOrChunk};
use crate::vector::VectorBuilder;

fn plan_range(len: usize) -> (Address, Address) {
    crate::address::range_of(len).unwrap_or((Address::new(0), Address::new(0)))
}

/// Align `l_pairs`/`r_pairs` for `union`/`intersect`. `align_ordered`'s own
/// contract (§4.3) requires both streams to already be sorted, so it is
/// only even attempted when both source indices report `is_ordered()`;
/// an unordered input goes straight to `align_unordered` rather than being
/// fed through a merge that assumes sortedness it doesn't have (spec
/// table: "`Y` if both ordered and merge succeeds; else `N`"). Only when
/// both inputs are ordered *and* the comparator doesn't fail mid-merge is
/// the result itself ordered.
fn align_for_merge<K: Clone>(
    l_ordered: bool,
    r_ordered: bool,
    l_pairs: &[(K, Address)],
    r_pairs: &[(K, Address)],
    ops: &dyn KeyOps<K>,
    site: &str,
) -> Result<(Vec<align::AlignedRow<K>>, bool), Error> {
    if !l_ordered || !r_ordered {
        log::debug!("{site}: at least one input is unordered, using unordered merge");
        return Ok((align::align_unordered(l_pairs, r_pairs, ops), false));
    }
    match align::align_ordered(l_pairs, r_pairs, ops) {
        Ok(rows) => Ok((rows, true)),
        Err(Error::ComparisonFailed) => {
            log::debug!("{site}: ordered alignment failed, degrading to unordered merge");
            Ok((align::align_unordered(l_pairs, r_pairs, ops), false))
        }
        Err(e) => Err(e),
    }
}

/// A stateless dispatcher holding only a reference to the vector-builder
/// factory (§5: "a stateless value holding only a reference to the
/// vector-builder factory"), needed for the `aggregate`/`group_by`/
/// `resample` family's `CreateMissing` step.
pub struct IndexBuilder<'vb, V, VB> {
    vector_builder: &'vb VB,
    _marker: PhantomData<V>,
}

impl<'vb, V, VB: VectorBuilder<V>> IndexBuilder<'vb, V, VB> {
    pub fn new(vector_builder: &'vb VB) -> Self {
        Self {
            vector_builder,
            _marker: PhantomData,
        }
    }

    /// §4.5 constructor, exposed through the builder so every operation
    /// in this module (including `create`) returns the uniform
    /// `(Index, Plan)` shape.
    pub fn create<K>(
        &self,
        keys: Vec<K>,
        ordered: Option<bool>,
        ops: Arc<dyn KeyOps<K>>,
        v: VectorPlan<V>,
    ) -> Result<(Index<K>, VectorPlan<V>), Error> {
        let idx = Index::new(keys, ordered, ops)?;
        Ok((idx, v))
    }

    /// Identity. There is exactly one `Index<K>` representation in this
    /// crate (the "linear" one of §4.6's normalization paragraph), so
    /// `project` never has anything to rewrite.
    pub fn project<K: Clone>(
        &self,
        idx: &Index<K>,
        v: VectorPlan<V>,
    ) -> Result<(Index<K>, VectorPlan<V>), Error> {
        Ok((idx.clone(), v))
    }

    /// Stable sort `idx`'s keys under its own comparator; old addresses
    /// are recovered with an `Exact` lookup against `idx` itself.
    pub fn order<K: Clone>(
        &self,
        idx: &Index<K>,
        v: VectorPlan<V>,
    ) -> Result<(Index<K>, VectorPlan<V>), Error> {
        let ops = idx.ops_arc();
        let mut sorted: Vec<K> = idx.keys().to_vec();
        let mut sort_err: Option<Error> = None;
        sorted.sort_by(|a, b| match ops.try_cmp(a, b) {
            Ok(ord) => ord,
            Err(e) => {
                sort_err = Some(e);
                std::cmp::Ordering::Equal
            }
        });
        if let Some(e) = sort_err {
            return Err(e);
        }

        let always = |_: Address| true;
        let mut pairs = Vec::with_capacity(sorted.len());
        for (new_pos, key) in sorted.iter().enumerate() {
            match idx.lookup(key, Semantics::Exact, &always)? {
                LookupResult::Present(_, old_addr) => pairs.push((Address::new(new_pos), old_addr)),
                LookupResult::Missing => {
                    panic!("order: sorted key vanished from the source index, invariant violated")
                }
            }
        }

        let new_range = plan_range(sorted.len());
        let new_index = Index::new(sorted, Some(true), ops)?;
        Ok((new_index, VectorPlan::relocate(v, new_range, pairs)))
    }

    /// Merge `L` and `R` by key. Only attempts `align_ordered` when both
    /// sides are already ordered (its own contract, §4.3, requires sorted
    /// inputs); on `ComparisonFailed`, or when either side is unordered
    /// to begin with, degrades to `align_unordered` (spec §4.3/§4.7).
    pub fn union<K: Clone>(
        &self,
        l: &Index<K>,
        vl: VectorPlan<V>,
        r: &Index<K>,
        vr: VectorPlan<V>,
    ) -> Result<(Index<K>, VectorPlan<V>, VectorPlan<V>), Error> {
        let ops = l.ops_arc();
        let l_pairs: Vec<(K, Address)> = l.mappings().map(|(k, a)| (k.clone(), a)).collect();
        let r_pairs: Vec<(K, Address)> = r.mappings().map(|(k, a)| (k.clone(), a)).collect();

        let (rows, ordered) = align_for_merge(
            l.is_ordered(),
            r.is_ordered(),
            &l_pairs,
            &r_pairs,
            ops.as_ref(),
            "union",
        )?;

        let new_keys: Vec<K> = rows.iter().map(|row| row.key.clone()).collect();
        let new_range = plan_range(new_keys.len());
        let mut l_out = Vec::new();
        let mut r_out = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let addr = Address::new(i);
            if let Some(old) = row.left {
                l_out.push((addr, old));
            }
            if let Some(old) = row.right {
                r_out.push((addr, old));
            }
        }

        let new_index = Index::new(new_keys, Some(ordered), ops)?;
        Ok((
            new_index,
            VectorPlan::relocate(vl, new_range, l_out),
            VectorPlan::relocate(vr, new_range, r_out),
        ))
    }

    /// `union` wrapped in a `Combine` under `transform` (spec's universal
    /// law 5: append distributes over combine-of-union).
    pub fn append<K: Clone>(
        &self,
        l: &Index<K>,
        vl: VectorPlan<V>,
        r: &Index<K>,
        vr: VectorPlan<V>,
        transform: impl Into<Transform>,
    ) -> Result<(Index<K>, VectorPlan<V>), Error> {
        let (idx, plan_l, plan_r) = self.union(l, vl, r, vr)?;
        Ok((idx, VectorPlan::combine(plan_l, plan_r, transform)))
    }

    /// Same alignment as `union`, keeping only rows present on both sides.
    pub fn intersect<K: Clone>(
        &self,
        l: &Index<K>,
        vl: VectorPlan<V>,
        r: &Index<K>,
        vr: VectorPlan<V>,
    ) -> Result<(Index<K>, VectorPlan<V>, VectorPlan<V>), Error> {
        let ops = l.ops_arc();
        let l_pairs: Vec<(K, Address)> = l.mappings().map(|(k, a)| (k.clone(), a)).collect();
        let r_pairs: Vec<(K, Address)> = r.mappings().map(|(k, a)| (k.clone(), a)).collect();

        let (rows, ordered) = align_for_merge(
            l.is_ordered(),
            r.is_ordered(),
            &l_pairs,
            &r_pairs,
            ops.as_ref(),
            "intersect",
        )?;

        let kept: Vec<_> = rows
            .into_iter()
            .filter(|row| row.left.is_some() && row.right.is_some())
            .collect();
        let new_keys: Vec<K> = kept.iter().map(|row| row.key.clone()).collect();
        let new_range = plan_range(new_keys.len());
        let mut l_out = Vec::with_capacity(kept.len());
        let mut r_out = Vec::with_capacity(kept.len());
        for (i, row) in kept.into_iter().enumerate() {
            let addr = Address::new(i);
            l_out.push((addr, row.left.expect("filtered on left.is_some()")));
            r_out.push((addr, row.right.expect("filtered on right.is_some()")));
        }

        let new_index = Index::new(new_keys, Some(ordered), ops)?;
        Ok((
            new_index,
            VectorPlan::relocate(vl, new_range, l_out),
            VectorPlan::relocate(vr, new_range, r_out),
        ))
    }

    /// Map each address to an optional new key; drop unmapped rows;
    /// always forces `is_ordered = false` regardless of whether the new
    /// keys happen to come out sorted (spec table: "N").
    pub fn with_index<K, K2: Clone>(
        &self,
        idx: &Index<K>,
        v: VectorPlan<V>,
        f: impl Fn(Address) -> Option<K2>,
        ops2: Arc<dyn KeyOps<K2>>,
    ) -> Result<(Index<K2>, VectorPlan<V>), Error> {
        let mut new_keys = Vec::new();
        let mut pairs = Vec::new();
        for (_, addr) in idx.mappings() {
            if let Some(k2) = f(addr) {
                pairs.push((Address::new(new_keys.len()), addr));
                new_keys.push(k2);
            }
        }
        let new_range = plan_range(new_keys.len());
        let new_index = Index::new(new_keys, Some(false), ops2)?;
        Ok((new_index, VectorPlan::relocate(v, new_range, pairs)))
    }

    /// For each `(key_r, addr_r)` in `r`, look it up in `l` under
    /// `sem`/`check`; on a hit, emit `(addr_r, addr_found_in_l)`. Returns
    /// only the plan; the resulting index is `r` itself (spec: "index
    /// used is R").
    pub fn reindex<K: Clone>(
        &self,
        l: &Index<K>,
        r: &Index<K>,
        sem: Semantics,
        v: VectorPlan<V>,
        check: &dyn Fn(Address) -> bool,
    ) -> Result<VectorPlan<V>, Error> {
        let mut pairs = Vec::new();
        for (key_r, addr_r) in r.mappings() {
            if let LookupResult::Present(_, found) = l.lookup(key_r, sem, check)? {
                pairs.push((addr_r, found));
            }
        }
        let new_range = plan_range(r.len());
        Ok(VectorPlan::relocate(v, new_range, pairs))
    }

    /// Keep only the addresses whose key satisfies `matcher`; re-address
    /// from zero. A subsequence of an ordered sequence is still ordered,
    /// so `is_ordered` is inherited rather than forced.
    pub fn lookup_level<K: Clone>(
        &self,
        idx: &Index<K>,
        v: VectorPlan<V>,
        matcher: impl Fn(&K) -> bool,
    ) -> Result<(Index<K>, VectorPlan<V>), Error> {
        let mut new_keys = Vec::new();
        let mut pairs = Vec::new();
        for (k, addr) in idx.mappings() {
            if matcher(k) {
                pairs.push((Address::new(new_keys.len()), addr));
                new_keys.push(k.clone());
            }
        }
        let new_range = plan_range(new_keys.len());
        let new_index = Index::new(new_keys, Some(idx.is_ordered()), idx.ops_arc())?;
        Ok((new_index, VectorPlan::relocate(v, new_range, pairs)))
    }

    /// Drop a single key. Fails with `KeyNotFound` if absent.
    pub fn drop_item<K: Clone>(
        &self,
        idx: &Index<K>,
        v: VectorPlan<V>,
        key: &K,
    ) -> Result<(Index<K>, VectorPlan<V>), Error> {
        let always = |_: Address| true;
        let addr = match idx.lookup(key, Semantics::Exact, &always)? {
            LookupResult::Present(_, addr) => addr,
            LookupResult::Missing => return Err(Error::KeyNotFound("drop_item: key not present".into())),
        };
        let new_keys: Vec<K> = idx
            .keys()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != addr.get())
            .map(|(_, k)| k.clone())
            .collect();
        let new_index = Index::new(new_keys, Some(idx.is_ordered()), idx.ops_arc())?;
        Ok((new_index, VectorPlan::drop_range(v, (addr, addr))))
    }

    /// Slice `idx` to `[lo, hi]` resolved via `NearestGreater`/
    /// `NearestSmaller` lookups, then adjusted for `Exclusive` bounds
    /// (spec §4.6's detailed `get_range` algorithm). Missing bounds fall
    /// back to the natural ends of the index; a bound that resolves to
    /// nothing, or a crossed `lo > hi`, yields the empty index untouched
    /// by an error (§7: "`InvalidRange` ... handled by returning empty").
    ///
    /// Every caller here already holds the crate's one `Index<K>`
    /// representation, so there is no non-linear incoming index to
    /// normalize first (spec's "normalizing a non-linear incoming index"
    /// paragraph does not apply when only one representation exists).
    pub fn get_range<K: Clone>(
        &self,
        idx: &Index<K>,
        v: VectorPlan<V>,
        lo: Option<(K, BoundaryBehavior)>,
        hi: Option<(K, BoundaryBehavior)>,
    ) -> Result<(Index<K>, VectorPlan<V>), Error> {
        let always = |_: Address| true;

        let lo_addr = match lo {
            Some((key, behavior)) => match idx.lookup(&key, Semantics::NearestGreater, &always)? {
                LookupResult::Present(_, addr) => Some(match behavior {
                    BoundaryBehavior::Exclusive => addr.increment(),
                    BoundaryBehavior::Inclusive => addr,
                }),
                LookupResult::Missing => None,
            },
            None => idx.range().map(|(lo, _)| lo),
        };

        let hi_addr = match hi {
            Some((key, behavior)) => match idx.lookup(&key, Semantics::NearestSmaller, &always)? {
                LookupResult::Present(_, addr) => match behavior {
                    BoundaryBehavior::Exclusive if addr.get() == 0 => None,
                    BoundaryBehavior::Exclusive => Some(addr.decrement()),
                    BoundaryBehavior::Inclusive => Some(addr),
                },
                LookupResult::Missing => None,
            },
            None => idx.range().map(|(_, hi)| hi),
        };

        let (lo_addr, hi_addr) = match (lo_addr, hi_addr) {
            (Some(l), Some(h)) if l.get() <= h.get() => (l, h),
            _ => return Ok(self.empty_result(idx, v)),
        };

        let new_keys: Vec<K> = idx.keys()[lo_addr.get()..=hi_addr.get()].to_vec();
        let new_index = Index::new(new_keys, Some(idx.is_ordered()), idx.ops_arc())?;
        Ok((new_index, VectorPlan::get_range(v, (lo_addr, hi_addr))))
    }

    fn empty_result<K: Clone>(&self, idx: &Index<K>, v: VectorPlan<V>) -> (Index<K>, VectorPlan<V>) {
        let _ = v;
        let empty = Index::new(Vec::new(), Some(true), idx.ops_arc()).expect("an empty key set never duplicates");
        (empty, VectorPlan::Empty)
    }

    fn chunk_keys<K: Clone>(&self, keys: &[K], agg: &Aggregation<K>) -> Vec<WindowOrChunk<K>> {
        match agg {
            Aggregation::WindowSize(n, boundary) => chunk::windowed_size(keys, *n, *boundary)
                .map(WindowOrChunk::Window)
                .collect(),
            Aggregation::ChunkSize(n, boundary) => chunk::chunked_size(keys, *n, *boundary)
                .map(WindowOrChunk::Chunk)
                .collect(),
            Aggregation::WindowWhile(cond) => chunk::windowed_while(keys, |a, b| cond(a, b))
                .map(WindowOrChunk::Window)
                .collect(),
            Aggregation::ChunkWhile(cond) => chunk::chunked_while(keys, |a, b| cond(a, b))
                .map(WindowOrChunk::Chunk)
                .collect(),
        }
    }

    /// Chunk `idx`'s keys per `agg`, reduce each chunk to one `(key,
    /// value)` pair via `key_sel`/`val_sel`, and assemble the result
    /// vector with `CreateMissing`. Always forces `is_ordered = false`
    /// (spec table: "N") since a window/chunk's derived key need not
    /// relate monotonically to its source keys.
    pub fn aggregate<K: Clone>(
        &self,
        idx: &Index<K>,
        agg: Aggregation<K>,
        v: VectorPlan<V>,
        val_sel: impl Fn(&Index<K>, &VectorPlan<V>) -> Option<V>,
        key_sel: impl Fn(&WindowOrChunk<K>, &Index<K>, &VectorPlan<V>) -> K,
    ) -> Result<(Index<K>, VectorPlan<V>), Error>
    where
        V: Clone,
    {
        if !idx.is_ordered() {
            return Err(Error::UnorderedIndex);
        }
        let windows = self.chunk_keys(idx.keys(), &agg);

        let mut new_keys = Vec::with_capacity(windows.len());
        let mut values = Vec::with_capacity(windows.len());
        for w in &windows {
            let keys = w.keys();
            if keys.is_empty() {
                continue;
            }
            let first = keys[0].clone();
            let last = keys[keys.len() - 1].clone();
            let (sub_idx, sub_plan) = self.get_range(
                idx,
                v.clone(),
                Some((first, BoundaryBehavior::Inclusive)),
                Some((last, BoundaryBehavior::Inclusive)),
            )?;
            new_keys.push(key_sel(w, &sub_idx, &sub_plan));
            values.push(val_sel(&sub_idx, &sub_plan));
        }

        let new_index = Index::new(new_keys, Some(false), idx.ops_arc())?;
        let built = self.vector_builder.create_missing(&values);
        Ok((new_index, VectorPlan::Return(built)))
    }

    /// Partition addresses by `key_sel`, building one sub-index per
    /// distinct mapped key, then collapse each group via `val_sel`.
    pub fn group_by<K: Clone, K2: Clone + PartialEq>(
        &self,
        idx: &Index<K>,
        key_sel: impl Fn(&K) -> Option<K2>,
        v: VectorPlan<V>,
        val_sel: impl Fn(&Index<K>, &VectorPlan<V>) -> Option<V>,
        ops2: Arc<dyn KeyOps<K2>>,
    ) -> Result<(Index<K2>, VectorPlan<V>), Error>
    where
        V: Clone,
    {
        let mut groups: Vec<(K2, Vec<(K, Address)>)> = Vec::new();
        for (k, addr) in idx.mappings() {
            let Some(k2) = key_sel(k) else { continue };
            match groups.iter_mut().find(|(gk, _)| *gk == k2) {
                Some((_, members)) => members.push((k.clone(), addr)),
                None => groups.push((k2, vec![(k.clone(), addr)])),
            }
        }

        let mut new_keys = Vec::with_capacity(groups.len());
        let mut values = Vec::with_capacity(groups.len());
        for (k2, members) in groups {
            let sub_keys: Vec<K> = members.iter().map(|(k, _)| k.clone()).collect();
            let pairs: Vec<(Address, Address)> = members
                .iter()
                .enumerate()
                .map(|(i, (_, addr))| (Address::new(i), *addr))
                .collect();
            let sub_range = plan_range(sub_keys.len());
            let sub_index = Index::new(sub_keys, None, idx.ops_arc())?;
            let sub_plan = VectorPlan::relocate(v.clone(), sub_range, pairs);
            let value = val_sel(&sub_index, &sub_plan);

            new_keys.push(k2);
            values.push(value);
        }

        let new_index = Index::new(new_keys, Some(false), ops2)?;
        let built = self.vector_builder.create_missing(&values);
        Ok((new_index, VectorPlan::Return(built)))
    }

    /// Split `idx`'s keys at `markers` via `chunked_using`, then assemble
    /// per-chunk the same way `aggregate` does.
    pub fn resample<K: Clone>(
        &self,
        idx: &Index<K>,
        markers: &[K],
        dir: Direction,
        v: VectorPlan<V>,
        val_sel: impl Fn(&Index<K>, &VectorPlan<V>) -> Option<V>,
        key_sel: impl Fn(&WindowOrChunk<K>, &Index<K>, &VectorPlan<V>) -> K,
    ) -> Result<(Index<K>, VectorPlan<V>), Error>
    where
        V: Clone,
    {
        if !idx.is_ordered() {
            return Err(Error::UnorderedIndex);
        }
        let mut new_keys = Vec::with_capacity(markers.len());
        let mut values = Vec::with_capacity(markers.len());
        for c in chunk::chunked_using(idx.keys(), dir, markers, idx.comparer()) {
            let c = c?;
            if c.keys.is_empty() {
                continue;
            }
            let first = c.keys[0].clone();
            let last = c.keys[c.keys.len() - 1].clone();
            let (sub_idx, sub_plan) = self.get_range(
                idx,
                v.clone(),
                Some((first, BoundaryBehavior::Inclusive)),
                Some((last, BoundaryBehavior::Inclusive)),
            )?;
            let wc = WindowOrChunk::Chunk(c);
            new_keys.push(key_sel(&wc, &sub_idx, &sub_plan));
            values.push(val_sel(&sub_idx, &sub_plan));
        }

        let new_index = Index::new(new_keys, Some(false), idx.ops_arc())?;
        let built = self.vector_builder.create_missing(&values);
        Ok((new_index, VectorPlan::Return(built)))
    }
}
