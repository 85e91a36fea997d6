//! Cross-module scenario tests (the seven worked examples, exercised here
//! through the public `IndexBuilder` surface rather than each kernel in
//! isolation) and the universal-law property tests.

use std::sync::Arc;

use proptest::prelude::*;

use crate::address::Address;
use crate::builder::IndexBuilder;
use crate::error::Error;
use crate::index::{Index, LookupResult};
use crate::key::OrdKeyOps;
use crate::plan::VectorPlan;
use crate::types::Semantics;
use crate::vector::VectorBuilder;

struct SumBuilder;

impl VectorBuilder<i64> for SumBuilder {
    fn create_missing(&self, values: &[Option<i64>]) -> i64 {
        values.iter().filter_map(|v| *v).sum()
    }

    fn build(&self, _plan: &VectorPlan<i64>, _inputs: &[i64]) -> i64 {
        0
    }
}

fn ordered(keys: Vec<i64>) -> Index<i64> {
    Index::new(keys, Some(true), Arc::new(OrdKeyOps)).unwrap()
}

#[test]
fn s1_duplicate_keys_rejected_at_construction() {
    let err = Index::new(vec![1i64, 2, 2], None, Arc::new(OrdKeyOps)).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(_)));
}

#[test]
fn s2_union_produces_sorted_merge_with_relocation_pairs() {
    let vb = SumBuilder;
    let b = IndexBuilder::new(&vb);
    let l = ordered(vec![1, 3, 5]);
    let r = ordered(vec![2, 3, 6]);
    let (merged, plan_l, plan_r) = b
        .union(&l, VectorPlan::Return(0), &r, VectorPlan::Return(1))
        .unwrap();
    assert_eq!(merged.keys(), &[1, 2, 3, 5, 6]);
    assert!(merged.is_ordered());
    assert!(matches!(plan_l, VectorPlan::Relocate { .. }));
    assert!(matches!(plan_r, VectorPlan::Relocate { .. }));
}

#[test]
fn s3_union_degrades_to_unordered_on_panicking_comparator() {
    use crate::key::ComparatorKeyOps;
    let ops = Arc::new(ComparatorKeyOps::new(
        |k: &i64| *k as u64,
        |_a: &i64, _b: &i64| panic!("no total order here"),
    ));
    let vb = SumBuilder;
    let b = IndexBuilder::new(&vb);
    let l = Index::new(vec![1i64, 2], None, ops.clone()).unwrap();
    let r = Index::new(vec![2i64, 3], None, ops).unwrap();
    let (merged, _, _) = b
        .union(&l, VectorPlan::Return(0), &r, VectorPlan::Return(1))
        .unwrap();
    assert!(!merged.is_ordered());
    assert_eq!(merged.len(), 3);
}

#[test]
fn s4_nearest_smaller_lookup_skips_rejected_address() {
    let idx = ordered(vec![10, 20, 30, 40]);
    let check = |addr: Address| addr != Address::new(2);
    let result = idx.lookup(&35, Semantics::NearestSmaller, &check).unwrap();
    assert_eq!(result, LookupResult::Present(20, Address::new(1)));
}

#[test]
fn s5_get_range_with_exclusive_bounds() {
    let vb = SumBuilder;
    let b = IndexBuilder::new(&vb);
    let source = ordered(vec![1, 2, 3, 4, 5]);
    let (sliced, _) = b
        .get_range(
            &source,
            VectorPlan::Return(0),
            Some((2, crate::types::BoundaryBehavior::Exclusive)),
            Some((5, crate::types::BoundaryBehavior::Exclusive)),
        )
        .unwrap();
    assert_eq!(sliced.keys(), &[3, 4]);
}

#[test]
fn s6_windowed_size_at_beginning_tags_leading_windows_incomplete() {
    use crate::chunk::windowed_size;
    use crate::types::Boundary;
    let windows: Vec<_> = windowed_size(&['a', 'b', 'c', 'd'], 3, Boundary::AtBeginning).collect();
    assert_eq!(windows.len(), 4);
    assert!(!windows[0].is_complete());
    assert!(windows[2].is_complete());
}

#[test]
fn s7_resample_backward_attaches_tail_to_last_marker_and_sums() {
    let vb = SumBuilder;
    let b = IndexBuilder::new(&vb);
    let source = ordered((1..=7).collect());
    let (resampled, plan) = b
        .resample(
            &source,
            &[3, 6],
            crate::types::Direction::Backward,
            VectorPlan::Return(0),
            |_sub_idx, _sub_plan| Some(1),
            |wc, _sub_idx, _sub_plan| *wc.marker().expect("chunked_using always tags a marker"),
        )
        .unwrap();
    assert_eq!(resampled.keys(), &[3, 6]);
    assert_eq!(plan, VectorPlan::Return(2));
}

#[test]
fn law_reindex_against_self_is_an_identity_permutation() {
    let vb = SumBuilder;
    let b = IndexBuilder::new(&vb);
    let idx = ordered(vec![1, 2, 3, 4]);
    let always = |_: Address| true;
    let plan = b
        .reindex(&idx, &idx, Semantics::Exact, VectorPlan::Return(0i64), &always)
        .unwrap();
    match plan {
        VectorPlan::Relocate { pairs, .. } => {
            let mut sorted_pairs = pairs.clone();
            sorted_pairs.sort_by_key(|(new, _)| new.get());
            for (new_addr, old_addr) in sorted_pairs {
                assert_eq!(new_addr, old_addr, "reindexing against self is the identity");
            }
        }
        other => panic!("expected Relocate, got {other:?}"),
    }
}

#[test]
fn law_append_wraps_union_in_combine_of_the_same_two_plans() {
    let vb = SumBuilder;
    let b = IndexBuilder::new(&vb);
    let l = ordered(vec![1, 3, 5]);
    let r = ordered(vec![2, 3, 6]);
    let (union_idx, union_l, union_r) = b
        .union(&l, VectorPlan::Return(0i64), &r, VectorPlan::Return(1i64))
        .unwrap();
    let (append_idx, append_plan) = b
        .append(&l, VectorPlan::Return(0i64), &r, VectorPlan::Return(1i64), "prefer_left")
        .unwrap();
    assert_eq!(append_idx.keys(), union_idx.keys());
    assert_eq!(
        append_plan,
        VectorPlan::combine(union_l, union_r, "prefer_left")
    );
}

fn dedup_keys(mut xs: Vec<i32>) -> Vec<i32> {
    xs.sort_unstable();
    xs.dedup();
    xs
}

proptest! {
    /// `key_at(address_of(k)) == k` for every key, and every address in
    /// `[0, len)` is reachable.
    #[test]
    fn law_address_bijectivity(raw in prop::collection::vec(any::<i32>(), 0..50)) {
        let keys = dedup_keys(raw);
        let idx = Index::new(keys.clone(), None, Arc::new(OrdKeyOps)).unwrap();
        for (k, addr) in idx.mappings() {
            prop_assert_eq!(idx.key_at(addr), Some(k));
        }
        prop_assert_eq!(idx.len(), keys.len());
    }

    /// A sequence that is already non-decreasing is always detected as
    /// ordered, regardless of how `Index::new` was told to treat it.
    #[test]
    fn law_sorted_input_is_detected_ordered(mut raw in prop::collection::vec(any::<i32>(), 0..50)) {
        raw.sort_unstable();
        raw.dedup();
        let idx = Index::new(raw, None, Arc::new(OrdKeyOps)).unwrap();
        prop_assert!(idx.is_ordered());
    }

    /// `union(L, R)` and `union(R, L)` contain the same key set, whichever
    /// side relocation pairs land on.
    #[test]
    fn law_union_commutes_on_key_set(
        raw_l in prop::collection::vec(any::<i32>(), 0..20),
        raw_r in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let l_keys = dedup_keys(raw_l);
        let r_keys = dedup_keys(raw_r);
        let vb = SumBuilder;
        let b = IndexBuilder::new(&vb);
        let l = Index::new(l_keys.iter().map(|&k| k as i64).collect(), None, Arc::new(OrdKeyOps)).unwrap();
        let r = Index::new(r_keys.iter().map(|&k| k as i64).collect(), None, Arc::new(OrdKeyOps)).unwrap();

        let (lr, _, _) = b.union(&l, VectorPlan::Return(0i64), &r, VectorPlan::Return(1i64)).unwrap();
        let (rl, _, _) = b.union(&r, VectorPlan::Return(0i64), &l, VectorPlan::Return(1i64)).unwrap();

        let mut lr_keys: Vec<i64> = lr.keys().to_vec();
        let mut rl_keys: Vec<i64> = rl.keys().to_vec();
        lr_keys.sort_unstable();
        rl_keys.sort_unstable();
        prop_assert_eq!(lr_keys, rl_keys);
    }

    /// A `union` of two indices explicitly marked unordered must never be
    /// fed through `align_ordered`'s sorted-stream merge (it could
    /// double-count a key that only looks sorted by coincidence) and must
    /// never manufacture a duplicate key out of two valid inputs.
    #[test]
    fn law_union_of_unordered_indices_never_duplicates_a_key(
        raw_l in prop::collection::vec(any::<i32>(), 0..20),
        raw_r in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let l_keys = dedup_keys(raw_l);
        let r_keys = dedup_keys(raw_r);
        let vb = SumBuilder;
        let b = IndexBuilder::new(&vb);
        // Pinned `Some(false)` regardless of whether the deduped keys would
        // also detect as ordered: this targets the builder's own ordered/
        // ordered gate ahead of `align_ordered`, not `is_sorted`'s verdict.
        let l = Index::new(l_keys.iter().map(|&k| k as i64).collect(), Some(false), Arc::new(OrdKeyOps)).unwrap();
        let r = Index::new(r_keys.iter().map(|&k| k as i64).collect(), Some(false), Arc::new(OrdKeyOps)).unwrap();

        let (merged, _, _) = b.union(&l, VectorPlan::Return(0i64), &r, VectorPlan::Return(1i64)).unwrap();
        prop_assert!(!merged.is_ordered());
        let mut seen = std::collections::HashSet::new();
        for k in merged.keys() {
            prop_assert!(seen.insert(*k), "union produced a duplicate key from two valid unordered indices");
        }
    }

    /// `intersect(L, R)`'s key set is always a subset of `union(L, R)`'s.
    #[test]
    fn law_intersect_is_subset_of_union(
        raw_l in prop::collection::vec(any::<i32>(), 0..20),
        raw_r in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let l_keys = dedup_keys(raw_l);
        let r_keys = dedup_keys(raw_r);
        let vb = SumBuilder;
        let b = IndexBuilder::new(&vb);
        let l = Index::new(l_keys.iter().map(|&k| k as i64).collect(), None, Arc::new(OrdKeyOps)).unwrap();
        let r = Index::new(r_keys.iter().map(|&k| k as i64).collect(), None, Arc::new(OrdKeyOps)).unwrap();

        let (u, _, _) = b.union(&l, VectorPlan::Return(0i64), &r, VectorPlan::Return(1i64)).unwrap();
        let (i, _, _) = b.intersect(&l, VectorPlan::Return(0i64), &r, VectorPlan::Return(1i64)).unwrap();

        let union_set: std::collections::HashSet<i64> = u.keys().iter().copied().collect();
        for k in i.keys() {
            prop_assert!(union_set.contains(k));
        }
    }

    /// Sorting an already-sorted index is a no-op on the key sequence.
    #[test]
    fn law_order_is_idempotent(raw in prop::collection::vec(any::<i32>(), 0..30)) {
        let keys = dedup_keys(raw);
        let vb = SumBuilder;
        let b = IndexBuilder::new(&vb);
        let idx = Index::new(keys.iter().map(|&k| k as i64).collect(), None, Arc::new(OrdKeyOps)).unwrap();
        let (once, _) = b.order(&idx, VectorPlan::Return(0i64)).unwrap();
        let (twice, _) = b.order(&once, VectorPlan::Return(0i64)).unwrap();
        prop_assert_eq!(once.keys(), twice.keys());
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        let sorted_i64: Vec<i64> = sorted.iter().map(|&k| k as i64).collect();
        prop_assert_eq!(once.keys(), sorted_i64.as_slice());
    }

    /// `get_range` on an ordered index always returns a contiguous
    /// sub-slice of the original (ordered) key sequence.
    #[test]
    fn law_get_range_returns_contiguous_subslice(
        mut raw in prop::collection::vec(any::<i32>(), 1..30),
        lo_idx in 0usize..30,
        hi_idx in 0usize..30,
    ) {
        raw.sort_unstable();
        raw.dedup();
        prop_assume!(!raw.is_empty());
        let lo_idx = lo_idx % raw.len();
        let hi_idx = hi_idx % raw.len();
        let (lo_idx, hi_idx) = if lo_idx <= hi_idx { (lo_idx, hi_idx) } else { (hi_idx, lo_idx) };

        let keys: Vec<i64> = raw.iter().map(|&k| k as i64).collect();
        let idx = Index::new(keys.clone(), Some(true), Arc::new(OrdKeyOps)).unwrap();
        let vb = SumBuilder;
        let b = IndexBuilder::new(&vb);

        let (sliced, _) = b
            .get_range(
                &idx,
                VectorPlan::Return(0i64),
                Some((keys[lo_idx], crate::types::BoundaryBehavior::Inclusive)),
                Some((keys[hi_idx], crate::types::BoundaryBehavior::Inclusive)),
            )
            .unwrap();
        prop_assert_eq!(sliced.keys(), &keys[lo_idx..=hi_idx]);
    }

    /// `drop_item` always removes exactly the targeted key and nothing else.
    #[test]
    fn law_drop_item_removes_exactly_one_key(raw in prop::collection::vec(any::<i32>(), 1..30)) {
        let keys = dedup_keys(raw);
        prop_assume!(!keys.is_empty());
        let target = keys[keys.len() / 2] as i64;
        let idx = Index::new(keys.iter().map(|&k| k as i64).collect(), None, Arc::new(OrdKeyOps)).unwrap();
        let vb = SumBuilder;
        let b = IndexBuilder::new(&vb);
        let (dropped, _) = b.drop_item(&idx, VectorPlan::Return(0i64), &target).unwrap();
        prop_assert_eq!(dropped.len(), idx.len() - 1);
        prop_assert!(!dropped.keys().contains(&target));
    }
}
