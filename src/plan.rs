//! The vector-construction plan: an immutable symbolic expression tree
//! describing how the vector layer should build a result vector from input
//! vectors. Pure data, no evaluation. The point (Design Notes: "Plan as
//! AST rather than as chained function calls") is that plans are
//! comparable by value and re-optimizable by the vector layer, the way the
//! teacher keeps its `VectorPlan` analogue, `layers::Trie`, a passive data
//! shape and puts all behavior in separate `Builder`/`Cursor` traits that
//! walk it.

use crate::address::Address;
use crate::types::Direction;

/// How `FillMissing` fills an address that has no source value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillPolicy<V> {
    Constant(V),
    Direction(Direction),
}

/// A pairwise transform applied by `Combine` at each output address where
/// both input plans would have contributed. `Series`-level callers pass
/// their own variants (`PreferLeft`, `PreferRight`, a user closure
/// identifier, ...); the core does not interpret this value, it only
/// carries it through to the vector layer untouched, mirroring how the
/// spec's `append(L, R, transform)` takes `transform` as an opaque,
/// caller-defined cell combinator.
pub type Transform = String;

/// A symbolic, immutable plan for constructing a result vector. `V` is the
/// opaque vector-handle type the downstream vector layer uses to refer to
/// its input vectors (`Return(k)` in the specification is "input vector
/// #k").
#[derive(Debug, Clone, PartialEq)]
pub enum VectorPlan<V> {
    /// Input vector `v`, unchanged.
    Return(V),
    /// Permute/gather `v` into a vector over `new_range`; addresses in
    /// `new_range` that are not the destination of any pair are missing.
    /// Pairs are `(new_addr, old_addr)` and need not be sorted by
    /// new-address; the caller contract forbids duplicate new-addresses
    /// (not re-checked here, see `layers::Trie::merge` in the teacher for
    /// the same "trust the builder, don't re-validate downstream" stance).
    Relocate {
        source: Box<VectorPlan<V>>,
        new_range: (Address, Address),
        pairs: Vec<(Address, Address)>,
    },
    /// Slice `[lo, hi]` (inclusive) out of `v`.
    GetRange {
        source: Box<VectorPlan<V>>,
        range: (Address, Address),
    },
    /// Remove the contiguous slice `[lo, hi]` (inclusive) from `v`.
    DropRange {
        source: Box<VectorPlan<V>>,
        range: (Address, Address),
    },
    /// Binary fold of two plans under a per-cell transform.
    Combine {
        left: Box<VectorPlan<V>>,
        right: Box<VectorPlan<V>>,
        transform: Transform,
    },
    /// Fill missing cells of `v` according to `policy`.
    FillMissing {
        source: Box<VectorPlan<V>>,
        policy: FillPolicy<V>,
    },
    /// The empty vector; no inputs.
    Empty,
}

impl<V> VectorPlan<V> {
    pub fn relocate(source: VectorPlan<V>, new_range: (Address, Address), pairs: Vec<(Address, Address)>) -> Self {
        VectorPlan::Relocate {
            source: Box::new(source),
            new_range,
            pairs,
        }
    }

    pub fn get_range(source: VectorPlan<V>, range: (Address, Address)) -> Self {
        VectorPlan::GetRange {
            source: Box::new(source),
            range,
        }
    }

    pub fn drop_range(source: VectorPlan<V>, range: (Address, Address)) -> Self {
        VectorPlan::DropRange {
            source: Box::new(source),
            range,
        }
    }

    pub fn combine(left: VectorPlan<V>, right: VectorPlan<V>, transform: impl Into<Transform>) -> Self {
        VectorPlan::Combine {
            left: Box::new(left),
            right: Box::new(right),
            transform: transform.into(),
        }
    }

    pub fn fill_missing(source: VectorPlan<V>, policy: FillPolicy<V>) -> Self {
        VectorPlan::FillMissing {
            source: Box::new(source),
            policy,
        }
    }
}
