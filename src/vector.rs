//! The boundary this crate consumes but does not implement (§1: "the
//! vector executor that interprets the relocation plan" is an external
//! collaborator). A plain trait, no default methods, no implementation,
//! it documents the interface `IndexBuilder` calls through, the way
//! `operator/index.rs` documents the `Builder`/`Cursor` traits it drives
//! without owning their implementation.

use crate::plan::VectorPlan;

/// Builds concrete vectors from a [`VectorPlan`]. Implemented by the
/// (out of scope) vector layer; `IndexBuilder` only ever holds a
/// reference to one.
pub trait VectorBuilder<V> {
    /// Build a vector from optional cells, one per address in order;
    /// `None` marks a missing cell.
    fn create_missing(&self, values: &[Option<V>]) -> V;

    /// Evaluate `plan` against `inputs` (indexed the way `Return(k)`
    /// names input vector `k`) and produce the resulting vector.
    fn build(&self, plan: &VectorPlan<V>, inputs: &[V]) -> V;
}
