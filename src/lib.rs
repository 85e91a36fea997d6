//! Index + vector-relocation algebra: a bijection between keys and
//! contiguous addresses, plus a symbolic plan language a vector executor
//! evaluates to actually move data around.
//!
//! This crate owns the bookkeeping (`Index`, `VectorPlan`, `IndexBuilder`)
//! and the comparator/ordering model (`KeyOps`). It does not own a vector
//! representation; [`VectorBuilder`] is the seam a concrete series library
//! plugs into.

mod address;
mod align;
mod builder;
mod chunk;
mod error;
mod index;
mod key;
mod plan;
mod types;
mod vector;

#[cfg(test)]
mod test;

pub use address::Address;
pub use align::{align_ordered, align_unordered, AlignedRow};
pub use builder::IndexBuilder;
pub use chunk::{chunked_size, chunked_using, chunked_while, windowed_size, windowed_while, Chunk, Window};
pub use error::Error;
pub use index::{Index, LookupResult};
pub use key::{ComparatorKeyOps, KeyOps, OrdKeyOps, UnorderedKeyOps};
pub use plan::{FillPolicy, Transform, VectorPlan};
pub use types::{Aggregation, Boundary, BoundaryBehavior, Direction, JoinKind, Semantics, WindowOrChunk};
pub use vector::VectorBuilder;
