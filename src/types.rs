//! Small shared enums that make up the builder/index public surface (§6 of
//! the specification). Kept together since none of them carries enough
//! behavior to deserve its own module, the way the teacher keeps
//! `Ordering`-shaped micro-types alongside the traits that consume them
//! rather than splintering one file per enum.

use crate::chunk::{Chunk, Window};

/// How `Index::lookup` should resolve a key that is absent (or present but
/// rejected by the `check` predicate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantics {
    /// Only an exact key match counts; `check` is ignored on a hit.
    Exact,
    /// Fall back to the largest key less than or equal to the target.
    NearestSmaller,
    /// Fall back to the smallest key greater than or equal to the target.
    NearestGreater,
}

/// How an inclusive/exclusive range bound should be converted to an
/// integer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryBehavior {
    Inclusive,
    Exclusive,
}

/// Direction of a resample/fill operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

/// How an incomplete leading/trailing window or chunk is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Only emit complete windows/chunks.
    Skip,
    /// Emit undersized windows/chunks at the start, marked `Incomplete`.
    AtBeginning,
    /// Emit undersized windows/chunks at the end, marked `Incomplete`.
    AtEnding,
}

/// Join semantics used at the `Series` layer; the core does not interpret
/// this itself, it only carries the type so callers have one shared
/// vocabulary for "how did you align these two indices."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Outer,
    Left,
    Right,
}

/// Chunking strategy for `IndexBuilder::aggregate`.
///
/// `WindowWhile`/`ChunkWhile` carry a predicate over `(first_key,
/// current_key)`; since `K` is not assumed to have interior mutability or
/// `Copy`, the predicate borrows both keys.
pub enum Aggregation<K> {
    WindowSize(usize, Boundary),
    ChunkSize(usize, Boundary),
    WindowWhile(Box<dyn Fn(&K, &K) -> bool>),
    ChunkWhile(Box<dyn Fn(&K, &K) -> bool>),
}

impl<K> std::fmt::Debug for Aggregation<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Aggregation::WindowSize(n, b) => f.debug_tuple("WindowSize").field(n).field(b).finish(),
            Aggregation::ChunkSize(n, b) => f.debug_tuple("ChunkSize").field(n).field(b).finish(),
            Aggregation::WindowWhile(_) => f.debug_tuple("WindowWhile").field(&"<fn>").finish(),
            Aggregation::ChunkWhile(_) => f.debug_tuple("ChunkWhile").field(&"<fn>").finish(),
        }
    }
}

/// Either a window or a chunk produced by the sequence chunkers, tagged
/// with completeness. `IndexBuilder::aggregate`/`resample` only care about
/// the key sequence each one covers, so this is what `key_sel`/`val_sel`
/// receive.
pub enum WindowOrChunk<K> {
    Window(Window<K>),
    Chunk(Chunk<K>),
}

impl<K> WindowOrChunk<K> {
    pub fn is_complete(&self) -> bool {
        match self {
            WindowOrChunk::Window(w) => w.is_complete(),
            WindowOrChunk::Chunk(c) => c.is_complete(),
        }
    }

    pub fn keys(&self) -> &[K] {
        match self {
            WindowOrChunk::Window(w) => &w.keys,
            WindowOrChunk::Chunk(c) => &c.keys,
        }
    }

    /// The marker key that defined this span, for chunks produced by
    /// `chunked_using` (i.e. `resample`'s per-chunk assembly). `None` for
    /// windows and for size/predicate-bounded chunks, which have no
    /// marker concept.
    pub fn marker(&self) -> Option<&K> {
        match self {
            WindowOrChunk::Window(_) => None,
            WindowOrChunk::Chunk(c) => c.marker(),
        }
    }
}
