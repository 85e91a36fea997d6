//! Error kinds surfaced by the index/builder API.

use thiserror::Error;

/// Argument-level errors raised by [`crate::Index`] and
/// [`crate::IndexBuilder`] operations.
///
/// `InvalidRange` from the specification has no variant here: a range
/// whose bounds cross after exclusive adjustment is not an error, it
/// resolves to an empty index (see `builder::get_range`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Construction saw the same key twice.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// `drop_item` (or another by-key lookup) was given a key the index
    /// does not contain.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// An operation that requires a total order (`key_range`, `aggregate`,
    /// `resample`, nearest-key `lookup`) was called on an unordered index.
    #[error("index is not ordered")]
    UnorderedIndex,

    /// The comparator raised (panicked or returned an error) while
    /// `align_ordered` was comparing two keys. Callers of `align_ordered`
    /// directly see this; `IndexBuilder` catches it internally and
    /// degrades to `align_unordered`.
    #[error("comparator failed during ordered alignment")]
    ComparisonFailed,
}

pub type Result<T> = std::result::Result<T, Error>;
