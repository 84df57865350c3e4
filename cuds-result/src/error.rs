use std::{fmt, io};
use thiserror::Error;
use uuid::Uuid;

/// Unified error type for all CUDS operations.
///
/// This enum covers every failure mode of the stack, from key validation in a
/// `DataContainer` up to row-count mismatches between the sub-tables of a keyed
/// table. Variants are grouped the same way callers are expected to react to them.
///
/// # Error Handling Strategy
///
/// Validation errors are raised before the backing store is touched, so a failed
/// `set`/`append` never leaves a partial write behind. Errors coming out of the pager
/// are propagated unchanged with `?`; nothing in CUDS retries or swallows them.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file or disk operations.
    ///
    /// Raised by persistent pagers when the backing file cannot be opened, read,
    /// written or truncated. The underlying `io::Error` carries the details.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow library error.
    ///
    /// Table schemas are arrow schemas and are persisted with arrow IPC; this
    /// variant surfaces failures while encoding/decoding them or while building
    /// record batches during a scan.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A key is not a member of the key space, or is outside the restricted key
    /// set of the container it was offered to.
    ///
    /// # Recovery
    ///
    /// The container is left unchanged. Fix the key and retry.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A container was initialised from more than one positional source.
    #[error("expected at most 1 positional source, got {0}")]
    TooManyPositionalArguments(usize),

    /// Mapping lookup of a key that is not present in a container.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Positional access outside `0..len` of a dense table.
    #[error("index {index} out of range for table of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// No record with the given identifier exists in a keyed table.
    #[error("record {0} does not exist")]
    RecordNotFound(Uuid),

    /// A record with the given identifier already exists in a keyed table.
    ///
    /// # Recovery
    ///
    /// Use `update_existing` or `set` when overwriting is intended.
    #[error("record {0} already exists")]
    RecordAlreadyExists(Uuid),

    /// Invalid user input or API parameter.
    ///
    /// Examples: a value that does not fit the dtype/shape of its column, a record
    /// description naming an unknown key, an item without an identifier, a row whose
    /// cells do not match the table schema.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Storage key or table path not found.
    #[error("Storage key not found")]
    NotFound,

    /// Internal error indicating corruption or a violated invariant.
    ///
    /// The items and data sub-tables of a keyed table disagreeing on their row
    /// count ends up here, as do truncated or malformed blobs. These errors are
    /// not recoverable by retrying; they signal an earlier interrupted write.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create an [`Error::InvalidKey`] from anything displayable.
    #[inline]
    pub fn invalid_key<K: fmt::Display>(key: K) -> Self {
        Error::InvalidKey(key.to_string())
    }

    /// Create an [`Error::Internal`] describing a truncated or malformed blob.
    #[inline]
    pub fn corrupt<E: fmt::Display>(what: E) -> Self {
        Error::Internal(format!("corrupt blob: {what}"))
    }
}
