//! Error types and result definitions for the CUDS crates.
//!
//! Every crate in the workspace returns [`Result<T>`] with the single [`Error`]
//! enum defined here, so errors propagate across crate boundaries with `?`.
//!
//! # Error Categories
//!
//! - **Validation** ([`Error::InvalidKey`], [`Error::TooManyPositionalArguments`],
//!   [`Error::InvalidArgumentError`]): malformed input, raised before any write
//! - **Lookup** ([`Error::KeyNotFound`], [`Error::IndexOutOfRange`],
//!   [`Error::RecordNotFound`]): absent keys, positions and identifiers
//! - **Duplicates** ([`Error::RecordAlreadyExists`])
//! - **Backing store** ([`Error::Io`], [`Error::Arrow`], [`Error::NotFound`])
//! - **Consistency** ([`Error::Internal`]): fatal, never retried

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
