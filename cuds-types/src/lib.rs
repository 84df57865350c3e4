//! Key spaces and values shared by the CUDS crates.
//!
//! A [`KeySpace`] is the fixed universe of keys a container may hold: each
//! member has an ordinal, a name, an optional scalar dtype and an array shape.
//! Ordinals order the members; that order is what tables use to place columns.
//!
//! The built-in key space is [`cuba::keyspace()`]. Custom key spaces (for
//! tests, or consumers with their own vocabulary) are assembled with
//! [`KeySpace::builder`].

#![forbid(unsafe_code)]

pub mod cuba;
pub mod keyspace;
pub mod value;

pub use keyspace::{Key, KeyDef, KeySpace, KeySpaceBuilder, ScalarType};
pub use value::Value;

/// Re-exported so downstream crates name the same identifier type.
pub use uuid::Uuid;
