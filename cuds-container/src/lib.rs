//! Key-restricted associative containers.
//!
//! A [`DataContainer`] maps keys of a [`KeySpace`](cuds_types::KeySpace) to
//! [`Value`](cuds_types::Value)s. Which keys it accepts is decided by its
//! [`KeyDomain`]: either the whole key space or a subset derived with
//! [`KeyDomain::restrict`]. Tables with a reduced schema hand out containers
//! of a restricted domain.

#![forbid(unsafe_code)]

pub mod container;
pub mod domain;

pub use container::{ContainerBuilder, DataContainer};
pub use domain::KeyDomain;
