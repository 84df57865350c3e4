//! Backing store for CUDS tables.
//!
//! The layers, bottom up:
//!
//! - [`pager`]: batched get/put/free of opaque blobs by [`types::PhysicalKey`].
//! - [`catalog`]: the persisted map from table paths to table headers.
//! - [`schema`] and [`types`]: arrow-described, fixed-width row schemas.
//! - [`table`]: [`TableStore`], [`Group`] and [`RowTable`], the "table"
//!   abstraction the container tables are built on (create/open a table,
//!   append, read, overwrite and remove rows, row count).

#![forbid(unsafe_code)]

pub mod catalog;
mod codecs;
pub mod constants;
pub mod pager;
pub mod schema;
pub mod table;
pub mod types;

pub use pager::{BatchGet, BatchPut, GetResult, MemPager, Pager};
pub use schema::RowSchema;
pub use table::{Group, RowTable, RowTableConfig, TableStore};
pub use types::{Cell, ColumnType, PhysicalKey};
