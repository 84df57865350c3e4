//! Tables of CUDS data containers over a [`cuds_storage`] store.
//!
//! - [`ColumnLayout`] places the keys of a container in the columns of a
//!   fixed-width row; a [`PresenceMask`] records which columns of a row hold
//!   real values.
//! - [`IndexedDataContainerTable`] stores containers by row position.
//! - [`CudsItems`] stores items (uid, item fields, container) by uuid, and
//!   [`DataContainerTable`] is its field-less form.
//!
//! Containers read from a table are always fresh copies; writing one back is
//! a whole-row replace.

#![forbid(unsafe_code)]

pub mod codec;
pub mod data_table;
pub mod indexed;
pub mod items;
pub mod layout;
pub mod mask;

pub use data_table::DataContainerTable;
pub use indexed::IndexedDataContainerTable;
pub use items::{Coordinates, CudsItems, Item, ItemFields};
pub use layout::{ColumnLayout, MASK_COLUMN, record_description};
pub use mask::PresenceMask;
