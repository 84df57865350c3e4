//! CUDS: Common Universal Data Structures
//!
//! This crate is the entrypoint of the CUDS toolkit. It re-exports the key
//! space, container and table types of the underlying `cuds-*` crates.
//!
//! # Quick Start
//!
//! Store a container in an in-memory keyed table and read it back:
//!
//! ```rust
//! use std::sync::Arc;
//! use cuds::{DataContainer, DataContainerTable, Uuid, cuba};
//! use cuds::storage::{MemPager, TableStore};
//!
//! let store = TableStore::open(Arc::new(MemPager::new())).unwrap();
//! let mut table =
//!     DataContainerTable::open(&store.group("particles"), "data", cuba::keyspace(), None)
//!         .unwrap();
//!
//! let mut particle = DataContainer::with_keyspace(cuba::keyspace());
//! particle.set(cuba::MASS, 1.5).unwrap();
//! particle.set(cuba::VELOCITY, [0.0, 1.0, 0.0]).unwrap();
//!
//! let uid = Uuid::new_v4();
//! table.set(uid, &particle).unwrap();
//! assert_eq!(table.get(uid).unwrap(), particle);
//! ```
//!
//! # Architecture
//!
//! - **Keys and values** (`cuds-types`): key spaces, the built-in CUBA
//!   vocabulary, and the value enum.
//! - **Containers** (`cuds-container`): key-restricted maps of values.
//! - **Tables** (`cuds-table`): dense and uuid-keyed tables of containers.
//! - **Storage** (`cuds-storage`): pagers and fixed-schema row tables.

pub use cuds_container::{ContainerBuilder, DataContainer, KeyDomain};
pub use cuds_result::{Error, Result};
pub use cuds_table::{
    Coordinates, CudsItems, DataContainerTable, IndexedDataContainerTable, Item, ItemFields,
    record_description,
};
pub use cuds_types::{Key, KeyDef, KeySpace, KeySpaceBuilder, ScalarType, Uuid, Value, cuba};

// Re-export storage abstractions
pub mod storage {
    //! Pagers and the table store the CUDS tables are built on.

    pub use cuds_storage::pager::{MemPager, Pager};
    pub use cuds_storage::{Group, RowTableConfig, TableStore};

    // SimdRDrivePager is only available when cuds-storage is built with simd-r-drive-support
    #[cfg(feature = "simd-r-drive-support")]
    pub use cuds_storage::pager::SimdRDrivePager;
}
