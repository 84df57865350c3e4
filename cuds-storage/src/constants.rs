use crate::types::PhysicalKey;

/// Well-known key for the root store catalog.
pub const CATALOG_ROOT_PKEY: PhysicalKey = 0;

/// Magic prefix of a serialized store catalog.
pub const CATALOG_MAGIC: [u8; 4] = *b"CCT0";

/// Magic prefix of a serialized row-table header.
pub const TABLE_HEADER_MAGIC: [u8; 4] = *b"CTB0";

/// Default target size of one row page, in bytes.
pub const DEFAULT_PAGE_BYTES: usize = 32 * 1024;

/// Separator between the components of a table path.
pub const PATH_SEPARATOR: char = '/';

/// Field metadata key naming the key-space member stored in a column.
pub const KEY_META_KEY: &str = "cuds_key";

/// Field metadata key carrying the declared array shape of a column (e.g. `"3,3"`).
pub const SHAPE_META_KEY: &str = "cuds_shape";

/// Field metadata key carrying the logical type of a fixed-size binary column.
pub const LOGICAL_TYPE_META_KEY: &str = "cuds_type";
