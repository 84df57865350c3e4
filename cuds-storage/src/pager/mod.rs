//! Minimal pager trait: batched get/put/free of opaque blobs addressed by
//! [`PhysicalKey`].
//!
//! Everything above this layer (catalog, table headers, row pages) is stored as
//! blobs through a `Pager`, so swapping the in-memory pager for a file-backed one
//! changes nothing else.

use crate::types::PhysicalKey;
use cuds_result::Result;

pub mod mem_pager;
pub use mem_pager::*;

#[cfg(feature = "simd-r-drive-support")]
pub mod simd_r_drive_pager;
#[cfg(feature = "simd-r-drive-support")]
pub use simd_r_drive_pager::*;

#[derive(Clone, Debug)]
pub enum BatchPut {
    Raw { key: PhysicalKey, bytes: Vec<u8> },
}

#[derive(Clone, Debug)]
pub enum BatchGet {
    Raw { key: PhysicalKey },
}

#[derive(Clone, Debug)]
pub enum GetResult<B> {
    Raw { key: PhysicalKey, bytes: B },
    Missing { key: PhysicalKey },
}

pub trait Pager: Send + Sync + 'static {
    type Blob: AsRef<[u8]> + Clone + Send + Sync + 'static;

    /// Allocate `n` new physical keys.
    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>>;

    /// Batch get blobs; returns one `GetResult` per request in order.
    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>>;

    /// Batch put blobs at fixed keys.
    fn batch_put(&self, puts: &[BatchPut]) -> Result<()>;

    /// Batch free physical keys. Implementations may ignore unknown keys.
    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()>;

    /// Fetch a single blob, `None` if the key holds nothing.
    fn get_one(&self, key: PhysicalKey) -> Result<Option<Self::Blob>> {
        Ok(self
            .batch_get(&[BatchGet::Raw { key }])?
            .pop()
            .and_then(|r| match r {
                GetResult::Raw { bytes, .. } => Some(bytes),
                GetResult::Missing { .. } => None,
            }))
    }

    /// Store a single blob.
    fn put_one(&self, key: PhysicalKey, bytes: Vec<u8>) -> Result<()> {
        self.batch_put(&[BatchPut::Raw { key, bytes }])
    }
}
