use super::*;
use crate::constants::CATALOG_ROOT_PKEY;
use crate::types::PhysicalKey;
use bytes::Bytes;
use cuds_result::{Error, Result};
use rustc_hash::FxHashMap;
use std::sync::{
    RwLock,
    atomic::{AtomicU64, Ordering},
};

/// In-memory pager used for tests and transient stores.
///
/// Blobs are handed out as [`Bytes`], so reads are reference-counted clones
/// rather than copies.
#[allow(clippy::module_name_repetitions)]
pub struct MemPager {
    next_key: AtomicU64,
    blobs: RwLock<FxHashMap<PhysicalKey, Bytes>>,
}

impl Default for MemPager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemPager {
    pub fn new() -> Self {
        Self {
            next_key: AtomicU64::new(CATALOG_ROOT_PKEY + 1),
            blobs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Number of live blobs. Lets tests check that freed pages are really gone.
    pub fn blob_count(&self) -> usize {
        self.blobs
            .read()
            .expect("MemPager blobs read lock poisoned")
            .len()
    }
}

impl Pager for MemPager {
    type Blob = Bytes;

    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>> {
        let n_u64 = n as u64;
        let start = self
            .next_key
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                cur.checked_add(n_u64)
            })
            .map_err(|_| Error::Internal("physical key space overflow".to_string()))?;
        Ok((start..start + n_u64).collect())
    }

    fn batch_put(&self, puts: &[BatchPut]) -> Result<()> {
        let mut map = self
            .blobs
            .write()
            .expect("MemPager blobs write lock poisoned");
        for p in puts {
            match p {
                BatchPut::Raw { key, bytes } => {
                    map.insert(*key, Bytes::copy_from_slice(bytes));
                }
            }
        }
        Ok(())
    }

    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>> {
        let map = self
            .blobs
            .read()
            .expect("MemPager blobs read lock poisoned");
        let mut out = Vec::with_capacity(gets.len());
        for g in gets {
            match *g {
                BatchGet::Raw { key } => match map.get(&key) {
                    Some(b) => out.push(GetResult::Raw {
                        key,
                        bytes: b.clone(),
                    }),
                    None => out.push(GetResult::Missing { key }),
                },
            }
        }
        Ok(out)
    }

    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()> {
        let mut map = self
            .blobs
            .write()
            .expect("MemPager blobs write lock poisoned");
        for &k in keys {
            map.remove(&k);
        }
        Ok(())
    }
}
