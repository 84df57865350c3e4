//! The top-level directory of all tables in a store.

use crate::codecs::{len_u32, read_u32_le, read_u64_le, take, write_u32_le, write_u64_le};
use crate::constants::CATALOG_MAGIC;
use crate::types::PhysicalKey;
use cuds_result::{Error, Result};
use rustc_hash::FxHashMap;

/// An in-memory mapping from table paths to the physical key of each table's
/// header blob.
#[derive(Debug, Clone, Default)]
pub struct StoreCatalog {
    pub map: FxHashMap<String, PhysicalKey>,
}

impl StoreCatalog {
    /// Deserializes the catalog from a byte buffer.
    /// Format: [magic] [entry_count: u64] ([path_len: u32] [path] [header_pk: u64])...
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cur = bytes;
        if take(&mut cur, 4)? != CATALOG_MAGIC.as_slice() {
            return Err(Error::corrupt("bad catalog magic"));
        }
        let entry_count = read_u64_le(&mut cur)? as usize;
        let mut map = FxHashMap::with_capacity_and_hasher(entry_count, Default::default());
        for _ in 0..entry_count {
            let path_len = read_u32_le(&mut cur)? as usize;
            let path = std::str::from_utf8(take(&mut cur, path_len)?)
                .map_err(|e| Error::corrupt(format!("catalog path: {e}")))?
                .to_string();
            let header_pk = read_u64_le(&mut cur)?;
            map.insert(path, header_pk);
        }
        Ok(Self { map })
    }

    /// Serializes the catalog into a byte vector for storage. Entries are
    /// written in path order so the blob is deterministic.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut buf = Vec::with_capacity(12 + entries.len() * 32);
        buf.extend_from_slice(&CATALOG_MAGIC);
        write_u64_le(&mut buf, entries.len() as u64);
        for (path, &header_pk) in entries {
            write_u32_le(&mut buf, len_u32(path.len(), "table path")?);
            buf.extend_from_slice(path.as_bytes());
            write_u64_le(&mut buf, header_pk);
        }
        Ok(buf)
    }
}
