//! Manual little-endian codecs for fixed-width fields.
//!
//! Readers take a cursor (`&mut &[u8]`) and advance it, returning
//! [`Error::Internal`] instead of panicking when a blob is truncated.

use cuds_result::{Error, Result};

#[inline]
pub(crate) fn take<'a>(cur: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if cur.len() < n {
        return Err(Error::corrupt(format!(
            "unexpected eof: wanted {n} bytes, {} left",
            cur.len()
        )));
    }
    let (head, tail) = cur.split_at(n);
    *cur = tail;
    Ok(head)
}

#[inline]
pub(crate) fn read_u32_le(cur: &mut &[u8]) -> Result<u32> {
    let b = take(cur, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline]
pub(crate) fn read_u64_le(cur: &mut &[u8]) -> Result<u64> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(take(cur, 8)?);
    Ok(u64::from_le_bytes(buf))
}

#[inline]
pub(crate) fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub(crate) fn write_u64_le(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub(crate) fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Internal(format!("{what} length {len} exceeds u32")))
}
