//! Physical column types and cell values of the row store.
//!
//! A [`ColumnType`] is the fixed-width physical representation of one column.
//! It is derived from (and converted back to) an arrow [`DataType`], which is
//! the schema language used to describe and persist tables.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field};
use cuds_result::{Error, Result};

use crate::codecs::take;

/// Opaque 64-bit address in the pager namespace.
/// Treated as an opaque handle by higher layers.
pub type PhysicalKey = u64;

/// Fixed-width physical type of a column.
///
/// Every variant has a constant byte width, so a row is a fixed-width record
/// and row `i` of a page lives at `i * row_width`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    Int32,
    Int64,
    Float64,
    /// Fixed-size byte string. Shorter payloads are zero padded.
    FixedBinary(usize),
    /// Fixed-length boolean vector, bit-packed on disk.
    BoolList(usize),
    Int32List(usize),
    Int64List(usize),
    Float64List(usize),
}

/// One value of one column of one row.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    FixedBinary(Vec<u8>),
    BoolList(Vec<bool>),
    Int32List(Vec<i32>),
    Int64List(Vec<i64>),
    Float64List(Vec<f64>),
}

#[inline]
fn list_item(dt: DataType) -> Arc<Field> {
    Arc::new(Field::new("item", dt, true))
}

#[inline]
fn list_len(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

impl ColumnType {
    /// Encoded width in bytes.
    pub fn width(&self) -> usize {
        match *self {
            ColumnType::Bool => 1,
            ColumnType::Int32 => 4,
            ColumnType::Int64 | ColumnType::Float64 => 8,
            ColumnType::FixedBinary(n) => n,
            ColumnType::BoolList(n) => n.div_ceil(8),
            ColumnType::Int32List(n) => 4 * n,
            ColumnType::Int64List(n) | ColumnType::Float64List(n) => 8 * n,
        }
    }

    pub fn to_arrow(&self) -> DataType {
        match *self {
            ColumnType::Bool => DataType::Boolean,
            ColumnType::Int32 => DataType::Int32,
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::FixedBinary(n) => DataType::FixedSizeBinary(list_len(n)),
            ColumnType::BoolList(n) => {
                DataType::FixedSizeList(list_item(DataType::Boolean), list_len(n))
            }
            ColumnType::Int32List(n) => {
                DataType::FixedSizeList(list_item(DataType::Int32), list_len(n))
            }
            ColumnType::Int64List(n) => {
                DataType::FixedSizeList(list_item(DataType::Int64), list_len(n))
            }
            ColumnType::Float64List(n) => {
                DataType::FixedSizeList(list_item(DataType::Float64), list_len(n))
            }
        }
    }

    pub fn from_arrow(dt: &DataType) -> Result<Self> {
        let size = |n: i32| {
            usize::try_from(n)
                .map_err(|_| Error::InvalidArgumentError(format!("negative size in {dt}")))
        };
        let ty = match dt {
            DataType::Boolean => ColumnType::Bool,
            DataType::Int32 => ColumnType::Int32,
            DataType::Int64 => ColumnType::Int64,
            DataType::Float64 => ColumnType::Float64,
            DataType::FixedSizeBinary(n) => ColumnType::FixedBinary(size(*n)?),
            DataType::FixedSizeList(item, n) => match item.data_type() {
                DataType::Boolean => ColumnType::BoolList(size(*n)?),
                DataType::Int32 => ColumnType::Int32List(size(*n)?),
                DataType::Int64 => ColumnType::Int64List(size(*n)?),
                DataType::Float64 => ColumnType::Float64List(size(*n)?),
                other => {
                    return Err(Error::InvalidArgumentError(format!(
                        "unsupported list item type {other}"
                    )));
                }
            },
            other => {
                return Err(Error::InvalidArgumentError(format!(
                    "unsupported column type {other}"
                )));
            }
        };
        Ok(ty)
    }

    /// Value written into columns that hold no meaningful data.
    pub fn fill(&self) -> Cell {
        match *self {
            ColumnType::Bool => Cell::Bool(false),
            ColumnType::Int32 => Cell::Int32(0),
            ColumnType::Int64 => Cell::Int64(0),
            ColumnType::Float64 => Cell::Float64(0.0),
            ColumnType::FixedBinary(n) => Cell::FixedBinary(vec![0; n]),
            ColumnType::BoolList(n) => Cell::BoolList(vec![false; n]),
            ColumnType::Int32List(n) => Cell::Int32List(vec![0; n]),
            ColumnType::Int64List(n) => Cell::Int64List(vec![0; n]),
            ColumnType::Float64List(n) => Cell::Float64List(vec![0.0; n]),
        }
    }

    /// Whether `cell` can be stored in a column of this type.
    pub fn accepts(&self, cell: &Cell) -> bool {
        match (*self, cell) {
            (ColumnType::Bool, Cell::Bool(_))
            | (ColumnType::Int32, Cell::Int32(_))
            | (ColumnType::Int64, Cell::Int64(_))
            | (ColumnType::Float64, Cell::Float64(_)) => true,
            (ColumnType::FixedBinary(n), Cell::FixedBinary(b)) => b.len() <= n,
            (ColumnType::BoolList(n), Cell::BoolList(v)) => v.len() == n,
            (ColumnType::Int32List(n), Cell::Int32List(v)) => v.len() == n,
            (ColumnType::Int64List(n), Cell::Int64List(v)) => v.len() == n,
            (ColumnType::Float64List(n), Cell::Float64List(v)) => v.len() == n,
            _ => false,
        }
    }

    /// Append the fixed-width encoding of `cell`. The cell must be accepted by this type.
    pub(crate) fn encode(&self, cell: &Cell, out: &mut Vec<u8>) {
        match cell {
            Cell::Bool(b) => out.push(u8::from(*b)),
            Cell::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Cell::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Cell::Float64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Cell::FixedBinary(b) => {
                out.extend_from_slice(b);
                out.resize(out.len() + (self.width() - b.len()), 0);
            }
            Cell::BoolList(v) => {
                let start = out.len();
                out.resize(start + self.width(), 0);
                for (i, bit) in v.iter().enumerate() {
                    if *bit {
                        out[start + i / 8] |= 1 << (i % 8);
                    }
                }
            }
            Cell::Int32List(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            Cell::Int64List(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            Cell::Float64List(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes()))
            }
        }
    }

    pub(crate) fn decode(&self, cur: &mut &[u8]) -> Result<Cell> {
        let bytes = take(cur, self.width())?;
        let cell = match *self {
            ColumnType::Bool => Cell::Bool(bytes[0] != 0),
            ColumnType::Int32 => Cell::Int32(i32::from_le_bytes(le4(bytes))),
            ColumnType::Int64 => Cell::Int64(i64::from_le_bytes(le8(bytes))),
            ColumnType::Float64 => Cell::Float64(f64::from_le_bytes(le8(bytes))),
            ColumnType::FixedBinary(_) => Cell::FixedBinary(bytes.to_vec()),
            ColumnType::BoolList(n) => {
                Cell::BoolList((0..n).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect())
            }
            ColumnType::Int32List(_) => Cell::Int32List(
                bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes(le4(c)))
                    .collect(),
            ),
            ColumnType::Int64List(_) => Cell::Int64List(
                bytes
                    .chunks_exact(8)
                    .map(|c| i64::from_le_bytes(le8(c)))
                    .collect(),
            ),
            ColumnType::Float64List(_) => Cell::Float64List(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes(le8(c)))
                    .collect(),
            ),
        };
        Ok(cell)
    }
}

#[inline]
fn le4(b: &[u8]) -> [u8; 4] {
    [b[0], b[1], b[2], b[3]]
}

#[inline]
fn le8(b: &[u8]) -> [u8; 8] {
    [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]
}

impl Cell {
    /// Short name of the cell kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Cell::Bool(_) => "bool",
            Cell::Int32(_) => "int32",
            Cell::Int64(_) => "int64",
            Cell::Float64(_) => "float64",
            Cell::FixedBinary(_) => "fixed_binary",
            Cell::BoolList(_) => "bool_list",
            Cell::Int32List(_) => "int32_list",
            Cell::Int64List(_) => "int64_list",
            Cell::Float64List(_) => "float64_list",
        }
    }
}
