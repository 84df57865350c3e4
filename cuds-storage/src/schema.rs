//! Row schemas: an arrow [`Schema`] plus the derived fixed-width layout.

use std::io::Cursor;
use std::sync::Arc;

use arrow::datatypes::{Schema, SchemaRef};
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use cuds_result::{Error, Result};

use crate::types::{Cell, ColumnType};

/// Schema of a [`RowTable`](crate::table::RowTable).
///
/// The arrow schema is the self-describing part that gets persisted; the
/// column types and row width are derived from it once.
#[derive(Clone, Debug)]
pub struct RowSchema {
    arrow: SchemaRef,
    columns: Vec<ColumnType>,
    width: usize,
}

impl PartialEq for RowSchema {
    /// Two row schemas are equal when their column names and physical types
    /// agree. Field metadata does not take part.
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self
                .arrow
                .fields()
                .iter()
                .zip(other.arrow.fields().iter())
                .all(|(a, b)| a.name() == b.name())
    }
}

impl RowSchema {
    pub fn new(arrow: SchemaRef) -> Result<Self> {
        let columns = arrow
            .fields()
            .iter()
            .map(|f| {
                ColumnType::from_arrow(f.data_type()).map_err(|e| {
                    Error::InvalidArgumentError(format!("column '{}': {e}", f.name()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let width = columns.iter().map(ColumnType::width).sum();
        Ok(Self {
            arrow,
            columns,
            width,
        })
    }

    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow
    }

    pub fn columns(&self) -> &[ColumnType] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Encoded width of one row in bytes.
    pub fn row_width(&self) -> usize {
        self.width
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.arrow.index_of(name).ok()
    }

    /// A row holding the fill value of every column.
    pub fn fill_row(&self) -> Vec<Cell> {
        self.columns.iter().map(ColumnType::fill).collect()
    }

    /// Check `cells` against the schema without encoding anything.
    pub fn validate_row(&self, cells: &[Cell]) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::InvalidArgumentError(format!(
                "row has {} cells, schema has {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        for (i, (ty, cell)) in self.columns.iter().zip(cells).enumerate() {
            if !ty.accepts(cell) {
                return Err(Error::InvalidArgumentError(format!(
                    "column '{}' of type {ty:?} cannot hold a {} cell",
                    self.arrow.field(i).name(),
                    cell.kind()
                )));
            }
        }
        Ok(())
    }

    pub fn encode_row(&self, cells: &[Cell], out: &mut Vec<u8>) -> Result<()> {
        self.validate_row(cells)?;
        out.reserve(self.width);
        for (ty, cell) in self.columns.iter().zip(cells) {
            ty.encode(cell, out);
        }
        Ok(())
    }

    pub fn decode_row(&self, bytes: &[u8]) -> Result<Vec<Cell>> {
        if bytes.len() != self.width {
            return Err(Error::corrupt(format!(
                "row is {} bytes, expected {}",
                bytes.len(),
                self.width
            )));
        }
        let mut cur = bytes;
        self.columns.iter().map(|ty| ty.decode(&mut cur)).collect()
    }

    /// Serialize the arrow schema as an IPC stream with no batches.
    pub(crate) fn to_ipc_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buf, &self.arrow)?;
            writer.finish()?;
        }
        Ok(buf)
    }

    pub(crate) fn from_ipc_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
        Self::new(reader.schema())
    }
}

impl TryFrom<Schema> for RowSchema {
    type Error = Error;

    fn try_from(schema: Schema) -> Result<Self> {
        Self::new(Arc::new(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};
    use std::collections::HashMap;

    fn sample() -> RowSchema {
        let meta = HashMap::from([("cuds_key".to_string(), "POSITION".to_string())]);
        RowSchema::try_from(Schema::new(vec![
            Field::new("mass", DataType::Float64, false),
            Field::new("position", ColumnType::Float64List(3).to_arrow(), false)
                .with_metadata(meta),
            Field::new("name", DataType::FixedSizeBinary(8), false),
        ]))
        .unwrap()
    }

    #[test]
    fn row_width_is_the_sum_of_column_widths() {
        assert_eq!(sample().row_width(), 8 + 24 + 8);
    }

    #[test]
    fn rows_round_trip_through_the_fixed_width_codec() {
        let schema = sample();
        let row = vec![
            Cell::Float64(2.5),
            Cell::Float64List(vec![1.0, -2.0, 3.0]),
            Cell::FixedBinary(b"argon\0\0\0".to_vec()),
        ];
        let mut buf = Vec::new();
        schema.encode_row(&row, &mut buf).unwrap();
        assert_eq!(buf.len(), schema.row_width());
        assert_eq!(schema.decode_row(&buf).unwrap(), row);
    }

    #[test]
    fn mismatched_rows_are_rejected_before_encoding() {
        let schema = sample();
        let mut buf = Vec::new();
        let err = schema
            .encode_row(&[Cell::Int32(1), Cell::Float64(0.0)], &mut buf)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));

        let err = schema
            .encode_row(
                &[
                    Cell::Float64(1.0),
                    Cell::Float64List(vec![1.0]),
                    Cell::FixedBinary(vec![]),
                ],
                &mut buf,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn ipc_round_trip_keeps_field_metadata() {
        let schema = sample();
        let bytes = schema.to_ipc_bytes().unwrap();
        let back = RowSchema::from_ipc_bytes(&bytes).unwrap();
        assert_eq!(back, schema);
        assert_eq!(
            back.arrow_schema()
                .field(1)
                .metadata()
                .get("cuds_key")
                .map(String::as_str),
            Some("POSITION")
        );
    }
}
