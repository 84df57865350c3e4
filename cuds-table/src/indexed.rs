//! Dense, position-addressed tables of data containers.

use std::sync::Arc;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use cuds_container::{DataContainer, KeyDomain};
use cuds_result::{Error, Result};
use cuds_storage::{Group, Pager, RowSchema, RowTable, RowTableConfig};
use cuds_types::KeySpace;

use crate::layout::ColumnLayout;

/// A table of containers addressed by zero-based row position.
///
/// Each row stores one container through the table's [`ColumnLayout`]: one
/// field per column plus a presence mask. Reading a row yields a new container
/// holding exactly the keys whose mask bit is set, in the table's own
/// [`KeyDomain`] (the layout's keys).
///
/// The length is always the backing table's row count; nothing is cached.
pub struct IndexedDataContainerTable<P: Pager> {
    table: RowTable<P>,
    layout: Arc<ColumnLayout>,
    domain: KeyDomain,
}

impl<P: Pager> IndexedDataContainerTable<P> {
    /// Open the table `name` of `group`, creating it if it does not exist.
    ///
    /// A new table gets the columns of `record` if given, otherwise one
    /// column per storable key of `keyspace`. An existing table keeps the
    /// layout it was created with; if `record` is given it must describe the
    /// same columns.
    pub fn open(
        group: &Group<P>,
        name: &str,
        keyspace: Arc<KeySpace>,
        record: Option<&Schema>,
    ) -> Result<Self> {
        Self::open_with_config(group, name, keyspace, record, RowTableConfig::default())
    }

    pub fn open_with_config(
        group: &Group<P>,
        name: &str,
        keyspace: Arc<KeySpace>,
        record: Option<&Schema>,
        config: RowTableConfig,
    ) -> Result<Self> {
        let wanted = record
            .map(|r| ColumnLayout::from_record(Arc::clone(&keyspace), r))
            .transpose()?;

        let (table, layout) = if group.contains_table(name) {
            let table = group.open_table(name)?;
            let stored =
                ColumnLayout::from_record(keyspace, table.schema().arrow_schema().as_ref())?;
            if table.schema() != &RowSchema::new(stored.record_schema())? {
                return Err(Error::InvalidArgumentError(format!(
                    "table '{}' is not a dense container table",
                    table.path()
                )));
            }
            if wanted.is_some_and(|w| !w.keys().eq(stored.keys())) {
                return Err(Error::InvalidArgumentError(format!(
                    "table '{}' exists with different columns",
                    table.path()
                )));
            }
            (table, stored)
        } else {
            let layout = wanted.unwrap_or_else(|| ColumnLayout::full(keyspace));
            let table = group.create_table(name, layout.record_schema(), config)?;
            (table, layout)
        };

        let domain = layout.domain()?;
        tracing::debug!(
            path = table.path(),
            columns = layout.len(),
            rows = table.row_count(),
            "opened dense container table"
        );
        Ok(Self {
            table,
            layout: Arc::new(layout),
            domain,
        })
    }

    pub fn layout(&self) -> &Arc<ColumnLayout> {
        &self.layout
    }

    /// Domain of the containers this table hands out.
    pub fn domain(&self) -> &KeyDomain {
        &self.domain
    }

    pub fn path(&self) -> &str {
        self.table.path()
    }

    pub fn len(&self) -> usize {
        self.table.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Append `container` as a new last row and return its position.
    ///
    /// Keys without a column in this table are dropped.
    pub fn append(&mut self, container: &DataContainer) -> Result<usize> {
        let row = self.layout.encode_row(container)?;
        self.table.append_row(&row)
    }

    /// The container stored at `position`.
    pub fn get(&self, position: usize) -> Result<DataContainer> {
        let row = self.table.read_row(position)?;
        self.layout.decode_row(row, &self.domain)
    }

    /// Replace the whole row at `position` with `container`.
    pub fn set(&mut self, position: usize, container: &DataContainer) -> Result<()> {
        if position >= self.len() {
            return Err(Error::IndexOutOfRange {
                index: position,
                len: self.len(),
            });
        }
        let row = self.layout.encode_row(container)?;
        self.table.write_row(position, &row)
    }

    /// Remove the row at `position`; later rows move down by one.
    ///
    /// Removing the only row recreates the backing table empty.
    pub fn remove(&mut self, position: usize) -> Result<()> {
        if position >= self.len() {
            return Err(Error::IndexOutOfRange {
                index: position,
                len: self.len(),
            });
        }
        if self.len() == 1 {
            self.table.recreate()
        } else {
            self.table.remove_row(position)
        }
    }

    /// Drop every row.
    pub fn clear(&mut self) -> Result<()> {
        self.table.recreate()
    }

    /// All containers in row order. Every call starts again at row 0.
    pub fn iter(&self) -> impl Iterator<Item = Result<DataContainer>> + '_ {
        (0..self.len()).map(move |position| self.get(position))
    }

    /// The raw table, record fields and mask included, as one batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        self.table.scan_batch()
    }
}
