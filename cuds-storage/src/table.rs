//! Fixed-schema row tables over a [`Pager`].
//!
//! A [`TableStore`] plays the role of the file: it owns the pager and the
//! catalog mapping table paths to header blobs. [`Group`]s are path prefixes
//! inside a store, and a [`RowTable`] is one fixed-width table inside a group.
//!
//! ## Physical layout
//!
//! - The catalog lives at [`CATALOG_ROOT_PKEY`].
//! - Each table has a header blob: magic, row count, rows per page, the
//!   physical keys of its pages, and its arrow schema as an IPC stream.
//! - Rows are packed into pages of `rows_per_page` rows. A page blob is
//!   `[row_count: u32][row 0][row 1]...`, every row `row_width` bytes.
//!
//! The row count in the header is the only row counter; every mutation
//! persists the page(s) first and the header last, and the in-memory header
//! is replaced only after the persisted one was written.

use std::sync::{Arc, RwLock};

use arrow::array::{
    ArrayRef, BooleanArray, BooleanBuilder, FixedSizeBinaryBuilder, FixedSizeListBuilder,
    Float64Array, Float64Builder, Int32Array, Int32Builder, Int64Array, Int64Builder,
};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use cuds_result::{Error, Result};

use crate::catalog::StoreCatalog;
use crate::codecs::{len_u32, read_u32_le, read_u64_le, take, write_u32_le, write_u64_le};
use crate::constants::{
    CATALOG_ROOT_PKEY, DEFAULT_PAGE_BYTES, PATH_SEPARATOR, TABLE_HEADER_MAGIC,
};
use crate::pager::{BatchPut, Pager};
use crate::schema::RowSchema;
use crate::types::{Cell, ColumnType, PhysicalKey};

/// Normalize a table or group path: no empty components, no leading or
/// trailing separator.
fn normalize_path(path: &str) -> String {
    path.split(PATH_SEPARATOR)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn join_path(parent: &str, child: &str) -> String {
    normalize_path(&format!("{parent}{PATH_SEPARATOR}{child}"))
}

/// The store: a pager plus the catalog of tables living in it.
pub struct TableStore<P: Pager> {
    pager: Arc<P>,
    catalog: Arc<RwLock<StoreCatalog>>,
}

impl<P: Pager> Clone for TableStore<P> {
    fn clone(&self) -> Self {
        Self {
            pager: Arc::clone(&self.pager),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<P: Pager> TableStore<P> {
    /// Open the store held by `pager`, loading its catalog if one exists.
    pub fn open(pager: Arc<P>) -> Result<Self> {
        let catalog = match pager.get_one(CATALOG_ROOT_PKEY)? {
            Some(blob) => StoreCatalog::from_bytes(blob.as_ref())?,
            None => StoreCatalog::default(),
        };
        tracing::debug!(tables = catalog.map.len(), "opened table store");
        Ok(Self {
            pager,
            catalog: Arc::new(RwLock::new(catalog)),
        })
    }

    pub fn pager(&self) -> &Arc<P> {
        &self.pager
    }

    /// The root group.
    pub fn root(&self) -> Group<P> {
        self.group("")
    }

    /// Open or create the group at `path`. Groups are implicit: they exist as
    /// soon as a table is created below them.
    pub fn group(&self, path: &str) -> Group<P> {
        Group {
            store: self.clone(),
            path: normalize_path(path),
        }
    }

    pub fn contains_table(&self, path: &str) -> bool {
        self.lookup(&normalize_path(path)).is_some()
    }

    /// All table paths, sorted.
    pub fn table_paths(&self) -> Vec<String> {
        let catalog = self.catalog.read().expect("catalog read lock poisoned");
        let mut paths: Vec<String> = catalog.map.keys().cloned().collect();
        paths.sort_unstable();
        paths
    }

    fn lookup(&self, path: &str) -> Option<PhysicalKey> {
        self.catalog
            .read()
            .expect("catalog read lock poisoned")
            .map
            .get(path)
            .copied()
    }

    /// Point `path` at `header_pk` and persist the catalog. The in-memory
    /// catalog only changes once the blob was written.
    fn register(&self, path: &str, header_pk: PhysicalKey) -> Result<()> {
        let mut catalog = self.catalog.write().expect("catalog write lock poisoned");
        let mut next = catalog.clone();
        next.map.insert(path.to_string(), header_pk);
        self.pager.put_one(CATALOG_ROOT_PKEY, next.to_bytes()?)?;
        *catalog = next;
        Ok(())
    }

    fn unregister(&self, path: &str) -> Result<Option<PhysicalKey>> {
        let mut catalog = self.catalog.write().expect("catalog write lock poisoned");
        let mut next = catalog.clone();
        let removed = next.map.remove(path);
        if removed.is_some() {
            self.pager.put_one(CATALOG_ROOT_PKEY, next.to_bytes()?)?;
            *catalog = next;
        }
        Ok(removed)
    }
}

/// A named location inside a store under which tables are created.
pub struct Group<P: Pager> {
    store: TableStore<P>,
    path: String,
}

impl<P: Pager> Clone for Group<P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.clone(),
        }
    }
}

impl<P: Pager> Group<P> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn store(&self) -> &TableStore<P> {
        &self.store
    }

    /// The sub-group `name` of this group.
    pub fn child(&self, name: &str) -> Group<P> {
        Group {
            store: self.store.clone(),
            path: join_path(&self.path, name),
        }
    }

    pub fn table_path(&self, name: &str) -> String {
        join_path(&self.path, name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.store.lookup(&self.table_path(name)).is_some()
    }

    /// Create an empty table. Fails if a table already exists at that path.
    pub fn create_table(
        &self,
        name: &str,
        schema: SchemaRef,
        config: RowTableConfig,
    ) -> Result<RowTable<P>> {
        let path = self.table_path(name);
        if self.store.lookup(&path).is_some() {
            return Err(Error::InvalidArgumentError(format!(
                "table '{path}' already exists"
            )));
        }
        RowTable::create(self.store.clone(), path, RowSchema::new(schema)?, config)
    }

    /// Open an existing table, [`Error::NotFound`] if there is none.
    pub fn open_table(&self, name: &str) -> Result<RowTable<P>> {
        RowTable::open(self.store.clone(), self.table_path(name))
    }

    /// Open the table if it exists, create it otherwise. An existing table
    /// must have the same column names and types as `schema`.
    pub fn open_or_create_table(
        &self,
        name: &str,
        schema: SchemaRef,
        config: RowTableConfig,
    ) -> Result<RowTable<P>> {
        if !self.contains_table(name) {
            return self.create_table(name, schema, config);
        }
        let table = self.open_table(name)?;
        let wanted = RowSchema::new(schema)?;
        if table.schema() != &wanted {
            return Err(Error::InvalidArgumentError(format!(
                "table '{}' exists with a different schema",
                table.path()
            )));
        }
        Ok(table)
    }

    /// Drop a table and free all of its pages.
    pub fn remove_table(&self, name: &str) -> Result<()> {
        let table = self.open_table(name)?;
        table.discard()?;
        self.store.unregister(table.path())?;
        tracing::debug!(path = table.path(), "removed table");
        Ok(())
    }
}

/// Tunables of a row table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowTableConfig {
    /// Target size of one page in bytes. A page holds at least one row.
    pub page_bytes: usize,
}

impl Default for RowTableConfig {
    fn default() -> Self {
        Self {
            page_bytes: DEFAULT_PAGE_BYTES,
        }
    }
}

#[derive(Clone, Debug)]
struct TableHeader {
    row_count: u64,
    rows_per_page: u32,
    pages: Vec<PhysicalKey>,
}

impl TableHeader {
    fn to_bytes(&self, schema: &RowSchema) -> Result<Vec<u8>> {
        let schema_bytes = schema.to_ipc_bytes()?;
        let mut buf = Vec::with_capacity(24 + self.pages.len() * 8 + schema_bytes.len());
        buf.extend_from_slice(&TABLE_HEADER_MAGIC);
        write_u64_le(&mut buf, self.row_count);
        write_u32_le(&mut buf, self.rows_per_page);
        write_u32_le(&mut buf, len_u32(self.pages.len(), "page list")?);
        for &pk in &self.pages {
            write_u64_le(&mut buf, pk);
        }
        write_u32_le(&mut buf, len_u32(schema_bytes.len(), "schema")?);
        buf.extend_from_slice(&schema_bytes);
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<(Self, RowSchema)> {
        let mut cur = bytes;
        if take(&mut cur, 4)? != TABLE_HEADER_MAGIC.as_slice() {
            return Err(Error::corrupt("bad table header magic"));
        }
        let row_count = read_u64_le(&mut cur)?;
        let rows_per_page = read_u32_le(&mut cur)?;
        let page_count = read_u32_le(&mut cur)? as usize;
        let pages = (0..page_count)
            .map(|_| read_u64_le(&mut cur))
            .collect::<Result<Vec<_>>>()?;
        let schema_len = read_u32_le(&mut cur)? as usize;
        let schema = RowSchema::from_ipc_bytes(take(&mut cur, schema_len)?)?;

        if rows_per_page == 0 {
            return Err(Error::corrupt("table header with zero rows per page"));
        }
        let needed = row_count.div_ceil(u64::from(rows_per_page));
        if needed != pages.len() as u64 {
            return Err(Error::corrupt(format!(
                "{row_count} rows need {needed} pages, header lists {}",
                pages.len()
            )));
        }
        Ok((
            Self {
                row_count,
                rows_per_page,
                pages,
            },
            schema,
        ))
    }
}

/// A fixed-schema, row-addressed table.
///
/// Rows are addressed by zero-based position. Removing a row compacts the
/// table, shifting every later row down by one. Like the columnar formats it
/// stands in for, a table cannot remove its only remaining row in place; use
/// [`RowTable::recreate`] for that.
pub struct RowTable<P: Pager> {
    store: TableStore<P>,
    path: String,
    header_pk: PhysicalKey,
    header: TableHeader,
    schema: RowSchema,
}

impl<P: Pager> RowTable<P> {
    fn create(
        store: TableStore<P>,
        path: String,
        schema: RowSchema,
        config: RowTableConfig,
    ) -> Result<Self> {
        let rows_per_page = (config.page_bytes / schema.row_width().max(1)).max(1);
        let header = TableHeader {
            row_count: 0,
            rows_per_page: u32::try_from(rows_per_page).unwrap_or(u32::MAX),
            pages: Vec::new(),
        };
        let header_pk = Self::write_new_header(&store, &path, &header, &schema)?;
        tracing::debug!(
            path = %path,
            columns = schema.column_count(),
            row_width = schema.row_width(),
            rows_per_page,
            "created table"
        );
        Ok(Self {
            store,
            path,
            header_pk,
            header,
            schema,
        })
    }

    fn open(store: TableStore<P>, path: String) -> Result<Self> {
        let header_pk = store.lookup(&path).ok_or(Error::NotFound)?;
        let blob = store.pager.get_one(header_pk)?.ok_or(Error::NotFound)?;
        let (header, schema) = TableHeader::from_bytes(blob.as_ref())?;
        tracing::debug!(path = %path, rows = header.row_count, "opened table");
        Ok(Self {
            store,
            path,
            header_pk,
            header,
            schema,
        })
    }

    fn write_new_header(
        store: &TableStore<P>,
        path: &str,
        header: &TableHeader,
        schema: &RowSchema,
    ) -> Result<PhysicalKey> {
        let header_pk = store
            .pager
            .alloc_many(1)?
            .pop()
            .ok_or_else(|| Error::Internal("pager allocated no key".into()))?;
        store.pager.put_one(header_pk, header.to_bytes(schema)?)?;
        store.register(path, header_pk)?;
        Ok(header_pk)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.header.row_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.row_count == 0
    }

    pub fn rows_per_page(&self) -> usize {
        self.header.rows_per_page as usize
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position >= self.row_count() {
            return Err(Error::IndexOutOfRange {
                index: position,
                len: self.row_count(),
            });
        }
        Ok(())
    }

    fn commit_header(&mut self, next: TableHeader) -> Result<()> {
        self.store
            .pager
            .put_one(self.header_pk, next.to_bytes(&self.schema)?)?;
        self.header = next;
        Ok(())
    }

    /// Rows of page `page_idx`, without the row-count prefix.
    fn load_page(&self, page_idx: usize) -> Result<Vec<u8>> {
        let pk = self.header.pages[page_idx];
        let blob = self
            .store
            .pager
            .get_one(pk)?
            .ok_or_else(|| Error::Internal(format!("page {pk} of '{}' is missing", self.path)))?;
        let mut cur = blob.as_ref();
        let rows = read_u32_le(&mut cur)? as usize;
        if cur.len() != rows * self.schema.row_width() {
            return Err(Error::corrupt(format!(
                "page {pk} holds {} bytes for {rows} rows",
                cur.len()
            )));
        }
        Ok(cur.to_vec())
    }

    fn page_blob(rows_in_page: usize, rows: &[u8]) -> Result<Vec<u8>> {
        let mut blob = Vec::with_capacity(4 + rows.len());
        write_u32_le(&mut blob, len_u32(rows_in_page, "page")?);
        blob.extend_from_slice(rows);
        Ok(blob)
    }

    /// Append a row; returns its position.
    pub fn append_row(&mut self, cells: &[Cell]) -> Result<usize> {
        let mut row = Vec::new();
        self.schema.encode_row(cells, &mut row)?;

        let position = self.row_count();
        let rpp = self.rows_per_page();
        let page_idx = position / rpp;
        let mut next = self.header.clone();

        let (pk, mut rows) = if page_idx == self.header.pages.len() {
            let pk = self
                .store
                .pager
                .alloc_many(1)?
                .pop()
                .ok_or_else(|| Error::Internal("pager allocated no key".into()))?;
            next.pages.push(pk);
            (pk, Vec::with_capacity(rpp * self.schema.row_width()))
        } else {
            (self.header.pages[page_idx], self.load_page(page_idx)?)
        };
        rows.extend_from_slice(&row);
        self.store
            .pager
            .put_one(pk, Self::page_blob(position % rpp + 1, &rows)?)?;

        next.row_count += 1;
        self.commit_header(next)?;
        tracing::trace!(path = %self.path, position, "appended row");
        Ok(position)
    }

    pub fn read_row(&self, position: usize) -> Result<Vec<Cell>> {
        self.check_position(position)?;
        let rpp = self.rows_per_page();
        let width = self.schema.row_width();
        let rows = self.load_page(position / rpp)?;
        let start = (position % rpp) * width;
        let bytes = rows
            .get(start..start + width)
            .ok_or_else(|| Error::corrupt(format!("row {position} beyond end of its page")))?;
        self.schema.decode_row(bytes)
    }

    /// Replace the whole row at `position`.
    pub fn write_row(&mut self, position: usize, cells: &[Cell]) -> Result<()> {
        self.check_position(position)?;
        let mut row = Vec::new();
        self.schema.encode_row(cells, &mut row)?;

        let rpp = self.rows_per_page();
        let width = self.schema.row_width();
        let page_idx = position / rpp;
        let mut rows = self.load_page(page_idx)?;
        let start = (position % rpp) * width;
        rows[start..start + width].copy_from_slice(&row);
        if width > 0 {
            let rows_in_page = rows.len() / width;
            self.store.pager.put_one(
                self.header.pages[page_idx],
                Self::page_blob(rows_in_page, &rows)?,
            )?;
        }
        tracing::trace!(path = %self.path, position, "overwrote row");
        Ok(())
    }

    /// Remove the row at `position`, shifting later rows down by one.
    ///
    /// Refuses to remove the only remaining row; see [`RowTable::recreate`].
    pub fn remove_row(&mut self, position: usize) -> Result<()> {
        self.check_position(position)?;
        if self.row_count() == 1 {
            return Err(Error::InvalidArgumentError(format!(
                "cannot remove the last row of '{}' in place, recreate the table instead",
                self.path
            )));
        }

        let rpp = self.rows_per_page();
        let width = self.schema.row_width();
        let first_page = position / rpp;

        // Gather every row from the first affected page to the end, drop the
        // removed one, then re-chunk.
        let mut tail = Vec::new();
        for page_idx in first_page..self.header.pages.len() {
            tail.extend_from_slice(&self.load_page(page_idx)?);
        }
        let local = (position - first_page * rpp) * width;
        tail.drain(local..local + width);

        let new_count = self.row_count() - 1;
        let pages_needed = new_count.div_ceil(rpp);
        let mut next = self.header.clone();
        let freed = next.pages.split_off(pages_needed);

        let mut puts = Vec::new();
        for page_idx in first_page..pages_needed {
            let rows_here = (new_count - page_idx * rpp).min(rpp);
            let start = (page_idx - first_page) * rpp * width;
            puts.push(BatchPut::Raw {
                key: next.pages[page_idx],
                bytes: Self::page_blob(rows_here, &tail[start..start + rows_here * width])?,
            });
        }
        self.store.pager.batch_put(&puts)?;

        next.row_count = new_count as u64;
        self.commit_header(next)?;
        if !freed.is_empty() {
            self.store.pager.free_many(&freed)?;
        }
        tracing::trace!(path = %self.path, position, "removed row");
        Ok(())
    }

    /// Discard every page and the header, then recreate the table empty,
    /// with the same schema, at the same path.
    pub fn recreate(&mut self) -> Result<()> {
        self.discard()?;
        let header = TableHeader {
            row_count: 0,
            rows_per_page: self.header.rows_per_page,
            pages: Vec::new(),
        };
        self.header_pk = Self::write_new_header(&self.store, &self.path, &header, &self.schema)?;
        self.header = header;
        tracing::debug!(path = %self.path, "recreated table");
        Ok(())
    }

    fn discard(&self) -> Result<()> {
        let mut keys = self.header.pages.clone();
        keys.push(self.header_pk);
        self.store.pager.free_many(&keys)
    }

    /// Iterate over all rows in position order.
    pub fn rows(&self) -> impl Iterator<Item = Result<Vec<Cell>>> + '_ {
        (0..self.row_count()).map(move |position| self.read_row(position))
    }

    /// Materialize the whole table as one arrow record batch.
    pub fn scan_batch(&self) -> Result<RecordBatch> {
        let width = self.schema.row_width();
        let mut rows = Vec::with_capacity(self.row_count());
        if width == 0 {
            for _ in 0..self.row_count() {
                rows.push(self.schema.decode_row(&[])?);
            }
        } else {
            for page_idx in 0..self.header.pages.len() {
                for bytes in self.load_page(page_idx)?.chunks_exact(width) {
                    rows.push(self.schema.decode_row(bytes)?);
                }
            }
        }

        let columns = self
            .schema
            .columns()
            .iter()
            .enumerate()
            .map(|(i, ty)| build_column(*ty, rows.iter().map(|r| &r[i])))
            .collect::<Result<Vec<_>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        Ok(RecordBatch::try_new_with_options(
            SchemaRef::clone(self.schema.arrow_schema()),
            columns,
            &options,
        )?)
    }
}

fn mismatch(ty: ColumnType, cell: &Cell) -> Error {
    Error::Internal(format!("decoded {} cell in {ty:?} column", cell.kind()))
}

fn build_column<'a>(ty: ColumnType, cells: impl Iterator<Item = &'a Cell>) -> Result<ArrayRef> {
    macro_rules! scalar {
        ($variant:ident, $array:ty) => {{
            let values = cells
                .map(|c| match c {
                    Cell::$variant(v) => Ok(*v),
                    other => Err(mismatch(ty, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(<$array>::from(values)) as ArrayRef
        }};
    }
    macro_rules! list {
        ($variant:ident, $builder:expr, $n:expr) => {{
            let mut builder = FixedSizeListBuilder::new($builder, $n as i32);
            for c in cells {
                match c {
                    Cell::$variant(v) => builder.values().append_slice(v),
                    other => return Err(mismatch(ty, other)),
                }
                builder.append(true);
            }
            Arc::new(builder.finish()) as ArrayRef
        }};
    }

    let array = match ty {
        ColumnType::Bool => scalar!(Bool, BooleanArray),
        ColumnType::Int32 => scalar!(Int32, Int32Array),
        ColumnType::Int64 => scalar!(Int64, Int64Array),
        ColumnType::Float64 => scalar!(Float64, Float64Array),
        ColumnType::FixedBinary(n) => {
            let mut builder = FixedSizeBinaryBuilder::new(n as i32);
            for c in cells {
                match c {
                    Cell::FixedBinary(b) => builder.append_value(b)?,
                    other => return Err(mismatch(ty, other)),
                }
            }
            Arc::new(builder.finish()) as ArrayRef
        }
        ColumnType::BoolList(n) => list!(BoolList, BooleanBuilder::new(), n),
        ColumnType::Int32List(n) => list!(Int32List, Int32Builder::new(), n),
        ColumnType::Int64List(n) => list!(Int64List, Int64Builder::new(), n),
        ColumnType::Float64List(n) => list!(Float64List, Float64Builder::new(), n),
    };
    Ok(array)
}
