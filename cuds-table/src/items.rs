//! Keyed tables: containers addressed by a caller-chosen uuid.
//!
//! A [`CudsItems`] lives in its own group and is made of two tables:
//!
//! - `items`: one row per item, the uid as 32 lower-case hex characters plus
//!   the item's own fixed fields ([`ItemFields`]);
//! - `data`: an [`IndexedDataContainerTable`] holding each item's container.
//!
//! Row `i` of `items` and row `i` of `data` describe the same item. The
//! uid-to-row index is kept in memory and rebuilt from `items` on open and
//! after every removal.

use std::marker::PhantomData;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use cuds_container::{DataContainer, KeyDomain};
use cuds_result::{Error, Result};
use cuds_storage::{Cell, ColumnType, Group, Pager, RowTable, RowTableConfig};
use cuds_types::{KeySpace, Uuid};
use rustc_hash::FxHashMap;

use crate::indexed::IndexedDataContainerTable;
use crate::layout::ColumnLayout;

/// Name of the uid column of an items table.
pub const UID_COLUMN: &str = "uid";

/// Width of the hex-encoded uid.
pub const UID_HEX_LEN: usize = 32;

/// Name of the items sub-table inside an item group.
pub const ITEMS_TABLE: &str = "items";

/// Name of the dense data sub-table inside an item group.
pub const DATA_TABLE: &str = "data";

/// Fixed-width fields an item stores next to its uid, e.g. node coordinates.
pub trait ItemFields: Sized {
    /// Arrow fields of the items table, after the uid column.
    fn fields() -> Vec<Field>;

    /// One cell per field of [`ItemFields::fields`].
    fn to_cells(&self) -> Vec<Cell>;

    fn from_cells(cells: Vec<Cell>) -> Result<Self>;
}

/// Items without fields of their own.
impl ItemFields for () {
    fn fields() -> Vec<Field> {
        Vec::new()
    }

    fn to_cells(&self) -> Vec<Cell> {
        Vec::new()
    }

    fn from_cells(cells: Vec<Cell>) -> Result<Self> {
        if cells.is_empty() {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "{} unexpected item cells",
                cells.len()
            )))
        }
    }
}

/// Position of a point-like item (particle, mesh node, lattice node).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinates(pub [f64; 3]);

impl ItemFields for Coordinates {
    fn fields() -> Vec<Field> {
        vec![Field::new(
            "coordinates",
            ColumnType::Float64List(3).to_arrow(),
            false,
        )]
    }

    fn to_cells(&self) -> Vec<Cell> {
        vec![Cell::Float64List(self.0.to_vec())]
    }

    fn from_cells(cells: Vec<Cell>) -> Result<Self> {
        match cells.as_slice() {
            [Cell::Float64List(v)] if v.len() == 3 => Ok(Coordinates([v[0], v[1], v[2]])),
            _ => Err(Error::Internal("malformed coordinates cell".into())),
        }
    }
}

/// One entry of a keyed table.
#[derive(Clone, Debug, PartialEq)]
pub struct Item<F> {
    /// `None` until the item is given an identifier; keyed tables never
    /// invent one.
    pub uid: Option<Uuid>,
    pub fields: F,
    pub data: DataContainer,
}

impl<F> Item<F> {
    pub fn new(uid: Uuid, fields: F, data: DataContainer) -> Self {
        Self {
            uid: Some(uid),
            fields,
            data,
        }
    }

    fn require_uid(&self) -> Result<Uuid> {
        self.uid
            .ok_or_else(|| Error::InvalidArgumentError("item has no uid".into()))
    }
}

fn encode_uid(uid: Uuid) -> Cell {
    Cell::FixedBinary(uid.simple().to_string().into_bytes())
}

fn decode_uid(cell: &Cell) -> Result<Uuid> {
    let Cell::FixedBinary(bytes) = cell else {
        return Err(Error::Internal(format!(
            "uid column holds a {} cell",
            cell.kind()
        )));
    };
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| Error::corrupt("stored uid is not 32 hex digits"))
}

/// A keyed table mapping uuids to items with fields `F` and a container.
///
/// Duplicate uids can only be created through [`CudsItems::add_unsafe`]. When
/// they exist, lookups resolve to the first of them in storage order.
pub struct CudsItems<P: Pager, F: ItemFields> {
    items: RowTable<P>,
    data: IndexedDataContainerTable<P>,
    uids: Vec<Uuid>,
    index: FxHashMap<Uuid, usize>,
    _fields: PhantomData<F>,
}

impl<P: Pager, F: ItemFields> CudsItems<P, F> {
    /// Open the item group `name` below `group`, creating its tables if
    /// needed. `record` optionally reduces the columns of the data table.
    pub fn open(
        group: &Group<P>,
        name: &str,
        keyspace: Arc<KeySpace>,
        record: Option<&Schema>,
    ) -> Result<Self> {
        let group = group.child(name);

        let mut fields = vec![Field::new(
            UID_COLUMN,
            DataType::FixedSizeBinary(UID_HEX_LEN as i32),
            false,
        )];
        fields.extend(F::fields());
        let items = group.open_or_create_table(
            ITEMS_TABLE,
            Arc::new(Schema::new(fields)),
            RowTableConfig::default(),
        )?;
        let data = IndexedDataContainerTable::open(&group, DATA_TABLE, keyspace, record)?;

        let mut this = Self {
            items,
            data,
            uids: Vec::new(),
            index: FxHashMap::default(),
            _fields: PhantomData,
        };
        this.len()?;
        this.uids = this
            .items
            .rows()
            .map(|row| decode_uid(&row?[0]))
            .collect::<Result<Vec<_>>>()?;
        this.rebuild_index();
        tracing::debug!(group = group.path(), items = this.uids.len(), "opened item table");
        Ok(this)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (position, uid) in self.uids.iter().enumerate() {
            self.index.entry(*uid).or_insert(position);
        }
    }

    /// Domain of the containers handed out by this table.
    pub fn domain(&self) -> &KeyDomain {
        self.data.domain()
    }

    pub fn layout(&self) -> &Arc<ColumnLayout> {
        self.data.layout()
    }

    /// Number of items. Fails with [`Error::Internal`] if the items and data
    /// tables disagree, which only an interrupted write can cause.
    pub fn len(&self) -> Result<usize> {
        let items = self.items.row_count();
        let data = self.data.len();
        if items != data {
            return Err(Error::Internal(format!(
                "'{}' has {items} items but '{}' has {data} rows",
                self.items.path(),
                self.data.path()
            )));
        }
        Ok(items)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Uids in storage order.
    pub fn uids(&self) -> &[Uuid] {
        &self.uids
    }

    pub fn contains(&self, uid: Uuid) -> bool {
        self.index.contains_key(&uid)
    }

    fn position(&self, uid: Uuid) -> Result<usize> {
        self.index
            .get(&uid)
            .copied()
            .ok_or(Error::RecordNotFound(uid))
    }

    fn read(&self, position: usize) -> Result<Item<F>> {
        let mut cells = self.items.read_row(position)?;
        let uid = decode_uid(&cells[0])?;
        let fields = F::from_cells(cells.split_off(1))?;
        let data = self.data.get(position)?;
        Ok(Item {
            uid: Some(uid),
            fields,
            data,
        })
    }

    fn item_row(uid: Uuid, fields: &F) -> Vec<Cell> {
        let mut row = vec![encode_uid(uid)];
        row.extend(fields.to_cells());
        row
    }

    fn write(&mut self, position: usize, uid: Uuid, fields: &F, data: &DataContainer) -> Result<()> {
        let row = Self::item_row(uid, fields);
        self.items.schema().validate_row(&row)?;
        self.data.layout().encode_row(data)?;

        self.data.set(position, data)?;
        self.items.write_row(position, &row)?;
        tracing::trace!(%uid, position, "replaced item");
        Ok(())
    }

    fn append(&mut self, uid: Uuid, fields: &F, data: &DataContainer) -> Result<()> {
        let row = Self::item_row(uid, fields);
        self.items.schema().validate_row(&row)?;
        self.data.layout().encode_row(data)?;

        let position = self.data.append(data)?;
        self.items.append_row(&row)?;
        self.uids.push(uid);
        self.index.entry(uid).or_insert(position);
        tracing::trace!(%uid, position, "appended item");
        Ok(())
    }

    /// The item stored under `uid`.
    pub fn get(&self, uid: Uuid) -> Result<Item<F>> {
        self.read(self.position(uid)?)
    }

    /// Store `fields` and `data` under `uid`, replacing the existing item or
    /// appending a new one.
    pub fn set(&mut self, uid: Uuid, fields: &F, data: &DataContainer) -> Result<()> {
        match self.index.get(&uid).copied() {
            Some(position) => self.write(position, uid, fields, data),
            None => self.append(uid, fields, data),
        }
    }

    /// Add an item whose uid is not in the table yet.
    pub fn add_safe(&mut self, item: &Item<F>) -> Result<Uuid> {
        let uid = item.require_uid()?;
        if self.contains(uid) {
            return Err(Error::RecordAlreadyExists(uid));
        }
        self.append(uid, &item.fields, &item.data)?;
        Ok(uid)
    }

    /// Add an item without looking for its uid first. The caller guarantees
    /// the uid is new.
    pub fn add_unsafe(&mut self, item: &Item<F>) -> Result<Uuid> {
        let uid = item.require_uid()?;
        self.append(uid, &item.fields, &item.data)?;
        Ok(uid)
    }

    /// Replace an item that must already exist.
    pub fn update_existing(&mut self, item: &Item<F>) -> Result<()> {
        let uid = item.require_uid()?;
        let position = self.position(uid)?;
        self.write(position, uid, &item.fields, &item.data)
    }

    /// Remove the item stored under `uid`.
    ///
    /// Removing the last item recreates both tables empty.
    pub fn remove(&mut self, uid: Uuid) -> Result<()> {
        let position = self.position(uid)?;
        if self.len()? == 1 {
            self.items.recreate()?;
            self.data.clear()?;
        } else {
            self.items.remove_row(position)?;
            self.data.remove(position)?;
        }
        self.uids.remove(position);
        self.rebuild_index();
        tracing::trace!(%uid, position, "removed item");
        Ok(())
    }

    /// All items in storage order. Every call starts again at the first row.
    pub fn iter(&self) -> impl Iterator<Item = Result<Item<F>>> + '_ {
        (0..self.uids.len()).map(move |position| self.read(position))
    }

    /// The items of `uids`, in that order. An unknown uid fails the
    /// iteration when it is reached.
    pub fn iter_sequence<'a, I>(&'a self, uids: I) -> impl Iterator<Item = Result<Item<F>>> + 'a
    where
        I: IntoIterator<Item = Uuid>,
        I::IntoIter: 'a,
    {
        uids.into_iter().map(move |uid| self.get(uid))
    }
}
