//! Column layouts: where each key of a container lives in a table row.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaRef};
use cuds_container::{DataContainer, KeyDomain};
use cuds_result::{Error, Result};
use cuds_storage::constants::{KEY_META_KEY, LOGICAL_TYPE_META_KEY, SHAPE_META_KEY};
use cuds_storage::{Cell, ColumnType};
use cuds_types::{Key, KeyDef, KeySpace};
use rustc_hash::FxHashMap;

use crate::codec::{column_type, decode_cell, encode_value};
use crate::mask::PresenceMask;

/// Name of the presence-mask column of a dense table.
pub const MASK_COLUMN: &str = "mask";

#[derive(Clone, Debug)]
struct Column {
    def: KeyDef,
    name: String,
    ty: ColumnType,
}

/// The mapping between keys and column positions of one table.
///
/// Columns are ordered by key ordinal. That order fixes both the field order
/// of a row and the bit order of its [`PresenceMask`]. Only keys with a dtype
/// can have a column.
#[derive(Clone, Debug)]
pub struct ColumnLayout {
    keyspace: Arc<KeySpace>,
    columns: Vec<Column>,
    positions: FxHashMap<Key, usize>,
}

impl ColumnLayout {
    fn from_defs(keyspace: Arc<KeySpace>, mut defs: Vec<KeyDef>) -> Result<Self> {
        defs.sort_by_key(KeyDef::key);
        let mut columns = Vec::with_capacity(defs.len());
        let mut positions = FxHashMap::with_capacity_and_hasher(defs.len(), Default::default());
        for def in defs {
            let ty = column_type(&def).ok_or_else(|| {
                Error::InvalidArgumentError(format!("key '{}' has no dtype to store", def.name()))
            })?;
            if positions.insert(def.key(), columns.len()).is_some() {
                return Err(Error::InvalidArgumentError(format!(
                    "key '{}' appears twice in the record",
                    def.name()
                )));
            }
            columns.push(Column {
                name: def.name().to_lowercase(),
                def,
                ty,
            });
        }
        Ok(Self {
            keyspace,
            columns,
            positions,
        })
    }

    /// One column for every key of `keyspace` that has a dtype.
    pub fn full(keyspace: Arc<KeySpace>) -> Self {
        let columns: Vec<Column> = keyspace
            .iter()
            .filter_map(|def| {
                column_type(def).map(|ty| Column {
                    def: def.clone(),
                    name: def.name().to_lowercase(),
                    ty,
                })
            })
            .collect();
        let positions = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.def.key(), i))
            .collect();
        Self {
            keyspace,
            columns,
            positions,
        }
    }

    /// A layout holding exactly `keys`.
    pub fn from_keys<I>(keyspace: Arc<KeySpace>, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = Key>,
    {
        let defs = keys
            .into_iter()
            .map(|key| keyspace.def(key).cloned())
            .collect::<Result<Vec<_>>>()?;
        Self::from_defs(keyspace, defs)
    }

    /// A layout from a record description: one field per key, named after the
    /// key (case-insensitively) and typed like the key's column. A
    /// [`MASK_COLUMN`] field, if present, is skipped.
    pub fn from_record(keyspace: Arc<KeySpace>, record: &Schema) -> Result<Self> {
        let mut defs = Vec::with_capacity(record.fields().len());
        for field in record.fields() {
            if field.name() == MASK_COLUMN {
                continue;
            }
            let key = keyspace.lookup(field.name()).ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "record field '{}' does not name a key",
                    field.name()
                ))
            })?;
            let def = keyspace.def(key)?;
            let expected = column_type(def).ok_or_else(|| {
                Error::InvalidArgumentError(format!("key '{}' has no dtype to store", def.name()))
            })?;
            let actual = ColumnType::from_arrow(field.data_type())?;
            if actual != expected {
                return Err(Error::InvalidArgumentError(format!(
                    "record field '{}' is {actual:?}, key '{}' needs {expected:?}",
                    field.name(),
                    def.name()
                )));
            }
            defs.push(def.clone());
        }
        Self::from_defs(keyspace, defs)
    }

    pub fn keyspace(&self) -> &Arc<KeySpace> {
        &self.keyspace
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column position of `key`.
    pub fn position(&self, key: Key) -> Option<usize> {
        self.positions.get(&key).copied()
    }

    /// Key stored at column `position`.
    pub fn key_at(&self, position: usize) -> Option<Key> {
        self.columns.get(position).map(|c| c.def.key())
    }

    /// Lower-cased column name of `key`.
    pub fn column_name(&self, key: Key) -> Option<&str> {
        self.position(key).map(|i| self.columns[i].name.as_str())
    }

    /// Keys with a column, in column order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.columns.iter().map(|c| c.def.key())
    }

    /// The container domain matching this layout: exactly its keys.
    pub fn domain(&self) -> Result<KeyDomain> {
        KeyDomain::full(Arc::clone(&self.keyspace)).restrict(self.keys())
    }

    /// One arrow field per column, carrying the key name, shape and logical
    /// dtype as field metadata.
    pub fn record_fields(&self) -> Vec<Field> {
        self.columns
            .iter()
            .map(|c| {
                let mut meta = HashMap::new();
                meta.insert(KEY_META_KEY.to_string(), c.def.name().to_string());
                if let Some(dtype) = c.def.dtype() {
                    meta.insert(LOGICAL_TYPE_META_KEY.to_string(), dtype.to_string());
                }
                if c.def.is_array() {
                    let shape: Vec<String> = c.def.shape().iter().map(usize::to_string).collect();
                    meta.insert(SHAPE_META_KEY.to_string(), shape.join(","));
                }
                Field::new(c.name.clone(), c.ty.to_arrow(), false).with_metadata(meta)
            })
            .collect()
    }

    /// Schema of a dense table row: the record fields followed by the mask.
    pub fn record_schema(&self) -> SchemaRef {
        let mut fields = self.record_fields();
        fields.push(Field::new(
            MASK_COLUMN,
            ColumnType::BoolList(self.len()).to_arrow(),
            false,
        ));
        Arc::new(Schema::new(fields))
    }

    /// Keys of `container` that have no column here and would be dropped.
    pub fn dropped_keys(&self, container: &DataContainer) -> Vec<Key> {
        container
            .keys()
            .filter(|k| !self.positions.contains_key(k))
            .collect()
    }

    /// Convert `container` to column cells and a presence mask.
    ///
    /// Keys without a column are skipped. Columns the container has no value
    /// for hold their fill value and a clear mask bit.
    pub fn to_row(&self, container: &DataContainer) -> Result<(Vec<Cell>, PresenceMask)> {
        let mut cells: Vec<Cell> = self.columns.iter().map(|c| c.ty.fill()).collect();
        let mut mask = PresenceMask::new(self.len());
        for (key, value) in container.iter() {
            match self.position(key) {
                Some(i) => {
                    cells[i] = encode_value(&self.columns[i].def, value)?;
                    mask.set(i, true);
                }
                None => {
                    tracing::trace!(key = %self.keyspace.describe(key), "dropping key without a column");
                }
            }
        }
        Ok((cells, mask))
    }

    /// Rebuild a container of `domain` from column cells and a presence mask.
    /// Only columns whose mask bit is set contribute.
    pub fn from_row(
        &self,
        cells: Vec<Cell>,
        mask: &PresenceMask,
        domain: &KeyDomain,
    ) -> Result<DataContainer> {
        if cells.len() != self.len() || mask.len() != self.len() {
            return Err(Error::Internal(format!(
                "row with {} cells and {} mask bits for a layout of {} columns",
                cells.len(),
                mask.len(),
                self.len()
            )));
        }
        let mut container = domain.container();
        for (i, cell) in cells.into_iter().enumerate() {
            if mask.get(i) {
                let def = &self.columns[i].def;
                container.set(def.key(), decode_cell(def, cell)?)?;
            }
        }
        Ok(container)
    }

    /// Full dense-table row: the column cells followed by the mask cell.
    pub fn encode_row(&self, container: &DataContainer) -> Result<Vec<Cell>> {
        let (mut cells, mask) = self.to_row(container)?;
        cells.push(Cell::BoolList(mask.to_bools()));
        Ok(cells)
    }

    /// Inverse of [`ColumnLayout::encode_row`].
    pub fn decode_row(&self, mut row: Vec<Cell>, domain: &KeyDomain) -> Result<DataContainer> {
        let mask = match row.pop() {
            Some(Cell::BoolList(bits)) => PresenceMask::from_bools(&bits),
            other => {
                return Err(Error::Internal(format!(
                    "dense row ends with {:?} instead of a mask",
                    other.as_ref().map(Cell::kind)
                )));
            }
        };
        self.from_row(row, &mask, domain)
    }
}

/// A reduced record description holding exactly `keys`, for tables that
/// should only store part of a key space.
pub fn record_description<I>(keyspace: Arc<KeySpace>, keys: I) -> Result<Schema>
where
    I: IntoIterator<Item = Key>,
{
    Ok(Schema::new(ColumnLayout::from_keys(keyspace, keys)?.record_fields()))
}
