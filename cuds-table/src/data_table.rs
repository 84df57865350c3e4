//! A uuid-keyed table of bare data containers.

use std::sync::Arc;

use arrow::datatypes::Schema;
use cuds_container::{DataContainer, KeyDomain};
use cuds_result::Result;
use cuds_storage::{Group, Pager};
use cuds_types::{KeySpace, Uuid};

use crate::items::CudsItems;

/// Maps uuids to [`DataContainer`]s. Setting a uid that exists replaces its
/// container; setting a new one appends it.
pub struct DataContainerTable<P: Pager> {
    items: CudsItems<P, ()>,
}

impl<P: Pager> DataContainerTable<P> {
    /// Open (or create) the table `name` below `group`. See
    /// [`IndexedDataContainerTable::open`](crate::IndexedDataContainerTable::open)
    /// for the meaning of `record`.
    pub fn open(
        group: &Group<P>,
        name: &str,
        keyspace: Arc<KeySpace>,
        record: Option<&Schema>,
    ) -> Result<Self> {
        Ok(Self {
            items: CudsItems::open(group, name, keyspace, record)?,
        })
    }

    pub fn domain(&self) -> &KeyDomain {
        self.items.domain()
    }

    pub fn contains(&self, uid: Uuid) -> bool {
        self.items.contains(uid)
    }

    pub fn get(&self, uid: Uuid) -> Result<DataContainer> {
        Ok(self.items.get(uid)?.data)
    }

    pub fn set(&mut self, uid: Uuid, data: &DataContainer) -> Result<()> {
        self.items.set(uid, &(), data)
    }

    pub fn remove(&mut self, uid: Uuid) -> Result<()> {
        self.items.remove(uid)
    }

    pub fn len(&self) -> Result<usize> {
        self.items.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.items.is_empty()
    }

    /// Uids in storage order.
    pub fn uids(&self) -> &[Uuid] {
        self.items.uids()
    }

    /// `(uid, container)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = Result<(Uuid, DataContainer)>> + '_ {
        self.uids()
            .iter()
            .copied()
            .zip(self.items.iter())
            .map(|(uid, item)| Ok((uid, item?.data)))
    }

    /// The containers of `uids`, in that order.
    pub fn iter_sequence<'a, I>(
        &'a self,
        uids: I,
    ) -> impl Iterator<Item = Result<DataContainer>> + 'a
    where
        I: IntoIterator<Item = Uuid>,
        I::IntoIter: 'a,
    {
        self.items
            .iter_sequence(uids)
            .map(|item| item.map(|item| item.data))
    }
}
