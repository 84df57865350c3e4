//! Key domains: the set of keys a container accepts.

use std::collections::BTreeSet;
use std::sync::Arc;

use cuds_result::{Error, Result};
use cuds_types::{Key, KeySpace};

use crate::container::DataContainer;

/// The keys a [`DataContainer`] may hold: a key space plus the subset of its
/// members that are permitted.
///
/// A restricted domain is a value, not a type. Two domains over the same key
/// space with the same permitted keys are equal no matter how they were
/// derived, and so are containers built from them.
#[derive(Clone, Debug)]
pub struct KeyDomain {
    keyspace: Arc<KeySpace>,
    allowed: Arc<BTreeSet<Key>>,
}

impl KeyDomain {
    /// Every member of `keyspace` is permitted.
    pub fn full(keyspace: Arc<KeySpace>) -> Self {
        let allowed = Arc::new(keyspace.keys().collect());
        Self { keyspace, allowed }
    }

    /// A domain over the same key space permitting only `keys`.
    ///
    /// Each key must be a key space member; an unknown key fails here rather
    /// than on first use. An empty set is valid and accepts nothing.
    pub fn restrict<I>(&self, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = Key>,
    {
        let allowed = keys
            .into_iter()
            .map(|key| {
                if self.keyspace.contains(key) {
                    Ok(key)
                } else {
                    Err(Error::InvalidKey(format!(
                        "{key} is not a member of the key space"
                    )))
                }
            })
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self {
            keyspace: Arc::clone(&self.keyspace),
            allowed: Arc::new(allowed),
        })
    }

    /// Like [`KeyDomain::restrict`], naming the keys (case-insensitively).
    pub fn restrict_names<'a, I>(&self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keys = names
            .into_iter()
            .map(|name| self.keyspace.resolve(name))
            .collect::<Result<Vec<_>>>()?;
        self.restrict(keys)
    }

    pub fn keyspace(&self) -> &Arc<KeySpace> {
        &self.keyspace
    }

    /// The permitted keys, in ordinal order.
    pub fn allowed(&self) -> &BTreeSet<Key> {
        &self.allowed
    }

    pub fn permits(&self, key: Key) -> bool {
        self.allowed.contains(&key)
    }

    /// [`Error::InvalidKey`] unless `key` is a key space member that this
    /// domain permits.
    pub fn check(&self, key: Key) -> Result<()> {
        if !self.keyspace.contains(key) {
            return Err(Error::InvalidKey(format!(
                "{key} is not a member of the key space"
            )));
        }
        if !self.permits(key) {
            return Err(Error::InvalidKey(format!(
                "{} is not permitted in this container",
                self.keyspace.describe(key)
            )));
        }
        Ok(())
    }

    /// Resolve `name` and [`check`](KeyDomain::check) the key it names.
    pub fn check_name(&self, name: &str) -> Result<Key> {
        let key = self.keyspace.resolve(name)?;
        self.check(key)?;
        Ok(key)
    }

    /// An empty container of this domain.
    pub fn container(&self) -> DataContainer {
        DataContainer::new(self.clone())
    }
}

impl PartialEq for KeyDomain {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.keyspace, &other.keyspace) && self.allowed == other.allowed
    }
}

impl Eq for KeyDomain {}
