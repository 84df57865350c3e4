//! [`DataContainer`], a map from keys to values restricted to a [`KeyDomain`].

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use cuds_result::{Error, Result};
use cuds_types::{Key, KeySpace, Value};

use crate::domain::KeyDomain;

/// A map from keys to values whose keys are limited to a [`KeyDomain`].
///
/// Values are stored as given. Checking a value against its key's dtype and
/// shape is left to the tables that persist containers.
///
/// Cloning a container (or calling [`DataContainer::data`]) produces an
/// independent copy: nothing done to the copy is visible in the source.
#[derive(Clone, Debug)]
pub struct DataContainer {
    domain: KeyDomain,
    entries: BTreeMap<Key, Value>,
}

impl PartialEq for DataContainer {
    /// Containers are equal when they hold the same key/value pairs; the
    /// domain does not take part.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl DataContainer {
    /// An empty container of `domain`.
    pub fn new(domain: KeyDomain) -> Self {
        Self {
            domain,
            entries: BTreeMap::new(),
        }
    }

    /// An empty container accepting every key of `keyspace`.
    pub fn with_keyspace(keyspace: Arc<KeySpace>) -> Self {
        Self::new(KeyDomain::full(keyspace))
    }

    /// A container of `domain` holding the entries of `other`.
    ///
    /// Every key of `other` must be permitted by `domain`; otherwise nothing is
    /// copied and the first offending key is reported.
    pub fn from_container(domain: KeyDomain, other: &DataContainer) -> Result<Self> {
        let mut container = Self::new(domain);
        container.update(other.iter().map(|(k, v)| (k, v.clone())))?;
        Ok(container)
    }

    pub fn domain(&self) -> &KeyDomain {
        &self.domain
    }

    pub fn keyspace(&self) -> &Arc<KeySpace> {
        self.domain.keyspace()
    }

    /// The keys this container accepts.
    pub fn restricted_keys(&self) -> &BTreeSet<Key> {
        self.domain.allowed()
    }

    /// The value under `key`, [`Error::KeyNotFound`] if there is none.
    pub fn get(&self, key: Key) -> Result<&Value> {
        self.entries
            .get(&key)
            .ok_or_else(|| Error::KeyNotFound(self.keyspace().describe(key)))
    }

    /// The value under `key`, if present.
    pub fn try_get(&self, key: Key) -> Option<&Value> {
        self.entries.get(&key)
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Value> {
        let key = self.keyspace().resolve(name)?;
        self.get(key)
    }

    /// Store `value` under `key`, returning the value it replaced.
    ///
    /// Fails with [`Error::InvalidKey`] when the key is not permitted; the
    /// container is unchanged in that case.
    pub fn set(&mut self, key: Key, value: impl Into<Value>) -> Result<Option<Value>> {
        self.domain.check(key)?;
        Ok(self.entries.insert(key, value.into()))
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = self.domain.check_name(name)?;
        Ok(self.entries.insert(key, value.into()))
    }

    /// Store every pair of `source`. All keys are checked first; if any is not
    /// permitted, nothing is stored.
    pub fn update<I, V>(&mut self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = (Key, V)>,
        V: Into<Value>,
    {
        let pairs = source
            .into_iter()
            .map(|(key, value)| {
                self.domain.check(key)?;
                Ok((key, value.into()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.entries.extend(pairs);
        Ok(())
    }

    /// Like [`DataContainer::update`], with keys given by name.
    pub fn update_named<'a, I, V>(&mut self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<Value>,
    {
        let pairs = source
            .into_iter()
            .map(|(name, value)| Ok((self.domain.check_name(name)?, value.into())))
            .collect::<Result<Vec<_>>>()?;
        self.entries.extend(pairs);
        Ok(())
    }

    /// Remove and return the value under `key`.
    pub fn remove(&mut self, key: Key) -> Result<Value> {
        self.entries
            .remove(&key)
            .ok_or_else(|| Error::KeyNotFound(self.domain.keyspace().describe(key)))
    }

    pub fn contains_key(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Present keys in ordinal order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.entries.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.entries.values()
    }

    /// Present entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Value)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// A snapshot of this container: a new, independent instance with the same
    /// domain and entries.
    pub fn data(&self) -> DataContainer {
        self.clone()
    }
}

impl IntoIterator for DataContainer {
    type Item = (Key, Value);
    type IntoIter = std::collections::btree_map::IntoIter<Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Construction and update arguments for a [`DataContainer`]: at most one
/// positional source of pairs, plus any number of named values.
///
/// Named and positional keys are resolved and checked by the same rule, all
/// before anything is stored.
///
/// ```
/// use cuds_container::{ContainerBuilder, KeyDomain};
/// use cuds_types::cuba;
///
/// let domain = KeyDomain::full(cuba::keyspace());
/// let c = ContainerBuilder::new()
///     .positional([(cuba::MASS, 1.5)])
///     .named("velocity", [0.0, 1.0, 0.0])
///     .build(&domain)
///     .unwrap();
/// assert_eq!(c.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ContainerBuilder {
    positional: Vec<Vec<(Key, Value)>>,
    named: Vec<(String, Value)>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a positional source. More than one makes [`build`](Self::build)
    /// and [`apply`](Self::apply) fail.
    pub fn positional<I, V>(mut self, source: I) -> Self
    where
        I: IntoIterator<Item = (Key, V)>,
        V: Into<Value>,
    {
        self.positional
            .push(source.into_iter().map(|(k, v)| (k, v.into())).collect());
        self
    }

    /// Add a value by key name (case-insensitive).
    pub fn named(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.named.push((name.to_string(), value.into()));
        self
    }

    fn resolve(self, domain: &KeyDomain) -> Result<Vec<(Key, Value)>> {
        if self.positional.len() > 1 {
            return Err(Error::TooManyPositionalArguments(self.positional.len()));
        }
        let mut pairs = Vec::new();
        for source in self.positional {
            for (key, value) in source {
                domain.check(key)?;
                pairs.push((key, value));
            }
        }
        for (name, value) in self.named {
            pairs.push((domain.check_name(&name)?, value));
        }
        Ok(pairs)
    }

    /// A new container of `domain`. Named values win over positional ones
    /// for the same key.
    pub fn build(self, domain: &KeyDomain) -> Result<DataContainer> {
        let mut container = DataContainer::new(domain.clone());
        self.apply(&mut container)?;
        Ok(container)
    }

    /// Update `target` with these arguments, atomically.
    pub fn apply(self, target: &mut DataContainer) -> Result<()> {
        let pairs = self.resolve(&target.domain)?;
        target.entries.extend(pairs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuds_types::cuba;

    fn full() -> KeyDomain {
        KeyDomain::full(cuba::keyspace())
    }

    #[test]
    fn missing_keys_are_reported() {
        let c = full().container();
        assert!(matches!(c.get(cuba::MASS), Err(Error::KeyNotFound(name)) if name == "MASS"));
        assert!(c.try_get(cuba::MASS).is_none());
    }

    #[test]
    fn set_replaces_and_returns_the_previous_value() {
        let mut c = full().container();
        assert_eq!(c.set(cuba::MASS, 1.0).unwrap(), None);
        assert_eq!(c.set(cuba::MASS, 2.0).unwrap(), Some(Value::Float64(1.0)));
        assert_eq!(c.get(cuba::MASS).unwrap(), &Value::Float64(2.0));
    }

    #[test]
    fn failed_update_stores_nothing() {
        let domain = full().restrict([cuba::MASS, cuba::NAME]).unwrap();
        let mut c = domain.container();
        c.set(cuba::NAME, "argon").unwrap();

        let err = c
            .update([(cuba::MASS, Value::from(3.0)), (cuba::VELOCITY, Value::from([1.0; 3]))])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
        assert_eq!(c.len(), 1);
        assert!(!c.contains_key(cuba::MASS));

        let err = c.update_named([("mass", 3.0), ("radius", 1.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn builder_rejects_two_positional_sources() {
        let err = ContainerBuilder::new()
            .positional([(cuba::MASS, 1.0)])
            .positional([(cuba::RADIUS, 1.0)])
            .build(&full())
            .unwrap_err();
        assert!(matches!(err, Error::TooManyPositionalArguments(2)));
    }

    #[test]
    fn builder_checks_names_and_keys_alike() {
        let domain = full().restrict([cuba::MASS]).unwrap();
        let by_key = ContainerBuilder::new()
            .positional([(cuba::RADIUS, 1.0)])
            .build(&domain)
            .unwrap_err();
        let by_name = ContainerBuilder::new()
            .named("Radius", 1.0)
            .build(&domain)
            .unwrap_err();
        assert!(matches!(by_key, Error::InvalidKey(_)));
        assert!(matches!(by_name, Error::InvalidKey(_)));
    }

    #[test]
    fn remove_and_iteration_follow_key_order() {
        let mut c = ContainerBuilder::new()
            .named("radius", 0.5)
            .named("uid", cuds_types::Uuid::nil())
            .named("mass", 2.0)
            .build(&full())
            .unwrap();
        let keys: Vec<_> = c.keys().collect();
        assert_eq!(keys, vec![cuba::UID, cuba::MASS, cuba::RADIUS]);

        assert_eq!(c.remove(cuba::MASS).unwrap(), Value::Float64(2.0));
        assert!(matches!(c.remove(cuba::MASS), Err(Error::KeyNotFound(_))));
        c.clear();
        assert!(c.is_empty());
    }
}
