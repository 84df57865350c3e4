//! The key space: an immutable, ordinal-ordered set of typed key definitions.

use std::fmt;

use cuds_result::{Error, Result};
use rustc_hash::FxHashMap;

/// A member of a key space, identified by its ordinal.
///
/// Keys are plain ordinals; their name, dtype and shape live in the
/// [`KeySpace`] that defines them. Ordering follows the ordinal, which is the
/// order columns are placed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(u16);

impl Key {
    #[inline]
    pub const fn new(ordinal: u16) -> Self {
        Key(ordinal)
    }

    #[inline]
    pub const fn ordinal(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key #{}", self.0)
    }
}

/// Element type of a key's values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int32,
    Int64,
    Float64,
    /// UTF-8 text of at most `max_len` bytes once stored.
    Text { max_len: usize },
    /// 128-bit identifier.
    Uuid,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float64 => "float64",
            ScalarType::Text { .. } => "text",
            ScalarType::Uuid => "uuid",
        }
    }

    /// Whether values of this type can form fixed-shape arrays.
    pub fn is_numeric_or_bool(&self) -> bool {
        !matches!(self, ScalarType::Text { .. } | ScalarType::Uuid)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Text { max_len } => write!(f, "text({max_len})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Definition of one key: `{ordinal, name, dtype, shape}`.
///
/// A key without a dtype can be held by a container but has no column
/// representation, so tables never store it. An empty shape means a scalar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyDef {
    key: Key,
    name: String,
    dtype: Option<ScalarType>,
    shape: Vec<usize>,
}

impl KeyDef {
    pub fn key(&self) -> Key {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> Option<ScalarType> {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn is_array(&self) -> bool {
        !self.shape.is_empty()
    }

    /// Number of scalar elements in one value (1 for scalars).
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// An immutable set of key definitions.
///
/// Lookups by name are case-insensitive; names are unique under that rule.
#[derive(Debug)]
pub struct KeySpace {
    defs: Vec<KeyDef>,
    by_key: FxHashMap<Key, usize>,
    by_name: FxHashMap<String, Key>,
}

impl KeySpace {
    pub fn builder() -> KeySpaceBuilder {
        KeySpaceBuilder::default()
    }

    pub fn get(&self, key: Key) -> Option<&KeyDef> {
        self.by_key.get(&key).map(|&i| &self.defs[i])
    }

    /// Like [`KeySpace::get`], but an unknown key is an [`Error::InvalidKey`].
    pub fn def(&self, key: Key) -> Result<&KeyDef> {
        self.get(key).ok_or_else(|| Error::invalid_key(key))
    }

    pub fn contains(&self, key: Key) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Case-insensitive lookup of a key by name.
    pub fn lookup(&self, name: &str) -> Option<Key> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Like [`KeySpace::lookup`], but an unknown name is an [`Error::InvalidKey`].
    pub fn resolve(&self, name: &str) -> Result<Key> {
        self.lookup(name).ok_or_else(|| Error::invalid_key(name))
    }

    /// The key's name, or its ordinal rendering if it is not a member.
    pub fn describe(&self, key: Key) -> String {
        match self.get(key) {
            Some(def) => def.name.clone(),
            None => key.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyDef> + '_ {
        self.defs.iter()
    }

    /// Keys in ordinal order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.defs.iter().map(|d| d.key)
    }
}

impl<'a> IntoIterator for &'a KeySpace {
    type Item = &'a KeyDef;
    type IntoIter = std::slice::Iter<'a, KeyDef>;

    fn into_iter(self) -> Self::IntoIter {
        self.defs.iter()
    }
}

/// Collects key definitions and validates them as a whole in [`build`].
///
/// [`build`]: KeySpaceBuilder::build
#[derive(Debug, Default)]
pub struct KeySpaceBuilder {
    defs: Vec<KeyDef>,
}

impl KeySpaceBuilder {
    /// Add a key with an explicit ordinal.
    pub fn define(
        mut self,
        ordinal: u16,
        name: &str,
        dtype: Option<ScalarType>,
        shape: &[usize],
    ) -> Self {
        self.defs.push(KeyDef {
            key: Key(ordinal),
            name: name.to_string(),
            dtype,
            shape: shape.to_vec(),
        });
        self
    }

    fn next_ordinal(&self) -> u16 {
        self.defs
            .iter()
            .map(|d| d.key.0)
            .max()
            .map_or(1, |m| m.saturating_add(1))
    }

    /// Add a scalar key after the highest ordinal so far.
    pub fn scalar(self, name: &str, dtype: ScalarType) -> Self {
        let ordinal = self.next_ordinal();
        self.define(ordinal, name, Some(dtype), &[])
    }

    /// Add a fixed-shape array key after the highest ordinal so far.
    pub fn array(self, name: &str, dtype: ScalarType, shape: &[usize]) -> Self {
        let ordinal = self.next_ordinal();
        self.define(ordinal, name, Some(dtype), shape)
    }

    /// Add a key that carries no dtype after the highest ordinal so far.
    pub fn untyped(self, name: &str) -> Self {
        let ordinal = self.next_ordinal();
        self.define(ordinal, name, None, &[])
    }

    pub fn build(mut self) -> Result<KeySpace> {
        self.defs.sort_by_key(|d| d.key);

        let mut by_key = FxHashMap::with_capacity_and_hasher(self.defs.len(), Default::default());
        let mut by_name = FxHashMap::with_capacity_and_hasher(self.defs.len(), Default::default());
        for (i, def) in self.defs.iter().enumerate() {
            if def.name.is_empty() {
                return Err(Error::InvalidArgumentError(format!(
                    "{} has an empty name",
                    def.key
                )));
            }
            if by_key.insert(def.key, i).is_some() {
                return Err(Error::InvalidArgumentError(format!(
                    "{} is defined twice",
                    def.key
                )));
            }
            if by_name.insert(def.name.to_lowercase(), def.key).is_some() {
                return Err(Error::InvalidArgumentError(format!(
                    "key name '{}' is defined twice",
                    def.name
                )));
            }
            if def.shape.contains(&0) {
                return Err(Error::InvalidArgumentError(format!(
                    "key '{}' has a zero-sized dimension",
                    def.name
                )));
            }
            match def.dtype {
                None if def.is_array() => {
                    return Err(Error::InvalidArgumentError(format!(
                        "key '{}' has a shape but no dtype",
                        def.name
                    )));
                }
                Some(dtype) if def.is_array() && !dtype.is_numeric_or_bool() => {
                    return Err(Error::InvalidArgumentError(format!(
                        "key '{}': arrays of {dtype} are not supported",
                        def.name
                    )));
                }
                _ => {}
            }
        }
        Ok(KeySpace {
            defs: self.defs,
            by_key,
            by_name,
        })
    }
}
