//! Values held by containers.

use uuid::Uuid;

/// A value stored under a key.
///
/// Containers store values as given; conversion to a key's declared dtype and
/// shape happens only when a value is written to a table column. Array values
/// are flat and row-major, so a 3x3 tensor is a 9-element array.
///
/// Numbers compare by value across `Int32`, `Int64` and `Float64` (and the
/// matching arrays), so `Int32(3) == Float64(3.0)`. A value read back from a
/// wider column therefore equals the one that was written.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
    Uuid(Uuid),
    BoolArray(Vec<bool>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Float64Array(Vec<f64>),
}

/// A scalar number, for comparisons across numeric variants.
#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn same(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b,
            (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => {
                // exact: no rounding of `i` through f64
                let bound = -(i64::MIN as f64);
                f.fract() == 0.0 && f >= -bound && f < bound && f as i64 == i
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::BoolArray(a), Value::BoolArray(b)) => a == b,
            (Value::Int32Array(a), Value::Int32Array(b)) => a == b,
            (Value::Int64Array(a), Value::Int64Array(b)) => a == b,
            (Value::Float64Array(a), Value::Float64Array(b)) => a == b,
            _ => {
                if let (Some(a), Some(b)) = (self.scalar_number(), other.scalar_number()) {
                    return a.same(b);
                }
                match (self.array_numbers(), other.array_numbers()) {
                    (Some(a), Some(b)) => {
                        a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x.same(*y))
                    }
                    _ => false,
                }
            }
        }
    }
}

impl Value {
    fn scalar_number(&self) -> Option<Number> {
        match *self {
            Value::Int32(v) => Some(Number::Int(i64::from(v))),
            Value::Int64(v) => Some(Number::Int(v)),
            Value::Float64(v) => Some(Number::Float(v)),
            _ => None,
        }
    }

    fn array_numbers(&self) -> Option<Vec<Number>> {
        match self {
            Value::Int32Array(v) => Some(v.iter().map(|&x| Number::Int(i64::from(x))).collect()),
            Value::Int64Array(v) => Some(v.iter().map(|&x| Number::Int(x)).collect()),
            Value::Float64Array(v) => Some(v.iter().map(|&x| Number::Float(x)).collect()),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::BoolArray(_) => "bool[]",
            Value::Int32Array(_) => "int32[]",
            Value::Int64Array(_) => "int64[]",
            Value::Float64Array(_) => "float64[]",
        }
    }

    /// Element count of an array value, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::BoolArray(v) => Some(v.len()),
            Value::Int32Array(v) => Some(v.len()),
            Value::Int64Array(v) => Some(v.len()),
            Value::Float64Array(v) => Some(v.len()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float64(v) => Some(v),
            Value::Int32(v) => Some(f64::from(v)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int32(v) => Some(i64::from(v)),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match *self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match self {
            Value::Float64Array(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v)
            }
        })*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f64 => Float64,
    String => Text,
    Uuid => Uuid,
    Vec<bool> => BoolArray,
    Vec<i32> => Int32Array,
    Vec<i64> => Int64Array,
    Vec<f64> => Float64Array,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        Value::Float64Array(v.to_vec())
    }
}

impl<const N: usize> From<[i32; N]> for Value {
    fn from(v: [i32; N]) -> Self {
        Value::Int32Array(v.to_vec())
    }
}

impl<const N: usize> From<[bool; N]> for Value {
    fn from(v: [bool; N]) -> Self {
        Value::BoolArray(v.to_vec())
    }
}

/// Row-major flattening of a matrix.
impl<const R: usize, const C: usize> From<[[f64; C]; R]> for Value {
    fn from(m: [[f64; C]; R]) -> Self {
        Value::Float64Array(m.iter().flatten().copied().collect())
    }
}
