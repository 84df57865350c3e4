//! Conversion between container [`Value`]s and storage [`Cell`]s.
//!
//! This is where a value meets its key's declared dtype and shape. Integers
//! widen (and narrow when they fit), floats accept integers, text is cut to
//! its column width at a character boundary and may not contain NUL (the
//! column's padding byte), and arrays must have exactly
//! `product(shape)` elements. Anything else is an
//! [`Error::InvalidArgumentError`] raised before the row is written.

use cuds_result::{Error, Result};
use cuds_storage::{Cell, ColumnType};
use cuds_types::{KeyDef, ScalarType, Uuid, Value};

/// Byte width of a stored uuid.
const UUID_BYTES: usize = 16;

/// The column type storing values of `def`, `None` for keys without a dtype.
pub fn column_type(def: &KeyDef) -> Option<ColumnType> {
    let dtype = def.dtype()?;
    let n = def.element_count();
    let ty = match (dtype, def.is_array()) {
        (ScalarType::Bool, false) => ColumnType::Bool,
        (ScalarType::Int32, false) => ColumnType::Int32,
        (ScalarType::Int64, false) => ColumnType::Int64,
        (ScalarType::Float64, false) => ColumnType::Float64,
        (ScalarType::Bool, true) => ColumnType::BoolList(n),
        (ScalarType::Int32, true) => ColumnType::Int32List(n),
        (ScalarType::Int64, true) => ColumnType::Int64List(n),
        (ScalarType::Float64, true) => ColumnType::Float64List(n),
        (ScalarType::Text { max_len }, _) => ColumnType::FixedBinary(max_len),
        (ScalarType::Uuid, _) => ColumnType::FixedBinary(UUID_BYTES),
    };
    Some(ty)
}

fn mismatch(def: &KeyDef, value: &Value, why: &str) -> Error {
    let dtype = def
        .dtype()
        .map_or_else(|| "none".to_string(), |d| d.to_string());
    Error::InvalidArgumentError(format!(
        "{} value does not fit key '{}' ({dtype}{:?}): {why}",
        value.type_name(),
        def.name(),
        def.shape()
    ))
}

/// Checked: an int64 that does not fit int32 is an error.
fn narrow_i32(def: &KeyDef, value: &Value, v: i64) -> Result<i32> {
    i32::try_from(v).map_err(|_| mismatch(def, value, "integer overflows int32"))
}

/// Longest prefix of `s` that fits `max_len` bytes without splitting a char.
fn truncate_text(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Convert `value` to the cell stored in the column of `def`.
pub fn encode_value(def: &KeyDef, value: &Value) -> Result<Cell> {
    let Some(dtype) = def.dtype() else {
        return Err(mismatch(def, value, "key has no column type"));
    };
    let n = def.element_count();
    let check_len = |len: usize| {
        if len == n {
            Ok(())
        } else {
            Err(mismatch(
                def,
                value,
                &format!("expected {n} elements, got {len}"),
            ))
        }
    };

    let cell = match (dtype, def.is_array(), value) {
        (ScalarType::Bool, false, Value::Bool(b)) => Cell::Bool(*b),
        (ScalarType::Int32, false, Value::Int32(v)) => Cell::Int32(*v),
        (ScalarType::Int32, false, Value::Int64(v)) => Cell::Int32(narrow_i32(def, value, *v)?),
        (ScalarType::Int64, false, Value::Int32(v)) => Cell::Int64(i64::from(*v)),
        (ScalarType::Int64, false, Value::Int64(v)) => Cell::Int64(*v),
        (ScalarType::Float64, false, Value::Float64(v)) => Cell::Float64(*v),
        (ScalarType::Float64, false, Value::Int32(v)) => Cell::Float64(f64::from(*v)),
        // Rounds above 2^53, within the precision of float64 itself.
        (ScalarType::Float64, false, Value::Int64(v)) => Cell::Float64(*v as f64),
        (ScalarType::Text { .. }, false, Value::Text(s)) if s.contains('\0') => {
            return Err(mismatch(def, value, "text contains a NUL character"));
        }
        (ScalarType::Text { max_len }, false, Value::Text(s)) => {
            Cell::FixedBinary(truncate_text(s, max_len).as_bytes().to_vec())
        }
        (ScalarType::Uuid, false, Value::Uuid(u)) => Cell::FixedBinary(u.as_bytes().to_vec()),

        (ScalarType::Bool, true, Value::BoolArray(v)) => {
            check_len(v.len())?;
            Cell::BoolList(v.clone())
        }
        (ScalarType::Int32, true, Value::Int32Array(v)) => {
            check_len(v.len())?;
            Cell::Int32List(v.clone())
        }
        (ScalarType::Int32, true, Value::Int64Array(v)) => {
            check_len(v.len())?;
            Cell::Int32List(
                v.iter()
                    .map(|&x| narrow_i32(def, value, x))
                    .collect::<Result<_>>()?,
            )
        }
        (ScalarType::Int64, true, Value::Int32Array(v)) => {
            check_len(v.len())?;
            Cell::Int64List(v.iter().map(|&x| i64::from(x)).collect())
        }
        (ScalarType::Int64, true, Value::Int64Array(v)) => {
            check_len(v.len())?;
            Cell::Int64List(v.clone())
        }
        (ScalarType::Float64, true, Value::Float64Array(v)) => {
            check_len(v.len())?;
            Cell::Float64List(v.clone())
        }
        (ScalarType::Float64, true, Value::Int32Array(v)) => {
            check_len(v.len())?;
            Cell::Float64List(v.iter().map(|&x| f64::from(x)).collect())
        }
        _ => return Err(mismatch(def, value, "incompatible type")),
    };
    Ok(cell)
}

fn undecodable(def: &KeyDef, cell: &Cell) -> Error {
    Error::Internal(format!(
        "{} cell in the column of key '{}'",
        cell.kind(),
        def.name()
    ))
}

/// Convert a stored cell back to the value of `def`.
pub fn decode_cell(def: &KeyDef, cell: Cell) -> Result<Value> {
    let value = match (def.dtype(), cell) {
        (Some(ScalarType::Text { .. }), Cell::FixedBinary(mut bytes)) => {
            let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            bytes.truncate(end);
            Value::Text(
                String::from_utf8(bytes)
                    .map_err(|e| Error::corrupt(format!("text of key '{}': {e}", def.name())))?,
            )
        }
        (Some(ScalarType::Uuid), Cell::FixedBinary(bytes)) => Value::Uuid(
            Uuid::from_slice(&bytes)
                .map_err(|e| Error::corrupt(format!("uuid of key '{}': {e}", def.name())))?,
        ),
        (Some(_), Cell::Bool(b)) => Value::Bool(b),
        (Some(_), Cell::Int32(v)) => Value::Int32(v),
        (Some(_), Cell::Int64(v)) => Value::Int64(v),
        (Some(_), Cell::Float64(v)) => Value::Float64(v),
        (Some(_), Cell::BoolList(v)) => Value::BoolArray(v),
        (Some(_), Cell::Int32List(v)) => Value::Int32Array(v),
        (Some(_), Cell::Int64List(v)) => Value::Int64Array(v),
        (Some(_), Cell::Float64List(v)) => Value::Float64Array(v),
        (_, other) => return Err(undecodable(def, &other)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuds_types::{KeySpace, cuba};

    fn def(key: cuds_types::Key) -> KeyDef {
        cuba::keyspace().get(key).unwrap().clone()
    }

    #[test]
    fn integers_widen_and_narrow_when_they_fit() {
        let label = def(cuba::LABEL);
        assert_eq!(
            encode_value(&label, &Value::Int64(-4)).unwrap(),
            Cell::Int32(-4)
        );
        assert!(matches!(
            encode_value(&label, &Value::Int64(i64::from(i32::MAX) + 1)),
            Err(Error::InvalidArgumentError(_))
        ));
        assert_eq!(
            encode_value(&def(cuba::MASS), &Value::Int32(3)).unwrap(),
            Cell::Float64(3.0)
        );
    }

    #[test]
    fn large_int64_rounds_into_a_float_column() {
        let big = (1i64 << 53) + 1;
        let cell = encode_value(&def(cuba::MASS), &Value::Int64(big)).unwrap();
        assert_eq!(cell, Cell::Float64(9_007_199_254_740_992.0));
        let back = decode_cell(&def(cuba::MASS), cell).unwrap();
        assert_ne!(back, Value::Int64(big));
    }

    #[test]
    fn arrays_must_match_the_declared_shape() {
        let stress = def(cuba::STRESS_TENSOR);
        assert_eq!(column_type(&stress), Some(ColumnType::Float64List(9)));
        assert!(encode_value(&stress, &Value::from([[1.0; 3]; 3])).is_ok());
        assert!(matches!(
            encode_value(&stress, &Value::from([1.0; 3])),
            Err(Error::InvalidArgumentError(_))
        ));
        assert!(matches!(
            encode_value(&stress, &Value::Float64(1.0)),
            Err(Error::InvalidArgumentError(_))
        ));
    }

    #[test]
    fn text_is_cut_at_a_char_boundary_and_trimmed_on_read() {
        let ks = KeySpace::builder()
            .scalar("label", ScalarType::Text { max_len: 5 })
            .build()
            .unwrap();
        let def = ks.iter().next().unwrap();

        let cell = encode_value(def, &Value::from("abcdé")).unwrap();
        assert_eq!(cell, Cell::FixedBinary(b"abcd".to_vec()));

        let padded = Cell::FixedBinary(b"ab\0\0\0".to_vec());
        assert_eq!(decode_cell(def, padded).unwrap(), Value::from("ab"));
    }

    #[test]
    fn text_with_nul_characters_is_rejected() {
        let name = def(cuba::NAME);
        for text in ["ab\0", "\0", "a\0b"] {
            assert!(matches!(
                encode_value(&name, &Value::from(text)),
                Err(Error::InvalidArgumentError(_))
            ));
        }
    }

    #[test]
    fn uuids_are_stored_as_raw_bytes() {
        let uid = def(cuba::UID);
        let id = Uuid::from_u128(0x1234);
        let cell = encode_value(&uid, &Value::Uuid(id)).unwrap();
        assert_eq!(cell, Cell::FixedBinary(id.as_bytes().to_vec()));
        assert_eq!(decode_cell(&uid, cell).unwrap(), Value::Uuid(id));
    }

    #[test]
    fn untyped_keys_have_no_column() {
        let eq = def(cuba::PHYSICS_EQUATION);
        assert_eq!(column_type(&eq), None);
        assert!(encode_value(&eq, &Value::Bool(true)).is_err());
    }
}
