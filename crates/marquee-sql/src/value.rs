//! Runtime values for literals and bound parameters.

use rust_decimal::Decimal;

use crate::RenderError;

/// A runtime SQL value.
///
/// Used for inline literals, bound parameters and row data. Maps to
/// Postgres types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL
    Null,

    /// Boolean
    Bool(bool),

    /// 16-bit signed integer (SMALLINT)
    I16(i16),

    /// 32-bit signed integer (INTEGER)
    I32(i32),

    /// 64-bit signed integer (BIGINT)
    I64(i64),

    /// 32-bit float (REAL)
    F32(f32),

    /// 64-bit float (DOUBLE PRECISION)
    F64(f64),

    /// Exact decimal (NUMERIC)
    Decimal(Decimal),

    /// Text (TEXT, VARCHAR, etc.)
    String(String),

    /// Binary data (BYTEA)
    Bytes(Vec<u8>),

    /// A list of values. Only valid where the renderer expands it into
    /// individual elements (IN lists); it has no single-slot form.
    Array(Vec<Value>),
}

impl Value {
    /// Returns true if this is a NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I16(_) => "smallint",
            Value::I32(_) => "integer",
            Value::I64(_) => "bigint",
            Value::F32(_) => "real",
            Value::F64(_) => "double precision",
            Value::Decimal(_) => "numeric",
            Value::String(_) => "text",
            Value::Bytes(_) => "bytea",
            Value::Array(_) => "array",
        }
    }

    /// Escape this value as an inline SQL literal.
    ///
    /// Strings double their single quotes; bytes render as a hex bytea
    /// literal. `Array` has no inline form and fails.
    pub fn escape(&self) -> Result<String, RenderError> {
        match self {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Value::I16(n) => Ok(n.to_string()),
            Value::I32(n) => Ok(n.to_string()),
            Value::I64(n) => Ok(n.to_string()),
            Value::F32(f) => Ok(escape_float(f64::from(*f))),
            Value::F64(f) => Ok(escape_float(*f)),
            Value::Decimal(d) => Ok(d.to_string()),
            Value::String(s) => Ok(crate::escape_string(s)),
            Value::Bytes(b) => {
                let mut lit = String::with_capacity(b.len() * 2 + 5);
                lit.push_str("'\\x");
                for byte in b {
                    lit.push_str(&format!("{byte:02x}"));
                }
                lit.push('\'');
                Ok(lit)
            }
            Value::Array(_) => Err(RenderError::Escape {
                type_name: self.type_name(),
            }),
        }
    }
}

/// Non-finite floats need Postgres's quoted spellings.
fn escape_float(f: f64) -> String {
    if f.is_nan() {
        "'NaN'".to_string()
    } else if f == f64::INFINITY {
        "'Infinity'".to_string()
    } else if f == f64::NEG_INFINITY {
        "'-Infinity'".to_string()
    } else {
        f.to_string()
    }
}

// Convenient From impls
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes() {
        let v = Value::from("Genre's One and Only");
        assert_eq!(v.escape().unwrap(), "'Genre''s One and Only'");
    }

    #[test]
    fn test_escape_round_trip() {
        // Un-quoting and un-doubling must give back the original string,
        // exactly as the backend would parse it.
        for original in ["", "'", "''", "it's a trap", "a''b'c", "no quotes"] {
            let escaped = Value::from(original).escape().unwrap();
            let inner = escaped
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .unwrap();
            assert_eq!(inner.replace("''", "'"), original);
        }
    }

    #[test]
    fn test_escape_bytes() {
        let v = Value::Bytes(vec![0xde, 0xad, 0x01]);
        assert_eq!(v.escape().unwrap(), "'\\xdead01'");
    }

    #[test]
    fn test_escape_array_fails() {
        let v = Value::from(vec![1i32, 2, 3]);
        assert_eq!(
            v.escape(),
            Err(RenderError::Escape { type_name: "array" })
        );
    }

    #[test]
    fn test_escape_non_finite_floats() {
        assert_eq!(Value::F64(f64::NAN).escape().unwrap(), "'NaN'");
        assert_eq!(Value::F64(f64::INFINITY).escape().unwrap(), "'Infinity'");
    }
}
