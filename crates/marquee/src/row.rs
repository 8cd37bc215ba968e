//! Row mapping between Postgres and runtime values.

use marquee_sql::Value;
use rust_decimal::Decimal;
use tokio_postgres::types::{IsNull, ToSql, Type as PgTypeInfo};

use crate::Error;

/// A row of data as column name → value pairs.
pub type Row = Vec<(String, Value)>;

/// Convert a tokio_postgres row to our Row type.
///
/// Column names and types come from the result metadata the backend
/// reports, so projections over joins (including aliased self-joins) map
/// without any descriptor lookup.
pub fn pg_row_to_row(pg_row: &tokio_postgres::Row) -> Result<Row, Error> {
    let mut row = Vec::with_capacity(pg_row.columns().len());

    for (idx, col) in pg_row.columns().iter().enumerate() {
        let value = pg_value_to_value(pg_row, idx, col.type_())?;
        row.push((col.name().to_string(), value));
    }

    Ok(row)
}

/// Extract a value from a Postgres row at a given index.
fn pg_value_to_value(
    row: &tokio_postgres::Row,
    idx: usize,
    ty: &PgTypeInfo,
) -> Result<Value, Error> {
    // NULL extraction: try_get with Option returns None for NULL values
    if *ty == PgTypeInfo::BOOL {
        let v: Option<bool> = row.try_get(idx)?;
        Ok(v.map(Value::Bool).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::INT2 {
        let v: Option<i16> = row.try_get(idx)?;
        Ok(v.map(Value::I16).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::INT4 {
        let v: Option<i32> = row.try_get(idx)?;
        Ok(v.map(Value::I32).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::INT8 {
        let v: Option<i64> = row.try_get(idx)?;
        Ok(v.map(Value::I64).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::FLOAT4 {
        let v: Option<f32> = row.try_get(idx)?;
        Ok(v.map(Value::F32).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::FLOAT8 {
        let v: Option<f64> = row.try_get(idx)?;
        Ok(v.map(Value::F64).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::NUMERIC {
        let v: Option<Decimal> = row.try_get(idx)?;
        Ok(v.map(Value::Decimal).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::TEXT || *ty == PgTypeInfo::VARCHAR || *ty == PgTypeInfo::BPCHAR {
        let v: Option<String> = row.try_get(idx)?;
        Ok(v.map(Value::String).unwrap_or(Value::Null))
    } else if *ty == PgTypeInfo::BYTEA {
        let v: Option<Vec<u8>> = row.try_get(idx)?;
        Ok(v.map(Value::Bytes).unwrap_or(Value::Null))
    } else {
        Err(Error::UnsupportedType(ty.to_string()))
    }
}

/// Wrapper to make our Value usable as a ToSql parameter.
#[derive(Debug)]
pub struct SqlParam<'a>(pub &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(
        &self,
        ty: &PgTypeInfo,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I16(v) => v.to_sql(ty, out),
            Value::I32(v) => v.to_sql(ty, out),
            Value::I64(v) => v.to_sql(ty, out),
            Value::F32(v) => v.to_sql(ty, out),
            Value::F64(v) => v.to_sql(ty, out),
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::String(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Array(_) => {
                Err("array values must be expanded into an IN list before binding".into())
            }
        }
    }

    fn accepts(ty: &PgTypeInfo) -> bool {
        // Accept common types
        *ty == PgTypeInfo::BOOL
            || *ty == PgTypeInfo::INT2
            || *ty == PgTypeInfo::INT4
            || *ty == PgTypeInfo::INT8
            || *ty == PgTypeInfo::FLOAT4
            || *ty == PgTypeInfo::FLOAT8
            || *ty == PgTypeInfo::NUMERIC
            || *ty == PgTypeInfo::TEXT
            || *ty == PgTypeInfo::VARCHAR
            || *ty == PgTypeInfo::BPCHAR
            || *ty == PgTypeInfo::BYTEA
    }

    tokio_postgres::types::to_sql_checked!();
}
