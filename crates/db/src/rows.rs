use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlgate_core::Row;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::executor::ExecutionError;

/// Converts a Postgres row into a JSON object keyed by column name.
///
/// NUMERIC values are rendered as strings so that no precision is lost on
/// the way to the client.
pub fn decode_row(row: &PgRow) -> Result<Row, ExecutionError> {
    let mut decoded = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())
            .map_err(|message| ExecutionError::Decode {
                column: column.name().to_string(),
                type_name: column.type_info().name().to_string(),
                message,
            })?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, String> {
    let raw = row.try_get_raw(index).map_err(|error| error.to_string())?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOL" => Value::Bool(get::<bool>(row, index)?),
        "INT2" => Value::from(get::<i16>(row, index)?),
        "INT4" => Value::from(get::<i32>(row, index)?),
        "INT8" => Value::from(get::<i64>(row, index)?),
        "FLOAT4" => float_value(f64::from(get::<f32>(row, index)?)),
        "FLOAT8" => float_value(get::<f64>(row, index)?),
        "NUMERIC" => Value::String(get::<Decimal>(row, index)?.to_string()),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
            Value::String(get::<String>(row, index)?)
        }
        "DATE" => Value::String(get::<NaiveDate>(row, index)?.to_string()),
        "TIMESTAMP" => Value::String(get::<NaiveDateTime>(row, index)?.to_string()),
        "TIMESTAMPTZ" => Value::String(get::<DateTime<Utc>>(row, index)?.to_rfc3339()),
        "JSON" | "JSONB" => get::<Value>(row, index)?,
        "UUID" => Value::String(get::<Uuid>(row, index)?.to_string()),
        other => return Err(format!("unsupported column type {other}")),
    };
    Ok(value)
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<T, String>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<T, _>(index).map_err(|error| error.to_string())
}

// NaN and infinities have no JSON representation.
fn float_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map_or_else(|| Value::String(value.to_string()), Value::Number)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::float_value;

    #[test]
    fn finite_floats_stay_numeric() {
        assert_eq!(float_value(7.25), json!(7.25));
    }

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(float_value(f64::NAN), Value::String("NaN".to_string()));
        assert_eq!(float_value(f64::INFINITY), Value::String("inf".to_string()));
    }
}
