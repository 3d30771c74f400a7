use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// SQL bindable value enum
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Accepted timestamp shapes in PATCH-style JSON payloads.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Build a dynamic UPDATE from a partial JSON payload. Only columns in
/// `allowed` may appear; everything else is rejected, so payload keys
/// never reach the SQL string unchecked.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        if !allowed.contains(&key.as_str()) {
            return Err(ErrorBadRequest(format!("Unknown or read-only field '{key}'")));
        }
        columns.push(format!("{key} = ?"));
        values.push(coerce(value)?);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        columns.join(", "),
        id_column
    );
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

fn coerce(value: &Value) -> Result<SqlValue, actix_web::Error> {
    match value {
        Value::String(s) => {
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(SqlValue::Date(date))
            } else if let Some(stamp) = parse_datetime(s) {
                Ok(SqlValue::DateTime(stamp))
            } else {
                Ok(SqlValue::String(s.clone()))
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::I64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::F64(f))
            } else {
                Err(ErrorBadRequest("Unsupported numeric value"))
            }
        }
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Null => Ok(SqlValue::Null),
        _ => Err(ErrorBadRequest("Unsupported JSON value type")),
    }
}

pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_columns_outside_the_allowlist() {
        let payload = json!({"status": "late", "id": 99});
        let err = build_update_sql(
            "attendance_records",
            &payload,
            &["status", "notes"],
            "id",
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn builds_update_with_trailing_id_bind() {
        let payload = json!({"notes": "left early"});
        let update =
            build_update_sql("attendance_records", &payload, &["notes"], "id", 7).unwrap();
        assert_eq!(
            update.sql,
            "UPDATE attendance_records SET notes = ? WHERE id = ?"
        );
        assert_eq!(update.values.len(), 2);
        assert!(matches!(update.values[1], SqlValue::U64(7)));
    }

    #[test]
    fn coerces_date_and_datetime_strings() {
        let payload = json!({
            "date": "2026-01-15",
            "check_in_time": "2026-01-15T08:55:00"
        });
        let update = build_update_sql(
            "attendance_records",
            &payload,
            &["date", "check_in_time"],
            "id",
            1,
        )
        .unwrap();
        assert!(update
            .values
            .iter()
            .any(|v| matches!(v, SqlValue::Date(_))));
        assert!(update
            .values
            .iter()
            .any(|v| matches!(v, SqlValue::DateTime(_))));
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(build_update_sql("users", &json!({}), &["email"], "id", 1).is_err());
        assert!(build_update_sql("users", &json!([1, 2]), &["email"], "id", 1).is_err());
    }
}
