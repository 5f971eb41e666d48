//! SQLite row source
//!
//! Reads a relational snapshot of the DSW schema. SQLite has no UUID,
//! timestamp or array types, so the declared column type decides how a
//! stored value is interpreted:
//! - `UUID` → [`Value::Uuid`]
//! - `TIMESTAMP*`, `DATETIME` → [`Value::Timestamp`]
//! - `*[]`, `ARRAY` (JSON text or `{a, b}` literal) → [`Value::Array`]
//! - `JSON*` → [`Value::Json`]
//! - `BOOL*` → [`Value::Bool`]

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags};
use uuid::Uuid;

use super::RowSource;
use crate::row::{Row, Value};
use crate::serializer::{looks_numeric, quote_ident};
use crate::{Error, Result};

/// SQLite-backed row source
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database file read-only
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open a writable in-memory database (for testing and replay checks)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Run a batch of statements, e.g. a generated insert script
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Columns of `table` in declaration order
    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let columns: Vec<ColumnInfo> = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
                let pk: i64 = row.get(5)?;
                Ok(ColumnInfo {
                    name,
                    kind: ColumnKind::from_declared(&declared),
                    pk,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        if columns.is_empty() {
            return Err(Error::Config(format!("table {} does not exist", table)));
        }
        Ok(columns)
    }

    fn select(&self, table: &str, filter: Option<(&str, &Value)>, limit: Option<u32>) -> Result<Vec<Row>> {
        let columns = self.columns(table)?;

        let column_list = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut order: Vec<&ColumnInfo> = columns.iter().filter(|c| c.pk > 0).collect();
        order.sort_by_key(|c| c.pk);
        let order_by = if order.is_empty() {
            "rowid".to_string()
        } else {
            order
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", column_list, quote_ident(table));
        let mut params: Vec<Value> = Vec::new();
        if let Some((key, value)) = filter {
            if !columns.iter().any(|c| c.name == key) {
                return Err(Error::Config(format!("table {} has no column {}", table, key)));
            }
            match value {
                // stored either as text or as 16 raw bytes
                Value::Uuid(id) => {
                    sql.push_str(&format!(" WHERE {} IN (?1, ?2)", quote_ident(key)));
                    params.push(value.clone());
                    params.push(Value::Bytes(id.as_bytes().to_vec()));
                }
                _ => {
                    sql.push_str(&format!(" WHERE {} = ?1", quote_ident(key)));
                    params.push(value.clone());
                }
            }
        }
        sql.push_str(&format!(" ORDER BY {}", order_by));
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Row> {
            let mut out = Row::new();
            for (i, column) in columns.iter().enumerate() {
                out.insert(column.name.clone(), column.kind.convert(row.get_ref(i)?));
            }
            Ok(out)
        };

        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl RowSource for SqliteStore {
    fn fetch_one(&self, table: &str, key: &str, value: &Value) -> Result<Option<Row>> {
        Ok(self.select(table, Some((key, value)), Some(1))?.into_iter().next())
    }

    fn fetch_many(&self, table: &str, key: &str, value: &Value) -> Result<Vec<Row>> {
        self.select(table, Some((key, value)), None)
    }

    fn fetch_all(&self, table: &str) -> Result<Vec<Row>> {
        self.select(table, None, None)
    }
}

struct ColumnInfo {
    name: String,
    kind: ColumnKind,
    pk: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Uuid,
    Timestamp,
    Array,
    Json,
    Bool,
    Plain,
}

impl ColumnKind {
    fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.ends_with("[]") || upper.contains("ARRAY") {
            ColumnKind::Array
        } else if upper.starts_with("UUID") {
            ColumnKind::Uuid
        } else if upper.starts_with("TIMESTAMP") || upper == "DATETIME" {
            ColumnKind::Timestamp
        } else if upper.starts_with("JSON") {
            ColumnKind::Json
        } else if upper.starts_with("BOOL") {
            ColumnKind::Bool
        } else {
            ColumnKind::Plain
        }
    }

    fn convert(self, value: ValueRef<'_>) -> Value {
        match (self, value) {
            (_, ValueRef::Null) => Value::Null,
            (ColumnKind::Bool, ValueRef::Integer(i)) => Value::Bool(i != 0),
            (ColumnKind::Bool, ValueRef::Text(t)) => {
                match String::from_utf8_lossy(t).to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Value::Bool(true),
                    "false" | "f" | "0" => Value::Bool(false),
                    other => Value::Text(other.to_string()),
                }
            }
            (ColumnKind::Uuid, ValueRef::Text(t)) => {
                let text = String::from_utf8_lossy(t);
                Uuid::parse_str(&text)
                    .map(Value::Uuid)
                    .unwrap_or_else(|_| Value::Text(text.into_owned()))
            }
            (ColumnKind::Uuid, ValueRef::Blob(b)) if b.len() == 16 => {
                Uuid::from_slice(b).map(Value::Uuid).unwrap_or_else(|_| Value::Bytes(b.to_vec()))
            }
            (ColumnKind::Timestamp, ValueRef::Text(t)) => {
                let text = String::from_utf8_lossy(t);
                parse_timestamp(&text)
                    .map(Value::Timestamp)
                    .unwrap_or_else(|| Value::Text(text.into_owned()))
            }
            (ColumnKind::Timestamp, ValueRef::Integer(secs)) => DateTime::from_timestamp(secs, 0)
                .map(|dt| Value::Timestamp(dt.fixed_offset()))
                .unwrap_or(Value::Integer(secs)),
            (ColumnKind::Array, ValueRef::Text(t)) => {
                let text = String::from_utf8_lossy(t);
                parse_array(&text)
                    .map(Value::Array)
                    .unwrap_or_else(|| Value::Text(text.into_owned()))
            }
            (ColumnKind::Json, ValueRef::Text(t)) => {
                let text = String::from_utf8_lossy(t);
                serde_json::from_str(&text)
                    .map(Value::Json)
                    .unwrap_or_else(|_| Value::Text(text.into_owned()))
            }
            (_, ValueRef::Integer(i)) => Value::Integer(i),
            (_, ValueRef::Real(r)) => Value::Real(r),
            (_, ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            (_, ValueRef::Blob(b)) => Value::Bytes(b.to_vec()),
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts);
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Parse an array column stored either as JSON or as a `{...}` literal
fn parse_array(text: &str) -> Option<Vec<Value>> {
    let text = text.trim();
    if text.starts_with('[') {
        let items: Vec<serde_json::Value> = serde_json::from_str(text).ok()?;
        return Some(items.into_iter().map(json_to_value).collect());
    }
    parse_array_literal(text)
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        other => Value::Json(other),
    }
}

/// Parse a one-dimensional PostgreSQL array literal such as `{a, "b c", NULL}`
fn parse_array_literal(text: &str) -> Option<Vec<Value>> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        if chars.next_if_eq(&'"').is_some() {
            let mut buf = String::new();
            loop {
                match chars.next()? {
                    '\\' => buf.push(chars.next()?),
                    '"' => break,
                    c => buf.push(c),
                }
            }
            items.push(Value::Text(buf));
        } else {
            let mut token = String::new();
            while let Some(c) = chars.next_if(|c| *c != ',') {
                token.push(c);
            }
            let token = token.trim();
            if token.contains(['{', '}', '"']) {
                return None;
            }
            items.push(if token.eq_ignore_ascii_case("null") {
                Value::Null
            } else if let Ok(i) = token.parse::<i64>() {
                Value::Integer(i)
            } else if looks_numeric(token) {
                token.parse::<f64>().map(Value::Real).ok()?
            } else {
                Value::Text(token.to_string())
            });
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(_) => return None,
        }
    }
    Some(items)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Integer(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(Sql::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            other => ToSqlOutput::Owned(Sql::Text(other.to_string())),
        })
    }
}
