//! Entity store: row-level CRUD over the workspace database, keyed by id and parent id.
//!
//! Functions here do not validate business rules; `hierarchy`, `scheme`, `ledger` and
//! `calc` do that before calling in. Multi-row writes take a `&Connection` that is
//! expected to be inside a transaction opened by the caller.

mod grading;
mod tree;

pub use grading::*;
pub use tree::*;

use rusqlite::{Connection, OptionalExtension};

use crate::error::CoreResult;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// A stored text column that no longer names a known value.
fn unknown_value(col: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        col,
        rusqlite::types::Type::Text,
        format!("unknown {what} {value:?}").into(),
    )
}

fn count_by(conn: &Connection, sql: &str, id: &str) -> CoreResult<i64> {
    Ok(conn.query_row(sql, [id], |r| r.get(0))?)
}

fn exists(conn: &Connection, sql: &str, id: &str) -> CoreResult<bool> {
    Ok(conn
        .query_row(sql, [id], |r| r.get::<_, i64>(0))
        .optional()?
        .is_some())
}
