//! Per-student, per-component scores. Storage is sparse: no row means ungraded.

use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::hierarchy::require_student;
use crate::model::{GradeComponent, Student, StoredScore};
use crate::store;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum ScoreCell {
    Graded(f64),
    Ungraded,
}

/// Reads a cell input. The first `,` counts as the decimal separator. Anything that
/// does not parse as a finite number becomes 0, as the grade table has always done.
pub fn parse_score_input(raw: &serde_json::Value) -> f64 {
    match raw {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s
            .trim()
            .replacen(',', ".", 1)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn check_range(value: f64) -> CoreResult<f64> {
    if !value.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&value) {
        return Err(
            CoreError::validation(format!("score must be between {MIN_SCORE} and {MAX_SCORE}"))
                .with_details(json!({ "value": value })),
        );
    }
    Ok(value)
}

/// The component must belong to the student's class.
fn resolve_cell(
    conn: &Connection,
    student_id: &str,
    component_id: &str,
) -> CoreResult<(Student, GradeComponent)> {
    let student = require_student(conn, student_id)?;
    match store::get_component(conn, component_id)? {
        Some(c) if c.class_id == student.class_id => Ok((student, c)),
        _ => Err(CoreError::not_found("component not found for this student's class")
            .with_details(json!({ "studentId": student_id, "componentId": component_id }))),
    }
}

pub fn set_score(
    conn: &Connection,
    student_id: &str,
    component_id: &str,
    raw: &serde_json::Value,
) -> CoreResult<f64> {
    let value = check_range(parse_score_input(raw))?;
    resolve_cell(conn, student_id, component_id)?;
    store::upsert_score(conn, student_id, component_id, value)?;
    tracing::debug!(student_id, component_id, value, "score set");
    Ok(value)
}

pub fn get_score(conn: &Connection, student_id: &str, component_id: &str) -> CoreResult<ScoreCell> {
    resolve_cell(conn, student_id, component_id)?;
    Ok(match store::get_score(conn, student_id, component_id)? {
        Some(v) => ScoreCell::Graded(v),
        None => ScoreCell::Ungraded,
    })
}

/// Returns the cell to ungraded.
pub fn clear_score(conn: &Connection, student_id: &str, component_id: &str) -> CoreResult<bool> {
    resolve_cell(conn, student_id, component_id)?;
    Ok(store::delete_score(conn, student_id, component_id)? > 0)
}

pub fn class_scores(conn: &Connection, class_id: &str) -> CoreResult<Vec<StoredScore>> {
    if !store::class_exists(conn, class_id)? {
        return Err(CoreError::not_found("class not found"));
    }
    store::list_class_scores(conn, class_id)
}
