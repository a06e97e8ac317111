use rusqlite::{Connection, OptionalExtension, Row};

use super::{now_rfc3339, unknown_value};
use crate::error::CoreResult;
use crate::model::{Average, GradeComponent, GradingType, StoredScore};

// ---- components ----

fn component_from_row(row: &Row<'_>) -> rusqlite::Result<GradeComponent> {
    Ok(GradeComponent {
        id: row.get(0)?,
        class_id: row.get(1)?,
        position: row.get(2)?,
        name: row.get(3)?,
        nickname: row.get(4)?,
        description: row.get(5)?,
        weight: row.get(6)?,
    })
}

pub fn list_components(conn: &Connection, class_id: &str) -> CoreResult<Vec<GradeComponent>> {
    let mut stmt = conn.prepare(
        "SELECT id, class_id, position, name, nickname, description, weight
         FROM grade_components
         WHERE class_id = ?
         ORDER BY position",
    )?;
    let rows = stmt
        .query_map([class_id], component_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_component(conn: &Connection, id: &str) -> CoreResult<Option<GradeComponent>> {
    Ok(conn
        .query_row(
            "SELECT id, class_id, position, name, nickname, description, weight
             FROM grade_components WHERE id = ?",
            [id],
            component_from_row,
        )
        .optional()?)
}

pub fn next_component_position(conn: &Connection, class_id: &str) -> CoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM grade_components WHERE class_id = ?",
        [class_id],
        |r| r.get(0),
    )?)
}

pub fn insert_component(conn: &Connection, c: &GradeComponent) -> CoreResult<()> {
    conn.execute(
        "INSERT INTO grade_components(id, class_id, position, name, nickname, description, weight)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &c.id,
            &c.class_id,
            c.position,
            &c.name,
            &c.nickname,
            &c.description,
            c.weight,
        ),
    )?;
    Ok(())
}

pub fn update_component(conn: &Connection, c: &GradeComponent) -> CoreResult<()> {
    conn.execute(
        "UPDATE grade_components
         SET name = ?, nickname = ?, description = ?, weight = ?
         WHERE id = ?",
        (&c.name, &c.nickname, &c.description, c.weight, &c.id),
    )?;
    Ok(())
}

pub fn fill_missing_weights(conn: &Connection, class_id: &str) -> CoreResult<usize> {
    Ok(conn.execute(
        "UPDATE grade_components SET weight = 0 WHERE class_id = ? AND weight IS NULL",
        [class_id],
    )?)
}

/// Deletes the component, every score keyed to it, and closes the gap in positions.
pub fn delete_component_rows(conn: &Connection, c: &GradeComponent) -> CoreResult<usize> {
    let scores_removed = conn.execute("DELETE FROM scores WHERE component_id = ?", [&c.id])?;
    conn.execute("DELETE FROM grade_components WHERE id = ?", [&c.id])?;
    conn.execute(
        "UPDATE grade_components SET position = position - 1 WHERE class_id = ? AND position > ?",
        (&c.class_id, c.position),
    )?;
    Ok(scores_removed)
}

// ---- scores ----

pub fn upsert_score(
    conn: &Connection,
    student_id: &str,
    component_id: &str,
    value: f64,
) -> CoreResult<()> {
    conn.execute(
        "INSERT INTO scores(student_id, component_id, value, updated_at)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(student_id, component_id) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        (student_id, component_id, value, now_rfc3339()),
    )?;
    Ok(())
}

pub fn get_score(conn: &Connection, student_id: &str, component_id: &str) -> CoreResult<Option<f64>> {
    Ok(conn
        .query_row(
            "SELECT value FROM scores WHERE student_id = ? AND component_id = ?",
            (student_id, component_id),
            |r| r.get(0),
        )
        .optional()?)
}

pub fn delete_score(conn: &Connection, student_id: &str, component_id: &str) -> CoreResult<usize> {
    Ok(conn.execute(
        "DELETE FROM scores WHERE student_id = ? AND component_id = ?",
        (student_id, component_id),
    )?)
}

pub fn list_class_scores(conn: &Connection, class_id: &str) -> CoreResult<Vec<StoredScore>> {
    let mut stmt = conn.prepare(
        "SELECT sc.student_id, sc.component_id, sc.value
         FROM scores sc
         JOIN students st ON st.id = sc.student_id
         JOIN grade_components gc ON gc.id = sc.component_id
         WHERE st.class_id = ?
         ORDER BY st.sort_order, gc.position",
    )?;
    let rows = stmt
        .query_map([class_id], |r| {
            Ok(StoredScore {
                student_id: r.get(0)?,
                component_id: r.get(1)?,
                value: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---- averages ----

fn average_from_row(row: &Row<'_>) -> rusqlite::Result<Average> {
    let t: String = row.get(3)?;
    Ok(Average {
        student_id: row.get(0)?,
        class_id: row.get(1)?,
        value: row.get(2)?,
        grading_type: GradingType::parse(&t).ok_or_else(|| unknown_value(3, "grading type", &t))?,
        computed_at: row.get(4)?,
    })
}

/// Replaces every stored average of the class with `values`.
pub fn replace_class_averages(
    conn: &Connection,
    class_id: &str,
    grading_type: GradingType,
    values: &[(String, f64)],
) -> CoreResult<String> {
    let computed_at = now_rfc3339();
    conn.execute("DELETE FROM averages WHERE class_id = ?", [class_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO averages(student_id, class_id, value, grading_type, computed_at)
         VALUES(?, ?, ?, ?, ?)",
    )?;
    for (student_id, value) in values {
        stmt.execute((student_id, class_id, value, grading_type.as_str(), &computed_at))?;
    }
    Ok(computed_at)
}

pub fn list_class_averages(conn: &Connection, class_id: &str) -> CoreResult<Vec<Average>> {
    let mut stmt = conn.prepare(
        "SELECT a.student_id, a.class_id, a.value, a.grading_type, a.computed_at
         FROM averages a
         JOIN students st ON st.id = a.student_id
         WHERE a.class_id = ?
         ORDER BY st.sort_order",
    )?;
    let rows = stmt
        .query_map([class_id], average_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
