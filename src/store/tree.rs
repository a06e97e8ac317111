use rusqlite::{Connection, OptionalExtension, Row};

use super::{count_by, exists, new_id, unknown_value};
use crate::error::CoreResult;
use crate::model::{Class, Course, GradingType, Institution, ScheduleSlot, Student, Subject, Weekday};

// ---- institutions ----

fn institution_from_row(row: &Row<'_>) -> rusqlite::Result<Institution> {
    Ok(Institution {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
    })
}

pub fn insert_institution(conn: &Connection, owner_id: &str, name: &str) -> CoreResult<Institution> {
    let id = new_id();
    conn.execute(
        "INSERT INTO institutions(id, owner_id, name) VALUES(?, ?, ?)",
        (&id, owner_id, name),
    )?;
    Ok(Institution {
        id,
        owner_id: owner_id.to_string(),
        name: name.to_string(),
    })
}

pub fn get_institution(conn: &Connection, id: &str) -> CoreResult<Option<Institution>> {
    Ok(conn
        .query_row(
            "SELECT id, owner_id, name FROM institutions WHERE id = ?",
            [id],
            institution_from_row,
        )
        .optional()?)
}

pub fn list_institutions(conn: &Connection, owner_id: &str) -> CoreResult<Vec<Institution>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name FROM institutions WHERE owner_id = ? ORDER BY name, rowid",
    )?;
    let rows = stmt
        .query_map([owner_id], institution_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_institution(conn: &Connection, inst: &Institution) -> CoreResult<()> {
    conn.execute(
        "UPDATE institutions SET name = ? WHERE id = ?",
        (&inst.name, &inst.id),
    )?;
    Ok(())
}

pub fn delete_institution_row(conn: &Connection, id: &str) -> CoreResult<usize> {
    Ok(conn.execute("DELETE FROM institutions WHERE id = ?", [id])?)
}

pub fn count_courses(conn: &Connection, institution_id: &str) -> CoreResult<i64> {
    count_by(
        conn,
        "SELECT COUNT(*) FROM courses WHERE institution_id = ?",
        institution_id,
    )
}

// ---- courses ----

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        institution_id: row.get(1)?,
        name: row.get(2)?,
        period: row.get(3)?,
    })
}

pub fn insert_course(
    conn: &Connection,
    institution_id: &str,
    name: &str,
    period: i64,
) -> CoreResult<Course> {
    let id = new_id();
    conn.execute(
        "INSERT INTO courses(id, institution_id, name, period) VALUES(?, ?, ?, ?)",
        (&id, institution_id, name, period),
    )?;
    Ok(Course {
        id,
        institution_id: institution_id.to_string(),
        name: name.to_string(),
        period,
    })
}

pub fn get_course(conn: &Connection, id: &str) -> CoreResult<Option<Course>> {
    Ok(conn
        .query_row(
            "SELECT id, institution_id, name, period FROM courses WHERE id = ?",
            [id],
            course_from_row,
        )
        .optional()?)
}

pub fn list_courses(conn: &Connection, institution_id: &str) -> CoreResult<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT id, institution_id, name, period FROM courses
         WHERE institution_id = ?
         ORDER BY name, rowid",
    )?;
    let rows = stmt
        .query_map([institution_id], course_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_course(conn: &Connection, course: &Course) -> CoreResult<()> {
    conn.execute(
        "UPDATE courses SET name = ?, period = ? WHERE id = ?",
        (&course.name, course.period, &course.id),
    )?;
    Ok(())
}

pub fn delete_course_row(conn: &Connection, id: &str) -> CoreResult<usize> {
    Ok(conn.execute("DELETE FROM courses WHERE id = ?", [id])?)
}

pub fn count_subjects(conn: &Connection, course_id: &str) -> CoreResult<i64> {
    count_by(conn, "SELECT COUNT(*) FROM subjects WHERE course_id = ?", course_id)
}

pub fn max_subject_period(conn: &Connection, course_id: &str) -> CoreResult<Option<i64>> {
    Ok(conn.query_row(
        "SELECT MAX(period) FROM subjects WHERE course_id = ?",
        [course_id],
        |r| r.get(0),
    )?)
}

// ---- subjects ----

fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        course_id: row.get(1)?,
        name: row.get(2)?,
        code: row.get(3)?,
        period: row.get(4)?,
        nickname: row.get(5)?,
    })
}

pub fn insert_subject(conn: &Connection, subject: &Subject) -> CoreResult<()> {
    conn.execute(
        "INSERT INTO subjects(id, course_id, name, code, period, nickname) VALUES(?, ?, ?, ?, ?, ?)",
        (
            &subject.id,
            &subject.course_id,
            &subject.name,
            &subject.code,
            subject.period,
            &subject.nickname,
        ),
    )?;
    Ok(())
}

pub fn get_subject(conn: &Connection, id: &str) -> CoreResult<Option<Subject>> {
    Ok(conn
        .query_row(
            "SELECT id, course_id, name, code, period, nickname FROM subjects WHERE id = ?",
            [id],
            subject_from_row,
        )
        .optional()?)
}

pub fn list_subjects(conn: &Connection, course_id: &str) -> CoreResult<Vec<Subject>> {
    let mut stmt = conn.prepare(
        "SELECT id, course_id, name, code, period, nickname FROM subjects
         WHERE course_id = ?
         ORDER BY period, name, rowid",
    )?;
    let rows = stmt
        .query_map([course_id], subject_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_subject(conn: &Connection, subject: &Subject) -> CoreResult<()> {
    conn.execute(
        "UPDATE subjects SET name = ?, code = ?, period = ?, nickname = ? WHERE id = ?",
        (
            &subject.name,
            &subject.code,
            subject.period,
            &subject.nickname,
            &subject.id,
        ),
    )?;
    Ok(())
}

pub fn delete_subject_row(conn: &Connection, id: &str) -> CoreResult<usize> {
    Ok(conn.execute("DELETE FROM subjects WHERE id = ?", [id])?)
}

pub fn count_classes(conn: &Connection, subject_id: &str) -> CoreResult<i64> {
    count_by(conn, "SELECT COUNT(*) FROM classes WHERE subject_id = ?", subject_id)
}

// ---- classes ----

fn load_schedule(conn: &Connection, class_id: &str) -> CoreResult<Vec<ScheduleSlot>> {
    let mut stmt = conn.prepare(
        "SELECT day, start_time, end_time FROM class_schedule WHERE class_id = ? ORDER BY slot_idx",
    )?;
    let rows = stmt
        .query_map([class_id], |r| {
            Ok(ScheduleSlot {
                day: weekday_column(r, 0)?,
                start: r.get(1)?,
                end: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn weekday_column(row: &Row<'_>, col: usize) -> rusqlite::Result<Weekday> {
    let day: String = row.get(col)?;
    Weekday::parse(&day).ok_or_else(|| unknown_value(col, "weekday", &day))
}

fn replace_schedule(conn: &Connection, class_id: &str, schedule: &[ScheduleSlot]) -> CoreResult<()> {
    conn.execute("DELETE FROM class_schedule WHERE class_id = ?", [class_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO class_schedule(class_id, slot_idx, day, start_time, end_time)
         VALUES(?, ?, ?, ?, ?)",
    )?;
    for (i, slot) in schedule.iter().enumerate() {
        stmt.execute((class_id, i as i64, slot.day.as_str(), &slot.start, &slot.end))?;
    }
    Ok(())
}

struct ClassRow {
    id: String,
    subject_id: String,
    number: String,
    nickname: Option<String>,
    location: String,
    grading_type: Option<GradingType>,
}

fn class_row(row: &Row<'_>) -> rusqlite::Result<ClassRow> {
    Ok(ClassRow {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        number: row.get(2)?,
        nickname: row.get(3)?,
        location: row.get(4)?,
        grading_type: row
            .get::<_, Option<String>>(5)?
            .map(|t| GradingType::parse(&t).ok_or_else(|| unknown_value(5, "grading type", &t)))
            .transpose()?,
    })
}

fn hydrate_class(conn: &Connection, row: ClassRow) -> CoreResult<Class> {
    let schedule = load_schedule(conn, &row.id)?;
    Ok(Class {
        schedule,
        grading_type: row.grading_type,
        id: row.id,
        subject_id: row.subject_id,
        number: row.number,
        nickname: row.nickname,
        location: row.location,
    })
}

pub fn insert_class(conn: &Connection, class: &Class) -> CoreResult<()> {
    conn.execute(
        "INSERT INTO classes(id, subject_id, number, nickname, location, grading_type)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &class.id,
            &class.subject_id,
            &class.number,
            &class.nickname,
            &class.location,
            class.grading_type.map(GradingType::as_str),
        ),
    )?;
    replace_schedule(conn, &class.id, &class.schedule)
}

pub fn get_class(conn: &Connection, id: &str) -> CoreResult<Option<Class>> {
    let row = conn
        .query_row(
            "SELECT id, subject_id, number, nickname, location, grading_type
             FROM classes WHERE id = ?",
            [id],
            class_row,
        )
        .optional()?;
    match row {
        Some(r) => Ok(Some(hydrate_class(conn, r)?)),
        None => Ok(None),
    }
}

pub fn list_classes(conn: &Connection, subject_id: &str) -> CoreResult<Vec<Class>> {
    let mut stmt = conn.prepare(
        "SELECT id, subject_id, number, nickname, location, grading_type
         FROM classes
         WHERE subject_id = ?
         ORDER BY number, rowid",
    )?;
    let rows = stmt
        .query_map([subject_id], class_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|r| hydrate_class(conn, r)).collect()
}

/// Updates the descriptive columns and the schedule. The grading type has its own setter.
pub fn update_class(conn: &Connection, class: &Class) -> CoreResult<()> {
    conn.execute(
        "UPDATE classes SET number = ?, nickname = ?, location = ? WHERE id = ?",
        (&class.number, &class.nickname, &class.location, &class.id),
    )?;
    replace_schedule(conn, &class.id, &class.schedule)
}

pub fn set_class_grading_type(conn: &Connection, class_id: &str, t: GradingType) -> CoreResult<()> {
    conn.execute(
        "UPDATE classes SET grading_type = ? WHERE id = ?",
        (t.as_str(), class_id),
    )?;
    Ok(())
}

pub fn delete_class_rows(conn: &Connection, id: &str) -> CoreResult<usize> {
    conn.execute("DELETE FROM class_schedule WHERE class_id = ?", [id])?;
    conn.execute("DELETE FROM averages WHERE class_id = ?", [id])?;
    conn.execute("DELETE FROM grade_components WHERE class_id = ?", [id])?;
    Ok(conn.execute("DELETE FROM classes WHERE id = ?", [id])?)
}

pub fn count_students(conn: &Connection, class_id: &str) -> CoreResult<i64> {
    count_by(conn, "SELECT COUNT(*) FROM students WHERE class_id = ?", class_id)
}

// ---- students ----

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        class_id: row.get(1)?,
        name: row.get(2)?,
        ra: row.get(3)?,
    })
}

pub fn insert_student(conn: &Connection, class_id: &str, name: &str, ra: &str) -> CoreResult<Student> {
    let id = new_id();
    let sort_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM students WHERE class_id = ?",
        [class_id],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO students(id, class_id, name, ra, sort_order) VALUES(?, ?, ?, ?, ?)",
        (&id, class_id, name, ra, sort_order),
    )?;
    Ok(Student {
        id,
        class_id: class_id.to_string(),
        name: name.to_string(),
        ra: ra.to_string(),
    })
}

pub fn get_student(conn: &Connection, id: &str) -> CoreResult<Option<Student>> {
    Ok(conn
        .query_row(
            "SELECT id, class_id, name, ra FROM students WHERE id = ?",
            [id],
            student_from_row,
        )
        .optional()?)
}

pub fn list_students(conn: &Connection, class_id: &str) -> CoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, class_id, name, ra FROM students WHERE class_id = ? ORDER BY sort_order",
    )?;
    let rows = stmt
        .query_map([class_id], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_student(conn: &Connection, student: &Student) -> CoreResult<()> {
    conn.execute(
        "UPDATE students SET name = ?, ra = ? WHERE id = ?",
        (&student.name, &student.ra, &student.id),
    )?;
    Ok(())
}

/// Removes the student together with its scores and average.
pub fn delete_student_rows(conn: &Connection, id: &str) -> CoreResult<usize> {
    conn.execute("DELETE FROM scores WHERE student_id = ?", [id])?;
    conn.execute("DELETE FROM averages WHERE student_id = ?", [id])?;
    Ok(conn.execute("DELETE FROM students WHERE id = ?", [id])?)
}

// ---- institution-wide lookups ----

pub fn institution_of_subject(conn: &Connection, subject_id: &str) -> CoreResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT c.institution_id
             FROM subjects s
             JOIN courses c ON c.id = s.course_id
             WHERE s.id = ?",
            [subject_id],
            |r| r.get(0),
        )
        .optional()?)
}

pub fn institution_of_class(conn: &Connection, class_id: &str) -> CoreResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT c.institution_id
             FROM classes cl
             JOIN subjects s ON s.id = cl.subject_id
             JOIN courses c ON c.id = s.course_id
             WHERE cl.id = ?",
            [class_id],
            |r| r.get(0),
        )
        .optional()?)
}

/// A schedule slot of some class, tagged with that class, for conflict scans.
#[derive(Debug, Clone)]
pub struct ScheduledSlot {
    pub class_id: String,
    pub class_number: String,
    pub slot: ScheduleSlot,
}

pub fn schedule_in_institution(
    conn: &Connection,
    institution_id: &str,
) -> CoreResult<Vec<ScheduledSlot>> {
    let mut stmt = conn.prepare(
        "SELECT cl.id, cl.number, cs.day, cs.start_time, cs.end_time
         FROM class_schedule cs
         JOIN classes cl ON cl.id = cs.class_id
         JOIN subjects s ON s.id = cl.subject_id
         JOIN courses c ON c.id = s.course_id
         WHERE c.institution_id = ?
         ORDER BY cl.id, cs.slot_idx",
    )?;
    let rows = stmt
        .query_map([institution_id], |r| {
            Ok(ScheduledSlot {
                class_id: r.get(0)?,
                class_number: r.get(1)?,
                slot: ScheduleSlot {
                    day: weekday_column(r, 2)?,
                    start: r.get(3)?,
                    end: r.get(4)?,
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Students of an institution holding `ra`, across every course, subject and class.
pub fn students_with_ra_in_institution(
    conn: &Connection,
    institution_id: &str,
    ra: &str,
) -> CoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT st.id, st.class_id, st.name, st.ra
         FROM students st
         JOIN classes cl ON cl.id = st.class_id
         JOIN subjects s ON s.id = cl.subject_id
         JOIN courses c ON c.id = s.course_id
         WHERE c.institution_id = ? AND st.ra = ?",
    )?;
    let rows = stmt
        .query_map((institution_id, ra), student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn class_exists(conn: &Connection, class_id: &str) -> CoreResult<bool> {
    exists(conn, "SELECT 1 FROM classes WHERE id = ?", class_id)
}
