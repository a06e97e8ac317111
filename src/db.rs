use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS institutions(
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_institutions_owner ON institutions(owner_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            institution_id TEXT NOT NULL,
            name TEXT NOT NULL,
            period INTEGER NOT NULL,
            FOREIGN KEY(institution_id) REFERENCES institutions(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_institution ON courses(institution_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            name TEXT NOT NULL,
            code TEXT NOT NULL,
            period INTEGER NOT NULL,
            nickname TEXT,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_course ON subjects(course_id)",
        [],
    )?;

    // grading_type stays NULL until the class scheme is created.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            number TEXT NOT NULL,
            nickname TEXT,
            location TEXT NOT NULL,
            grading_type TEXT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_subject ON classes(subject_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_schedule(
            class_id TEXT NOT NULL,
            slot_idx INTEGER NOT NULL,
            day TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            PRIMARY KEY(class_id, slot_idx),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            name TEXT NOT NULL,
            ra TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class_sort ON students(class_id, sort_order)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_ra ON students(ra)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_components(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            nickname TEXT NOT NULL,
            description TEXT,
            weight REAL,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_components_class ON grade_components(class_id, position)",
        [],
    )?;

    // Sparse: a missing row means the cell is ungraded.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS scores(
            student_id TEXT NOT NULL,
            component_id TEXT NOT NULL,
            value REAL NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY(student_id, component_id),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(component_id) REFERENCES grade_components(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_component ON scores(component_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS averages(
            student_id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            value REAL NOT NULL,
            grading_type TEXT NOT NULL,
            computed_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_averages_class ON averages(class_id)",
        [],
    )?;

    Ok(())
}
