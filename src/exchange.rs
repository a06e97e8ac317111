//! `;`-separated CSV: student roster import and class grade table export.
//!
//! File IO stays in the IPC handler; these functions work on text.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, CoreResult};
use crate::hierarchy::{check_ra_free, require_class};
use crate::model::Student;
use crate::store;

pub const SEPARATOR: char = ';';
pub const BOM: char = '\u{feff}';
pub const UNGRADED_CELL: &str = "-";

fn csv_quote(s: &str) -> String {
    if s.contains(SEPARATOR) || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn parse_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == SEPARATOR && !in_quotes => out.push(std::mem::take(&mut buf)),
            c => buf.push(c),
        }
    }
    out.push(buf);
    out
}

/// Two decimals with `,` as the decimal separator.
pub fn format_decimal(v: f64) -> String {
    format!("{v:.2}").replace('.', ",")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportWarning {
    pub line: usize,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
struct RosterRow {
    line_no: usize,
    name: String,
    ra: String,
}

fn parse_roster(text: &str) -> (Vec<RosterRow>, Vec<ImportWarning>, usize) {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut total = 0usize;
    for (idx, raw_line) in text.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        total += 1;
        let fields = parse_record(line);
        let name = fields.first().map(|f| f.trim()).unwrap_or_default();
        let ra = fields.get(1).map(|f| f.trim()).unwrap_or_default();
        if name.is_empty() || ra.is_empty() {
            warnings.push(ImportWarning {
                line: idx + 1,
                code: "incomplete_line",
                message: "expected Name;RA".to_string(),
            });
            continue;
        }
        rows.push(RosterRow {
            line_no: idx + 1,
            name: name.to_string(),
            ra: ra.to_string(),
        });
    }
    (rows, warnings, total)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub rows_total: usize,
    pub imported: Vec<Student>,
    pub skipped: usize,
    pub warnings: Vec<ImportWarning>,
}

/// Imports a `Name;RA` roster into the class. The first line is a header. Lines whose
/// RA is already taken are reported and skipped; the rest go in one transaction.
pub fn import_students_csv(conn: &Connection, class_id: &str, text: &str) -> CoreResult<ImportReport> {
    require_class(conn, class_id)?;
    let institution_id = store::institution_of_class(conn, class_id)?
        .ok_or_else(|| CoreError::not_found("class not found"))?;
    let (rows, mut warnings, rows_total) = parse_roster(text);

    let tx = conn.unchecked_transaction()?;
    let mut seen: HashSet<String> = HashSet::new();
    let mut imported = Vec::new();
    for row in rows {
        if !seen.insert(row.ra.clone()) {
            warnings.push(ImportWarning {
                line: row.line_no,
                code: "duplicate_ra_in_file",
                message: format!("RA \"{}\" appears earlier in the file", row.ra),
            });
            continue;
        }
        match check_ra_free(&tx, &institution_id, &row.ra, None) {
            Ok(()) => {}
            Err(CoreError::Validation { message, .. }) => {
                warnings.push(ImportWarning {
                    line: row.line_no,
                    code: "duplicate_ra",
                    message,
                });
                continue;
            }
            Err(e) => return Err(e),
        }
        imported.push(store::insert_student(&tx, class_id, &row.name, &row.ra)?);
    }
    tx.commit()?;

    tracing::info!(
        class_id,
        imported = imported.len(),
        warnings = warnings.len(),
        "roster imported"
    );
    warnings.sort_by_key(|w| w.line);
    Ok(ImportReport {
        rows_total,
        skipped: rows_total - imported.len(),
        imported,
        warnings,
    })
}

#[derive(Debug, Clone)]
pub struct ClassExport {
    pub text: String,
    pub rows_exported: usize,
}

/// Renders `Name;RA;<component nicknames>;Average` with a UTF-8 BOM.
pub fn export_class_csv(conn: &Connection, class_id: &str) -> CoreResult<ClassExport> {
    require_class(conn, class_id)?;
    let components = store::list_components(conn, class_id)?;
    let students = store::list_students(conn, class_id)?;
    let scores: HashMap<(String, String), f64> = store::list_class_scores(conn, class_id)?
        .into_iter()
        .map(|s| ((s.student_id, s.component_id), s.value))
        .collect();
    let averages: HashMap<String, f64> = store::list_class_averages(conn, class_id)?
        .into_iter()
        .map(|a| (a.student_id, a.value))
        .collect();

    let mut header = vec!["Name".to_string(), "RA".to_string()];
    header.extend(components.iter().map(|c| csv_quote(&c.nickname)));
    header.push("Average".to_string());

    let mut text = String::new();
    text.push(BOM);
    text.push_str(&header.join(";"));
    text.push('\n');

    for st in &students {
        let mut cells = vec![csv_quote(&st.name), csv_quote(&st.ra)];
        for c in &components {
            cells.push(
                scores
                    .get(&(st.id.clone(), c.id.clone()))
                    .map(|v| format_decimal(*v))
                    .unwrap_or_else(|| UNGRADED_CELL.to_string()),
            );
        }
        cells.push(
            averages
                .get(&st.id)
                .map(|v| format_decimal(*v))
                .unwrap_or_else(|| UNGRADED_CELL.to_string()),
        );
        text.push_str(&cells.join(";"));
        text.push('\n');
    }

    tracing::debug!(class_id, rows = students.len(), "class exported");
    Ok(ClassExport {
        text,
        rows_exported: students.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc;
    use crate::db;
    use crate::hierarchy::{self, fixtures};
    use crate::ledger;
    use crate::model::{GradingType, Weekday};
    use crate::scheme::{self, NewComponent};
    use serde_json::json;

    #[test]
    fn parse_record_handles_quotes() {
        assert_eq!(parse_record("a;b"), vec!["a", "b"]);
        assert_eq!(parse_record("\"Silva; Ana\";12"), vec!["Silva; Ana", "12"]);
        assert_eq!(parse_record("\"say \"\"hi\"\"\";1"), vec!["say \"hi\"", "1"]);
        assert_eq!(parse_record("solo"), vec!["solo"]);
    }

    #[test]
    fn import_reports_bad_lines_and_keeps_the_rest() {
        let conn = db::open_in_memory().expect("db");
        let t = fixtures::tree(&conn, "u1");
        let sibling = hierarchy::create_class(
            &conn,
            &t.subject.id,
            fixtures::new_class("B", vec![fixtures::slot(Weekday::Tuesday, "19:00", "21:00")]),
        )
        .expect("class b");
        hierarchy::create_student(&conn, &sibling.id, "Existing", "900").expect("existing");

        let text = "\u{feff}Name;RA\nAna;100\n\nBia;\nCaio;100\nDani;900\nEva;101\n";
        let report = import_students_csv(&conn, &t.class.id, text).expect("import");

        assert_eq!(report.rows_total, 5);
        assert_eq!(report.imported.len(), 2);
        assert_eq!(report.skipped, 3);
        let codes: Vec<(usize, &str)> = report.warnings.iter().map(|w| (w.line, w.code)).collect();
        assert_eq!(
            codes,
            vec![
                (4, "incomplete_line"),
                (5, "duplicate_ra_in_file"),
                (6, "duplicate_ra")
            ]
        );
        let names: Vec<String> = store::list_students(&conn, &t.class.id)
            .expect("list")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Eva"]);
    }

    #[test]
    fn import_into_missing_class_is_not_found() {
        let conn = db::open_in_memory().expect("db");
        let e = import_students_csv(&conn, "nope", "Name;RA\nAna;1\n").unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn export_writes_bom_header_and_comma_decimals() {
        let conn = db::open_in_memory().expect("db");
        let t = fixtures::tree(&conn, "u1");
        let a = hierarchy::create_student(&conn, &t.class.id, "Ana", "1").expect("a");
        hierarchy::create_student(&conn, &t.class.id, "Bia", "2").expect("b");
        scheme::create_scheme(&conn, &t.class.id, GradingType::Arithmetic).expect("scheme");
        let p1 = scheme::add_component(
            &conn,
            &t.class.id,
            NewComponent {
                name: "Exam 1".into(),
                nickname: "P1".into(),
                description: None,
                weight: None,
            },
        )
        .expect("p1");
        scheme::add_component(
            &conn,
            &t.class.id,
            NewComponent {
                name: "Exam 2".into(),
                nickname: "P2".into(),
                description: None,
                weight: None,
            },
        )
        .expect("p2");
        ledger::set_score(&conn, &a.id, &p1.id, &json!("7,5")).expect("score");

        let before = export_class_csv(&conn, &t.class.id).expect("export");
        assert_eq!(before.rows_exported, 2);
        assert_eq!(
            before.text,
            "\u{feff}Name;RA;P1;P2;Average\nAna;1;7,50;-;-\nBia;2;-;-;-\n"
        );

        calc::compute_averages(&conn, &t.class.id).expect("compute");
        let after = export_class_csv(&conn, &t.class.id).expect("export");
        assert!(after.text.contains("Ana;1;7,50;-;7,50\n"));
        assert!(after.text.contains("Bia;2;-;-;0,00\n"));
    }
}
