//! Add / edit / delete for the five hierarchy levels.
//!
//! Every operation validates fully before it writes. Deletion is leaf-first: a parent
//! with children is refused with an integrity error, except students, whose scores and
//! average go with them.

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::model::{Class, Course, Institution, ScheduleSlot, Student, Subject};
use crate::schedule;
use crate::store;

pub const MIN_COURSE_PERIOD: i64 = 1;
pub const MAX_COURSE_PERIOD: i64 = 12;

pub(crate) fn required(field: &str, value: &str) -> CoreResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(CoreError::validation(format!("{field} must not be empty"))
            .with_details(json!({ "field": field })));
    }
    Ok(v.to_string())
}

pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn same_key(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn require_institution(conn: &Connection, id: &str) -> CoreResult<Institution> {
    store::get_institution(conn, id)?.ok_or_else(|| CoreError::not_found("institution not found"))
}

pub fn require_course(conn: &Connection, id: &str) -> CoreResult<Course> {
    store::get_course(conn, id)?.ok_or_else(|| CoreError::not_found("course not found"))
}

pub fn require_subject(conn: &Connection, id: &str) -> CoreResult<Subject> {
    store::get_subject(conn, id)?.ok_or_else(|| CoreError::not_found("subject not found"))
}

pub fn require_class(conn: &Connection, id: &str) -> CoreResult<Class> {
    store::get_class(conn, id)?.ok_or_else(|| CoreError::not_found("class not found"))
}

pub fn require_student(conn: &Connection, id: &str) -> CoreResult<Student> {
    store::get_student(conn, id)?.ok_or_else(|| CoreError::not_found("student not found"))
}

fn institution_of_class(conn: &Connection, class_id: &str) -> CoreResult<String> {
    store::institution_of_class(conn, class_id)?
        .ok_or_else(|| CoreError::not_found("class not found"))
}

fn guard_no_children(kind: &str, children: &str, count: i64) -> CoreResult<()> {
    if count > 0 {
        return Err(CoreError::integrity(format!(
            "cannot delete {kind}: it still has {count} {children}"
        ))
        .with_details(json!({ "children": children, "count": count })));
    }
    Ok(())
}

// ---- institutions ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionPatch {
    pub name: Option<String>,
}

pub fn create_institution(conn: &Connection, owner_id: &str, name: &str) -> CoreResult<Institution> {
    let owner_id = required("ownerId", owner_id)?;
    let name = required("name", name)?;
    let inst = store::insert_institution(conn, &owner_id, &name)?;
    tracing::info!(institution_id = %inst.id, owner_id = %owner_id, "institution created");
    Ok(inst)
}

pub fn update_institution(
    conn: &Connection,
    id: &str,
    patch: InstitutionPatch,
) -> CoreResult<Institution> {
    let mut inst = require_institution(conn, id)?;
    if let Some(name) = patch.name.as_deref() {
        inst.name = required("name", name)?;
    }
    store::update_institution(conn, &inst)?;
    Ok(inst)
}

pub fn delete_institution(conn: &Connection, id: &str) -> CoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    require_institution(&tx, id)?;
    guard_no_children("institution", "courses", store::count_courses(&tx, id)?)?;
    store::delete_institution_row(&tx, id)?;
    tx.commit()?;
    tracing::info!(institution_id = %id, "institution deleted");
    Ok(())
}

// ---- courses ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePatch {
    pub name: Option<String>,
    pub period: Option<i64>,
}

fn check_course_period(period: i64) -> CoreResult<()> {
    if !(MIN_COURSE_PERIOD..=MAX_COURSE_PERIOD).contains(&period) {
        return Err(CoreError::validation(format!(
            "course period must be between {MIN_COURSE_PERIOD} and {MAX_COURSE_PERIOD}"
        ))
        .with_details(json!({ "period": period })));
    }
    Ok(())
}

pub fn create_course(
    conn: &Connection,
    institution_id: &str,
    name: &str,
    period: i64,
) -> CoreResult<Course> {
    require_institution(conn, institution_id)?;
    let name = required("name", name)?;
    check_course_period(period)?;
    let course = store::insert_course(conn, institution_id, &name, period)?;
    tracing::info!(course_id = %course.id, institution_id, "course created");
    Ok(course)
}

pub fn update_course(conn: &Connection, id: &str, patch: CoursePatch) -> CoreResult<Course> {
    let mut course = require_course(conn, id)?;
    if let Some(name) = patch.name.as_deref() {
        course.name = required("name", name)?;
    }
    if let Some(period) = patch.period {
        check_course_period(period)?;
        if let Some(max_subject) = store::max_subject_period(conn, id)? {
            if period < max_subject {
                return Err(CoreError::validation(format!(
                    "course period cannot be below {max_subject}: a subject is offered in that period"
                ))
                .with_details(json!({ "period": period, "maxSubjectPeriod": max_subject })));
            }
        }
        course.period = period;
    }
    store::update_course(conn, &course)?;
    Ok(course)
}

pub fn delete_course(conn: &Connection, id: &str) -> CoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    require_course(&tx, id)?;
    guard_no_children("course", "subjects", store::count_subjects(&tx, id)?)?;
    store::delete_course_row(&tx, id)?;
    tx.commit()?;
    tracing::info!(course_id = %id, "course deleted");
    Ok(())
}

// ---- subjects ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub period: i64,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub period: Option<i64>,
    pub nickname: Option<String>,
}

fn check_subject_period(course: &Course, period: i64) -> CoreResult<()> {
    if period < 1 || period > course.period {
        return Err(CoreError::validation(format!(
            "subject period must be between 1 and {}",
            course.period
        ))
        .with_details(json!({ "period": period, "coursePeriod": course.period })));
    }
    Ok(())
}

fn check_subject_code_free(
    conn: &Connection,
    course_id: &str,
    code: &str,
    exclude: Option<&str>,
) -> CoreResult<()> {
    let taken = store::list_subjects(conn, course_id)?
        .into_iter()
        .any(|s| exclude != Some(s.id.as_str()) && same_key(&s.code, code));
    if taken {
        return Err(CoreError::validation(format!(
            "a subject with code \"{code}\" already exists in this course"
        ))
        .with_details(json!({ "code": code })));
    }
    Ok(())
}

pub fn create_subject(conn: &Connection, course_id: &str, new: NewSubject) -> CoreResult<Subject> {
    let course = require_course(conn, course_id)?;
    let name = required("name", &new.name)?;
    let code = required("code", &new.code)?;
    check_subject_period(&course, new.period)?;
    check_subject_code_free(conn, course_id, &code, None)?;

    let subject = Subject {
        id: store::new_id(),
        course_id: course_id.to_string(),
        name,
        code,
        period: new.period,
        nickname: optional_text(new.nickname.as_deref()),
    };
    store::insert_subject(conn, &subject)?;
    tracing::info!(subject_id = %subject.id, course_id, "subject created");
    Ok(subject)
}

pub fn update_subject(conn: &Connection, id: &str, patch: SubjectPatch) -> CoreResult<Subject> {
    let mut subject = require_subject(conn, id)?;
    let course = require_course(conn, &subject.course_id)?;

    if let Some(name) = patch.name.as_deref() {
        subject.name = required("name", name)?;
    }
    if let Some(code) = patch.code.as_deref() {
        let code = required("code", code)?;
        check_subject_code_free(conn, &subject.course_id, &code, Some(id))?;
        subject.code = code;
    }
    if let Some(period) = patch.period {
        check_subject_period(&course, period)?;
        subject.period = period;
    }
    if let Some(nickname) = patch.nickname.as_deref() {
        subject.nickname = optional_text(Some(nickname));
    }
    store::update_subject(conn, &subject)?;
    Ok(subject)
}

pub fn delete_subject(conn: &Connection, id: &str) -> CoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    require_subject(&tx, id)?;
    guard_no_children("subject", "classes", store::count_classes(&tx, id)?)?;
    store::delete_subject_row(&tx, id)?;
    tx.commit()?;
    tracing::info!(subject_id = %id, "subject deleted");
    Ok(())
}

// ---- classes ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClass {
    pub number: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub location: String,
    pub schedule: Vec<ScheduleSlot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPatch {
    pub number: Option<String>,
    pub nickname: Option<String>,
    pub location: Option<String>,
    pub schedule: Option<Vec<ScheduleSlot>>,
}

fn check_class_number_free(
    conn: &Connection,
    subject_id: &str,
    number: &str,
    exclude: Option<&str>,
) -> CoreResult<()> {
    let taken = store::list_classes(conn, subject_id)?
        .into_iter()
        .any(|c| exclude != Some(c.id.as_str()) && same_key(&c.number, number));
    if taken {
        return Err(CoreError::validation(format!(
            "a class numbered \"{number}\" already exists in this subject"
        ))
        .with_details(json!({ "number": number })));
    }
    Ok(())
}

pub fn create_class(conn: &Connection, subject_id: &str, new: NewClass) -> CoreResult<Class> {
    require_subject(conn, subject_id)?;
    let number = required("number", &new.number)?;
    let location = required("location", &new.location)?;
    let schedule = schedule::normalize_schedule(new.schedule)?;
    check_class_number_free(conn, subject_id, &number, None)?;

    let institution_id = store::institution_of_subject(conn, subject_id)?
        .ok_or_else(|| CoreError::not_found("subject not found"))?;

    let tx = conn.unchecked_transaction()?;
    schedule::check_institution_conflicts(&tx, &institution_id, &schedule, None)?;
    let class = Class {
        id: store::new_id(),
        subject_id: subject_id.to_string(),
        number,
        nickname: optional_text(new.nickname.as_deref()),
        location,
        schedule,
        grading_type: None,
    };
    store::insert_class(&tx, &class)?;
    tx.commit()?;

    tracing::info!(class_id = %class.id, subject_id, "class created");
    Ok(class)
}

pub fn update_class(conn: &Connection, id: &str, patch: ClassPatch) -> CoreResult<Class> {
    let mut class = require_class(conn, id)?;

    if let Some(number) = patch.number.as_deref() {
        let number = required("number", number)?;
        check_class_number_free(conn, &class.subject_id, &number, Some(id))?;
        class.number = number;
    }
    if let Some(location) = patch.location.as_deref() {
        class.location = required("location", location)?;
    }
    if let Some(nickname) = patch.nickname.as_deref() {
        class.nickname = optional_text(Some(nickname));
    }

    let tx = conn.unchecked_transaction()?;
    if let Some(slots) = patch.schedule {
        let slots = schedule::normalize_schedule(slots)?;
        let institution_id = institution_of_class(&tx, id)?;
        schedule::check_institution_conflicts(&tx, &institution_id, &slots, Some(id))?;
        class.schedule = slots;
    }
    store::update_class(&tx, &class)?;
    tx.commit()?;
    Ok(class)
}

/// Only an empty class can go; its grading scheme goes with it.
pub fn delete_class(conn: &Connection, id: &str) -> CoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    require_class(&tx, id)?;
    guard_no_children("class", "students", store::count_students(&tx, id)?)?;
    store::delete_class_rows(&tx, id)?;
    tx.commit()?;
    tracing::info!(class_id = %id, "class deleted");
    Ok(())
}

// ---- students ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub ra: Option<String>,
}

pub(crate) fn check_ra_free(
    conn: &Connection,
    institution_id: &str,
    ra: &str,
    exclude: Option<&str>,
) -> CoreResult<()> {
    let holders = store::students_with_ra_in_institution(conn, institution_id, ra)?;
    if let Some(holder) = holders.iter().find(|s| exclude != Some(s.id.as_str())) {
        return Err(CoreError::validation(format!(
            "a student with RA \"{ra}\" already exists in this institution"
        ))
        .with_details(json!({ "ra": ra, "studentId": holder.id, "classId": holder.class_id })));
    }
    Ok(())
}

pub fn create_student(conn: &Connection, class_id: &str, name: &str, ra: &str) -> CoreResult<Student> {
    let name = required("name", name)?;
    let ra = required("ra", ra)?;
    let institution_id = institution_of_class(conn, class_id)?;

    let tx = conn.unchecked_transaction()?;
    check_ra_free(&tx, &institution_id, &ra, None)?;
    let student = store::insert_student(&tx, class_id, &name, &ra)?;
    tx.commit()?;

    tracing::info!(student_id = %student.id, class_id, "student created");
    Ok(student)
}

pub fn update_student(conn: &Connection, id: &str, patch: StudentPatch) -> CoreResult<Student> {
    let mut student = require_student(conn, id)?;
    if let Some(name) = patch.name.as_deref() {
        student.name = required("name", name)?;
    }
    if let Some(ra) = patch.ra.as_deref() {
        let ra = required("ra", ra)?;
        let institution_id = institution_of_class(conn, &student.class_id)?;
        check_ra_free(conn, &institution_id, &ra, Some(id))?;
        student.ra = ra;
    }
    store::update_student(conn, &student)?;
    Ok(student)
}

pub fn delete_student(conn: &Connection, id: &str) -> CoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    require_student(&tx, id)?;
    store::delete_student_rows(&tx, id)?;
    tx.commit()?;
    tracing::info!(student_id = %id, "student deleted");
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::Weekday;

    pub struct Tree {
        pub institution: Institution,
        pub course: Course,
        pub subject: Subject,
        pub class: Class,
    }

    pub fn slot(day: Weekday, start: &str, end: &str) -> ScheduleSlot {
        ScheduleSlot {
            day,
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn new_class(number: &str, schedule: Vec<ScheduleSlot>) -> NewClass {
        NewClass {
            number: number.to_string(),
            nickname: None,
            location: "Room 12".to_string(),
            schedule,
        }
    }

    /// institution -> course (8 periods) -> subject -> class (Monday 19:00-21:00)
    pub fn tree(conn: &Connection, owner: &str) -> Tree {
        let institution = create_institution(conn, owner, "Fatec").expect("institution");
        let course = create_course(conn, &institution.id, "ADS", 8).expect("course");
        let subject = create_subject(
            conn,
            &course.id,
            NewSubject {
                name: "Algorithms".into(),
                code: "ALG1".into(),
                period: 1,
                nickname: None,
            },
        )
        .expect("subject");
        let class = create_class(
            conn,
            &subject.id,
            new_class("A", vec![slot(Weekday::Monday, "19:00", "21:00")]),
        )
        .expect("class");
        Tree {
            institution,
            course,
            subject,
            class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::db;
    use crate::model::Weekday;

    #[test]
    fn course_period_bounds_are_enforced() {
        let conn = db::open_in_memory().expect("db");
        let inst = create_institution(&conn, "u1", "Fatec").expect("inst");
        assert_eq!(
            create_course(&conn, &inst.id, "X", 0).unwrap_err().code(),
            "validation_error"
        );
        assert_eq!(
            create_course(&conn, &inst.id, "X", 13).unwrap_err().code(),
            "validation_error"
        );
        assert!(create_course(&conn, &inst.id, "X", 12).is_ok());
        assert_eq!(
            create_course(&conn, "missing", "X", 4).unwrap_err().code(),
            "not_found"
        );
    }

    #[test]
    fn subject_code_is_unique_per_course_ignoring_case() {
        let conn = db::open_in_memory().expect("db");
        let t = tree(&conn, "u1");
        let dup = create_subject(
            &conn,
            &t.course.id,
            NewSubject {
                name: "Other".into(),
                code: "alg1".into(),
                period: 2,
                nickname: None,
            },
        );
        assert_eq!(dup.unwrap_err().code(), "validation_error");

        let too_late = create_subject(
            &conn,
            &t.course.id,
            NewSubject {
                name: "Other".into(),
                code: "OTH".into(),
                period: 9,
                nickname: None,
            },
        );
        assert_eq!(too_late.unwrap_err().code(), "validation_error");

        let other_course = create_course(&conn, &t.institution.id, "GTI", 6).expect("course");
        let same_code_elsewhere = create_subject(
            &conn,
            &other_course.id,
            NewSubject {
                name: "Algorithms".into(),
                code: "ALG1".into(),
                period: 1,
                nickname: Some("  ".into()),
            },
        )
        .expect("same code in another course");
        assert_eq!(same_code_elsewhere.nickname, None);
    }

    #[test]
    fn course_period_cannot_drop_below_its_subjects() {
        let conn = db::open_in_memory().expect("db");
        let t = tree(&conn, "u1");
        update_subject(
            &conn,
            &t.subject.id,
            SubjectPatch {
                period: Some(5),
                ..Default::default()
            },
        )
        .expect("move subject to period 5");
        let e = update_course(
            &conn,
            &t.course.id,
            CoursePatch {
                period: Some(4),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(e.code(), "validation_error");
        let c = update_course(
            &conn,
            &t.course.id,
            CoursePatch {
                period: Some(5),
                name: Some(" ADS 2 ".into()),
            },
        )
        .expect("period 5 ok");
        assert_eq!(c.name, "ADS 2");
    }

    #[test]
    fn class_schedule_conflicts_are_institution_wide() {
        let conn = db::open_in_memory().expect("db");
        let t = tree(&conn, "u1");

        // Another course and subject of the same institution.
        let course2 = create_course(&conn, &t.institution.id, "GTI", 6).expect("course");
        let subject2 = create_subject(
            &conn,
            &course2.id,
            NewSubject {
                name: "Networks".into(),
                code: "NET".into(),
                period: 1,
                nickname: None,
            },
        )
        .expect("subject");

        let clash = create_class(
            &conn,
            &subject2.id,
            new_class("B", vec![slot(Weekday::Monday, "20:00", "22:00")]),
        );
        let e = clash.unwrap_err();
        assert_eq!(e.code(), "validation_error");
        assert!(e.to_string().contains("Monday"));

        create_class(
            &conn,
            &subject2.id,
            new_class("B", vec![slot(Weekday::Monday, "21:00", "23:00")]),
        )
        .expect("back-to-back is fine");

        // A different institution never conflicts.
        let other = tree(&conn, "u1");
        assert_eq!(other.class.schedule[0].start, "19:00");
    }

    #[test]
    fn class_number_unique_and_schedule_edit_excludes_self() {
        let conn = db::open_in_memory().expect("db");
        let t = tree(&conn, "u1");
        let dup = create_class(
            &conn,
            &t.subject.id,
            new_class("a", vec![slot(Weekday::Tuesday, "08:00", "10:00")]),
        );
        assert_eq!(dup.unwrap_err().code(), "validation_error");

        let moved = update_class(
            &conn,
            &t.class.id,
            ClassPatch {
                schedule: Some(vec![slot(Weekday::Monday, "20:00", "22:00")]),
                ..Default::default()
            },
        )
        .expect("overlapping only itself");
        assert_eq!(moved.schedule[0].end, "22:00");
        let reloaded = require_class(&conn, &t.class.id).expect("reload");
        assert_eq!(reloaded.schedule, moved.schedule);
    }

    #[test]
    fn deletion_is_leaf_first() {
        let conn = db::open_in_memory().expect("db");
        let t = tree(&conn, "u1");
        let s = create_student(&conn, &t.class.id, "Ana", "123").expect("student");

        assert_eq!(
            delete_institution(&conn, &t.institution.id).unwrap_err().code(),
            "integrity_error"
        );
        assert_eq!(
            delete_course(&conn, &t.course.id).unwrap_err().code(),
            "integrity_error"
        );
        assert_eq!(
            delete_subject(&conn, &t.subject.id).unwrap_err().code(),
            "integrity_error"
        );
        assert_eq!(
            delete_class(&conn, &t.class.id).unwrap_err().code(),
            "integrity_error"
        );

        delete_student(&conn, &s.id).expect("student");
        delete_class(&conn, &t.class.id).expect("class");
        delete_subject(&conn, &t.subject.id).expect("subject");
        delete_course(&conn, &t.course.id).expect("course");
        delete_institution(&conn, &t.institution.id).expect("institution");
        assert_eq!(
            delete_institution(&conn, &t.institution.id).unwrap_err().code(),
            "not_found"
        );
    }

    #[test]
    fn ra_is_unique_per_institution_only() {
        let conn = db::open_in_memory().expect("db");
        let t = tree(&conn, "u1");
        create_student(&conn, &t.class.id, "Ana", "123").expect("first");

        let subject2 = create_subject(
            &conn,
            &t.course.id,
            NewSubject {
                name: "Databases".into(),
                code: "DB1".into(),
                period: 2,
                nickname: None,
            },
        )
        .expect("subject");
        let class2 = create_class(
            &conn,
            &subject2.id,
            new_class("C", vec![slot(Weekday::Wednesday, "19:00", "21:00")]),
        )
        .expect("class");
        assert_eq!(
            create_student(&conn, &class2.id, "Bia", " 123 ").unwrap_err().code(),
            "validation_error"
        );

        let other = tree(&conn, "u2");
        create_student(&conn, &other.class.id, "Bia", "123").expect("other institution");

        let bia = create_student(&conn, &class2.id, "Bia", "456").expect("fresh RA");
        assert_eq!(
            update_student(
                &conn,
                &bia.id,
                StudentPatch {
                    ra: Some("123".into()),
                    ..Default::default()
                }
            )
            .unwrap_err()
            .code(),
            "validation_error"
        );
        update_student(
            &conn,
            &bia.id,
            StudentPatch {
                ra: Some("456".into()),
                name: Some("Beatriz".into()),
            },
        )
        .expect("keeping own RA");
    }
}
