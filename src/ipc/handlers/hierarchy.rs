use crate::hierarchy::{
    self, ClassPatch, CoursePatch, InstitutionPatch, NewClass, NewSubject, StudentPatch, SubjectPatch,
};
use crate::ipc::helpers::{get_required_i64, get_required_str, parse_params, to_json, with_db};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::{json, Value};

// ---- institutions ----

fn handle_institutions_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let owner_id = get_required_str(params, "ownerId")?;
        let items = store::list_institutions(conn, &owner_id)?;
        Ok(json!({ "institutions": to_json(&items)? }))
    })
}

fn handle_institutions_get(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "institutionId")?;
        to_json(&hierarchy::require_institution(conn, &id)?)
    })
}

fn handle_institutions_create(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let owner_id = get_required_str(params, "ownerId")?;
        let name = get_required_str(params, "name")?;
        to_json(&hierarchy::create_institution(conn, &owner_id, &name)?)
    })
}

fn handle_institutions_update(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "institutionId")?;
        let patch: InstitutionPatch = parse_params(params)?;
        to_json(&hierarchy::update_institution(conn, &id, patch)?)
    })
}

fn handle_institutions_delete(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "institutionId")?;
        hierarchy::delete_institution(conn, &id)?;
        Ok(json!({ "deleted": true }))
    })
}

// ---- courses ----

fn handle_courses_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let institution_id = get_required_str(params, "institutionId")?;
        hierarchy::require_institution(conn, &institution_id)?;
        let items = store::list_courses(conn, &institution_id)?;
        Ok(json!({ "courses": to_json(&items)? }))
    })
}

fn handle_courses_get(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "courseId")?;
        to_json(&hierarchy::require_course(conn, &id)?)
    })
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let institution_id = get_required_str(params, "institutionId")?;
        let name = get_required_str(params, "name")?;
        let period = get_required_i64(params, "period")?;
        to_json(&hierarchy::create_course(conn, &institution_id, &name, period)?)
    })
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "courseId")?;
        let patch: CoursePatch = parse_params(params)?;
        to_json(&hierarchy::update_course(conn, &id, patch)?)
    })
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "courseId")?;
        hierarchy::delete_course(conn, &id)?;
        Ok(json!({ "deleted": true }))
    })
}

// ---- subjects ----

fn handle_subjects_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let course_id = get_required_str(params, "courseId")?;
        hierarchy::require_course(conn, &course_id)?;
        let items = store::list_subjects(conn, &course_id)?;
        Ok(json!({ "subjects": to_json(&items)? }))
    })
}

fn handle_subjects_get(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "subjectId")?;
        to_json(&hierarchy::require_subject(conn, &id)?)
    })
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let course_id = get_required_str(params, "courseId")?;
        let new: NewSubject = parse_params(params)?;
        to_json(&hierarchy::create_subject(conn, &course_id, new)?)
    })
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "subjectId")?;
        let patch: SubjectPatch = parse_params(params)?;
        to_json(&hierarchy::update_subject(conn, &id, patch)?)
    })
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "subjectId")?;
        hierarchy::delete_subject(conn, &id)?;
        Ok(json!({ "deleted": true }))
    })
}

// ---- classes ----

fn handle_classes_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let subject_id = get_required_str(params, "subjectId")?;
        hierarchy::require_subject(conn, &subject_id)?;
        let items = store::list_classes(conn, &subject_id)?;
        Ok(json!({ "classes": to_json(&items)? }))
    })
}

fn handle_classes_get(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "classId")?;
        to_json(&hierarchy::require_class(conn, &id)?)
    })
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let subject_id = get_required_str(params, "subjectId")?;
        let new: NewClass = parse_params(params)?;
        to_json(&hierarchy::create_class(conn, &subject_id, new)?)
    })
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "classId")?;
        let patch: ClassPatch = parse_params(params)?;
        to_json(&hierarchy::update_class(conn, &id, patch)?)
    })
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "classId")?;
        hierarchy::delete_class(conn, &id)?;
        Ok(json!({ "deleted": true }))
    })
}

// ---- students ----

fn handle_students_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        hierarchy::require_class(conn, &class_id)?;
        let items = store::list_students(conn, &class_id)?;
        Ok(json!({ "students": to_json(&items)? }))
    })
}

fn handle_students_get(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "studentId")?;
        to_json(&hierarchy::require_student(conn, &id)?)
    })
}

fn handle_students_create(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let name = get_required_str(params, "name")?;
        let ra = get_required_str(params, "ra")?;
        to_json(&hierarchy::create_student(conn, &class_id, &name, &ra)?)
    })
}

fn handle_students_update(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "studentId")?;
        let patch: StudentPatch = parse_params(params)?;
        to_json(&hierarchy::update_student(conn, &id, patch)?)
    })
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let id = get_required_str(params, "studentId")?;
        hierarchy::delete_student(conn, &id)?;
        Ok(json!({ "deleted": true }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let resp = match req.method.as_str() {
        "institutions.list" => handle_institutions_list(state, req),
        "institutions.get" => handle_institutions_get(state, req),
        "institutions.create" => handle_institutions_create(state, req),
        "institutions.update" => handle_institutions_update(state, req),
        "institutions.delete" => handle_institutions_delete(state, req),
        "courses.list" => handle_courses_list(state, req),
        "courses.get" => handle_courses_get(state, req),
        "courses.create" => handle_courses_create(state, req),
        "courses.update" => handle_courses_update(state, req),
        "courses.delete" => handle_courses_delete(state, req),
        "subjects.list" => handle_subjects_list(state, req),
        "subjects.get" => handle_subjects_get(state, req),
        "subjects.create" => handle_subjects_create(state, req),
        "subjects.update" => handle_subjects_update(state, req),
        "subjects.delete" => handle_subjects_delete(state, req),
        "classes.list" => handle_classes_list(state, req),
        "classes.get" => handle_classes_get(state, req),
        "classes.create" => handle_classes_create(state, req),
        "classes.update" => handle_classes_update(state, req),
        "classes.delete" => handle_classes_delete(state, req),
        "students.list" => handle_students_list(state, req),
        "students.get" => handle_students_get(state, req),
        "students.create" => handle_students_create(state, req),
        "students.update" => handle_students_update(state, req),
        "students.delete" => handle_students_delete(state, req),
        _ => return None,
    };
    Some(resp)
}
