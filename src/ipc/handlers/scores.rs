use crate::calc;
use crate::ipc::helpers::{get_required_str, get_required_value, to_json, with_db};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use serde_json::{json, Value};

fn handle_scores_set(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let student_id = get_required_str(params, "studentId")?;
        let component_id = get_required_str(params, "componentId")?;
        let raw = get_required_value(params, "value")?;
        let value = ledger::set_score(conn, &student_id, &component_id, raw)?;
        Ok(json!({ "studentId": student_id, "componentId": component_id, "value": value }))
    })
}

fn handle_scores_get(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let student_id = get_required_str(params, "studentId")?;
        let component_id = get_required_str(params, "componentId")?;
        to_json(&ledger::get_score(conn, &student_id, &component_id)?)
    })
}

fn handle_scores_clear(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let student_id = get_required_str(params, "studentId")?;
        let component_id = get_required_str(params, "componentId")?;
        let cleared = ledger::clear_score(conn, &student_id, &component_id)?;
        Ok(json!({ "cleared": cleared }))
    })
}

fn handle_scores_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let scores = ledger::class_scores(conn, &class_id)?;
        Ok(json!({ "scores": to_json(&scores)? }))
    })
}

fn handle_averages_compute(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        to_json(&calc::compute_averages(conn, &class_id)?)
    })
}

fn handle_averages_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let averages = calc::list_averages(conn, &class_id)?;
        Ok(json!({ "averages": to_json(&averages)? }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "scores.set" => Some(handle_scores_set(state, req)),
        "scores.get" => Some(handle_scores_get(state, req)),
        "scores.clear" => Some(handle_scores_clear(state, req)),
        "scores.list" => Some(handle_scores_list(state, req)),
        "averages.compute" => Some(handle_averages_compute(state, req)),
        "averages.list" => Some(handle_averages_list(state, req)),
        _ => None,
    }
}
