use crate::ipc::helpers::{get_required_str, get_required_value, parse_params, to_json, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::GradingType;
use crate::scheme::{self, ComponentPatch, NewComponent};
use serde_json::{json, Value};

fn read_type(params: &Value) -> Result<GradingType, HandlerErr> {
    let raw = get_required_str(params, "type")?;
    GradingType::parse(&raw).ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: format!("unknown grading type: {raw}"),
        details: Some(json!({ "accepted": ["Arithmetic", "Weighted"] })),
    })
}

fn handle_scheme_get(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        to_json(&scheme::get_scheme(conn, &class_id)?)
    })
}

fn handle_scheme_create(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let t = read_type(params)?;
        to_json(&scheme::create_scheme(conn, &class_id, t)?)
    })
}

fn handle_scheme_change_type(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let t = read_type(params)?;
        to_json(&scheme::change_type(conn, &class_id, t)?)
    })
}

fn handle_components_add(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let new: NewComponent = parse_params(params)?;
        to_json(&scheme::add_component(conn, &class_id, new)?)
    })
}

fn handle_components_update(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let component_id = get_required_str(params, "componentId")?;
        let patch: ComponentPatch = parse_params(get_required_value(params, "patch")?)?;
        to_json(&scheme::edit_component(conn, &class_id, &component_id, patch)?)
    })
}

fn handle_components_remove(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let component_id = get_required_str(params, "componentId")?;
        let scores_removed = scheme::remove_component(conn, &class_id, &component_id)?;
        Ok(json!({ "removed": true, "scoresRemoved": scores_removed }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "scheme.get" => Some(handle_scheme_get(state, req)),
        "scheme.create" => Some(handle_scheme_create(state, req)),
        "scheme.changeType" => Some(handle_scheme_change_type(state, req)),
        "components.add" => Some(handle_components_add(state, req)),
        "components.update" => Some(handle_components_update(state, req)),
        "components.remove" => Some(handle_components_remove(state, req)),
        _ => None,
    }
}
