use crate::ipc::helpers::{get_required_str, parse_params, to_json, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::navigator::{self, Level, NavPath};
use serde_json::{json, Value};

fn read_path(params: &Value) -> Result<NavPath, HandlerErr> {
    match params.get("path") {
        None | Some(Value::Null) => Ok(NavPath::root()),
        Some(v) => parse_params(v),
    }
}

fn handle_nav_list(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let owner_id = get_required_str(params, "ownerId")?;
        let path = read_path(params)?;
        let listing = navigator::list(conn, &owner_id, &path)?;
        tracing::debug!(level = listing.level().as_str(), depth = path.depth(), "nav list");
        let mut result = to_json(&listing)?;
        result["path"] = to_json(&path)?;
        result["count"] = json!(listing.len());
        Ok(result)
    })
}

fn handle_nav_descend(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let owner_id = get_required_str(params, "ownerId")?;
        let path = read_path(params)?;
        let level: Level = parse_params(
            params
                .get("level")
                .ok_or_else(|| HandlerErr::bad_params("missing level"))?,
        )?;
        let id = get_required_str(params, "id")?;
        let next = navigator::descend(conn, &owner_id, &path, level, &id)?;
        let level = navigator::current_level(&next)?;
        Ok(json!({ "path": to_json(&next)?, "level": level.as_str() }))
    })
}

fn handle_nav_ascend(_state: &mut AppState, req: &Request) -> Value {
    let result = read_path(&req.params).and_then(|path| {
        let up = navigator::ascend(&path);
        let level = navigator::current_level(&up)?;
        Ok(json!({ "path": to_json(&up)?, "level": level.as_str() }))
    });
    match result {
        Ok(v) => crate::ipc::error::ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "nav.list" => Some(handle_nav_list(state, req)),
        "nav.descend" => Some(handle_nav_descend(state, req)),
        "nav.ascend" => Some(handle_nav_ascend(state, req)),
        _ => None,
    }
}
