use crate::exchange;
use crate::ipc::helpers::{get_required_str, to_json, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::path::PathBuf;

fn required_path(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let p = get_required_str(params, key)?;
    let p = p.trim();
    if p.is_empty() {
        return Err(HandlerErr::bad_params(format!("missing {key}")));
    }
    Ok(p.to_string())
}

fn handle_import_students_csv(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let in_path = required_path(params, "inPath")?;
        let text = std::fs::read_to_string(&in_path).map_err(|e| HandlerErr::io_failed(e, &in_path))?;
        let report = exchange::import_students_csv(conn, &class_id, &text)?;
        let mut result = to_json(&report)?;
        result["path"] = json!(in_path);
        Ok(result)
    })
}

fn handle_export_class_csv(state: &mut AppState, req: &Request) -> Value {
    with_db(state, req, |conn, params| {
        let class_id = get_required_str(params, "classId")?;
        let out_path = required_path(params, "outPath")?;
        let export = exchange::export_class_csv(conn, &class_id)?;

        let out = PathBuf::from(&out_path);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HandlerErr::io_failed(e, &out_path))?;
        }
        std::fs::write(&out, export.text).map_err(|e| HandlerErr::io_failed(e, &out_path))?;

        tracing::info!(class_id = %class_id, path = %out_path, "class csv written");
        Ok(json!({ "rowsExported": export.rows_exported, "path": out_path }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "exchange.importStudentsCsv" => Some(handle_import_students_csv(state, req)),
        "exchange.exportClassCsv" => Some(handle_export_class_csv(state, req)),
        _ => None,
    }
}
