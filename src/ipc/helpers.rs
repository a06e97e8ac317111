use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn io_failed(e: std::io::Error, path: &str) -> Self {
        HandlerErr {
            code: "io_failed",
            message: e.to_string(),
            details: Some(serde_json::json!({ "path": path })),
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<CoreError> for HandlerErr {
    fn from(e: CoreError) -> Self {
        HandlerErr {
            code: e.code(),
            details: e.details(),
            message: e.to_string(),
        }
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {key}")))
}

pub fn get_required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or non-integer {key}")))
}

pub fn get_required_value<'a>(params: &'a Value, key: &str) -> Result<&'a Value, HandlerErr> {
    params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {key}")))
}

/// Deserializes a typed payload; shape errors become `bad_params`.
pub fn parse_params<T: DeserializeOwned>(value: &Value) -> Result<T, HandlerErr> {
    serde_json::from_value(value.clone()).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

pub fn to_json<T: Serialize>(v: &T) -> Result<Value, HandlerErr> {
    serde_json::to_value(v).map_err(|e| HandlerErr {
        code: "internal_error",
        message: e.to_string(),
        details: None,
    })
}

/// Runs `f` against the open workspace and wraps the outcome in the response envelope.
pub fn with_db<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&Connection, &Value) -> Result<Value, HandlerErr>,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => {
            if e.code == "persistence_error" || e.code == "io_failed" {
                tracing::warn!(method = %req.method, code = e.code, message = %e.message, "request failed");
            } else {
                tracing::debug!(method = %req.method, code = e.code, message = %e.message, "request rejected");
            }
            e.response(&req.id)
        }
    }
}
