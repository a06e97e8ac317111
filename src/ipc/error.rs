use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn err_omits_details_when_absent() {
        let v = err("7", "not_found", "class not found", None);
        assert_eq!(v["ok"], json!(false));
        assert_eq!(v["error"]["code"], json!("not_found"));
        assert!(v["error"].get("details").is_none());

        let v = err("8", "bad_params", "missing classId", Some(json!({ "key": "classId" })));
        assert_eq!(v["error"]["details"]["key"], json!("classId"));
    }
}
