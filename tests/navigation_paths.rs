use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOKD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

fn id_of(v: &serde_json::Value) -> String {
    v.get("id").and_then(|v| v.as_str()).expect("id").to_string()
}

struct Tree {
    institution_id: String,
    course_id: String,
    subject_id: String,
    class_id: String,
}

/// institution -> course -> subject -> class meeting Monday 19:00-21:00
fn build_tree(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, owner: &str) -> Tree {
    let inst = request_ok(
        stdin,
        reader,
        "tree-1",
        "institutions.create",
        json!({ "ownerId": owner, "name": "Fatec" }),
    );
    let course = request_ok(
        stdin,
        reader,
        "tree-2",
        "courses.create",
        json!({ "institutionId": id_of(&inst), "name": "ADS", "period": 6 }),
    );
    let subject = request_ok(
        stdin,
        reader,
        "tree-3",
        "subjects.create",
        json!({ "courseId": id_of(&course), "name": "Algorithms", "code": "ALG1", "period": 1 }),
    );
    let class = request_ok(
        stdin,
        reader,
        "tree-4",
        "classes.create",
        json!({
            "subjectId": id_of(&subject),
            "number": "A",
            "location": "Lab 3",
            "schedule": [{ "day": "Monday", "start": "19:00", "end": "21:00" }]
        }),
    );
    Tree {
        institution_id: id_of(&inst),
        course_id: id_of(&course),
        subject_id: id_of(&subject),
        class_id: id_of(&class),
    }
}

#[test]
fn navigation_walks_the_tree_with_explicit_paths() {
    let workspace = temp_dir("gradebook-navigation");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let tree = build_tree(&mut stdin, &mut reader, "u1");
    let _ = build_tree(&mut stdin, &mut reader, "u2");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "classId": tree.class_id, "name": "Ana", "ra": "1" }),
    );

    let roots = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "nav.list",
        json!({ "ownerId": "u1", "path": [] }),
    );
    assert_eq!(roots["level"], json!("institutions"));
    assert_eq!(roots["items"].as_array().map(|a| a.len()), Some(1));

    let mut path = json!([]);
    let steps = [
        ("institutions", tree.institution_id.clone()),
        ("courses", tree.course_id.clone()),
        ("subjects", tree.subject_id.clone()),
        ("classes", tree.class_id.clone()),
    ];
    for (i, (level, id)) in steps.iter().enumerate() {
        let next = request_ok(
            &mut stdin,
            &mut reader,
            &format!("d{}", i),
            "nav.descend",
            json!({ "ownerId": "u1", "path": path, "level": level, "id": id }),
        );
        path = next["path"].clone();
    }
    assert_eq!(path.as_array().map(|a| a.len()), Some(4));

    let students = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "nav.list",
        json!({ "ownerId": "u1", "path": path }),
    );
    assert_eq!(students["level"], json!("students"));
    assert_eq!(students["items"][0]["name"], json!("Ana"));

    let up = request_ok(&mut stdin, &mut reader, "5", "nav.ascend", json!({ "path": path }));
    assert_eq!(up["level"], json!("classes"));
    assert_eq!(up["path"].as_array().map(|a| a.len()), Some(3));

    let root = request_ok(&mut stdin, &mut reader, "6", "nav.ascend", json!({ "path": [] }));
    assert_eq!(root["path"], json!([]));

    assert_eq!(
        request_err_code(
            &mut stdin,
            &mut reader,
            "7",
            "nav.descend",
            json!({ "ownerId": "u1", "path": [], "level": "courses", "id": tree.course_id })
        ),
        "validation_error"
    );
    assert_eq!(
        request_err_code(
            &mut stdin,
            &mut reader,
            "8",
            "nav.descend",
            json!({ "ownerId": "u2", "path": [], "level": "institutions", "id": tree.institution_id })
        ),
        "not_found"
    );
    assert_eq!(
        request_err_code(
            &mut stdin,
            &mut reader,
            "9",
            "nav.list",
            json!({ "ownerId": "u2", "path": [tree.institution_id] })
        ),
        "not_found"
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
