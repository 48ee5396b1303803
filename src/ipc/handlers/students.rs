use crate::ipc::error::ok;
use crate::ipc::helpers::{form_field, registry_err, required_str};
use crate::ipc::types::{AppState, Request};
use crate::registry::{NewRecordInput, RemoveOutcome};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.registry.list_all() {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => registry_err(req, e),
    }
}

fn handle_students_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    // A missing query behaves like an empty search box.
    let query = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    match state.registry.search(query) {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => registry_err(req, e),
    }
}

fn read_new_record(req: &Request) -> Result<NewRecordInput, serde_json::Value> {
    Ok(NewRecordInput {
        id: form_field(req, "id")?,
        name: form_field(req, "name")?,
        m1: form_field(req, "m1")?,
        m2: form_field(req, "m2")?,
        m3: form_field(req, "m3")?,
        exam: form_field(req, "exam")?,
    })
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let input = match read_new_record(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.registry.add_student(&input) {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => registry_err(req, e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.registry.remove_student(&name) {
        Ok(RemoveOutcome::Removed { count }) => {
            ok(&req.id, json!({ "removed": count, "notFound": false }))
        }
        // Nothing matched: a no-op, not a failure.
        Ok(RemoveOutcome::NotFound) => ok(
            &req.id,
            json!({ "removed": 0, "notFound": true, "name": name }),
        ),
        Err(e) => registry_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.search" => Some(handle_students_search(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
