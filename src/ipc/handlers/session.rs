use crate::gate::LoginOutcome;
use crate::ipc::error::ok;
use crate::ipc::helpers::form_field;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_session_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let pin = match form_field(req, "pin") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let denied = state.registry.login(&pin) == LoginOutcome::Rejected;
    ok(
        &req.id,
        json!({
            "session": state.registry.session_state(),
            "denied": denied,
        }),
    )
}

fn handle_session_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "session": state.registry.session_state() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_session_login(state, req)),
        "session.status" => Some(handle_session_status(state, req)),
        _ => None,
    }
}
