use crate::gate::SessionState;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Store details stay behind the gate; a locked session only learns that the
/// process is alive.
fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let status = state.registry.status();
    if status.session == SessionState::Locked {
        return ok(
            &req.id,
            json!({
                "version": env!("CARGO_PKG_VERSION"),
                "session": status.session,
            }),
        );
    }
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataPath": status.data_path.to_string_lossy(),
            "recordCount": status.record_count,
            "session": status.session,
            "dirty": status.dirty,
            "loadError": status.load_error,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        _ => None,
    }
}
