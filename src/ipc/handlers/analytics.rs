use crate::ipc::error::ok;
use crate::ipc::helpers::registry_err;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_analytics_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.registry.analytics() {
        Ok(view) => ok(&req.id, json!(view)),
        Err(e) => registry_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.summary" => Some(handle_analytics_summary(state, req)),
        _ => None,
    }
}
