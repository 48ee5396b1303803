use crate::ipc::error::{err, ok};
use crate::ipc::helpers::registry_err;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn path_param(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

fn handle_backup_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match path_param(req, "outPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.registry.export_bundle(&PathBuf::from(&out_path)) {
        Ok(export) => ok(
            &req.id,
            json!({
                "path": out_path,
                "bundleFormat": export.bundle_format,
                "entryCount": export.entry_count,
                "recordCount": export.record_count,
                "sha256": export.sha256,
            }),
        ),
        Err(e) => registry_err(req, e),
    }
}

fn handle_backup_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match path_param(req, "inPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.registry.import_bundle(&PathBuf::from(&in_path)) {
        Ok((format, record_count)) => ok(
            &req.id,
            json!({
                "path": in_path,
                "bundleFormatDetected": format,
                "recordCount": record_count,
            }),
        ),
        Err(e) => registry_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportBundle" => Some(handle_backup_export_bundle(state, req)),
        "backup.importBundle" => Some(handle_backup_import_bundle(state, req)),
        _ => None,
    }
}
