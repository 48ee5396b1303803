use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::registry::RegistryError;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Form fields arrive either as the text the user typed or as JSON numbers.
/// Both are handed to validation as text.
pub fn form_field(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(v) if !v.is_null() => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a string or number", key),
            None,
        )),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn registry_err(req: &Request, e: RegistryError) -> serde_json::Value {
    let code = match &e {
        RegistryError::Locked => "locked",
        RegistryError::Validation(_) => "validation_failed",
        RegistryError::DuplicateId(_) => "duplicate_id",
        RegistryError::EmptyStore => "no_records",
        RegistryError::Persist(_) => "persist_failed",
        RegistryError::Backup(_) => "io_failed",
        RegistryError::BadBundle(_) => "bad_bundle",
    };
    let details = match &e {
        RegistryError::DuplicateId(id) => Some(json!({ "id": id })),
        _ => None,
    };
    if !matches!(e, RegistryError::Locked | RegistryError::Validation(_)) {
        tracing::warn!(method = %req.method, code, error = %e, "request failed");
    }
    err(&req.id, code, e.to_string(), details)
}
