use serde_json::json;

use crate::error::{ImportError, SubmitError, ValidationError};

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

pub fn validation_err(id: &str, e: &ValidationError) -> serde_json::Value {
    err(
        id,
        "validation_failed",
        e.to_string(),
        Some(json!({ "errors": e.errors })),
    )
}

pub fn submit_err(id: &str, e: &SubmitError) -> serde_json::Value {
    match e {
        SubmitError::Validation(v) => validation_err(id, v),
        SubmitError::NotFound(_) => err(id, "not_found", e.to_string(), None),
    }
}

pub fn import_err(id: &str, e: &ImportError) -> serde_json::Value {
    let code = match e {
        ImportError::Read { .. } => "io_failed",
        ImportError::InvalidJson(_) | ImportError::NotAnArray => "import_failed",
    };
    err(id, code, format!("Import failed: {e}"), None)
}

/// The store already holds the change; only the workspace write failed.
pub fn persist_err(id: &str, e: &anyhow::Error) -> serde_json::Value {
    err(
        id,
        "db_update_failed",
        format!("saved in memory only; workspace write failed: {e:#}"),
        None,
    )
}
