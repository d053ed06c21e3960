use crate::exchange;
use crate::ipc::error::{err, import_err, ok, persist_err};
use crate::ipc::helpers::{param_str, param_trimmed, persist};
use crate::ipc::types::{AppState, Request};
use crate::reconcile;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// `outPath` wins; otherwise `outDir` gets a timestamped file name.
fn export_target(req: &Request) -> Option<PathBuf> {
    if let Some(p) = param_trimmed(req, "outPath") {
        return Some(PathBuf::from(p));
    }
    param_trimmed(req, "outDir").map(|d| PathBuf::from(d).join(exchange::export_file_name(Utc::now())))
}

fn handle_export_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    let text = match exchange::to_json_pretty(state.store.records()) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "export_failed", e.to_string(), None),
    };
    let Some(out) = export_target(req) else {
        return ok(
            &req.id,
            json!({
                "json": text,
                "fileName": exchange::export_file_name(Utc::now()),
                "count": state.store.len()
            }),
        );
    };
    if let Err(e) = exchange::write_export(&out, &text) {
        return err(&req.id, "io_failed", format!("{e:#}"), None);
    }
    info!(path = %out.display(), count = state.store.len(), "exported students as JSON");
    ok(
        &req.id,
        json!({
            "path": out.to_string_lossy(),
            "count": state.store.len()
        }),
    )
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let csv = exchange::to_csv(state.store.records());
    let Some(out) = param_trimmed(req, "outPath").map(PathBuf::from) else {
        return ok(&req.id, json!({ "csv": csv, "count": state.store.len() }));
    };
    if let Err(e) = exchange::write_export(&out, &csv) {
        return err(&req.id, "io_failed", format!("{e:#}"), None);
    }
    info!(path = %out.display(), count = state.store.len(), "exported students as CSV");
    ok(
        &req.id,
        json!({
            "path": out.to_string_lossy(),
            "count": state.store.len()
        }),
    )
}

fn handle_import_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let text = if let Some(t) = param_str(req, "text") {
        t.to_string()
    } else if let Some(p) = param_trimmed(req, "path") {
        match reconcile::read_import_file(&PathBuf::from(p)) {
            Ok(t) => t,
            Err(e) => return import_err(&req.id, &e),
        }
    } else {
        return err(&req.id, "bad_params", "missing text or path", None);
    };

    let summary = match reconcile::import_into(&mut state.store, &text) {
        Ok(s) => s,
        Err(e) => return import_err(&req.id, &e),
    };
    if let Err(e) = persist(state) {
        return persist_err(&req.id, &e);
    }
    ok(&req.id, json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exchange.exportJson" => Some(handle_export_json(state, req)),
        "exchange.exportCsv" => Some(handle_export_csv(state, req)),
        "exchange.importJson" => Some(handle_import_json(state, req)),
        _ => None,
    }
}
