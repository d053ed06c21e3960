use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use crate::store::Store;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Opens (or creates) the workspace database and reloads the store from it.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)?;
    let store = Store::restore(&conn);
    info!(
        workspace = %path.display(),
        students = store.len(),
        "workspace opened"
    );
    state.workspace = Some(path.to_path_buf());
    state.store = store;
    state.db = Some(conn);
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    if let Err(e) = open_workspace(state, &path) {
        return err(&req.id, "db_open_failed", format!("{e:#}"), None);
    }
    let theme = state
        .db
        .as_ref()
        .map(|conn| settings::load_theme(conn))
        .unwrap_or_default();
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "studentCount": state.store.len(),
            "theme": theme.as_str()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
