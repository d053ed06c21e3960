use crate::ipc::error::{err, ok};
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use crate::settings::{self, Theme};
use serde_json::json;

fn handle_theme_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let theme = state
        .db
        .as_ref()
        .map(|conn| settings::load_theme(conn))
        .unwrap_or_default();
    ok(&req.id, json!({ "theme": theme.as_str() }))
}

fn store_theme(state: &mut AppState, req: &Request, theme: Theme) -> serde_json::Value {
    let Some(conn) = state.db.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = settings::save_theme(conn, theme) {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    ok(&req.id, json!({ "theme": theme.as_str() }))
}

fn handle_theme_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(mode) = param_str(req, "mode") else {
        return err(&req.id, "bad_params", "missing mode", None);
    };
    let Some(theme) = Theme::parse(mode) else {
        return err(&req.id, "bad_params", "mode must be light or dark", None);
    };
    store_theme(state, req, theme)
}

fn handle_theme_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let next = settings::load_theme(conn).toggled();
    store_theme(state, req, next)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "theme.get" => Some(handle_theme_get(state, req)),
        "theme.set" => Some(handle_theme_set(state, req)),
        "theme.toggle" => Some(handle_theme_toggle(state, req)),
        _ => None,
    }
}
