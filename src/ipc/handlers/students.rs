use crate::exchange;
use crate::form::{self, StudentForm};
use crate::ipc::error::{err, ok, persist_err, submit_err};
use crate::ipc::helpers::{param_str, param_trimmed, persist, view_request};
use crate::ipc::types::{AppState, Request};
use crate::projection;
use serde_json::json;
use tracing::info;

fn parse_form(req: &Request) -> Result<StudentForm, serde_json::Value> {
    serde_json::from_value::<StudentForm>(req.params.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid student form: {e}"), None))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = view_request(req);
    let p = projection::project(state.store.records(), &view);
    let rows: Vec<serde_json::Value> = p
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            json!({
                "rowNumber": p.start_index + i + 1,
                "student": r,
                "gradeTone": r.grade().tone()
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "rows": rows,
            "page": p.page,
            "totalPages": p.total_pages,
            "startIndex": p.start_index,
            "filteredCount": p.filtered_count,
            "pages": projection::pagination_window(p.page, p.total_pages),
            "sort": view.sort.as_str(),
            "stats": p.stats
        }),
    )
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(student_id) = param_str(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    match state.store.find_by_id(student_id) {
        Some(r) => ok(&req.id, json!({ "student": r })),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let form = match parse_form(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let rec = match form::submit(&mut state.store, &form, None) {
        Ok(r) => r,
        Err(e) => return submit_err(&req.id, &e),
    };
    if let Err(e) = persist(state) {
        return persist_err(&req.id, &e);
    }
    ok(&req.id, json!({ "student": rec }))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let Some(student_id) = param_str(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    let form = match parse_form(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let rec = match form::submit(&mut state.store, &form, Some(student_id)) {
        Ok(r) => r,
        Err(e) => return submit_err(&req.id, &e),
    };
    if let Err(e) = persist(state) {
        return persist_err(&req.id, &e);
    }
    ok(&req.id, json!({ "student": rec }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let Some(student_id) = param_str(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    if !state.store.remove(student_id) {
        return err(&req.id, "not_found", "student not found", None);
    }
    info!(id = %student_id, "student deleted");
    if let Err(e) = persist(state) {
        return persist_err(&req.id, &e);
    }
    ok(&req.id, json!({ "deleted": true }))
}

fn handle_students_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let cleared = state.store.len();
    state.store.clear();
    info!(cleared, "all students cleared");
    if let Err(e) = persist(state) {
        return persist_err(&req.id, &e);
    }
    ok(&req.id, json!({ "cleared": cleared }))
}

fn handle_students_check_roll(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(roll) = param_trimmed(req, "roll") else {
        return err(&req.id, "bad_params", "missing roll", None);
    };
    let exclude_id = param_str(req, "excludeId");
    ok(
        &req.id,
        json!({ "unique": state.store.is_roll_unique(&roll, exclude_id) }),
    )
}

fn handle_students_print(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(student_id) = param_str(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    match state.store.find_by_id(student_id) {
        Some(r) => ok(&req.id, json!({ "html": exchange::print_html(r) })),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.clear" => Some(handle_students_clear(state, req)),
        "students.checkRoll" => Some(handle_students_check_roll(state, req)),
        "students.print" => Some(handle_students_print(state, req)),
        _ => None,
    }
}
