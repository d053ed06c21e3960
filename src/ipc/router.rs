use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::exchange::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::settings::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use serde_json::json;

    fn req(id: &str, method: &str, params: serde_json::Value) -> Request {
        Request {
            id: id.to_string(),
            method: method.to_string(),
            params,
        }
    }

    #[test]
    fn failed_write_keeps_change_in_memory_and_says_so() {
        // No kv table, so every slot write fails.
        let mut state = AppState {
            db: Some(Connection::open_in_memory().expect("open in-memory db")),
            ..Default::default()
        };
        let resp = handle_request(
            &mut state,
            req(
                "1",
                "students.create",
                json!({ "name": "Bob", "roll": "R1", "subjects": [{ "name": "Math", "marks": 50 }] }),
            ),
        );
        assert_eq!(resp["ok"], json!(false));
        assert_eq!(resp["error"]["code"], json!("db_update_failed"));
        let message = resp["error"]["message"].as_str().unwrap_or("");
        assert!(message.starts_with("saved in memory only"), "{message}");
        assert_eq!(state.store.len(), 1);

        let resp = handle_request(
            &mut state,
            req("2", "exchange.importJson", json!({ "text": "[]" })),
        );
        assert_eq!(resp["error"]["code"], json!("db_update_failed"));
    }
}
