use anyhow::anyhow;

use crate::ipc::types::{AppState, Request};
use crate::projection::{SortMode, ViewRequest, DEFAULT_PAGE_SIZE};

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

pub fn param_trimmed(req: &Request, key: &str) -> Option<String> {
    param_str(req, key)
        .map(|s| s.trim().to_string())
        .and_then(|s| if s.is_empty() { None } else { Some(s) })
}

fn param_usize(req: &Request, key: &str) -> Option<usize> {
    let v = req.params.get(key)?;
    v.as_u64()
        .map(|n| n as usize)
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<usize>().ok()))
}

pub fn view_request(req: &Request) -> ViewRequest {
    ViewRequest {
        query: param_str(req, "query").unwrap_or("").to_string(),
        sort: param_str(req, "sort")
            .map(SortMode::parse)
            .unwrap_or_default(),
        page: param_usize(req, "page").unwrap_or(1),
        page_size: param_usize(req, "pageSize").unwrap_or(DEFAULT_PAGE_SIZE),
    }
}

/// Writes the in-memory store to the workspace slot.
pub fn persist(state: &mut AppState) -> anyhow::Result<()> {
    let Some(conn) = state.db.as_mut() else {
        return Err(anyhow!("no workspace selected"));
    };
    state.store.persist(conn)
}
