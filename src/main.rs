mod calc;
mod db;
mod error;
mod exchange;
mod form;
mod ipc;
mod projection;
mod reconcile;
mod record;
mod settings;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Student results sidecar: newline-delimited JSON requests on stdin,
/// one JSON response per line on stdout.
#[derive(Parser, Debug)]
#[command(name = "resultsd", version)]
struct Args {
    /// Workspace directory to open at startup
    #[arg(long, env = "RESULTSD_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "resultsd=debug")
    #[arg(long, env = "RESULTSD_LOG", default_value = "resultsd=info")]
    log: String,
}

fn init_tracing(default_filter: &str) {
    // stdout carries responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(&args.log);

    let mut state = ipc::AppState::default();
    if let Some(path) = args.workspace.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            error!(workspace = %path.display(), error = %format!("{e:#}"), "failed to open workspace");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "resultsd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!(error = %e, "unparsable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let method = req.method.clone();
        let resp = ipc::handle_request(&mut state, req);
        if resp.get("ok").and_then(|v| v.as_bool()) == Some(false) {
            let error = &resp["error"];
            warn!(%method, %error, "request failed");
        }
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
