//! Line-oriented JSON front door for the console backend.
//!
//! Each stdin line is `{"command": "...", "arg0": ..., "arg1": ...}`; each
//! reply is one stdout line, `{"ok": true, "data": ...}` or
//! `{"ok": false, "error": "..."}`.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use menta_verde_lib::{init_tracing, invoke, AppConfig, AppState};

#[derive(Debug, Deserialize)]
struct Request {
    command: String,
    #[serde(default)]
    arg0: Option<Value>,
    #[serde(default)]
    arg1: Option<Value>,
}

async fn handle_line(state: &AppState, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "malformed request line");
            return json!({ "ok": false, "error": format!("Invalid request: {e}") });
        }
    };
    match invoke(state, &request.command, request.arg0, request.arg1).await {
        Ok(data) => json!({ "ok": true, "data": data }),
        Err(e) => json!({ "ok": false, "error": e }),
    }
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("menta-verde-admin: {e}");
            std::process::exit(1);
        }
    };
    let _guard = init_tracing(&config);

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to initialise state");
            std::process::exit(1);
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&state, &line).await;
        let mut out = reply.to_string();
        out.push('\n');
        if let Err(e) = stdout.write_all(out.as_bytes()).await {
            error!(error = %e, "stdout write failed");
            break;
        }
        if let Err(e) = stdout.flush().await {
            error!(error = %e, "stdout flush failed");
            break;
        }
    }
    info!("stdin closed, shutting down");
}
