mod calc;
mod config;
mod db;
mod error;
mod exchange;
mod hierarchy;
mod ipc;
mod ledger;
mod model;
mod navigator;
mod schedule;
mod scheme;
mod store;
mod telemetry;

use anyhow::Context;
use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let settings = config::Settings::from_env().context("reading settings")?;
    telemetry::init_tracing(&settings)?;

    let mut state = ipc::AppState::default();
    if let Some(path) = settings.workspace.clone() {
        state
            .open_workspace(path.clone())
            .with_context(|| format!("opening workspace {}", path.display()))?;
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradebookd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                // No id to echo back.
                tracing::debug!(error = %e, "unparseable request");
                ipc::err("", "bad_json", e.to_string(), None)
            }
        };

        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
