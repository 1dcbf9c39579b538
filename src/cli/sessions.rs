// src/cli/sessions.rs — Offline session commands: list, history, delete
//
// These run without a server, so every session is durable-only here.

use crate::core::types::{SessionHistory, SessionSummary};
use crate::infra::config::Config;

pub async fn run_list(config: &Config) -> anyhow::Result<()> {
    let coordinator = super::build_offline_coordinator(config)?;
    let sessions = coordinator.list().await?;
    print!("{}", format_sessions(&sessions));
    Ok(())
}

pub async fn run_history(config: &Config, id: i64) -> anyhow::Result<()> {
    let coordinator = super::build_offline_coordinator(config)?;
    let history = coordinator.inspect(id).await?;
    print!("{}", format_history(&history));
    Ok(())
}

pub async fn run_delete(config: &Config, id: i64) -> anyhow::Result<()> {
    let coordinator = super::build_offline_coordinator(config)?;
    coordinator.destroy(id).await?;
    println!("Deleted session {id}");
    Ok(())
}

fn format_sessions(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "No sessions.\n".to_string();
    }
    let mut out = format!("{:>6}  {:<27}  {:>5}  {}\n", "ID", "CREATED", "MSGS", "REPOSITORY");
    for s in sessions {
        out.push_str(&format!(
            "{:>6}  {:<27}  {:>5}  {}\n",
            s.session_id, s.created_at, s.message_count, s.repo_url
        ));
    }
    out
}

fn format_history(history: &SessionHistory) -> String {
    let mut out = format!(
        "Session {} ({}), created {}\n",
        history.session_id, history.repo_url, history.created_at
    );
    if history.messages.is_empty() {
        out.push_str("  (no messages)\n");
        return out;
    }
    for m in &history.messages {
        out.push_str(&format!("\n[{}] {}:\n{}\n", m.created_at, m.role, m.text));
    }
    out
}
