//! Subcommand handlers.
//!
//! Each handler takes an open store and writes its result to `out`, so the
//! binary can hand it stdout and tests can hand it a buffer.

use anyhow::Result;
use std::io::Write;
use tracker_core::{Conversation, ConversationStore, QueryOptions};

/// Longest prompt/reply excerpt printed in the plain-text listing.
const EXCERPT_CHARS: usize = 80;

pub fn create(
    store: &ConversationStore,
    project: &str,
    session_id: &str,
    prompt: &str,
    out: &mut impl Write,
) -> Result<()> {
    let id = store.create_conversation(project, session_id, prompt)?;
    tracing::info!(target: "tracker::cli", "Recorded conversation {}", id);
    writeln!(out, "{}", id)?;
    Ok(())
}

pub fn update(
    store: &ConversationStore,
    project: &str,
    reply: &str,
    transcript: &str,
    out: &mut impl Write,
) -> Result<()> {
    let changed = store.update_conversation(project, reply, transcript)?;
    if changed == 0 {
        tracing::info!(target: "tracker::cli", "No conversation recorded for {}", project.trim());
    }
    writeln!(out, "{}", changed)?;
    Ok(())
}

pub fn query(
    store: &ConversationStore,
    opts: &QueryOptions,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let conversations = store.query_conversations(opts)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &conversations)?;
        writeln!(out)?;
        return Ok(());
    }

    for conversation in &conversations {
        writeln!(out, "{}", summary_line(conversation))?;
    }
    Ok(())
}

pub fn latest_session(
    store: &ConversationStore,
    project: &str,
    out: &mut impl Write,
) -> Result<()> {
    let session_id = store.get_latest_session_id(project)?;
    writeln!(out, "{}", session_id)?;
    Ok(())
}

/// Print one conversation as JSON. Returns false when the id is unknown.
pub fn show(store: &ConversationStore, id: i64, out: &mut impl Write) -> Result<bool> {
    let Some(conversation) = store.get_conversation(id)? else {
        return Ok(false);
    };
    serde_json::to_writer_pretty(&mut *out, &conversation)?;
    writeln!(out)?;
    Ok(true)
}

fn summary_line(conversation: &Conversation) -> String {
    let prompt = conversation.user_prompt.as_deref().unwrap_or("");
    let reply = conversation.assistant_reply.as_deref().unwrap_or("");
    format!(
        "{}\t{}\t{}\t{}\t{}",
        conversation.id,
        conversation.started_at.format("%Y-%m-%d %H:%M:%S"),
        conversation.status,
        excerpt(prompt),
        excerpt(reply)
    )
}

fn excerpt(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= EXCERPT_CHARS {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(EXCERPT_CHARS - 1).collect();
    cut.push('…');
    cut
}
