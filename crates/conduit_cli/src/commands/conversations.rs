//! `conduit conversations` subcommands.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color};
use conduit_core::{ConversationId, ConversationStore, Message, Role, Transform};

use super::{open_store, workspace_root};
use crate::cli::ConversationsAction;
use crate::output;

const PREVIEW_CHARS: usize = 80;

pub async fn handle(action: ConversationsAction) -> Result<()> {
    match action {
        ConversationsAction::List { workdir } => list(workspace_root(workdir)?).await,
        ConversationsAction::Show { id, workdir } => show(workspace_root(workdir)?, &id).await,
    }
}

async fn list(root: std::path::PathBuf) -> Result<()> {
    let store = open_store(&root)?;
    let ids = store.conversation_ids()?;
    if ids.is_empty() {
        output::dim("No stored conversations");
        return Ok(());
    }

    output::header("Conversations");
    let mut listing = output::table(&["Conversation", "Messages", "First prompt"]);
    let mut rows = Vec::with_capacity(ids.len());
    for id in &ids {
        let messages = store.read(id).await?;
        let first = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| preview(&m.content))
            .unwrap_or_default();
        listing.add_row(vec![
            Cell::new(id).fg(Color::Green),
            Cell::new(messages.len()),
            Cell::new(&first),
        ]);
        rows.push(serde_json::json!({
            "id": id.as_str(),
            "messages": messages.len(),
            "first_prompt": first,
        }));
    }
    output::table_print(&listing, &rows);
    Ok(())
}

async fn show(root: std::path::PathBuf, id: &str) -> Result<()> {
    let store = open_store(&root)?;
    let messages = store.read(&ConversationId::from(id)).await?;
    if messages.is_empty() {
        bail!("no conversation with id {id}");
    }

    if output::is_json() {
        output::data(id, &messages);
        return Ok(());
    }

    output::header(&format!("Conversation {id}"));
    let mut listing = output::table(&["#", "Role", "Content", "Tokens"]);
    for message in &messages {
        listing.add_row(vec![
            Cell::new(message.seq),
            Cell::new(role_label(message)).fg(role_color(message.role)),
            Cell::new(preview(&describe(message))),
            Cell::new(message.token_count),
        ]);
    }
    println!("{listing}");
    Ok(())
}

fn role_label(message: &Message) -> String {
    match (&message.role, &message.tool_name) {
        (Role::Tool, Some(name)) if message.is_error => format!("tool:{name} (error)"),
        (Role::Tool, Some(name)) => format!("tool:{name}"),
        (Role::Assistant, _) => match &message.provider {
            Some(provider) => format!("assistant@{provider}"),
            None => "assistant".to_string(),
        },
        (role, _) => role.as_str().to_string(),
    }
}

fn role_color(role: Role) -> Color {
    match role {
        Role::User => Color::Cyan,
        Role::Assistant => Color::Green,
        Role::Tool => Color::Yellow,
        Role::System => Color::Magenta,
    }
}

/// Content plus a note for tool calls and markers.
fn describe(message: &Message) -> String {
    let mut text = message.content.clone();
    if !message.tool_calls.is_empty() {
        let names: Vec<&str> = message.tool_calls.iter().map(|c| c.name.as_str()).collect();
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&format!("[calls: {}]", names.join(", ")));
    }
    match &message.transform {
        Some(Transform::Compressed { .. }) => text.insert_str(0, "[compressed] "),
        Some(Transform::Pruned { .. }) => text.insert_str(0, "[pruned] "),
        None => {}
    }
    text
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::ToolCall;

    #[test]
    fn test_preview_keeps_first_line() {
        assert_eq!(preview("first\nsecond"), "first");
        let long = "x".repeat(100);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 1);
    }

    #[test]
    fn test_describe_notes_calls_and_markers() {
        let message = Message::assistant("")
            .with_tool_calls(vec![ToolCall::new("c1", "read", "{}")]);
        assert_eq!(describe(&message), "[calls: read]");

        let mut summarized = Message::assistant("a long explanation of the plan");
        summarized.mark_compressed("plan");
        assert_eq!(describe(&summarized), "[compressed] plan");
    }

    #[test]
    fn test_role_label() {
        let tool = Message::tool_result("c1", "read", "boom", true);
        assert_eq!(role_label(&tool), "tool:read (error)");
        let answer = Message::assistant("hi").with_provider("deepseek");
        assert_eq!(role_label(&answer), "assistant@deepseek");
        assert_eq!(role_label(&Message::user("q")), "user");
    }
}
