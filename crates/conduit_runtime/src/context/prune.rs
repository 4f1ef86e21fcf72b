//! Relevance pruning of tool output against the files the user asked about.

use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use conduit_core::{Conversation, Role};

/// Extensions recognized as source or config files.
const FILE_EXTENSIONS: &[&str] = &[
    "rs", "toml", "ts", "tsx", "js", "jsx", "mjs", "py", "go", "java", "kt", "swift", "c", "h",
    "cc", "cpp", "hpp", "cs", "rb", "php", "sh", "sql", "json", "yaml", "yml", "md", "html",
    "css", "scss", "vue", "svelte", "zig", "ex", "exs", "lock", "proto", "txt",
];

static FILE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    // Longest extensions first so "tsx" wins over "ts".
    let mut exts = FILE_EXTENSIONS.to_vec();
    exts.sort_by_key(|e| std::cmp::Reverse(e.len()));
    Regex::new(&format!(
        r"(?:[\w.\-]+/)*[\w\-][\w.\-]*\.(?:{})\b",
        exts.join("|")
    ))
    .unwrap()
});

/// File-path-like tokens in `text`, deduplicated in order of appearance.
pub fn extract_file_tokens(text: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for m in FILE_TOKEN.find_iter(text) {
        let token = m.as_str().trim_start_matches("./");
        if !files.iter().any(|f| f == token) {
            files.push(token.to_string());
        }
    }
    files
}

fn references_any(content: &str, files: &[String]) -> bool {
    files.iter().any(|path| {
        let name = path.rsplit('/').next().unwrap_or(path);
        content.contains(path.as_str()) || content.contains(name)
    })
}

/// What one prune pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneReport {
    pub pruned: usize,
    pub files: Vec<String>,
    pub tokens_before: u64,
    pub tokens_after: u64,
}

/// Replace tool output that mentions none of the files in `query` with a
/// placeholder.
///
/// No-op when the query names no files. Messages already carrying a marker
/// are skipped.
pub fn prune(conversation: &mut Conversation, query: &str) -> PruneReport {
    let files = extract_file_tokens(query);
    let tokens_before = conversation.estimated_tokens();
    let mut report = PruneReport {
        tokens_before,
        tokens_after: tokens_before,
        ..Default::default()
    };
    if files.is_empty() {
        return report;
    }

    let file_list = files.join(", ");
    for message in &mut conversation.messages {
        if message.role != Role::Tool
            || message.is_transformed()
            || references_any(&message.content, &files)
        {
            continue;
        }
        let placeholder = format!(
            "[output of `{}` omitted: does not reference {}]",
            message.tool_name.as_deref().unwrap_or("tool"),
            file_list
        );
        if message.mark_pruned(placeholder, files.clone()) {
            report.pruned += 1;
        }
    }

    report.tokens_after = conversation.estimated_tokens();
    if report.pruned > 0 {
        info!(
            conversation.id = %conversation.id,
            pruned = report.pruned,
            files = %file_list,
            tokens_before = report.tokens_before,
            tokens_after = report.tokens_after,
            "irrelevant tool output pruned"
        );
    }
    report.files = files;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{Message, ToolCall, Transform};

    fn conversation() -> Conversation {
        let mut conv = Conversation::new();
        conv.push(Message::user("why does src/parser/lexer.rs panic?"));
        conv.push(Message::assistant("").with_tool_calls(vec![
            ToolCall::new("a", "read", r#"{"path":"src/parser/lexer.rs"}"#),
            ToolCall::new("b", "grep", r#"{"pattern":"TODO"}"#),
            ToolCall::new("c", "bash", r#"{"command":"ls"}"#),
        ]));
        conv.push(Message::tool_result("a", "read", "// src/parser/lexer.rs\nfn next()", false));
        conv.push(Message::tool_result("b", "grep", "lexer.rs:10: TODO handle eof", false));
        conv.push(Message::tool_result("c", "bash", "Cargo.toml\nREADME.md\ntarget", false));
        conv
    }

    #[test]
    fn test_extract_file_tokens() {
        assert_eq!(
            extract_file_tokens("compare ./src/main.rs with Cargo.toml and src/main.rs"),
            vec!["src/main.rs", "Cargo.toml"]
        );
        assert_eq!(extract_file_tokens("open web/app.tsx"), vec!["web/app.tsx"]);
        assert!(extract_file_tokens("explain the algorithm").is_empty());
        assert!(extract_file_tokens("call self.parse() then return").is_empty());
    }

    #[test]
    fn test_prune_without_files_is_noop() {
        let mut conv = conversation();
        let before = conv.clone();
        let report = prune(&mut conv, "explain the algorithm");
        assert_eq!(conv, before);
        assert_eq!(report.pruned, 0);
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_prune_keeps_referencing_output() {
        let mut conv = conversation();
        let report = prune(&mut conv, "why does src/parser/lexer.rs panic?");

        assert_eq!(report.pruned, 1);
        assert_eq!(report.files, vec!["src/parser/lexer.rs"]);
        // full path and bare file name both count as a reference
        assert!(!conv.messages[2].is_transformed());
        assert!(!conv.messages[3].is_transformed());

        let pruned = &conv.messages[4];
        assert!(pruned.content.contains("`bash`"));
        assert!(pruned.content.contains("src/parser/lexer.rs"));
        assert_eq!(
            pruned.transform,
            Some(Transform::Pruned {
                files: vec!["src/parser/lexer.rs".to_string()]
            })
        );
        assert!(conv.validate_tool_pairing().is_ok());
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut once = conversation();
        prune(&mut once, "look at src/parser/lexer.rs");
        let mut twice = once.clone();
        let report = prune(&mut twice, "look at src/parser/lexer.rs");
        assert_eq!(report.pruned, 0);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_prune_skips_compressed_messages() {
        let mut conv = conversation();
        conv.messages[4].mark_compressed("listing");
        let report = prune(&mut conv, "src/parser/lexer.rs");
        assert_eq!(report.pruned, 0);
        assert_eq!(conv.messages[4].content, "listing");
    }
}
