//! Terminal output: styled text for humans, one JSON object per line for scripts.
//!
//! - `console` for colors (respects NO_COLOR, auto-disables when piped)
//! - `comfy-table` for listings
//! - `indicatif` for the run spinner

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cli::OutputFormat;

// ── Global format flag ─────────────────────────────────────────────

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(format: OutputFormat) {
    JSON_MODE.store(matches!(format, OutputFormat::Json), Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

// ── JSON envelope ──────────────────────────────────────────────────

#[derive(Serialize)]
struct Line<'a> {
    level: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a JsonValue>,
}

fn line_json(level: &str, message: &str, data: Option<&JsonValue>) -> String {
    serde_json::to_string(&Line {
        level,
        message,
        data,
    })
    .unwrap_or_else(|_| format!("{{\"level\":\"{level}\"}}"))
}

fn emit_json(level: &str, message: &str, data: Option<&JsonValue>) {
    println!("{}", line_json(level, message, data));
}

// ── Messages ───────────────────────────────────────────────────────

pub fn header(text: &str) {
    if is_json() {
        emit_json("info", text, None);
    } else {
        println!("{}", style(text).bold().cyan());
    }
}

pub fn success(text: &str) {
    if is_json() {
        emit_json("success", text, None);
    } else {
        println!("{} {}", style("✓").green(), style(text).bright());
    }
}

pub fn error(text: &str) {
    if is_json() {
        eprintln!("{}", line_json("error", text, None));
    } else {
        eprintln!("{} {}", style("✗").red(), style(text).bright());
    }
}

pub fn warning(text: &str) {
    if is_json() {
        emit_json("warning", text, None);
    } else {
        println!("{} {}", style("!").yellow(), style(text).bright());
    }
}

pub fn dim(text: &str) {
    if is_json() {
        emit_json("info", text, None);
    } else {
        println!("{}", style(text).dim());
    }
}

/// Key-value pair with a styled key.
pub fn kv(key: &str, value: &str) {
    if is_json() {
        let data = serde_json::json!({ key: value });
        emit_json("info", key, Some(&data));
    } else {
        println!("  {} {}", style(key).cyan().bold(), value);
    }
}

/// Body text printed as-is, e.g. a model answer or tool output.
pub fn body(text: &str) {
    if is_json() {
        let data = JsonValue::String(text.to_string());
        emit_json("data", "", Some(&data));
    } else {
        println!("{text}");
    }
}

/// Arbitrary serializable value: pretty JSON for humans, envelope for scripts.
pub fn data<T: Serialize>(label: &str, value: &T) {
    let value = serde_json::to_value(value).unwrap_or(JsonValue::Null);
    if is_json() {
        emit_json("data", label, Some(&value));
    } else {
        let formatted = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        println!("{formatted}");
    }
}

// ── Tables ─────────────────────────────────────────────────────────

pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(Attribute::Bold)),
        );
    table
}

/// Print `table`, or `rows` as a JSON list in JSON mode.
pub fn table_print<T: Serialize>(table: &Table, rows: &[T]) {
    if is_json() {
        let data = serde_json::json!({ "items": rows });
        emit_json("list", "", Some(&data));
    } else {
        println!("{table}");
    }
}

// ── Spinners ───────────────────────────────────────────────────────

/// Spinner on stderr; hidden in JSON mode.
pub fn spinner(message: &str) -> ProgressBar {
    if is_json() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn spinner_success(spinner: &ProgressBar, message: &str) {
    spinner.finish_and_clear();
    success(message);
}

pub fn spinner_error(spinner: &ProgressBar, message: &str) {
    spinner.finish_and_clear();
    error(message);
}
