//! `conduit providers` subcommands.

use anyhow::{Context, Result, anyhow};
use comfy_table::{Cell, Color};
use conduit_core::Message;
use conduit_llms::{Normalizer, ProviderProfile, ProviderTable, SamplingParams};
use serde::Serialize;

use crate::cli::ProvidersAction;
use crate::output;

#[derive(Serialize)]
struct ProviderRow<'a> {
    id: &'a str,
    wire_format: &'a str,
    default_model: &'a str,
    configured: bool,
    metadata: Vec<&'a str>,
}

impl<'a> From<&'a ProviderProfile> for ProviderRow<'a> {
    fn from(profile: &'a ProviderProfile) -> Self {
        Self {
            id: &profile.id,
            wire_format: profile.wire_format.as_str(),
            default_model: &profile.default_model,
            configured: profile.has_credentials(),
            metadata: profile.metadata_wire_names(),
        }
    }
}

pub async fn handle(action: ProvidersAction, table: ProviderTable) -> Result<()> {
    match action {
        ProvidersAction::List => list(&table),
        ProvidersAction::Info { provider } => info(&table, &provider),
        ProvidersAction::Test { provider, model } => test(table, &provider, model).await,
    }
}

fn list(table: &ProviderTable) -> Result<()> {
    output::header("Provider Profiles");

    let rows: Vec<ProviderRow> = table.iter().map(ProviderRow::from).collect();
    let mut listing = output::table(&["Provider", "Format", "Default model", "Status", "Metadata"]);
    for row in &rows {
        let status = if row.configured {
            Cell::new("configured").fg(Color::Green)
        } else {
            Cell::new("missing API key").fg(Color::Yellow)
        };
        let metadata = if row.metadata.is_empty() {
            "-".to_string()
        } else {
            row.metadata.join(", ")
        };
        listing.add_row(vec![
            Cell::new(row.id).fg(Color::Green),
            Cell::new(row.wire_format),
            Cell::new(row.default_model),
            status,
            Cell::new(metadata),
        ]);
    }
    output::table_print(&listing, &rows);
    Ok(())
}

fn info(table: &ProviderTable, provider_id: &str) -> Result<()> {
    let profile = table.profile(provider_id)?;

    output::header(&format!("Provider: {}", profile.id));
    output::kv("format", profile.wire_format.as_str());
    output::kv("endpoint", &profile.endpoint);
    output::kv("default model", &profile.default_model);
    output::kv(
        "credentials",
        if profile.has_credentials() {
            "configured"
        } else {
            "missing"
        },
    );
    if profile.metadata_required_on_tool_call {
        output::kv("tool calls", "metadata must be replayed");
    }

    if !profile.metadata.is_empty() {
        output::header("Metadata fields");
        let mut fields = output::table(&["Wire name", "Key", "Scope"]);
        for field in &profile.metadata {
            fields.add_row(vec![
                Cell::new(&field.wire_name).fg(Color::Green),
                Cell::new(&field.key),
                Cell::new(format!("{:?}", field.scope).to_lowercase()),
            ]);
        }
        output::table_print(&fields, &profile.metadata);
    }

    if !profile.prices.is_empty() {
        output::header("Prices (USD per million tokens)");
        let mut prices = output::table(&["Model", "Input", "Output", "Cache read"]);
        for (model, price) in &profile.prices {
            prices.add_row(vec![
                Cell::new(model).fg(Color::Green),
                Cell::new(format!("{:.2}", price.input_per_mtok)),
                Cell::new(format!("{:.2}", price.output_per_mtok)),
                Cell::new(
                    price
                        .cache_read_per_mtok
                        .map_or_else(|| "-".to_string(), |p| format!("{p:.2}")),
                ),
            ]);
        }
        let rows: Vec<_> = profile.prices.iter().collect();
        output::table_print(&prices, &rows);
    }
    Ok(())
}

async fn test(table: ProviderTable, provider_id: &str, model: Option<String>) -> Result<()> {
    table.profile(provider_id)?;
    let normalizer = Normalizer::new(table);
    let mut sampling = SamplingParams::new().with_max_tokens(16);
    if let Some(model) = model {
        sampling = sampling.with_model(model);
    }

    let spinner = output::spinner(&format!("Calling {provider_id}..."));
    let messages = [Message::user("Reply with the single word: pong")];
    let response = match normalizer.call(provider_id, &messages, &[], &sampling).await {
        Ok(response) => response,
        Err(e) => {
            output::spinner_error(&spinner, &format!("{provider_id} call failed"));
            return Err(anyhow!(e)).context(format!("testing {provider_id}"));
        }
    };

    output::spinner_success(
        &spinner,
        &format!(
            "{} answered in {}ms",
            response.model,
            response.latency.as_millis()
        ),
    );
    output::kv("reply", response.content.trim());
    output::kv(
        "tokens",
        &format!(
            "{} in / {} out",
            response.usage.input_tokens, response.usage.output_tokens
        ),
    );
    output::kv("cost", &format!("${:.6}", response.cost_usd));
    Ok(())
}
