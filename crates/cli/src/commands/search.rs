use smartquote_core::builder::CatalogMatcher;
use smartquote_core::config::LoadOptions;
use smartquote_core::domain::catalog::CatalogEntry;
use smartquote_core::ports::CatalogSource;
use tracing::info;

use crate::commands::{connect, load_config, runtime, CommandResult};

const COMMAND: &str = "search";

pub fn run(options: &LoadOptions, query: &str) -> CommandResult {
    execute(options, query).unwrap_or_else(|failure| failure)
}

fn execute(options: &LoadOptions, query: &str) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, options)?;
    let backend = connect(COMMAND, &config)?;
    let runtime = runtime(COMMAND)?;

    let entries = runtime
        .block_on(backend.fetch_catalog())
        .map_err(|error| CommandResult::service_failure(COMMAND, &error))?;
    let matcher = CatalogMatcher::new(entries);
    let hits: Vec<&CatalogEntry> = matcher.search(query);

    info!(
        event_name = "cli.search.completed",
        correlation_id = "cli",
        catalog_entries = matcher.len(),
        hits = hits.len(),
        "catalog search completed"
    );

    Ok(CommandResult::success_with_data(
        COMMAND,
        format!("{} of {} catalog entries matched", hits.len(), matcher.len()),
        &hits,
    ))
}
