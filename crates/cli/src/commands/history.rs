use serde::Serialize;
use smartquote_core::config::LoadOptions;
use smartquote_core::ports::{DeleteOutcome, HistoryService};
use tracing::info;

use crate::commands::{connect, load_config, runtime, CommandResult};

const LIST_COMMAND: &str = "history";
const DELETE_COMMAND: &str = "history-delete";

#[derive(Debug, Serialize)]
struct DeleteReport<'a> {
    filename: &'a str,
    outcome: DeleteOutcome,
}

pub fn list(options: &LoadOptions) -> CommandResult {
    execute_list(options).unwrap_or_else(|failure| failure)
}

/// A document that is already gone counts as deleted.
pub fn delete(options: &LoadOptions, filename: &str) -> CommandResult {
    if filename.trim().is_empty() {
        return CommandResult::input_failure(DELETE_COMMAND, "filename must not be empty");
    }
    execute_delete(options, filename).unwrap_or_else(|failure| failure)
}

fn execute_list(options: &LoadOptions) -> Result<CommandResult, CommandResult> {
    let config = load_config(LIST_COMMAND, options)?;
    let backend = connect(LIST_COMMAND, &config)?;
    let runtime = runtime(LIST_COMMAND)?;
    let entries = runtime
        .block_on(backend.list_history())
        .map_err(|error| CommandResult::service_failure(LIST_COMMAND, &error))?;

    Ok(CommandResult::success_with_data(
        LIST_COMMAND,
        format!("{} generated quotation(s)", entries.len()),
        &entries,
    ))
}

fn execute_delete(options: &LoadOptions, filename: &str) -> Result<CommandResult, CommandResult> {
    let config = load_config(DELETE_COMMAND, options)?;
    let backend = connect(DELETE_COMMAND, &config)?;
    let runtime = runtime(DELETE_COMMAND)?;
    let outcome = runtime
        .block_on(backend.delete_history(filename))
        .map_err(|error| CommandResult::service_failure(DELETE_COMMAND, &error))?;

    info!(
        event_name = "cli.history.delete_completed",
        correlation_id = "cli",
        filename,
        outcome = ?outcome,
        "history delete completed"
    );

    let message = match outcome {
        DeleteOutcome::Deleted => format!("deleted `{filename}`"),
        DeleteOutcome::AlreadyAbsent => format!("`{filename}` was already absent"),
    };
    Ok(CommandResult::success_with_data(DELETE_COMMAND, message, &DeleteReport { filename, outcome }))
}
