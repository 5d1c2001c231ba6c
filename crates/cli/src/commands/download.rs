use std::path::{Path, PathBuf};

use serde::Serialize;
use smartquote_client::download_url;
use smartquote_core::config::LoadOptions;

use crate::commands::{connect, load_config, runtime, CommandResult, EXIT_BACKEND};

const COMMAND: &str = "download";

#[derive(Debug, Serialize)]
struct DownloadReport {
    download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
}

pub struct DownloadArgs<'a> {
    pub url: &'a str,
    pub out_dir: &'a Path,
    pub filename: Option<&'a str>,
    pub print_only: bool,
}

pub fn run(options: &LoadOptions, args: &DownloadArgs<'_>) -> CommandResult {
    if args.url.trim().is_empty() {
        return CommandResult::input_failure(COMMAND, "document url must not be empty");
    }

    let target = download_url(args.url.trim());
    if args.print_only {
        return CommandResult::success_with_data(
            COMMAND,
            "download url resolved",
            &DownloadReport { download_url: target, path: None },
        );
    }

    execute(options, args, target).unwrap_or_else(|failure| failure)
}

fn execute(
    options: &LoadOptions,
    args: &DownloadArgs<'_>,
    target: String,
) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, options)?;
    let backend = connect(COMMAND, &config)?;
    let runtime = runtime(COMMAND)?;

    let path = runtime
        .block_on(backend.save_document(args.url.trim(), args.out_dir, args.filename))
        .map_err(|error| {
            CommandResult::failure(COMMAND, error.error_class(), error.to_string(), EXIT_BACKEND)
        })?;

    Ok(CommandResult::success_with_data(
        COMMAND,
        format!("saved {}", path.display()),
        &DownloadReport { download_url: target, path: Some(path) },
    ))
}
