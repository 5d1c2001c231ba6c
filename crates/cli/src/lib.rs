pub mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use smartquote_core::config::{ConfigOverrides, LoadOptions};

use crate::commands::download::DownloadArgs;
use crate::commands::quote::{parse_assignment, QuoteArgs};
use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "smartquote",
    about = "SmartQuote operator CLI",
    long_about = "Build quotations from free-text requests, search the catalog, and manage generated documents.",
    after_help = "Examples:\n  smartquote search \"usb hub\"\n  smartquote quote --prompt \"3 laptops for Acme\" --tax 7.5\n  smartquote quote --add CAM-01 --qty CAM-01=2 --finalize --save-to .\n  smartquote history\n  smartquote doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a smartquote.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the backend base URL")]
    backend_url: Option<String>,
    #[arg(long, global = true, help = "Override the log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, value_name = "PERCENT", help = "Default discount rate for new quotations")]
    default_discount: Option<Decimal>,
    #[arg(long, global = true, value_name = "PERCENT", help = "Default tax rate for new quotations")]
    default_tax: Option<Decimal>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Search the product catalog by name, SKU or brand")]
    Search { query: String },
    #[command(about = "Draft a quotation from a prompt and catalog picks, optionally finalizing it")]
    Quote(QuoteCommand),
    #[command(about = "List generated quotation documents, or delete one")]
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    #[command(about = "Download a generated quotation document")]
    Download {
        url: String,
        #[arg(long, default_value = ".", help = "Directory to write the document into")]
        out_dir: PathBuf,
        #[arg(long, help = "File name to save as (defaults to the URL's last segment)")]
        filename: Option<String>,
        #[arg(long, help = "Only print the download URL")]
        print_url: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryAction {
    #[command(about = "List generated quotation documents")]
    List,
    #[command(about = "Delete a generated document; an already missing file is not an error")]
    Delete { filename: String },
}

#[derive(Debug, Args)]
struct QuoteCommand {
    #[arg(long, help = "Free-text description of what the customer needs")]
    prompt: Option<String>,
    #[arg(long = "add", value_name = "SKU", help = "Add a catalog product (repeatable)")]
    add: Vec<String>,
    #[arg(long = "qty", value_name = "SKU=N", value_parser = parse_assignment::<i64>)]
    quantities: Vec<(String, i64)>,
    #[arg(long = "price", value_name = "SKU=AMOUNT", value_parser = parse_assignment::<Decimal>)]
    prices: Vec<(String, Decimal)>,
    #[arg(long, value_name = "SKU", help = "Remove a line item (repeatable)")]
    remove: Vec<String>,
    #[arg(long, help = "Customer name printed on the quotation")]
    customer: Option<String>,
    #[arg(long = "discount", value_name = "PERCENT")]
    discount_rate: Option<Decimal>,
    #[arg(long = "tax", value_name = "PERCENT")]
    tax_rate: Option<Decimal>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    invoice_date: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    valid_until: Option<NaiveDate>,
    #[arg(long, help = "Send the quotation to the finalize service")]
    finalize: bool,
    #[arg(long, value_name = "DIR", requires = "finalize", help = "Save the finalized document here")]
    save_to: Option<PathBuf>,
}

impl From<QuoteCommand> for QuoteArgs {
    fn from(command: QuoteCommand) -> Self {
        Self {
            prompt: command.prompt,
            add: command.add,
            quantities: command.quantities,
            prices: command.prices,
            remove: command.remove,
            customer: command.customer,
            discount_rate: command.discount_rate,
            tax_rate: command.tax_rate,
            invoice_date: command.invoice_date,
            valid_until: command.valid_until,
            finalize: command.finalize,
            save_to: command.save_to,
        }
    }
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.global.config.is_some(),
            config_path: self.global.config.clone(),
            overrides: ConfigOverrides {
                backend_url: self.global.backend_url.clone(),
                log_level: self.global.log_level.clone(),
                discount_rate: self.global.default_discount,
                tax_rate: self.global.default_tax,
            },
        }
    }
}

pub fn execute(cli: Cli) -> CommandResult {
    let options = cli.load_options();
    let command_name = command_name(&cli.command);
    tracing::info!(
        event_name = "cli.command.started",
        correlation_id = "cli",
        command = command_name,
        "command started"
    );

    let result = match cli.command {
        Command::Search { query } => commands::search::run(&options, &query),
        Command::Quote(quote) => commands::quote::run(&options, &QuoteArgs::from(quote)),
        Command::History { action: None | Some(HistoryAction::List) } => {
            commands::history::list(&options)
        }
        Command::History { action: Some(HistoryAction::Delete { filename }) } => {
            commands::history::delete(&options, &filename)
        }
        Command::Download { url, out_dir, filename, print_url } => commands::download::run(
            &options,
            &DownloadArgs {
                url: &url,
                out_dir: &out_dir,
                filename: filename.as_deref(),
                print_only: print_url,
            },
        ),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    tracing::info!(
        event_name = "cli.command.finished",
        correlation_id = "cli",
        command = command_name,
        exit_code = result.exit_code,
        "command finished"
    );
    result
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Search { .. } => "search",
        Command::Quote(_) => "quote",
        Command::History { action: Some(HistoryAction::Delete { .. }) } => "history-delete",
        Command::History { .. } => "history",
        Command::Download { .. } => "download",
        Command::Config => "config",
        Command::Doctor { .. } => "doctor",
    }
}
