use std::process::ExitCode;

use clap::Parser;
use smartquote_cli::{execute, Cli};
use smartquote_core::config::{AppConfig, LogFormat};

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // A broken config is reported by the command itself; logging just stays off.
    if let Ok(config) = AppConfig::load(cli.load_options()) {
        init_logging(&config);
    }

    let result = execute(cli);
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
