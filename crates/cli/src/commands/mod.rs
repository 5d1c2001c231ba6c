pub mod config;
pub mod doctor;
pub mod download;
pub mod history;
pub mod quote;
pub mod search;

use serde::Serialize;
use serde_json::Value;
use smartquote_client::{ClientError, HttpBackend};
use smartquote_core::config::{AppConfig, ConfigError, LoadOptions};
use smartquote_core::errors::{DomainError, ServiceError};
use thiserror::Error;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_BACKEND: u8 = 3;
pub const EXIT_INPUT: u8 = 4;

/// Operator input that cannot be applied to the quotation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("nothing to quote: pass --prompt or at least one --add")]
    NothingToQuote,
    #[error("sku `{0}` is not in the catalog")]
    UnknownSku(String),
    #[error("sku `{0}` is not on the quotation")]
    NotOnQuotation(String),
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => {
                let payload = CommandOutcome {
                    command: command.to_string(),
                    status: "ok".to_string(),
                    error_class: None,
                    message: message.into(),
                    data: Some(data),
                };
                Self { exit_code: 0, output: serialize_payload(payload) }
            }
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn config_failure(command: &str, error: &ConfigError) -> Self {
        Self::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    }

    pub fn service_failure(command: &str, error: &ServiceError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), EXIT_BACKEND)
    }

    pub fn input_failure(command: &str, message: impl Into<String>) -> Self {
        Self::failure(command, "invalid_input", message, EXIT_INPUT)
    }

    /// Maps an error from a multi-step command onto the exit code contract.
    pub fn from_error(command: &str, error: &anyhow::Error) -> Self {
        if let Some(config) = error.downcast_ref::<ConfigError>() {
            return Self::config_failure(command, config);
        }
        if let Some(service) = error.downcast_ref::<ServiceError>() {
            return Self::service_failure(command, service);
        }
        if let Some(client) = error.downcast_ref::<ClientError>() {
            return Self::failure(command, client.error_class(), error.to_string(), EXIT_BACKEND);
        }
        if error.downcast_ref::<DomainError>().is_some() || error.downcast_ref::<InputError>().is_some()
        {
            return Self::input_failure(command, format!("{error:#}"));
        }
        Self::failure(command, "runtime", format!("{error:#}"), 1)
    }
}

pub(crate) fn load_config(command: &str, options: &LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| CommandResult::config_failure(command, &error))
}

pub(crate) fn connect(command: &str, config: &AppConfig) -> Result<HttpBackend, CommandResult> {
    HttpBackend::new(&config.backend).map_err(|error| {
        CommandResult::failure(command, "client_init", error.to_string(), EXIT_BACKEND)
    })
}

pub(crate) fn runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            1,
        )
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
