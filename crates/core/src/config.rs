use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::DEFAULT_VALIDITY_DAYS;
use crate::session::SessionDefaults;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub quote: QuoteDefaultsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct QuoteDefaultsConfig {
    pub validity_days: u32,
    pub discount_rate: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub log_level: Option<String>,
    pub discount_rate: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: DEFAULT_BACKEND_URL.to_string(),
                connect_timeout_secs: 10,
            },
            quote: QuoteDefaultsConfig {
                validity_days: DEFAULT_VALIDITY_DAYS,
                discount_rate: Decimal::ZERO,
                tax_rate: Decimal::ZERO,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl QuoteDefaultsConfig {
    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            validity_days: self.validity_days,
            discount_rate: self.discount_rate,
            tax_rate: self.tax_rate,
        }
    }
}

impl BackendConfig {
    /// Base URL without a trailing slash, ready for `format!("{base}/path")`.
    pub fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("smartquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(connect_timeout_secs) = backend.connect_timeout_secs {
                self.backend.connect_timeout_secs = connect_timeout_secs;
            }
        }

        if let Some(quote) = patch.quote {
            if let Some(validity_days) = quote.validity_days {
                self.quote.validity_days = validity_days;
            }
            if let Some(discount_rate) = quote.discount_rate {
                self.quote.discount_rate = discount_rate;
            }
            if let Some(tax_rate) = quote.tax_rate {
                self.quote.tax_rate = tax_rate;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let backend_url =
            read_env("SMARTQUOTE_BACKEND_URL").or_else(|| read_env("SMARTQUOTE_BACKEND_BASE_URL"));
        if let Some(value) = backend_url {
            self.backend.base_url = value;
        }
        if let Some(value) = read_env("SMARTQUOTE_BACKEND_CONNECT_TIMEOUT_SECS") {
            self.backend.connect_timeout_secs =
                parse_value("SMARTQUOTE_BACKEND_CONNECT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SMARTQUOTE_QUOTE_VALIDITY_DAYS") {
            self.quote.validity_days = parse_value("SMARTQUOTE_QUOTE_VALIDITY_DAYS", &value)?;
        }
        if let Some(value) = read_env("SMARTQUOTE_QUOTE_DISCOUNT_RATE") {
            self.quote.discount_rate = parse_value("SMARTQUOTE_QUOTE_DISCOUNT_RATE", &value)?;
        }
        if let Some(value) = read_env("SMARTQUOTE_QUOTE_TAX_RATE") {
            self.quote.tax_rate = parse_value("SMARTQUOTE_QUOTE_TAX_RATE", &value)?;
        }

        let log_level =
            read_env("SMARTQUOTE_LOGGING_LEVEL").or_else(|| read_env("SMARTQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SMARTQUOTE_LOGGING_FORMAT").or_else(|| read_env("SMARTQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend_url) = overrides.backend_url {
            self.backend.base_url = backend_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(discount_rate) = overrides.discount_rate {
            self.quote.discount_rate = discount_rate;
        }
        if let Some(tax_rate) = overrides.tax_rate {
            self.quote.tax_rate = tax_rate;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend(&self.backend)?;
        validate_quote(&self.quote)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("smartquote.toml"), PathBuf::from("config/smartquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    let url = backend.base_url.trim();
    if url.is_empty() {
        return Err(ConfigError::Validation(
            "backend.base_url is required (for example `http://127.0.0.1:8000`)".to_string(),
        ));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "backend.base_url must start with http:// or https://".to_string(),
        ));
    }

    if backend.connect_timeout_secs == 0 || backend.connect_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "backend.connect_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_quote(quote: &QuoteDefaultsConfig) -> Result<(), ConfigError> {
    if quote.validity_days == 0 || quote.validity_days > 365 {
        return Err(ConfigError::Validation(
            "quote.validity_days must be in range 1..=365".to_string(),
        ));
    }
    if quote.discount_rate.is_sign_negative() || quote.discount_rate > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "quote.discount_rate must be in range 0..=100".to_string(),
        ));
    }
    if quote.tax_rate.is_sign_negative() {
        return Err(ConfigError::Validation("quote.tax_rate must not be negative".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    backend: Option<BackendPatch>,
    quote: Option<QuotePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotePatch {
    validity_days: Option<u32>,
    discount_rate: Option<Decimal>,
    tax_rate: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
