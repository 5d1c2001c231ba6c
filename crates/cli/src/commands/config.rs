use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use smartquote_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

const COMMAND: &str = "config";

struct Field<'a> {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    CommandResult { exit_code: 0, output: render(&config, options) }
}

fn render(config: &AppConfig, options: &LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let doc = config_file_doc.as_ref();
    let path = config_file_path.as_deref();
    let overrides = &options.overrides;

    let fields = [
        Field {
            key_path: "backend.base_url",
            value: config.backend.base_url.clone(),
            env_keys: &["SMARTQUOTE_BACKEND_URL", "SMARTQUOTE_BACKEND_BASE_URL"],
            overridden: overrides.backend_url.is_some(),
            doc,
            path,
        },
        Field {
            key_path: "backend.connect_timeout_secs",
            value: config.backend.connect_timeout_secs.to_string(),
            env_keys: &["SMARTQUOTE_BACKEND_CONNECT_TIMEOUT_SECS"],
            overridden: false,
            doc,
            path,
        },
        Field {
            key_path: "quote.validity_days",
            value: config.quote.validity_days.to_string(),
            env_keys: &["SMARTQUOTE_QUOTE_VALIDITY_DAYS"],
            overridden: false,
            doc,
            path,
        },
        Field {
            key_path: "quote.discount_rate",
            value: config.quote.discount_rate.to_string(),
            env_keys: &["SMARTQUOTE_QUOTE_DISCOUNT_RATE"],
            overridden: overrides.discount_rate.is_some(),
            doc,
            path,
        },
        Field {
            key_path: "quote.tax_rate",
            value: config.quote.tax_rate.to_string(),
            env_keys: &["SMARTQUOTE_QUOTE_TAX_RATE"],
            overridden: overrides.tax_rate.is_some(),
            doc,
            path,
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SMARTQUOTE_LOGGING_LEVEL", "SMARTQUOTE_LOG_LEVEL"],
            overridden: overrides.log_level.is_some(),
            doc,
            path,
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["SMARTQUOTE_LOGGING_FORMAT", "SMARTQUOTE_LOG_FORMAT"],
            overridden: false,
            doc,
            path,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        format!("- {} = {} (source: {})", field.key_path, field.value, field_source(field))
    }));
    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("smartquote.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/smartquote.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field<'_>) -> String {
    if field.overridden {
        return "flag".to_string();
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = field.doc {
        if contains_path(doc, field.key_path) {
            let file_path = field
                .path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: toml::Value =
            "[backend]\nbase_url = \"http://quotes.local\"\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "backend.base_url"));
        assert!(!contains_path(&doc, "backend.connect_timeout_secs"));
        assert!(!contains_path(&doc, "quote.tax_rate"));
    }
}
