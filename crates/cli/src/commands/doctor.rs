use serde::Serialize;
use smartquote_client::HttpBackend;
use smartquote_core::config::{AppConfig, LoadOptions};
use smartquote_core::ports::{CatalogSource, HistoryService};

use crate::commands::{CommandResult, EXIT_BACKEND, EXIT_CONFIG};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const CONFIG_NOT_LOADED: &str = "skipped because configuration did not load";

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = exit_code_for(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!("configuration loaded; backend {}", config.backend.base()),
            });
            checks.extend(check_backend(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("catalog_reachability", CONFIG_NOT_LOADED));
            checks.push(skipped("history_reachability", CONFIG_NOT_LOADED));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_backend(config: &AppConfig) -> Vec<DoctorCheck> {
    let backend = match HttpBackend::new(&config.backend) {
        Ok(backend) => backend,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "catalog_reachability",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                },
                skipped("history_reachability", "skipped because the http client is unavailable"),
            ];
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "catalog_reachability",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped("history_reachability", "skipped because the async runtime is unavailable"),
            ];
        }
    };

    let catalog = match runtime.block_on(backend.fetch_catalog()) {
        Ok(entries) => DoctorCheck {
            name: "catalog_reachability",
            status: CheckStatus::Pass,
            details: format!("catalog returned {} product(s)", entries.len()),
        },
        Err(error) => DoctorCheck {
            name: "catalog_reachability",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    };
    let history = match runtime.block_on(backend.list_history()) {
        Ok(entries) => DoctorCheck {
            name: "history_reachability",
            status: CheckStatus::Pass,
            details: format!("history lists {} document(s)", entries.len()),
        },
        Err(error) => DoctorCheck {
            name: "history_reachability",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    };

    vec![catalog, history]
}

fn exit_code_for(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };
    if failed("config_validation") {
        EXIT_CONFIG
    } else if report.overall_status == CheckStatus::Fail {
        EXIT_BACKEND
    } else {
        0
    }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: reason.to_string() }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let status = match check.status {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "SKIP",
        };
        lines.push(format!("[{status}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}

fn escape_json(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
