use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::{mpsc, Mutex, OnceLock};
use std::thread;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use smartquote_cli::commands::download::{self, DownloadArgs};
use smartquote_cli::commands::quote::{self, QuoteArgs};
use smartquote_cli::commands::{config, doctor, history, search};
use smartquote_core::config::{ConfigOverrides, LoadOptions};
use tokio::net::TcpListener;

#[test]
fn search_returns_catalog_matches() {
    with_env(&[], || {
        let base = spawn_backend();
        let result = search::run(&options_for(&base), "sony");
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "search");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(payload["data"][0]["sku"], "CAM-01");
    });
}

#[test]
fn search_reports_unreachable_backend() {
    with_env(&[], || {
        let result = search::run(&options_for(&closed_port_url()), "camera");
        assert_eq!(result.exit_code, 3, "expected backend failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "transport");
    });
}

#[test]
fn quote_draft_applies_catalog_picks_and_rates() {
    with_env(&[], || {
        let base = spawn_backend();
        let args = QuoteArgs {
            add: vec!["CAM-01".to_string(), "tri-02".to_string()],
            remove: vec!["TRI-02".to_string()],
            discount_rate: Some(Decimal::from(10)),
            tax_rate: Some(Decimal::from(5)),
            ..QuoteArgs::default()
        };

        let result = quote::run(&options_for(&base), &args);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(data["phase"], "Reviewing");
        assert_eq!(data["customer_name"], "Valued Customer");
        assert_eq!(data["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(decimal(&data["totals"]["subtotal"]), Decimal::from(100));
        assert_eq!(decimal(&data["totals"]["discount_amount"]), Decimal::from(10));
        assert_eq!(decimal(&data["totals"]["tax_amount"]), Decimal::new(45, 1));
        assert_eq!(decimal(&data["totals"]["grand_total"]), Decimal::new(945, 1));
        assert!(data.get("receipt").is_none());
    });
}

#[test]
fn default_rate_flags_seed_new_quotations() {
    with_env(&[], || {
        let base = spawn_backend();
        let mut options = options_for(&base);
        options.overrides.discount_rate = Some(Decimal::from(10));
        options.overrides.tax_rate = Some(Decimal::from(5));

        let shown = config::run(&options);
        assert!(shown.output.contains("- quote.discount_rate = 10 (source: flag)"));
        assert!(shown.output.contains("- quote.tax_rate = 5 (source: flag)"));

        let args = QuoteArgs { add: vec!["CAM-01".to_string()], ..QuoteArgs::default() };
        let result = quote::run(&options, &args);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let totals = &parse_payload(&result.output)["data"]["totals"];
        assert_eq!(decimal(&totals["discount_rate"]), Decimal::from(10));
        assert_eq!(decimal(&totals["grand_total"]), Decimal::new(945, 1));
    });
}

#[test]
fn quote_from_prompt_finalizes_and_saves_document() {
    with_env(&[], || {
        let base = spawn_backend();
        let directory = tempfile::tempdir().expect("temp dir");
        let args = QuoteArgs {
            prompt: Some("two tripods for Acme".to_string()),
            quantities: vec![("TRI-02".to_string(), 3)],
            finalize: true,
            save_to: Some(directory.path().to_path_buf()),
            ..QuoteArgs::default()
        };

        let result = quote::run(&options_for(&base), &args);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(data["phase"], "Finalized");
        assert_eq!(data["customer_name"], "Acme Ltd");
        assert_eq!(data["receipt"]["invoice_no"], "INV-20251130-0001");
        assert!(data["receipt"]["anomaly"].is_null());
        assert_eq!(decimal(&data["totals"]["grand_total"]), Decimal::from(105));

        let saved = directory.path().join("Quote_INV-20251130-0001.pdf");
        assert_eq!(data["saved_document"], saved.display().to_string());
        assert_eq!(std::fs::read(&saved).expect("document saved"), b"%PDF-1.4".to_vec());
    });
}

#[test]
fn quote_flags_backend_total_mismatch() {
    with_env(&[], || {
        let base = spawn_backend();
        let args = QuoteArgs {
            add: vec!["CAM-01".to_string()],
            customer: Some("Mismatch Co".to_string()),
            finalize: true,
            ..QuoteArgs::default()
        };

        let result = quote::run(&options_for(&base), &args);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        let anomaly = &payload["data"]["receipt"]["anomaly"];
        assert_eq!(decimal(&anomaly["reported"]), Decimal::from(101));
        assert_eq!(decimal(&anomaly["computed"]), Decimal::from(100));
        assert!(payload["message"].as_str().is_some_and(|message| message.contains("backend reported")));
    });
}

#[test]
fn quote_rejects_unknown_catalog_sku() {
    with_env(&[], || {
        let base = spawn_backend();
        let args = QuoteArgs { add: vec!["NOPE-1".to_string()], ..QuoteArgs::default() };

        let result = quote::run(&options_for(&base), &args);
        assert_eq!(result.exit_code, 4, "expected input failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        assert_eq!(payload["message"], "sku `NOPE-1` is not in the catalog");
    });
}

#[test]
fn quote_requires_prompt_or_catalog_pick() {
    with_env(&[], || {
        let args = QuoteArgs { prompt: Some("   ".to_string()), ..QuoteArgs::default() };
        let result = quote::run(&LoadOptions::default(), &args);
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn history_lists_and_deletes_idempotently() {
    with_env(&[], || {
        let base = spawn_backend();
        let options = options_for(&base);

        let listed = history::list(&options);
        assert_eq!(listed.exit_code, 0, "unexpected output: {}", listed.output);
        let payload = parse_payload(&listed.output);
        assert_eq!(payload["data"][0]["filename"], "Quote_INV-20251130-0001.pdf");

        let deleted = history::delete(&options, "Quote_INV-20251130-0001.pdf");
        assert_eq!(parse_payload(&deleted.output)["data"]["outcome"], "deleted");

        let absent = history::delete(&options, "Quote_gone.pdf");
        assert_eq!(absent.exit_code, 0, "missing document is not an error");
        let payload = parse_payload(&absent.output);
        assert_eq!(payload["data"]["outcome"], "already_absent");
        assert_eq!(payload["message"], "`Quote_gone.pdf` was already absent");
    });
}

#[test]
fn download_print_url_needs_no_backend() {
    with_env(&[], || {
        let args = DownloadArgs {
            url: "http://127.0.0.1:8000/pdf/Quote_1.pdf?v=2",
            out_dir: FsPath::new("."),
            filename: None,
            print_only: true,
        };
        let result = download::run(&LoadOptions::default(), &args);
        assert_eq!(result.exit_code, 0);
        assert_eq!(
            parse_payload(&result.output)["data"]["download_url"],
            "http://127.0.0.1:8000/pdf/Quote_1.pdf?v=2&download=true"
        );
    });
}

#[test]
fn invalid_backend_url_is_a_config_failure() {
    with_env(&[("SMARTQUOTE_BACKEND_URL", "ftp://127.0.0.1")], || {
        let result = search::run(&LoadOptions::default(), "camera");
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "search");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_reports_flag_and_env_sources() {
    with_env(&[("SMARTQUOTE_QUOTE_TAX_RATE", "7.5")], || {
        let result = config::run(&options_for("http://quotes.local:8000"));
        assert_eq!(result.exit_code, 0);
        assert!(result
            .output
            .contains("- backend.base_url = http://quotes.local:8000 (source: flag)"));
        assert!(result
            .output
            .contains("- quote.tax_rate = 7.5 (source: env (SMARTQUOTE_QUOTE_TAX_RATE))"));
        assert!(result.output.contains("- quote.validity_days = 30 (source: default)"));
    });
}

#[test]
fn doctor_reports_backend_readiness() {
    with_env(&[], || {
        let base = spawn_backend();
        let healthy = doctor::run(&options_for(&base), true);
        assert_eq!(healthy.exit_code, 0, "unexpected output: {}", healthy.output);
        let report = parse_payload(&healthy.output);
        assert_eq!(report["overall_status"], "pass");

        let unreachable = doctor::run(&options_for(&closed_port_url()), true);
        assert_eq!(unreachable.exit_code, 3);
        let report = parse_payload(&unreachable.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][1]["name"], "catalog_reachability");
        assert_eq!(report["checks"][1]["status"], "fail");
    });
}

fn options_for(base_url: &str) -> LoadOptions {
    LoadOptions {
        overrides: ConfigOverrides {
            backend_url: Some(base_url.to_string()),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    }
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| panic!("expected decimal string, got {value}"))
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let address = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{address}")
}

/// Starts the fake backend on its own thread and runtime, since each command
/// builds a runtime of its own.
fn spawn_backend() -> String {
    let (sender, receiver) = mpsc::channel::<SocketAddr>();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("backend runtime builds");
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback listener");
            let address = listener.local_addr().expect("listener address");
            sender.send(address).expect("address is received");
            axum::serve(listener, fake_backend(format!("http://{address}")))
                .await
                .expect("fake backend serves");
        });
    });
    format!("http://{}", receiver.recv().expect("backend address"))
}

fn fake_backend(base_url: String) -> Router {
    Router::new()
        .route(
            "/products",
            get(|| async {
                Json(json!({ "products": [
                    { "sku": "CAM-01", "name": "Mirrorless Camera", "brand": "Sony", "unit_price": 100 },
                    { "sku": "TRI-02", "name": "Travel Tripod", "price": "35.00" }
                ]}))
            }),
        )
        .route(
            "/analyze-request",
            post(|| async {
                Json(json!({
                    "success": true,
                    "suggested_customer": "Acme Ltd",
                    "products": [
                        { "sku": "TRI-02", "name": "Travel Tripod", "unit_price": 35, "quantity": 2 }
                    ]
                }))
            }),
        )
        .route(
            "/finalize-quotation",
            post(|State(base): State<String>, Json(body): Json<Value>| async move {
                let local_total: f64 = body["products"]
                    .as_array()
                    .map(|products| {
                        products.iter().filter_map(|product| product["line_total"].as_f64()).sum()
                    })
                    .unwrap_or_default();
                let reported = if body["customer_name"] == "Mismatch Co" {
                    local_total + 1.0
                } else {
                    local_total
                };
                Json(json!({
                    "success": true,
                    "invoice_no": "INV-20251130-0001",
                    "filename": "Quote_INV-20251130-0001.pdf",
                    "pdf_url": format!("{base}/pdf/Quote_INV-20251130-0001.pdf"),
                    "grand_total": reported
                }))
            }),
        )
        .route(
            "/pdf/{filename}",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                match query.get("download").map(String::as_str) {
                    Some("true") => (StatusCode::OK, b"%PDF-1.4".to_vec()),
                    _ => (StatusCode::BAD_REQUEST, b"missing download flag".to_vec()),
                }
            }),
        )
        .route(
            "/history",
            get(|State(base): State<String>| async move {
                Json(json!([{
                    "filename": "Quote_INV-20251130-0001.pdf",
                    "url": format!("{base}/pdf/Quote_INV-20251130-0001.pdf"),
                    "created_at": "2025-11-30 10:15"
                }]))
            }),
        )
        .route(
            "/history/{filename}",
            delete(|Path(filename): Path<String>| async move {
                if filename == "Quote_INV-20251130-0001.pdf" {
                    (StatusCode::OK, Json(json!({ "success": true, "message": "File deleted" })))
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({ "detail": "File not found" })))
                }
            }),
        )
        .with_state(base_url)
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "SMARTQUOTE_BACKEND_URL",
        "SMARTQUOTE_BACKEND_BASE_URL",
        "SMARTQUOTE_BACKEND_CONNECT_TIMEOUT_SECS",
        "SMARTQUOTE_QUOTE_VALIDITY_DAYS",
        "SMARTQUOTE_QUOTE_DISCOUNT_RATE",
        "SMARTQUOTE_QUOTE_TAX_RATE",
        "SMARTQUOTE_LOGGING_LEVEL",
        "SMARTQUOTE_LOGGING_FORMAT",
        "SMARTQUOTE_LOG_LEVEL",
        "SMARTQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
