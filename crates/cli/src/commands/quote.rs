//! `smartquote quote`: drive one quotation session from the command line.
//!
//! The prompt analysis and the catalog fetch run concurrently through the
//! session driver, edits are applied in argument order, and the quotation is
//! only sent to the finalize service when `--finalize` is given.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use smartquote_client::{CatalogUpdate, DriverUpdate, HttpBackend, Services, SessionDriver};
use smartquote_core::builder::{QuotationTotals, TotalsRow};
use smartquote_core::config::{AppConfig, LoadOptions};
use smartquote_core::session::{
    AnalysisOutcome, FinalizeOutcome, QuoteReceipt, QuoteSession, SessionPhaseKind,
};
use tracing::{info, warn};

use crate::commands::{connect, load_config, runtime, CommandResult, InputError};

const COMMAND: &str = "quote";

#[derive(Clone, Debug, Default)]
pub struct QuoteArgs {
    pub prompt: Option<String>,
    pub add: Vec<String>,
    pub quantities: Vec<(String, i64)>,
    pub prices: Vec<(String, Decimal)>,
    pub remove: Vec<String>,
    pub customer: Option<String>,
    pub discount_rate: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub invoice_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub finalize: bool,
    pub save_to: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ItemRow {
    sku: String,
    name: String,
    quantity: u32,
    unit_price: Decimal,
    line_total: Decimal,
}

#[derive(Debug, Serialize)]
struct QuoteReport {
    phase: SessionPhaseKind,
    customer_name: String,
    invoice_date: NaiveDate,
    valid_until: NaiveDate,
    items: Vec<ItemRow>,
    totals: QuotationTotals,
    breakdown: Vec<TotalsRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<QuoteReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_document: Option<PathBuf>,
}

/// Parses `SKU=VALUE` pairs used by `--qty` and `--price`.
pub fn parse_assignment<T: FromStr>(raw: &str) -> Result<(String, T), String> {
    let (sku, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SKU=VALUE, got `{raw}`"))?;
    let sku = sku.trim();
    if sku.is_empty() {
        return Err(format!("missing sku in `{raw}`"));
    }
    let value =
        value.trim().parse::<T>().map_err(|_| format!("invalid value `{}` for `{sku}`", value.trim()))?;
    Ok((sku.to_string(), value))
}

pub fn run(options: &LoadOptions, args: &QuoteArgs) -> CommandResult {
    if args.prompt.as_deref().map_or(true, |prompt| prompt.trim().is_empty()) && args.add.is_empty() {
        return CommandResult::input_failure(COMMAND, InputError::NothingToQuote.to_string());
    }

    execute(options, args).unwrap_or_else(|failure| failure)
}

fn execute(options: &LoadOptions, args: &QuoteArgs) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, options)?;
    let backend = Arc::new(connect(COMMAND, &config)?);
    let runtime = runtime(COMMAND)?;

    let report = runtime
        .block_on(build_quote(&config, backend, args))
        .map_err(|error| CommandResult::from_error(COMMAND, &error))?;

    let message = match &report.receipt {
        Some(receipt) => {
            let mut message = format!(
                "finalized {} with grand total {}",
                receipt.invoice_no.0, receipt.totals.grand_total
            );
            if let Some(anomaly) = &receipt.anomaly {
                message.push_str(&format!(
                    " (backend reported {}, totals shown are local)",
                    anomaly.reported
                ));
            }
            message
        }
        None => format!(
            "draft with {} line item(s), grand total {}",
            report.items.len(),
            report.totals.grand_total
        ),
    };

    Ok(CommandResult::success_with_data(COMMAND, message, &report))
}

async fn build_quote(
    config: &AppConfig,
    backend: Arc<HttpBackend>,
    args: &QuoteArgs,
) -> anyhow::Result<QuoteReport> {
    let today = Local::now().date_naive();
    let session = QuoteSession::new(today, config.quote.session_defaults());
    let mut driver = SessionDriver::new(session, Services::from_backend(Arc::clone(&backend)));

    info!(
        event_name = "cli.quote.started",
        correlation_id = %driver.correlation_id(),
        has_prompt = args.prompt.is_some(),
        catalog_picks = args.add.len(),
        finalize = args.finalize,
        "quote command started"
    );

    if !args.add.is_empty() {
        driver.load_catalog();
    }
    if let Some(prompt) = args.prompt.as_deref().filter(|prompt| !prompt.trim().is_empty()) {
        driver.submit_prompt(prompt).context("could not start analysis")?;
    }

    for update in driver.settle().await {
        match update {
            DriverUpdate::Analysis(AnalysisOutcome::Failed(notice)) => {
                return Err(anyhow::Error::new(notice.error).context("analysis failed"));
            }
            DriverUpdate::Catalog(CatalogUpdate::Failed(error)) => {
                return Err(anyhow::Error::new(error).context("catalog unavailable"));
            }
            _ => {}
        }
    }

    apply_edits(&mut driver, args)?;

    let mut receipt = None;
    let mut saved_document = None;
    if args.finalize {
        driver.confirm().context("could not finalize quotation")?;
        for update in driver.settle().await {
            match update {
                DriverUpdate::Finalize(FinalizeOutcome::Finalized(finalized)) => {
                    receipt = Some(finalized);
                }
                DriverUpdate::Finalize(FinalizeOutcome::Failed(notice)) => {
                    return Err(anyhow::Error::new(notice.error).context("finalize failed"));
                }
                _ => {}
            }
        }

        if let (Some(directory), Some(finalized)) = (args.save_to.as_deref(), receipt.as_ref()) {
            let path = backend
                .save_document(&finalized.pdf_url, directory, finalized.filename.as_deref())
                .await
                .context("quotation finalized but the document could not be saved")?;
            saved_document = Some(path);
        }
    }

    Ok(report(&driver, receipt, saved_document))
}

fn apply_edits(driver: &mut SessionDriver, args: &QuoteArgs) -> anyhow::Result<()> {
    for sku in &args.add {
        if driver.add_from_catalog(sku)?.is_none() {
            return Err(InputError::UnknownSku(sku.clone()).into());
        }
    }

    let session = driver.session_mut();
    for (sku, quantity) in &args.quantities {
        if !session.set_quantity(sku, *quantity)? {
            return Err(InputError::NotOnQuotation(sku.clone()).into());
        }
    }
    for (sku, price) in &args.prices {
        if !session.set_unit_price(sku, *price)? {
            return Err(InputError::NotOnQuotation(sku.clone()).into());
        }
    }
    for sku in &args.remove {
        if session.remove(sku)?.is_none() {
            warn!(
                event_name = "cli.quote.remove_missing",
                correlation_id = "cli",
                sku = %sku,
                "requested removal of a sku that is not on the quotation"
            );
        }
    }

    session.update_details(|details| {
        if let Some(customer) = &args.customer {
            details.customer_name = customer.clone();
        }
        if let Some(rate) = args.discount_rate {
            details.discount_rate = rate;
        }
        if let Some(rate) = args.tax_rate {
            details.tax_rate = rate;
        }
        if let Some(date) = args.invoice_date {
            details.set_invoice_date(date);
        }
        if let Some(date) = args.valid_until {
            details.set_valid_until(date);
        }
    })?;

    Ok(())
}

fn report(
    driver: &SessionDriver,
    receipt: Option<QuoteReceipt>,
    saved_document: Option<PathBuf>,
) -> QuoteReport {
    let session = driver.session();
    let details = session.details();
    let totals = receipt.as_ref().map(|receipt| receipt.totals.clone()).unwrap_or_else(|| session.totals());

    QuoteReport {
        phase: session.phase().kind(),
        customer_name: details.billed_customer().to_string(),
        invoice_date: details.invoice_date(),
        valid_until: details.valid_until(),
        items: session
            .store()
            .items()
            .iter()
            .map(|item| ItemRow {
                sku: item.sku().as_str().to_string(),
                name: item.name().to_string(),
                quantity: item.quantity(),
                unit_price: item.unit_price(),
                line_total: item.line_total(),
            })
            .collect(),
        breakdown: totals.breakdown(),
        totals,
        receipt,
        saved_document,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::parse_assignment;

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(parse_assignment::<i64>("CAM-01=3"), Ok(("CAM-01".to_string(), 3)));
        assert_eq!(
            parse_assignment::<Decimal>(" TRI-02 = 35.50 "),
            Ok(("TRI-02".to_string(), Decimal::new(3550, 2)))
        );
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        assert!(parse_assignment::<i64>("CAM-01").is_err());
        assert!(parse_assignment::<i64>("=3").is_err());
        assert!(parse_assignment::<i64>("CAM-01=three").is_err());
    }
}
