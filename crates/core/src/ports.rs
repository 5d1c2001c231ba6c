use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::builder::pricing::QuotationTotals;
use crate::domain::catalog::CatalogEntry;
use crate::domain::line_item::LineItem;
use crate::errors::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisResult {
    pub items: Vec<LineItem>,
    pub suggested_customer: Option<String>,
}

/// Snapshot of a quotation handed to the finalize service. The totals are
/// the locally derived ones at the moment the user confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizeRequest {
    pub customer_name: String,
    pub invoice_date: NaiveDate,
    pub valid_until: NaiveDate,
    pub items: Vec<LineItem>,
    pub totals: QuotationTotals,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizeResult {
    pub invoice_no: String,
    pub pdf_url: String,
    pub filename: Option<String>,
    pub reported_grand_total: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub filename: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, prompt: &str) -> Result<AnalysisResult, ServiceError>;
}

#[async_trait]
pub trait FinalizeService: Send + Sync {
    async fn finalize(&self, request: &FinalizeRequest) -> Result<FinalizeResult, ServiceError>;
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ServiceError>;
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ServiceError>;

    /// Deleting a document that is already gone is not a failure.
    async fn delete_history(&self, filename: &str) -> Result<DeleteOutcome, ServiceError>;
}
