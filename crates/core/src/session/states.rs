use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::builder::pricing::QuotationTotals;
use crate::domain::quote::InvoiceNumber;
use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhaseKind {
    Idle,
    Analyzing,
    Reviewing,
    Finalizing,
    Finalized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    Analyze,
    Edit,
    Finalize,
    StartNew,
}

/// Where a failed analysis returns to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResumePhase {
    Idle,
    Reviewing,
}

impl ResumePhase {
    pub(crate) fn phase(self) -> SessionPhase {
        match self {
            Self::Idle => SessionPhase::Idle,
            Self::Reviewing => SessionPhase::Reviewing,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Analyzing { generation: u64, resume: ResumePhase },
    Reviewing,
    Finalizing,
    Finalized(QuoteReceipt),
}

impl SessionPhase {
    pub fn kind(&self) -> SessionPhaseKind {
        match self {
            Self::Idle => SessionPhaseKind::Idle,
            Self::Analyzing { .. } => SessionPhaseKind::Analyzing,
            Self::Reviewing => SessionPhaseKind::Reviewing,
            Self::Finalizing => SessionPhaseKind::Finalizing,
            Self::Finalized(_) => SessionPhaseKind::Finalized,
        }
    }
}

/// Tag carried by one in-flight analysis call. Only the ticket of the latest
/// generation may apply its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnalysisTicket {
    pub(crate) generation: u64,
}

impl AnalysisTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GrandTotalMismatch {
    pub reported: Decimal,
    pub computed: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteReceipt {
    pub invoice_no: InvoiceNumber,
    pub pdf_url: String,
    pub filename: Option<String>,
    pub totals: QuotationTotals,
    pub anomaly: Option<GrandTotalMismatch>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionNotice {
    pub action: SessionAction,
    pub message: String,
    pub error: ServiceError,
}

impl SessionNotice {
    pub(crate) fn new(action: SessionAction, error: ServiceError) -> Self {
        Self { action, message: error.user_message(), error }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Applied { items: usize, suggested_customer: Option<String> },
    Stale { generation: u64, current: u64 },
    Failed(SessionNotice),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finalized(QuoteReceipt),
    Failed(SessionNotice),
    /// No finalize was in flight, so the response was dropped.
    Ignored,
}
