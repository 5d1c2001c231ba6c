pub mod builder;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod session;
pub mod wire;

pub use builder::{compute_totals, CatalogMatcher, LineItemStore, QuotationTotals, TotalsRow};
pub use domain::catalog::CatalogEntry;
pub use domain::line_item::{LineItem, ProductCandidate, ProductInfo, Sku};
pub use domain::quote::{InvoiceNumber, QuoteDetails};
pub use errors::{DomainError, ServiceError};
pub use ports::{
    AnalysisResult, AnalysisService, CatalogSource, DeleteOutcome, FinalizeRequest,
    FinalizeResult, FinalizeService, HistoryEntry, HistoryService,
};
pub use session::{
    AnalysisOutcome, AnalysisTicket, FinalizeOutcome, QuoteReceipt, QuoteSession, SessionDefaults,
    SessionNotice, SessionPhase, SessionPhaseKind,
};
