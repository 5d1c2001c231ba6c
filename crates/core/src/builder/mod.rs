pub mod catalog;
pub mod pricing;
pub mod store;

pub use catalog::{CatalogMatcher, MAX_SEARCH_RESULTS};
pub use pricing::{compute_totals, QuotationTotals, TotalsRow, REPORTED_TOTAL_TOLERANCE};
pub use store::LineItemStore;
