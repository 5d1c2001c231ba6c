use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::builder::pricing::QuotationTotals;
use crate::builder::store::LineItemStore;
use crate::domain::line_item::{LineItem, ProductCandidate};
use crate::domain::quote::{InvoiceNumber, QuoteDetails, DEFAULT_VALIDITY_DAYS};
use crate::errors::{DomainError, ServiceError};
use crate::ports::{AnalysisResult, FinalizeRequest, FinalizeResult};
use crate::session::states::{
    AnalysisOutcome, AnalysisTicket, FinalizeOutcome, GrandTotalMismatch, QuoteReceipt,
    ResumePhase, SessionAction, SessionNotice, SessionPhase,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDefaults {
    pub validity_days: u32,
    pub discount_rate: Decimal,
    pub tax_rate: Decimal,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            validity_days: DEFAULT_VALIDITY_DAYS,
            discount_rate: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
        }
    }
}

/// One quotation in progress: the phase machine, the line items and the
/// header details, owned by a single writer.
///
/// Network results re-enter only through [`QuoteSession::complete_analysis`]
/// and [`QuoteSession::complete_finalize`]. Each `begin_analysis` bumps the
/// generation, and a result whose ticket is not the current generation is
/// dropped without touching the store.
#[derive(Clone, Debug)]
pub struct QuoteSession {
    phase: SessionPhase,
    generation: u64,
    store: LineItemStore,
    details: QuoteDetails,
    defaults: SessionDefaults,
    last_notice: Option<SessionNotice>,
}

impl QuoteSession {
    pub fn new(today: NaiveDate, defaults: SessionDefaults) -> Self {
        Self {
            phase: SessionPhase::Idle,
            generation: 0,
            store: LineItemStore::new(),
            details: fresh_details(today, &defaults),
            defaults,
            last_notice: None,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &LineItemStore {
        &self.store
    }

    pub fn details(&self) -> &QuoteDetails {
        &self.details
    }

    pub fn last_notice(&self) -> Option<&SessionNotice> {
        self.last_notice.as_ref()
    }

    pub fn receipt(&self) -> Option<&QuoteReceipt> {
        match &self.phase {
            SessionPhase::Finalized(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn totals(&self) -> QuotationTotals {
        self.store.compute_totals(self.details.discount_rate, self.details.tax_rate)
    }

    pub fn update_details(
        &mut self,
        update: impl FnOnce(&mut QuoteDetails),
    ) -> Result<(), DomainError> {
        self.ensure_editable(SessionAction::Edit)?;
        update(&mut self.details);
        Ok(())
    }

    pub fn begin_analysis(&mut self, prompt: &str) -> Result<AnalysisTicket, DomainError> {
        let resume = match &self.phase {
            SessionPhase::Idle => ResumePhase::Idle,
            SessionPhase::Reviewing => ResumePhase::Reviewing,
            SessionPhase::Analyzing { resume, .. } => *resume,
            _ => return Err(self.invalid(SessionAction::Analyze)),
        };
        if prompt.trim().is_empty() {
            return Err(DomainError::EmptyPrompt);
        }

        self.generation += 1;
        self.phase = SessionPhase::Analyzing { generation: self.generation, resume };
        Ok(AnalysisTicket { generation: self.generation })
    }

    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<AnalysisResult, ServiceError>,
    ) -> AnalysisOutcome {
        let resume = match &self.phase {
            SessionPhase::Analyzing { generation, resume } if *generation == ticket.generation => {
                *resume
            }
            _ => {
                return AnalysisOutcome::Stale {
                    generation: ticket.generation,
                    current: self.generation,
                }
            }
        };

        match outcome {
            Ok(result) => {
                let items = result.items.len();
                self.store.bulk_replace(result.items);
                if let Some(customer) = &result.suggested_customer {
                    self.details.customer_name = customer.clone();
                }
                self.phase = SessionPhase::Reviewing;
                self.last_notice = None;
                AnalysisOutcome::Applied { items, suggested_customer: result.suggested_customer }
            }
            Err(error) => {
                let notice = SessionNotice::new(SessionAction::Analyze, error);
                self.phase = resume.phase();
                self.last_notice = Some(notice.clone());
                AnalysisOutcome::Failed(notice)
            }
        }
    }

    pub fn upsert(&mut self, candidate: ProductCandidate) -> Result<&LineItem, DomainError> {
        self.ensure_editable(SessionAction::Edit)?;
        self.mark_edited();
        Ok(self.store.upsert(candidate))
    }

    pub fn set_quantity(&mut self, sku: &str, quantity: i64) -> Result<bool, DomainError> {
        self.ensure_editable(SessionAction::Edit)?;
        Ok(self.store.set_quantity(sku, quantity))
    }

    pub fn set_unit_price(&mut self, sku: &str, price: Decimal) -> Result<bool, DomainError> {
        self.ensure_editable(SessionAction::Edit)?;
        Ok(self.store.set_unit_price(sku, price))
    }

    pub fn remove(&mut self, sku: &str) -> Result<Option<LineItem>, DomainError> {
        self.ensure_editable(SessionAction::Edit)?;
        Ok(self.store.remove(sku))
    }

    pub fn begin_finalize(&mut self) -> Result<FinalizeRequest, DomainError> {
        if self.phase != SessionPhase::Reviewing {
            return Err(self.invalid(SessionAction::Finalize));
        }
        if self.store.is_empty() {
            return Err(DomainError::EmptyQuotation);
        }

        let request = FinalizeRequest {
            customer_name: self.details.billed_customer().to_string(),
            invoice_date: self.details.invoice_date(),
            valid_until: self.details.valid_until(),
            items: self.store.items().to_vec(),
            totals: self.totals(),
        };
        self.phase = SessionPhase::Finalizing;
        Ok(request)
    }

    pub fn complete_finalize(
        &mut self,
        outcome: Result<FinalizeResult, ServiceError>,
    ) -> FinalizeOutcome {
        if self.phase != SessionPhase::Finalizing {
            return FinalizeOutcome::Ignored;
        }

        match outcome {
            Ok(result) => {
                let totals = self.totals();
                let anomaly = result
                    .reported_grand_total
                    .filter(|reported| !totals.matches_reported(*reported))
                    .map(|reported| GrandTotalMismatch { reported, computed: totals.grand_total });
                let receipt = QuoteReceipt {
                    invoice_no: InvoiceNumber(result.invoice_no),
                    pdf_url: result.pdf_url,
                    filename: result.filename,
                    totals,
                    anomaly,
                };
                self.phase = SessionPhase::Finalized(receipt.clone());
                self.last_notice = None;
                FinalizeOutcome::Finalized(receipt)
            }
            Err(error) => {
                let notice = SessionNotice::new(SessionAction::Finalize, error);
                self.phase = SessionPhase::Reviewing;
                self.last_notice = Some(notice.clone());
                FinalizeOutcome::Failed(notice)
            }
        }
    }

    /// Discards the current quotation. Any analysis still in flight becomes
    /// stale because the generation moves on.
    pub fn start_new(&mut self, today: NaiveDate) -> Result<(), DomainError> {
        if self.phase == SessionPhase::Finalizing {
            return Err(self.invalid(SessionAction::StartNew));
        }

        self.generation += 1;
        self.phase = SessionPhase::Idle;
        self.store.clear();
        self.details = fresh_details(today, &self.defaults);
        self.last_notice = None;
        Ok(())
    }

    fn ensure_editable(&self, action: SessionAction) -> Result<(), DomainError> {
        match self.phase {
            SessionPhase::Finalizing | SessionPhase::Finalized(_) => Err(self.invalid(action)),
            _ => Ok(()),
        }
    }

    fn mark_edited(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Reviewing;
        } else if let SessionPhase::Analyzing { resume, .. } = &mut self.phase {
            *resume = ResumePhase::Reviewing;
        }
    }

    fn invalid(&self, action: SessionAction) -> DomainError {
        DomainError::InvalidTransition { phase: self.phase.kind(), action }
    }
}

fn fresh_details(today: NaiveDate, defaults: &SessionDefaults) -> QuoteDetails {
    let mut details = QuoteDetails::new(today, defaults.validity_days);
    details.discount_rate = defaults.discount_rate;
    details.tax_rate = defaults.tax_rate;
    details
}
