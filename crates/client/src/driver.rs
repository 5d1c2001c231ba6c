//! Async shell around [`QuoteSession`].
//!
//! The driver is the session's only writer. Network calls run on spawned
//! tokio tasks and report back over an `mpsc` channel; [`SessionDriver::next_event`]
//! applies each report through the synchronous session operations, so a
//! superseded analysis can never overwrite newer state.

use std::sync::Arc;

use chrono::NaiveDate;
use smartquote_core::builder::CatalogMatcher;
use smartquote_core::domain::catalog::CatalogEntry;
use smartquote_core::domain::line_item::{LineItem, ProductCandidate};
use smartquote_core::errors::{DomainError, ServiceError};
use smartquote_core::ports::{
    AnalysisResult, AnalysisService, CatalogSource, FinalizeResult, FinalizeService,
};
use smartquote_core::session::{AnalysisOutcome, AnalysisTicket, FinalizeOutcome, QuoteSession};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::http::HttpBackend;

const EVENT_BUFFER: usize = 32;

#[derive(Clone)]
pub struct Services {
    pub analysis: Arc<dyn AnalysisService>,
    pub finalize: Arc<dyn FinalizeService>,
    pub catalog: Arc<dyn CatalogSource>,
}

impl Services {
    pub fn from_backend(backend: Arc<HttpBackend>) -> Self {
        Self { analysis: backend.clone(), finalize: backend.clone(), catalog: backend }
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    AnalysisFinished { ticket: AnalysisTicket, outcome: Result<AnalysisResult, ServiceError> },
    FinalizeFinished(Result<FinalizeResult, ServiceError>),
    CatalogFetched(Result<Vec<CatalogEntry>, ServiceError>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogUpdate {
    Loaded { entries: usize },
    Failed(ServiceError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverUpdate {
    Analysis(AnalysisOutcome),
    Finalize(FinalizeOutcome),
    Catalog(CatalogUpdate),
}

pub struct SessionDriver {
    session: QuoteSession,
    catalog: CatalogMatcher,
    services: Services,
    sender: mpsc::Sender<SessionEvent>,
    receiver: mpsc::Receiver<SessionEvent>,
    in_flight: usize,
    correlation_id: String,
}

impl SessionDriver {
    pub fn new(session: QuoteSession, services: Services) -> Self {
        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        Self {
            session,
            catalog: CatalogMatcher::default(),
            services,
            sender,
            receiver,
            in_flight: 0,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn session(&self) -> &QuoteSession {
        &self.session
    }

    /// Direct access for synchronous edits. Network-backed transitions go
    /// through the driver methods instead.
    pub fn session_mut(&mut self) -> &mut QuoteSession {
        &mut self.session
    }

    pub fn catalog(&self) -> &CatalogMatcher {
        &self.catalog
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Number of spawned calls whose results have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        self.catalog.search(query)
    }

    /// Adds the catalog entry with this SKU, or bumps its quantity. `Ok(None)`
    /// means the SKU is not in the loaded catalog.
    pub fn add_from_catalog(&mut self, sku: &str) -> Result<Option<&LineItem>, DomainError> {
        let Some(entry) = self.catalog.find_by_sku(sku) else {
            return Ok(None);
        };
        let candidate = ProductCandidate::from(entry);
        self.session.upsert(candidate).map(Some)
    }

    pub fn load_catalog(&mut self) {
        let source = Arc::clone(&self.services.catalog);
        self.spawn(async move { SessionEvent::CatalogFetched(source.fetch_catalog().await) }, |error| {
            SessionEvent::CatalogFetched(Err(error))
        });
    }

    pub fn submit_prompt(&mut self, prompt: &str) -> Result<AnalysisTicket, DomainError> {
        let ticket = self.session.begin_analysis(prompt)?;
        info!(
            event_name = "session.analysis.started",
            correlation_id = %self.correlation_id,
            generation = ticket.generation(),
            "analysis submitted"
        );

        let service = Arc::clone(&self.services.analysis);
        let prompt = prompt.to_string();
        self.spawn(
            async move {
                let outcome = service.analyze(&prompt).await;
                SessionEvent::AnalysisFinished { ticket, outcome }
            },
            move |error| SessionEvent::AnalysisFinished { ticket, outcome: Err(error) },
        );
        Ok(ticket)
    }

    pub fn confirm(&mut self) -> Result<(), DomainError> {
        let request = self.session.begin_finalize()?;
        info!(
            event_name = "session.finalize.started",
            correlation_id = %self.correlation_id,
            items = request.items.len(),
            grand_total = %request.totals.grand_total,
            "finalize submitted"
        );

        let service = Arc::clone(&self.services.finalize);
        self.spawn(
            async move { SessionEvent::FinalizeFinished(service.finalize(&request).await) },
            |error| SessionEvent::FinalizeFinished(Err(error)),
        );
        Ok(())
    }

    pub fn start_new(&mut self, today: NaiveDate) -> Result<(), DomainError> {
        self.session.start_new(today)?;
        info!(
            event_name = "session.reset",
            correlation_id = %self.correlation_id,
            generation = self.session.generation(),
            "started a new quotation"
        );
        Ok(())
    }

    /// Waits for the next spawned call to report and applies it. Returns
    /// `None` when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<DriverUpdate> {
        if self.in_flight == 0 {
            return None;
        }
        let event = self.receiver.recv().await?;
        self.in_flight -= 1;
        Some(self.apply(event))
    }

    /// Drains every in-flight call, returning the updates in arrival order.
    pub async fn settle(&mut self) -> Vec<DriverUpdate> {
        let mut updates = Vec::with_capacity(self.in_flight);
        while let Some(update) = self.next_event().await {
            updates.push(update);
        }
        updates
    }

    pub fn apply(&mut self, event: SessionEvent) -> DriverUpdate {
        match event {
            SessionEvent::AnalysisFinished { ticket, outcome } => {
                let applied = self.session.complete_analysis(ticket, outcome);
                self.log_analysis(&applied);
                DriverUpdate::Analysis(applied)
            }
            SessionEvent::FinalizeFinished(outcome) => {
                let applied = self.session.complete_finalize(outcome);
                self.log_finalize(&applied);
                DriverUpdate::Finalize(applied)
            }
            SessionEvent::CatalogFetched(Ok(entries)) => {
                let count = entries.len();
                self.catalog.load(entries);
                info!(
                    event_name = "session.catalog.loaded",
                    correlation_id = %self.correlation_id,
                    entries = count,
                    "catalog loaded"
                );
                DriverUpdate::Catalog(CatalogUpdate::Loaded { entries: count })
            }
            SessionEvent::CatalogFetched(Err(error)) => {
                warn!(
                    event_name = "session.catalog.failed",
                    correlation_id = %self.correlation_id,
                    error = %error,
                    "catalog unavailable; manual search disabled"
                );
                DriverUpdate::Catalog(CatalogUpdate::Failed(error))
            }
        }
    }

    /// Runs `call` on its own task. A call that panics or is cancelled still
    /// reports once, through `on_abort`, so `in_flight` always drains.
    fn spawn<F, A>(&mut self, call: F, on_abort: A)
    where
        F: std::future::Future<Output = SessionEvent> + Send + 'static,
        A: FnOnce(ServiceError) -> SessionEvent + Send + 'static,
    {
        let sender = self.sender.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let event = match tokio::spawn(call).await {
                Ok(event) => event,
                Err(error) => {
                    warn!(
                        event_name = "session.call.aborted",
                        error = %error,
                        "service call ended without a result"
                    );
                    on_abort(ServiceError::Transport(format!("service call aborted: {error}")))
                }
            };
            if sender.send(event).await.is_err() {
                debug!(event_name = "session.event.dropped", "driver closed before call returned");
            }
        });
    }

    fn log_analysis(&self, outcome: &AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::Applied { items, suggested_customer } => info!(
                event_name = "session.analysis.applied",
                correlation_id = %self.correlation_id,
                items,
                suggested_customer = suggested_customer.is_some(),
                "analysis applied"
            ),
            AnalysisOutcome::Stale { generation, current } => info!(
                event_name = "session.analysis.stale_discarded",
                correlation_id = %self.correlation_id,
                generation,
                current,
                "discarded superseded analysis response"
            ),
            AnalysisOutcome::Failed(notice) => warn!(
                event_name = "session.analysis.failed",
                correlation_id = %self.correlation_id,
                error_class = notice.error.error_class(),
                error = %notice.error,
                "analysis failed"
            ),
        }
    }

    fn log_finalize(&self, outcome: &FinalizeOutcome) {
        match outcome {
            FinalizeOutcome::Finalized(receipt) => {
                info!(
                    event_name = "session.finalize.completed",
                    correlation_id = %self.correlation_id,
                    invoice_no = %receipt.invoice_no.0,
                    grand_total = %receipt.totals.grand_total,
                    "quotation finalized"
                );
                if let Some(anomaly) = &receipt.anomaly {
                    warn!(
                        event_name = "session.finalize.total_mismatch",
                        correlation_id = %self.correlation_id,
                        reported = %anomaly.reported,
                        computed = %anomaly.computed,
                        "backend grand total differs from local totals"
                    );
                }
            }
            FinalizeOutcome::Failed(notice) => warn!(
                event_name = "session.finalize.failed",
                correlation_id = %self.correlation_id,
                error_class = notice.error.error_class(),
                error = %notice.error,
                "finalize failed"
            ),
            FinalizeOutcome::Ignored => debug!(
                event_name = "session.finalize.ignored",
                correlation_id = %self.correlation_id,
                "finalize response arrived with nothing in flight"
            ),
        }
    }
}
