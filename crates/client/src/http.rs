//! `reqwest` adapter for the quotation backend.
//!
//! One [`HttpBackend`] serves every port. The base URL is resolved from
//! [`BackendConfig`] once and never re-read.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use smartquote_core::config::BackendConfig;
use smartquote_core::domain::catalog::CatalogEntry;
use smartquote_core::errors::ServiceError;
use smartquote_core::ports::{
    AnalysisResult, AnalysisService, CatalogSource, DeleteOutcome, FinalizeRequest,
    FinalizeResult, FinalizeService, HistoryEntry, HistoryService,
};
use smartquote_core::wire::{
    error_detail, parse_catalog, AnalyzeRequestBody, AnalyzeResponseBody, FinalizeRequestBody,
    FinalizeResponseBody,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ClientError;

pub const ANALYZE_PATH: &str = "analyze-request";
pub const FINALIZE_PATH: &str = "finalize-quotation";
pub const PRODUCTS_PATH: &str = "products";
pub const HISTORY_PATH: &str = "history";

const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone, Debug)]
pub struct HttpBackend {
    pub(crate) client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { client, base_url: config.base().to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn history_item_url(&self, filename: &str) -> Result<Url, ClientError> {
        let raw = self.endpoint(HISTORY_PATH);
        let mut url = Url::parse(&raw)
            .map_err(|error| ClientError::InvalidUrl { url: raw.clone(), reason: error.to_string() })?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| ClientError::InvalidUrl {
                url: raw.clone(),
                reason: "base url cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty().push(filename);
        }
        Ok(url)
    }

    async fn get_json(&self, path: &str, correlation_id: &str) -> Result<Value, ClientError> {
        let endpoint = self.endpoint(path);
        debug!(event_name = "client.request.sent", correlation_id, method = "GET", %endpoint);
        let response = self
            .client
            .get(&endpoint)
            .header(CORRELATION_HEADER, correlation_id)
            .send()
            .await
            .map_err(|source| ClientError::Request { endpoint: endpoint.clone(), source })?;
        read_json(&endpoint, response).await
    }

    async fn post_json<B>(&self, path: &str, body: &B, correlation_id: &str) -> Result<Value, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let endpoint = self.endpoint(path);
        debug!(event_name = "client.request.sent", correlation_id, method = "POST", %endpoint);
        let response = self
            .client
            .post(&endpoint)
            .header(CORRELATION_HEADER, correlation_id)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Request { endpoint: endpoint.clone(), source })?;
        read_json(&endpoint, response).await
    }

    async fn request_analysis(
        &self,
        prompt: &str,
        correlation_id: &str,
    ) -> Result<AnalysisResult, ServiceError> {
        let payload =
            self.post_json(ANALYZE_PATH, &AnalyzeRequestBody { prompt }, correlation_id).await?;
        let body: AnalyzeResponseBody = decode(&self.endpoint(ANALYZE_PATH), payload)?;
        body.into_result()
    }

    async fn request_finalize(
        &self,
        request: &FinalizeRequest,
        correlation_id: &str,
    ) -> Result<FinalizeResult, ServiceError> {
        let payload = self
            .post_json(FINALIZE_PATH, &FinalizeRequestBody::from(request), correlation_id)
            .await?;
        let body: FinalizeResponseBody = decode(&self.endpoint(FINALIZE_PATH), payload)?;
        body.into_result()
    }

    async fn request_delete(
        &self,
        filename: &str,
        correlation_id: &str,
    ) -> Result<DeleteOutcome, ClientError> {
        let url = self.history_item_url(filename)?;
        let endpoint = url.to_string();
        debug!(event_name = "client.request.sent", correlation_id, method = "DELETE", %endpoint);
        let response = self
            .client
            .delete(url)
            .header(CORRELATION_HEADER, correlation_id)
            .send()
            .await
            .map_err(|source| ClientError::Request { endpoint: endpoint.clone(), source })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        ensure_success(&endpoint, response).await?;
        Ok(DeleteOutcome::Deleted)
    }
}

/// Turns a non-2xx response into [`ClientError::Status`], preferring the
/// backend's own `detail`/`error` text over the raw body.
pub(crate) async fn ensure_success(
    endpoint: &str,
    response: Response,
) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&text)
        .ok()
        .as_ref()
        .and_then(error_detail)
        .or_else(|| Some(text.trim().to_string()).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(ClientError::Status { endpoint: endpoint.to_string(), status: status.as_u16(), detail })
}

async fn read_json(endpoint: &str, response: Response) -> Result<Value, ClientError> {
    let response = ensure_success(endpoint, response).await?;
    let text = response
        .text()
        .await
        .map_err(|source| ClientError::Request { endpoint: endpoint.to_string(), source })?;
    serde_json::from_str(&text)
        .map_err(|error| ClientError::Decode { endpoint: endpoint.to_string(), reason: error.to_string() })
}

fn decode<T: DeserializeOwned>(endpoint: &str, payload: Value) -> Result<T, ClientError> {
    serde_json::from_value(payload)
        .map_err(|error| ClientError::Decode { endpoint: endpoint.to_string(), reason: error.to_string() })
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl AnalysisService for HttpBackend {
    async fn analyze(&self, prompt: &str) -> Result<AnalysisResult, ServiceError> {
        let correlation_id = new_correlation_id();
        info!(
            event_name = "client.analysis.requested",
            correlation_id = %correlation_id,
            prompt_chars = prompt.chars().count(),
            "requesting product analysis"
        );

        let result = self.request_analysis(prompt, &correlation_id).await;
        match &result {
            Ok(analysis) => info!(
                event_name = "client.analysis.completed",
                correlation_id = %correlation_id,
                items = analysis.items.len(),
                suggested_customer = analysis.suggested_customer.is_some(),
                "product analysis completed"
            ),
            Err(error) => warn!(
                event_name = "client.analysis.failed",
                correlation_id = %correlation_id,
                error_class = error.error_class(),
                error = %error,
                "product analysis failed"
            ),
        }
        result
    }
}

#[async_trait]
impl FinalizeService for HttpBackend {
    async fn finalize(&self, request: &FinalizeRequest) -> Result<FinalizeResult, ServiceError> {
        let correlation_id = new_correlation_id();
        info!(
            event_name = "client.finalize.requested",
            correlation_id = %correlation_id,
            items = request.items.len(),
            grand_total = %request.totals.grand_total,
            "requesting quotation finalize"
        );

        let result = self.request_finalize(request, &correlation_id).await;
        match &result {
            Ok(finalized) => info!(
                event_name = "client.finalize.completed",
                correlation_id = %correlation_id,
                invoice_no = %finalized.invoice_no,
                "quotation finalized"
            ),
            Err(error) => warn!(
                event_name = "client.finalize.failed",
                correlation_id = %correlation_id,
                error_class = error.error_class(),
                error = %error,
                "quotation finalize failed"
            ),
        }
        result
    }
}

#[async_trait]
impl CatalogSource for HttpBackend {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ServiceError> {
        let correlation_id = new_correlation_id();
        let payload = self.get_json(PRODUCTS_PATH, &correlation_id).await.map_err(|error| {
            warn!(
                event_name = "client.catalog.failed",
                correlation_id = %correlation_id,
                error = %error,
                "catalog fetch failed"
            );
            ServiceError::from(error)
        })?;

        let entries = parse_catalog(payload);
        info!(
            event_name = "client.catalog.loaded",
            correlation_id = %correlation_id,
            entries = entries.len(),
            "catalog fetched"
        );
        Ok(entries)
    }
}

#[async_trait]
impl HistoryService for HttpBackend {
    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ServiceError> {
        let correlation_id = new_correlation_id();
        let payload = self.get_json(HISTORY_PATH, &correlation_id).await?;
        let entries: Vec<HistoryEntry> = decode(&self.endpoint(HISTORY_PATH), payload)?;
        info!(
            event_name = "client.history.listed",
            correlation_id = %correlation_id,
            entries = entries.len(),
            "history listed"
        );
        Ok(entries)
    }

    async fn delete_history(&self, filename: &str) -> Result<DeleteOutcome, ServiceError> {
        let correlation_id = new_correlation_id();
        let outcome = self.request_delete(filename, &correlation_id).await?;
        info!(
            event_name = "client.history.deleted",
            correlation_id = %correlation_id,
            filename,
            outcome = ?outcome,
            "history entry delete handled"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use smartquote_core::config::BackendConfig;

    use super::HttpBackend;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(&BackendConfig { base_url: base_url.to_string(), connect_timeout_secs: 5 })
            .expect("client builds")
    }

    #[test]
    fn endpoints_join_without_double_slashes() {
        let backend = backend("http://127.0.0.1:8000/");
        assert_eq!(backend.base_url(), "http://127.0.0.1:8000");
        assert_eq!(backend.endpoint("/products"), "http://127.0.0.1:8000/products");
        assert_eq!(backend.endpoint("history"), "http://127.0.0.1:8000/history");
    }

    #[test]
    fn history_item_url_encodes_filename() {
        let backend = backend("http://127.0.0.1:8000/api");
        let url = backend.history_item_url("Quote 12/A.pdf").expect("url builds");
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/history/Quote%2012%2FA.pdf");
    }
}
