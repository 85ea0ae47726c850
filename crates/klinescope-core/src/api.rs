//! Backend contract and its HTTP implementation.
//!
//! # Endpoints
//!
//! | Method | Path | Response `data` |
//! |--------|------|-----------------|
//! | GET | `/api/stocks/search?q=&limit=` | `[{symbol, name}]` |
//! | GET | `/api/stocks?limit=` | `[{symbol, name}]` (hot set) |
//! | GET | `/api/indices` | `[string]` |
//! | POST | `/api/chart` | `{chart, stock_count, index_name}` |
//!
//! Every response carries `success: bool` and an optional `error` message.
//! `success: false` is reported as [`ApiErrorKind::Application`] so callers can
//! treat it exactly like a transport failure.
//!
//! [`ApiErrorKind::Application`]: crate::ApiErrorKind::Application

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::{ApiError, ChartRequest, IndexName, Symbol, SymbolId};

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Successful chart response, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartResponse {
    /// Opaque figure document, passed through to the renderer.
    pub chart: String,
    pub stock_count: usize,
    pub index_name: String,
}

/// Chart backend contract.
///
/// # Required Methods
///
/// | Method | Description |
/// |--------|-------------|
/// | [`search_stocks`](ChartBackend::search_stocks) | Picker search, empty query allowed |
/// | [`hot_stocks`](ChartBackend::hot_stocks) | Pre-filtered bootstrap pool |
/// | [`indices`](ChartBackend::indices) | Full index list |
/// | [`chart`](ChartBackend::chart) | Chart generation |
pub trait ChartBackend: Send + Sync {
    fn search_stocks<'a>(&'a self, query: &'a str, limit: usize) -> BackendFuture<'a, Vec<Symbol>>;

    fn hot_stocks<'a>(&'a self, limit: usize) -> BackendFuture<'a, Vec<Symbol>>;

    fn indices<'a>(&'a self) -> BackendFuture<'a, Vec<IndexName>>;

    /// `timeout_ms` is forwarded to the transport as its own deadline.
    fn chart<'a>(&'a self, request: ChartRequest, timeout_ms: u64) -> BackendFuture<'a, ChartResponse>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StockRow {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    success: bool,
    #[serde(default)]
    chart: Option<String>,
    #[serde(default)]
    stock_count: Option<usize>,
    #[serde(default)]
    index_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// HTTP implementation of [`ChartBackend`].
#[derive(Clone)]
pub struct HttpChartBackend {
    http: Arc<dyn HttpClient>,
    base_url: String,
    request_timeout_ms: u64,
}

impl HttpChartBackend {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            base_url,
            request_timeout_ms: 10_000,
        }
    }

    /// Transport timeout for the list and search endpoints.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    async fn get_envelope<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, ApiError> {
        let request = HttpRequest::get(self.url(path_and_query))
            .with_header("accept", "application/json")
            .with_timeout_ms(self.request_timeout_ms);
        let response = self.http.execute(request).await.map_err(transport_error)?;
        let envelope: Envelope<T> = decode(&response)?;

        if !envelope.success {
            return Err(application_error(envelope.error));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::malformed("successful response is missing 'data'"))
    }
}

impl ChartBackend for HttpChartBackend {
    fn search_stocks<'a>(&'a self, query: &'a str, limit: usize) -> BackendFuture<'a, Vec<Symbol>> {
        Box::pin(async move {
            let path = search_path(query, limit);
            let rows: Vec<StockRow> = self.get_envelope(&path).await?;
            Ok(rows_to_symbols(rows))
        })
    }

    fn hot_stocks<'a>(&'a self, limit: usize) -> BackendFuture<'a, Vec<Symbol>> {
        Box::pin(async move {
            let rows: Vec<StockRow> = self.get_envelope(&hot_path(limit)).await?;
            Ok(rows_to_symbols(rows))
        })
    }

    fn indices<'a>(&'a self) -> BackendFuture<'a, Vec<IndexName>> {
        Box::pin(async move {
            let names: Vec<String> = self.get_envelope(INDICES_PATH).await?;
            names
                .into_iter()
                .map(|name| {
                    IndexName::new(name)
                        .map_err(|error| ApiError::malformed(format!("index list: {error}")))
                })
                .collect()
        })
    }

    fn chart<'a>(&'a self, request: ChartRequest, timeout_ms: u64) -> BackendFuture<'a, ChartResponse> {
        Box::pin(async move {
            let body = serde_json::to_string(&request)
                .map_err(|error| ApiError::malformed(format!("chart request: {error}")))?;
            let http_request = HttpRequest::post(self.url(CHART_PATH))
                .with_header("accept", "application/json")
                .with_json_body(body)
                .with_timeout_ms(timeout_ms);

            let response = self
                .http
                .execute(http_request)
                .await
                .map_err(transport_error)?;
            let envelope: ChartEnvelope = decode(&response)?;

            if !envelope.success {
                return Err(application_error(envelope.error));
            }

            let chart = envelope
                .chart
                .ok_or_else(|| ApiError::malformed("successful chart response is missing 'chart'"))?;

            Ok(ChartResponse {
                chart,
                stock_count: envelope.stock_count.unwrap_or(request.stocks.len()),
                index_name: envelope.index_name.unwrap_or(request.index),
            })
        })
    }
}

pub const INDICES_PATH: &str = "/api/indices";
pub const CHART_PATH: &str = "/api/chart";

/// `GET` target for the picker search.
pub fn search_path(query: &str, limit: usize) -> String {
    format!(
        "/api/stocks/search?q={}&limit={limit}",
        urlencoding::encode(query)
    )
}

/// `GET` target for the hot bootstrap pool.
pub fn hot_path(limit: usize) -> String {
    format!("/api/stocks?limit={limit}")
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        // Error bodies may still explain the failure.
        if let Ok(ErrorBody { error: Some(message) }) = serde_json::from_str(&response.body) {
            if !message.trim().is_empty() {
                return Err(ApiError::application(message));
            }
        }
        return Err(ApiError::status(response.status));
    }

    serde_json::from_str(&response.body)
        .map_err(|error| ApiError::malformed(format!("failed to decode response: {error}")))
}

fn transport_error(error: HttpError) -> ApiError {
    if error.is_timeout() {
        ApiError::timeout(error.message())
    } else {
        ApiError::transport(error.message())
    }
}

fn application_error(message: Option<String>) -> ApiError {
    ApiError::application(message.unwrap_or_default())
}

// A bad row drops only itself; envelope failures stay `Malformed`.
fn rows_to_symbols(rows: Vec<StockRow>) -> Vec<Symbol> {
    rows.into_iter()
        .filter_map(|row| match SymbolId::parse(&row.symbol) {
            Ok(id) => {
                let label = row.name.unwrap_or_else(|| id.as_str().to_owned());
                Some(Symbol::new(id, label))
            }
            Err(error) => {
                warn!(symbol = %row.symbol, %error, "skipping unparseable stock row");
                None
            }
        })
        .collect()
}
