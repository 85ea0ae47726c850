//! Shared fixtures for the klinescope behavior tests.

pub use std::sync::Arc;

use klinescope_core::api::{hot_path, CHART_PATH, INDICES_PATH};
use klinescope_core::{
    App, AppConfig, AppHandle, AppSnapshot, BootstrapPhase, HttpChartBackend, HttpMethod,
    MemorySink, ScriptedHttpClient,
};
use serde_json::json;

pub const BASE_URL: &str = "http://backend.test";

/// Hot pool containing only the flagship symbol.
pub const HOT_FLAGSHIP: &str = r#"{"success":true,"data":[{"symbol":"sh600519","name":"Flagship"}]}"#;

pub const HOT_TWO: &str = r#"{"success":true,"data":[
  {"symbol":"sh600519","name":"贵州茅台"},
  {"symbol":"sz000001","name":"平安银行"}
]}"#;

pub const INDICES: &str = r#"{"success":true,"data":["上证指数","深证成指"]}"#;

/// Minimal figure document.
pub fn figure() -> String {
    json!({
        "data": [{"type": "scatter", "mode": "lines", "y": [1.0, 1.1, 0.9]}],
        "layout": {"title": {"text": "对比"}},
    })
    .to_string()
}

/// Successful chart response body.
pub fn chart_body(stock_count: usize, index_name: &str) -> String {
    json!({
        "success": true,
        "chart": figure(),
        "stock_count": stock_count,
        "index_name": index_name,
    })
    .to_string()
}

/// Backend that bootstraps with the given hot pool and the two default indices.
pub fn bootstrapped(hot: &str) -> ScriptedHttpClient {
    ScriptedHttpClient::new()
        .on(HttpMethod::Get, hot_path(20), hot)
        .on(HttpMethod::Get, INDICES_PATH, INDICES)
}

/// Same as [`bootstrapped`] plus a chart endpoint that always succeeds.
pub fn charting(hot: &str, stock_count: usize) -> ScriptedHttpClient {
    bootstrapped(hot).on(HttpMethod::Post, CHART_PATH, chart_body(stock_count, "上证指数"))
}

/// A running session wired to a scripted backend and an in-memory sink.
pub struct Harness {
    pub client: Arc<ScriptedHttpClient>,
    pub handle: AppHandle,
    pub sink: MemorySink,
}

impl Harness {
    pub fn start(client: ScriptedHttpClient) -> Self {
        Self::start_with(AppConfig::default(), client)
    }

    pub fn start_with(config: AppConfig, client: ScriptedHttpClient) -> Self {
        let client = Arc::new(client);
        let backend = Arc::new(HttpChartBackend::new(client.clone(), BASE_URL));
        let sink = MemorySink::new();
        let (app, handle) = App::new(config, backend, Box::new(sink.clone()));
        app.spawn();
        Self {
            client,
            handle,
            sink,
        }
    }

    /// Wait for bootstrap to finish, successfully or not.
    pub async fn bootstrapped(&self) -> AppSnapshot {
        self.handle
            .wait_for(|snapshot| {
                matches!(snapshot.phase, BootstrapPhase::Ready | BootstrapPhase::Failed)
            })
            .await
            .expect("session alive")
    }

    pub fn chart_calls(&self) -> usize {
        self.client.call_count(CHART_PATH)
    }

    pub fn search_calls(&self) -> usize {
        self.client.call_count("/api/stocks/search")
    }
}

/// The submit gate recomputed from a snapshot's own fields.
pub fn expected_gate(snapshot: &AppSnapshot) -> bool {
    klinescope_core::form::can_submit(
        &snapshot.selection,
        snapshot.request_state,
        snapshot.status.busy,
    )
}
