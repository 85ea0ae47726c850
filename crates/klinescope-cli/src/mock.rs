//! Built-in offline backend for `--mock`.

use klinescope_core::api::{CHART_PATH, INDICES_PATH};
use klinescope_core::{HttpMethod, ScriptedHttpClient};

const HOT_STOCKS: &str = r#"{"success":true,"data":[
  {"symbol":"sh600519","name":"贵州茅台"},
  {"symbol":"sz000001","name":"平安银行"},
  {"symbol":"sh601318","name":"中国平安"},
  {"symbol":"sz000858","name":"五粮液"},
  {"symbol":"sz300750","name":"宁德时代"}
]}"#;

const INDICES: &str = r#"{"success":true,"data":["上证指数","深证成指","创业板指","沪深300"]}"#;

const SEARCH: &str = r#"{"success":true,"data":[
  {"symbol":"sh600519","name":"贵州茅台"},
  {"symbol":"sz000858","name":"五粮液"},
  {"symbol":"sz000568","name":"泸州老窖"}
]}"#;

// Counts and index name are left out so they echo the request.
const CHART: &str = r#"{"success":true,"chart":"{\"data\":[{\"type\":\"scatter\",\"mode\":\"lines\",\"name\":\"贵州茅台\",\"x\":[\"2024-01-02\",\"2024-01-03\",\"2024-01-04\"],\"y\":[1.0,1.02,0.99]},{\"type\":\"scatter\",\"mode\":\"lines\",\"name\":\"上证指数\",\"x\":[\"2024-01-02\",\"2024-01-03\",\"2024-01-04\"],\"y\":[1.0,0.995,1.004]}],\"layout\":{\"title\":{\"text\":\"股票与指数对比\"},\"hovermode\":\"x unified\"}}"}"#;

/// Canned responses for every backend endpoint.
pub fn demo_client() -> ScriptedHttpClient {
    ScriptedHttpClient::new()
        .on_prefix(HttpMethod::Get, "/api/stocks?", HOT_STOCKS)
        .on_prefix(HttpMethod::Get, "/api/stocks/search", SEARCH)
        .on(HttpMethod::Get, INDICES_PATH, INDICES)
        .on(HttpMethod::Post, CHART_PATH, CHART)
}
