use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Minimal HTTP method set needed by the backend client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP request envelope used by backend transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 10_000,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json_body(self, body: impl Into<String>) -> Self {
        let mut request = self.with_header("content-type", "application/json");
        request.body = Some(body.into());
        request
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Path plus query string, without scheme and host.
    pub fn path_and_query(&self) -> &str {
        let without_scheme = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        match without_scheme.find('/') {
            Some(index) => &without_scheme[index..],
            None => "/",
        }
    }
}

/// HTTP response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    timed_out: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// Transport contract for the backend client.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a>;
}

/// Production HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent("klinescope/0.1.0")
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(Duration::from_millis(request.timeout_ms));

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::timed_out(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::timed_out(format!("response body timeout: {e}"))
                } else {
                    HttpError::new(format!("failed to read response body: {e}"))
                }
            })?;

            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Debug, Clone)]
enum ScriptedReply {
    Respond(HttpResponse),
    Fail(HttpError),
}

#[derive(Debug, Clone)]
struct ScriptedRoute {
    method: HttpMethod,
    target: String,
    prefix: bool,
    // Served in order; the last one repeats.
    replies: Vec<(ScriptedReply, Duration)>,
    hits: usize,
}

impl ScriptedRoute {
    fn next_reply(&mut self) -> Option<(ScriptedReply, Duration)> {
        let index = self.hits.min(self.replies.len().checked_sub(1)?);
        self.hits += 1;
        self.replies.get(index).cloned()
    }

    fn matches(&self, request: &HttpRequest) -> bool {
        if self.method != request.method {
            return false;
        }
        let path = request.path_and_query();
        if self.prefix {
            path.starts_with(&self.target)
        } else {
            path == self.target
        }
    }
}

/// Offline transport with canned replies, per-route latency and a call log.
///
/// Exact routes win over prefix routes; within each group the most recently
/// added route wins, so a script can override an earlier default. Requests
/// without a matching route get a 404. A route may carry several replies,
/// served one per call, with the last one repeating.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<ScriptedRoute>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to an exact path-and-query with a 200 JSON body.
    pub fn on(self, method: HttpMethod, target: impl Into<String>, body: impl Into<String>) -> Self {
        let reply = ScriptedReply::Respond(HttpResponse::ok_json(body));
        self.push(method, target.into(), false, reply, Duration::ZERO)
    }

    /// Reply to every request whose path-and-query starts with `prefix`.
    pub fn on_prefix(
        self,
        method: HttpMethod,
        prefix: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let reply = ScriptedReply::Respond(HttpResponse::ok_json(body));
        self.push(method, prefix.into(), true, reply, Duration::ZERO)
    }

    /// Reply with an arbitrary response after `delay`.
    pub fn on_delayed(
        self,
        method: HttpMethod,
        target: impl Into<String>,
        response: HttpResponse,
        delay: Duration,
    ) -> Self {
        self.push(method, target.into(), false, ScriptedReply::Respond(response), delay)
    }

    /// Fail with a transport error after `delay`.
    pub fn on_error(
        self,
        method: HttpMethod,
        target: impl Into<String>,
        error: HttpError,
        delay: Duration,
    ) -> Self {
        self.push(method, target.into(), false, ScriptedReply::Fail(error), delay)
    }

    /// Reply to successive calls with successive `(response, delay)` pairs.
    pub fn on_sequence(
        self,
        method: HttpMethod,
        target: impl Into<String>,
        responses: Vec<(HttpResponse, Duration)>,
    ) -> Self {
        let replies = responses
            .into_iter()
            .map(|(response, delay)| (ScriptedReply::Respond(response), delay))
            .collect();
        self.push_route(method, target.into(), false, replies)
    }

    fn push(
        self,
        method: HttpMethod,
        target: String,
        prefix: bool,
        reply: ScriptedReply,
        delay: Duration,
    ) -> Self {
        self.push_route(method, target, prefix, vec![(reply, delay)])
    }

    fn push_route(
        self,
        method: HttpMethod,
        target: String,
        prefix: bool,
        replies: Vec<(ScriptedReply, Duration)>,
    ) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(ScriptedRoute {
                method,
                target,
                prefix,
                replies,
                hits: 0,
            });
        }
        self
    }

    /// Every request executed so far, in arrival order.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of executed requests whose path starts with `path`.
    pub fn call_count(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|request| request.path_and_query().starts_with(path))
            .count()
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<(ScriptedReply, Duration)> {
        let mut routes = self.routes.lock().ok()?;
        let position = routes
            .iter()
            .rposition(|route| !route.prefix && route.matches(request))
            .or_else(|| {
                routes
                    .iter()
                    .rposition(|route| route.prefix && route.matches(request))
            })?;
        routes[position].next_reply()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(request.clone());
            }

            let Some((reply, delay)) = self.next_reply(&request) else {
                return Ok(HttpResponse::new(404, r#"{"success":false,"error":"not found"}"#));
            };

            if !delay.is_zero() {
                let budget = Duration::from_millis(request.timeout_ms);
                if delay > budget {
                    tokio::time::sleep(budget).await;
                    return Err(HttpError::timed_out(format!(
                        "request timeout after {}ms",
                        request.timeout_ms
                    )));
                }
                tokio::time::sleep(delay).await;
            }

            match reply {
                ScriptedReply::Respond(response) => Ok(response),
                ScriptedReply::Fail(error) => Err(error),
            }
        })
    }
}
