//! Debounced remote search for the symbol picker.
//!
//! ```text
//! query_changed("mao")  ─┐ (re-arms 300 ms timer)
//! query_changed("maot") ─┤
//!                        └─► Due{timer} ─► seq += 1 ─► spawn lookup ─► Resolved{seq}
//!                                                                     applied iff seq is newest
//! ```
//!
//! Failures never reach the user: a failed lookup resolves to an empty list
//! and is logged at `warn`. Only successful responses are cached.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::ChartBackend;
use crate::cache::{CacheMode, CacheStore};
use crate::task::Supervisor;
use crate::timer::{TimerHandle, TimerId, TimerQueue};
use crate::Symbol;

/// Events the controller schedules for itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// Quiet period elapsed for the query armed under `timer`.
    Due { timer: TimerId, query: String },
    /// A lookup issued as number `seq` finished.
    Resolved {
        seq: u64,
        query: String,
        symbols: Vec<Symbol>,
    },
}

/// Latest applied search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub query: String,
    pub symbols: Vec<Symbol>,
}

/// Cached lookups against the backend search endpoint.
#[derive(Clone)]
pub struct SearchFetcher {
    backend: Arc<dyn ChartBackend>,
    cache: CacheStore<Vec<Symbol>>,
    limit: usize,
    mode: CacheMode,
}

impl SearchFetcher {
    pub fn new(backend: Arc<dyn ChartBackend>, limit: usize, mode: CacheMode) -> Self {
        Self {
            backend,
            cache: CacheStore::session(),
            limit,
            mode,
        }
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Results for `query`, from the cache when allowed. Never fails.
    pub async fn lookup(&self, query: &str) -> Vec<Symbol> {
        if self.mode.reads() {
            if let Some(hit) = self.cache.get(query).await {
                debug!(query, hits = hit.len(), "search cache hit");
                return hit;
            }
        }

        match self.backend.search_stocks(query, self.limit).await {
            Ok(symbols) => {
                if self.mode.writes() {
                    self.cache.put(query, symbols.clone()).await;
                }
                symbols
            }
            Err(error) => {
                warn!(query, code = error.code(), %error, "stock search failed");
                Vec::new()
            }
        }
    }

    pub async fn cached_queries(&self) -> usize {
        self.cache.len().await
    }
}

/// Query-to-results bridge with debounce and stale-result suppression.
///
/// Generic over the session event type `E` so it can share the session
/// queue; `wrap` lifts a [`SearchEvent`] into `E`.
pub struct RemoteSearchController<E> {
    fetcher: SearchFetcher,
    debounce: Duration,
    timers: TimerQueue<E>,
    supervisor: Supervisor<E>,
    wrap: fn(SearchEvent) -> E,
    pending: Option<TimerHandle>,
    issued: u64,
    results: Option<SearchResults>,
}

impl<E: Send + 'static> RemoteSearchController<E> {
    pub fn new(
        fetcher: SearchFetcher,
        debounce: Duration,
        supervisor: Supervisor<E>,
        wrap: fn(SearchEvent) -> E,
    ) -> Self {
        Self {
            fetcher,
            debounce,
            timers: TimerQueue::new(supervisor.sender()),
            supervisor,
            wrap,
            pending: None,
            issued: 0,
            results: None,
        }
    }

    /// Input changed: cancel any armed timer and re-arm for `query`.
    pub fn query_changed(&mut self, query: impl Into<String>) {
        let query = query.into();
        if let Some(previous) = self.pending.take() {
            self.timers.cancel(previous);
        }
        let wrap = self.wrap;
        self.pending = Some(
            self.timers
                .schedule(self.debounce, move |timer| wrap(SearchEvent::Due { timer, query })),
        );
    }

    /// Feed back an event. Returns `true` when the visible results changed.
    pub fn handle(&mut self, event: SearchEvent) -> bool {
        match event {
            SearchEvent::Due { timer, query } => {
                self.fire(timer, query);
                false
            }
            SearchEvent::Resolved {
                seq,
                query,
                symbols,
            } => self.resolve(seq, query, symbols),
        }
    }

    fn fire(&mut self, timer: TimerId, query: String) {
        // Only the newest armed timer may fire; anything else was superseded
        // after it had already been queued.
        if self.pending.as_ref().map(TimerHandle::id) != Some(timer) {
            debug!(?timer, "dropping superseded search timer");
            return;
        }
        self.pending = None;
        self.issued += 1;
        let seq = self.issued;
        debug!(seq, query = %query, "issuing stock search");

        let fetcher = self.fetcher.clone();
        let wrap = self.wrap;
        self.supervisor.spawn("stock-search", async move {
            let symbols = fetcher.lookup(&query).await;
            wrap(SearchEvent::Resolved {
                seq,
                query,
                symbols,
            })
        });
    }

    fn resolve(&mut self, seq: u64, query: String, symbols: Vec<Symbol>) -> bool {
        if seq != self.issued {
            debug!(seq, latest = self.issued, query = %query, "dropping stale search results");
            return false;
        }
        self.results = Some(SearchResults { query, symbols });
        true
    }

    pub fn results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }

    /// Sequence number of the newest issued lookup (0 before the first).
    pub const fn issued(&self) -> u64 {
        self.issued
    }

    /// A debounce timer is armed and has not fired yet.
    pub const fn is_debouncing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn fetcher(&self) -> &SearchFetcher {
        &self.fetcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{search_path, HttpChartBackend};
    use crate::http_client::{HttpError, HttpMethod, HttpResponse, ScriptedHttpClient};
    use tokio::sync::mpsc;

    const MAOTAI: &str = r#"{"success":true,"data":[{"symbol":"sh600519","name":"贵州茅台"}]}"#;

    #[derive(Debug)]
    enum Probe {
        Search(SearchEvent),
        Fault(String),
    }

    fn setup(
        client: ScriptedHttpClient,
        mode: CacheMode,
    ) -> (
        Arc<ScriptedHttpClient>,
        RemoteSearchController<Probe>,
        mpsc::UnboundedReceiver<Probe>,
    ) {
        let client = Arc::new(client);
        let backend = Arc::new(HttpChartBackend::new(client.clone(), "http://backend.test"));
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = RemoteSearchController::new(
            SearchFetcher::new(backend, 50, mode),
            Duration::from_millis(300),
            Supervisor::new(tx, Probe::Fault),
            Probe::Search,
        );
        (client, controller, rx)
    }

    /// Feed queued events back until results change.
    async fn pump(controller: &mut RemoteSearchController<Probe>, rx: &mut mpsc::UnboundedReceiver<Probe>) {
        while let Some(event) = rx.recv().await {
            match event {
                Probe::Search(event) => {
                    if controller.handle(event) {
                        return;
                    }
                }
                Probe::Fault(message) => panic!("unexpected fault: {message}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_issues_one_lookup_for_final_query() {
        let (client, mut controller, mut rx) = setup(
            ScriptedHttpClient::new().on_prefix(HttpMethod::Get, "/api/stocks/search", MAOTAI),
            CacheMode::Use,
        );

        for query in ["m", "ma", "mao", "maot"] {
            controller.query_changed(query);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(controller.is_debouncing());
        pump(&mut controller, &mut rx).await;

        assert!(!controller.is_debouncing());
        assert_eq!(client.call_count("/api/stocks/search"), 1);
        assert_eq!(client.calls()[0].path_and_query(), search_path("maot", 50));
        assert_eq!(controller.results().map(|r| r.query.as_str()), Some("maot"));
        assert_eq!(controller.issued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_response_is_dropped() {
        let slow = HttpResponse::ok_json(r#"{"success":true,"data":[{"symbol":"sz000001","name":"平安银行"}]}"#);
        let (_client, mut controller, mut rx) = setup(
            ScriptedHttpClient::new()
                .on_delayed(HttpMethod::Get, search_path("pa", 50), slow, Duration::from_secs(2))
                .on(HttpMethod::Get, search_path("mao", 50), MAOTAI),
            CacheMode::Use,
        );

        controller.query_changed("pa");
        tokio::time::sleep(Duration::from_millis(350)).await;
        let due = rx.recv().await.expect("first timer");
        match due {
            Probe::Search(event) => assert!(!controller.handle(event)),
            Probe::Fault(message) => panic!("unexpected fault: {message}"),
        }

        controller.query_changed("mao");
        pump(&mut controller, &mut rx).await;
        assert_eq!(controller.results().map(|r| r.query.as_str()), Some("mao"));

        // The straggler for "pa" arrives later and must not replace newer results.
        let straggler = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("straggler arrives")
            .expect("channel open");
        match straggler {
            Probe::Search(event) => assert!(!controller.handle(event)),
            Probe::Fault(message) => panic!("unexpected fault: {message}"),
        }
        assert_eq!(controller.results().map(|r| r.symbols[0].label.as_str()), Some("贵州茅台"));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_query_is_served_from_cache() {
        let (client, mut controller, mut rx) = setup(
            ScriptedHttpClient::new().on_prefix(HttpMethod::Get, "/api/stocks/search", MAOTAI),
            CacheMode::Use,
        );

        controller.query_changed("");
        pump(&mut controller, &mut rx).await;
        controller.query_changed("");
        pump(&mut controller, &mut rx).await;

        assert_eq!(client.call_count("/api/stocks/search"), 1);
        assert_eq!(controller.issued(), 2);
        assert_eq!(controller.fetcher().cached_queries().await, 1);
    }

    #[tokio::test]
    async fn bypass_mode_always_hits_network() {
        let client = Arc::new(
            ScriptedHttpClient::new().on_prefix(HttpMethod::Get, "/api/stocks/search", MAOTAI),
        );
        let backend = Arc::new(HttpChartBackend::new(client.clone(), "http://backend.test"));
        let fetcher = SearchFetcher::new(backend, 50, CacheMode::Bypass);

        fetcher.lookup("mao").await;
        fetcher.lookup("mao").await;
        assert_eq!(client.call_count("/api/stocks/search"), 2);
        assert_eq!(fetcher.cached_queries().await, 0);
    }

    #[tokio::test]
    async fn failures_resolve_empty_and_are_not_cached() {
        let client = Arc::new(ScriptedHttpClient::new().on_error(
            HttpMethod::Get,
            search_path("mao", 50),
            HttpError::new("connection refused"),
            Duration::ZERO,
        ));
        let backend = Arc::new(HttpChartBackend::new(client.clone(), "http://backend.test"));
        let fetcher = SearchFetcher::new(backend, 50, CacheMode::Use);

        assert!(fetcher.lookup("mao").await.is_empty());
        assert!(fetcher.lookup("mao").await.is_empty());
        assert_eq!(client.call_count("/api/stocks/search"), 2);
    }
}
