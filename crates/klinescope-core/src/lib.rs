//! # Klinescope Core
//!
//! Request orchestration for the klinescope stock-chart client.
//!
//! ## Overview
//!
//! A user picks A-share symbols and a market index, asks the backend to build a
//! comparison chart, and views it. This crate owns everything between the user
//! and the backend:
//!
//! - **Debounced search** for the symbol picker, with stale-result suppression
//! - **Parallel bootstrap** of the hot symbol pool and the index list
//! - **Form gate** deciding when a chart may be requested
//! - **Chart pipeline** with at most one request in flight and a 30 s deadline
//! - **Presenter** for the status line and auto-dismissing notifications
//! - **Renderer** that overlays interaction settings and drives a sink
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Backend contract and HTTP implementation |
//! | [`app`] | Session event loop, snapshots, and handle |
//! | [`bootstrap`] | Initial pool loading and default selection |
//! | [`cache`] | Session cache for search results |
//! | [`config`] | Session configuration |
//! | [`domain`] | Domain models (Symbol, IndexName, Selection) |
//! | [`error`] | Error taxonomy |
//! | [`form`] | Selection ownership and the submit gate |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Chart request lifecycle |
//! | [`presenter`] | Status line and notifications |
//! | [`render`] | Figure preparation and render sinks |
//! | [`search`] | Debounced remote search |
//! | [`task`] | Supervised background tasks |
//! | [`timer`] | Cancellable timers |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use klinescope_core::{App, AppConfig, HttpChartBackend, MemorySink, ReqwestHttpClient, UserAction};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let backend = HttpChartBackend::new(Arc::new(ReqwestHttpClient::new()), &config.base_url);
//!     let (app, handle) = App::new(config, Arc::new(backend), Box::new(MemorySink::new()));
//!     app.spawn();
//!
//!     handle.wait_for(|snapshot| snapshot.can_submit).await?;
//!     handle.dispatch(UserAction::Submit)?;
//!     let done = handle.wait_for(|snapshot| !snapshot.status.busy).await?;
//!     println!("{}", done.status.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / User     │
//! └────────┬────────┘
//!          │ UserAction
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  App event loop │────▶│ Timers / tasks   │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │ events
//!          ▼                       ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Form / Pipeline │────▶│ ChartBackend     │
//! │ Presenter       │     │ (HTTP client)    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ChartRenderer   │
//! │ (RenderSink)    │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Nothing is fatal to a session. Every failure ends with the request state
//! back at `Idle` and the gate recomputed:
//!
//! ```rust
//! use klinescope_core::{ApiError, SubmitError, SUBMIT_FAILURE_MESSAGE};
//!
//! let error = SubmitError::from(ApiError::transport("connection refused"));
//! assert_eq!(error.user_message(), SUBMIT_FAILURE_MESSAGE);
//! ```

pub mod api;
pub mod app;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod form;
pub mod http_client;
pub mod pipeline;
pub mod presenter;
pub mod render;
pub mod search;
pub mod task;
pub mod timer;

// Re-export commonly used types at crate root for convenience

// Backend contract
pub use api::{ChartBackend, ChartResponse, HttpChartBackend};

// Session
pub use app::{App, AppHandle, AppSnapshot, UserAction};

// Components
pub use bootstrap::{BootstrapFetch, BootstrapLoader, BootstrapPhase, BootstrapReport, Defaults};
pub use form::FormStateMachine;
pub use pipeline::{ChartRequestPipeline, ChartSuccess, ChartTicket, PendingChart, RequestState};
pub use presenter::{Notification, NotificationId, Severity, StatusAndAlertPresenter, StatusLine};
pub use render::{
    ChartRenderer, ChartView, FigureFileSink, InteractionOptions, MemorySink, RenderSink, SinkCall,
};
pub use search::{RemoteSearchController, SearchEvent, SearchFetcher, SearchResults};

// Caching
pub use cache::{CacheMode, CacheStore};

// Configuration
pub use config::{AppConfig, AppConfigBuilder};

// Domain models
pub use domain::{ChartRequest, DateRange, IndexName, Selection, Symbol, SymbolId};

// Error types
pub use error::{
    ApiError, ApiErrorKind, BootstrapError, CoreError, RenderError, SubmitError, SubmitRejection,
    ValidationError, RENDER_FAILURE_MESSAGE, SUBMIT_FAILURE_MESSAGE, TIMEOUT_MESSAGE,
};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
