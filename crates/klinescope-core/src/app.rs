//! The session: one task that owns every component and processes events in
//! arrival order.
//!
//! ```text
//!  AppHandle::dispatch ─┐
//!  timers ──────────────┼─► mpsc queue ─► App::run ─► components ─► watch<AppSnapshot>
//!  spawned fetches ─────┘
//! ```
//!
//! Network work runs in supervised tasks that post their results back to the
//! queue, so component state only ever changes on the session task.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::ChartBackend;
use crate::bootstrap::{BootstrapFetch, BootstrapLoader, BootstrapPhase};
use crate::config::AppConfig;
use crate::form::FormStateMachine;
use crate::pipeline::{ChartRequestPipeline, ChartSuccess, ChartTicket, RequestState};
use crate::presenter::{Notification, NotificationId, Severity, StatusAndAlertPresenter, StatusLine};
use crate::render::{ChartRenderer, ChartView, RenderSink};
use crate::search::{RemoteSearchController, SearchEvent, SearchFetcher, SearchResults};
use crate::task::Supervisor;
use crate::{
    ApiError, CoreError, DateRange, IndexName, Selection, SubmitError, SubmitRejection, Symbol,
    SymbolId, RENDER_FAILURE_MESSAGE,
};

pub const STATUS_BOOTSTRAPPING: &str = "正在加载股票和指数数据...";
pub const STATUS_READY: &str = "数据加载完成，就绪";
pub const STATUS_BOOTSTRAP_FAILED: &str = "数据加载失败";
pub const BOOTSTRAP_FAILED_ALERT: &str = "数据加载失败，请刷新页面重试";
pub const STATUS_SUBMITTING: &str = "正在生成图表...";
pub const CHART_SUCCESS_ALERT: &str = "图表生成成功！鼠标悬浮可查看详细数据";
pub const STATUS_RESET: &str = "已重置，就绪";
pub const RESET_ALERT: &str = "表单已重置";
pub const FAULT_ALERT: &str = "应用出现错误，请刷新页面";

/// Everything a user can do to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Picker input changed.
    QueryChanged(String),
    SelectSymbols(Vec<SymbolId>),
    /// Pick a symbol, typically from search results.
    AddSymbol(Symbol),
    RemoveSymbol(SymbolId),
    SetIndex(Option<IndexName>),
    SetNormalize(bool),
    SetDateRange(DateRange),
    Submit,
    Reset,
    /// Close the current notification.
    Dismiss,
    /// Report an unexpected failure from outside the session.
    Fault(String),
    Shutdown,
}

impl UserAction {
    /// Whether the action changes the form's selection.
    pub const fn edits_form(&self) -> bool {
        matches!(
            self,
            Self::SelectSymbols(_)
                | Self::AddSymbol(_)
                | Self::RemoveSymbol(_)
                | Self::SetIndex(_)
                | Self::SetNormalize(_)
                | Self::SetDateRange(_)
        )
    }
}

#[derive(Debug)]
enum Event {
    Action(UserAction),
    Search(SearchEvent),
    BootstrapFinished(BootstrapFetch),
    ChartResolved {
        ticket: ChartTicket,
        outcome: Result<ChartSuccess, SubmitError>,
    },
    NotificationExpired(NotificationId),
    Fault(String),
    Sync(oneshot::Sender<AppSnapshot>),
}

/// Immutable view of the session, published after every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSnapshot {
    pub phase: BootstrapPhase,
    pub symbols: Vec<Symbol>,
    pub indices: Vec<IndexName>,
    pub selection: Selection,
    pub request_state: RequestState,
    pub can_submit: bool,
    pub status: StatusLine,
    pub notification: Option<Notification>,
    pub chart_info: Option<String>,
    pub view: ChartView,
    pub search: Option<SearchResults>,
}

impl AppSnapshot {
    pub fn label_for(&self, id: &SymbolId) -> Option<&str> {
        self.symbols
            .iter()
            .find(|symbol| symbol.id == *id)
            .map(|symbol| symbol.label.as_str())
    }
}

/// Cloneable front door to a running session.
#[derive(Debug, Clone)]
pub struct AppHandle {
    tx: mpsc::UnboundedSender<Event>,
    snapshots: watch::Receiver<AppSnapshot>,
}

impl AppHandle {
    pub fn dispatch(&self, action: UserAction) -> Result<(), CoreError> {
        self.tx
            .send(Event::Action(action))
            .map_err(|_| CoreError::SessionClosed)
    }

    /// Latest published snapshot, without waiting.
    pub fn snapshot(&self) -> AppSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Snapshot taken after every previously dispatched action was processed.
    pub async fn sync(&self) -> Result<AppSnapshot, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Event::Sync(reply))
            .map_err(|_| CoreError::SessionClosed)?;
        rx.await.map_err(|_| CoreError::SessionClosed)
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<AppSnapshot, CoreError>
    where
        F: FnMut(&AppSnapshot) -> bool,
    {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| CoreError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppSnapshot> {
        self.snapshots.clone()
    }

    pub fn report_fault(&self, message: impl Into<String>) -> Result<(), CoreError> {
        self.dispatch(UserAction::Fault(message.into()))
    }

    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.dispatch(UserAction::Shutdown)
    }
}

/// Session state and event loop.
pub struct App {
    config: AppConfig,
    backend: Arc<dyn ChartBackend>,
    rx: mpsc::UnboundedReceiver<Event>,
    supervisor: Supervisor<Event>,
    snapshots: watch::Sender<AppSnapshot>,
    bootstrap: BootstrapLoader,
    form: FormStateMachine,
    pipeline: ChartRequestPipeline,
    presenter: StatusAndAlertPresenter<Event>,
    renderer: ChartRenderer,
    search: RemoteSearchController<Event>,
}

impl App {
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn ChartBackend>,
        sink: Box<dyn RenderSink>,
    ) -> (Self, AppHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(tx.clone(), Event::Fault);
        let (snapshots, snapshot_rx) = watch::channel(AppSnapshot::default());

        let fetcher = SearchFetcher::new(Arc::clone(&backend), config.search_limit, config.search_cache);
        let app = Self {
            bootstrap: BootstrapLoader::new(config.flagship_symbol.clone(), config.default_index.clone()),
            form: FormStateMachine::new(),
            pipeline: ChartRequestPipeline::new(config.chart_timeout),
            presenter: StatusAndAlertPresenter::new(
                tx.clone(),
                config.notification_dismiss,
                Event::NotificationExpired,
            ),
            renderer: ChartRenderer::new(sink, config.container.clone()),
            search: RemoteSearchController::new(
                fetcher,
                config.search_debounce,
                supervisor.clone(),
                Event::Search,
            ),
            config,
            backend,
            rx,
            supervisor,
            snapshots,
        };
        let handle = AppHandle {
            tx,
            snapshots: snapshot_rx,
        };
        (app, handle)
    }

    /// Run the session on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Bootstrap, then process events until shutdown or until every
    /// snapshot subscriber is gone.
    pub async fn run(mut self) {
        info!(base_url = %self.config.base_url, "session started");
        self.start_bootstrap();
        self.publish();

        while let Some(event) = self.rx.recv().await {
            if matches!(event, Event::Action(UserAction::Shutdown)) {
                break;
            }
            self.handle(event);
            self.publish();
            if self.snapshots.is_closed() {
                debug!("all snapshot subscribers dropped");
                break;
            }
        }
        info!("session stopped");
    }

    fn start_bootstrap(&mut self) {
        if let Err(error) = self.bootstrap.begin() {
            warn!(%error, "bootstrap not started");
            return;
        }
        self.presenter.set_status(STATUS_BOOTSTRAPPING, true);

        let backend = Arc::clone(&self.backend);
        let hot_limit = self.config.hot_limit;
        self.supervisor.spawn_or(
            "bootstrap",
            async move {
                Event::BootstrapFinished(BootstrapFetch::run(backend.as_ref(), hot_limit).await)
            },
            |message| {
                Event::BootstrapFinished(BootstrapFetch {
                    hot: Err(ApiError::transport(message.clone())),
                    indices: Err(ApiError::transport(message)),
                })
            },
        );
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Action(action) => self.handle_action(action),
            Event::Search(event) => {
                if self.search.handle(event) {
                    debug!("search results updated");
                }
            }
            Event::BootstrapFinished(fetch) => self.finish_bootstrap(fetch),
            Event::ChartResolved { ticket, outcome } => self.finish_chart(ticket, outcome),
            Event::NotificationExpired(id) => {
                self.presenter.expire(id);
            }
            Event::Fault(message) => self.handle_fault(&message),
            Event::Sync(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_action(&mut self, action: UserAction) {
        // Bootstrap seeds the form when it lands; earlier edits would be lost.
        if action.edits_form() && self.bootstrap.phase().is_pending() {
            debug!(?action, "form edit ignored until bootstrap completes");
            return;
        }
        match action {
            UserAction::QueryChanged(query) => self.search.query_changed(query),
            UserAction::SelectSymbols(symbols) => self.form.select_symbols(symbols),
            UserAction::AddSymbol(symbol) => {
                let id = symbol.id.clone();
                self.bootstrap.remember(symbol);
                self.form.add_symbol(id);
            }
            UserAction::RemoveSymbol(id) => {
                self.form.remove_symbol(&id);
            }
            UserAction::SetIndex(index) => self.form.set_index(index),
            UserAction::SetNormalize(normalize) => self.form.set_normalize(normalize),
            UserAction::SetDateRange(range) => self.form.set_date_range(range),
            UserAction::Submit => self.submit(),
            UserAction::Reset => self.reset(),
            UserAction::Dismiss => {
                self.presenter.dismiss_current();
            }
            UserAction::Fault(message) => self.handle_fault(&message),
            // Handled by the loop before dispatch.
            UserAction::Shutdown => {}
        }
    }

    fn finish_bootstrap(&mut self, fetch: BootstrapFetch) {
        let report = self.bootstrap.complete(fetch);
        self.form.apply_defaults(&report.defaults);

        if report.is_ready() {
            self.presenter.set_status(STATUS_READY, false);
        } else {
            self.presenter.set_status(STATUS_BOOTSTRAP_FAILED, false);
            self.presenter.notify(BOOTSTRAP_FAILED_ALERT, Severity::Danger);
        }
    }

    fn submit(&mut self) {
        if self.presenter.is_busy() {
            debug!(rejection = %SubmitRejection::Busy, "submit ignored");
            return;
        }
        let pending = match self.pipeline.begin(self.form.selection()) {
            Ok(pending) => pending,
            Err(rejection) => {
                debug!(%rejection, "submit ignored");
                return;
            }
        };

        self.presenter.set_status(STATUS_SUBMITTING, true);
        self.renderer.show_loading();

        let backend = Arc::clone(&self.backend);
        let deadline = self.pipeline.deadline();
        let ticket = pending.ticket;
        self.supervisor.spawn_or(
            "chart-request",
            async move {
                let outcome =
                    ChartRequestPipeline::execute(backend.as_ref(), pending.request, deadline).await;
                Event::ChartResolved { ticket, outcome }
            },
            move |message| Event::ChartResolved {
                ticket,
                outcome: Err(SubmitError::failure(message)),
            },
        );
    }

    fn finish_chart(&mut self, ticket: ChartTicket, outcome: Result<ChartSuccess, SubmitError>) {
        if !self.pipeline.resolve(ticket, &outcome) {
            return;
        }

        match outcome {
            Ok(success) => {
                match self
                    .renderer
                    .render(&success.payload, success.stock_count, &success.index_name)
                {
                    Ok(()) => {
                        self.presenter.set_status(
                            format!("图表生成成功 ({}只股票)", success.stock_count),
                            false,
                        );
                        self.presenter
                            .set_chart_info(success.stock_count, &success.index_name);
                        self.presenter.notify(CHART_SUCCESS_ALERT, Severity::Success);
                    }
                    Err(error) => {
                        warn!(%error, "chart payload could not be drawn");
                        self.presenter.set_status(RENDER_FAILURE_MESSAGE, false);
                        self.presenter.clear_chart_info();
                        self.presenter.notify(RENDER_FAILURE_MESSAGE, Severity::Danger);
                    }
                }
            }
            Err(error) => {
                let message = error.user_message();
                self.presenter.set_status(message.clone(), false);
                self.presenter.notify(message, Severity::Danger);
                self.renderer.show_placeholder();
            }
        }

        self.pipeline.settle();
    }

    fn reset(&mut self) {
        if self.pipeline.state() == RequestState::Loading || self.bootstrap.phase().is_pending() {
            debug!("reset ignored while busy");
            return;
        }
        self.form.reset();
        self.renderer.show_placeholder();
        self.presenter.clear_chart_info();
        self.presenter.set_status(STATUS_RESET, false);
        self.presenter.notify(RESET_ALERT, Severity::Info);
    }

    fn handle_fault(&mut self, message: &str) {
        error!(%message, "unexpected fault");
        if self.presenter.is_busy() {
            return;
        }
        self.presenter.notify(FAULT_ALERT, Severity::Danger);
    }

    fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            phase: self.bootstrap.phase(),
            symbols: self.bootstrap.symbols().to_vec(),
            indices: self.bootstrap.indices().to_vec(),
            selection: self.form.selection().clone(),
            request_state: self.pipeline.state(),
            can_submit: self
                .form
                .can_submit(self.pipeline.state(), self.presenter.is_busy()),
            status: self.presenter.status().clone(),
            notification: self.presenter.notification().cloned(),
            chart_info: self.presenter.chart_info().map(str::to_owned),
            view: self.renderer.view().clone(),
            search: self.search.results().cloned(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
