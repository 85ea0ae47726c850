//! Chart submission: at most one request in flight, bounded by a deadline.
//!
//! The pipeline is split so a session can keep its event loop free while the
//! network call runs:
//!
//! | Step | Where | Effect |
//! |------|-------|--------|
//! | [`begin`](ChartRequestPipeline::begin) | event loop | gate check, `Idle -> Loading`, ticket |
//! | [`execute`](ChartRequestPipeline::execute) | spawned task | `POST /api/chart` under the deadline |
//! | [`resolve`](ChartRequestPipeline::resolve) | event loop | `Loading -> Success / Failed` |
//! | [`settle`](ChartRequestPipeline::settle) | event loop | back to `Idle` |

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::ChartBackend;
use crate::form;
use crate::{ApiErrorKind, ChartRequest, Selection, SubmitError, SubmitRejection};

/// Lifecycle of the chart request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success,
    Failed,
}

/// Identifies one submission; results carrying an older ticket are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartTicket(u64);

/// An accepted submission, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChart {
    pub ticket: ChartTicket,
    pub request: ChartRequest,
}

/// Successful chart response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSuccess {
    /// Opaque figure document.
    pub payload: String,
    pub stock_count: usize,
    pub index_name: String,
}

#[derive(Debug, Clone)]
pub struct ChartRequestPipeline {
    state: RequestState,
    deadline: Duration,
    next_ticket: u64,
    in_flight: Option<ChartTicket>,
}

impl ChartRequestPipeline {
    pub fn new(deadline: Duration) -> Self {
        Self {
            state: RequestState::Idle,
            deadline,
            next_ticket: 0,
            in_flight: None,
        }
    }

    pub const fn state(&self) -> RequestState {
        self.state
    }

    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Accept a submission or reject it without touching the network.
    pub fn begin(&mut self, selection: &Selection) -> Result<PendingChart, SubmitRejection> {
        if self.state != RequestState::Idle {
            return Err(SubmitRejection::Busy);
        }
        form::validate(selection)?;
        let request = ChartRequest::from_selection(selection)?;

        self.next_ticket += 1;
        let ticket = ChartTicket(self.next_ticket);
        self.in_flight = Some(ticket);
        self.state = RequestState::Loading;
        info!(
            stocks = request.stocks.len(),
            index = %request.index,
            normalize = request.normalize,
            "chart request started"
        );
        Ok(PendingChart { ticket, request })
    }

    /// Send the request. The transport gets the same deadline, and an outer
    /// timeout guards transports that ignore it.
    pub async fn execute(
        backend: &dyn ChartBackend,
        request: ChartRequest,
        deadline: Duration,
    ) -> Result<ChartSuccess, SubmitError> {
        let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(deadline, backend.chart(request, timeout_ms)).await {
            Err(_) => Err(SubmitError::Timeout { after: deadline }),
            Ok(Err(error)) if error.kind() == ApiErrorKind::Timeout => {
                Err(SubmitError::Timeout { after: deadline })
            }
            Ok(Err(error)) => Err(error.into()),
            Ok(Ok(response)) => Ok(ChartSuccess {
                payload: response.chart,
                stock_count: response.stock_count,
                index_name: response.index_name,
            }),
        }
    }

    /// Record the outcome for `ticket`. Returns `false` for a stale ticket.
    pub fn resolve(
        &mut self,
        ticket: ChartTicket,
        outcome: &Result<ChartSuccess, SubmitError>,
    ) -> bool {
        if self.in_flight != Some(ticket) {
            debug!(?ticket, "ignoring stale chart outcome");
            return false;
        }
        self.in_flight = None;
        self.state = match outcome {
            Ok(success) => {
                info!(stock_count = success.stock_count, index = %success.index_name, "chart request succeeded");
                RequestState::Success
            }
            Err(error) => {
                warn!(timeout = error.is_timeout(), %error, "chart request failed");
                RequestState::Failed
            }
        };
        true
    }

    /// Return to `Idle` once the outcome has been presented.
    pub fn settle(&mut self) -> RequestState {
        let previous = self.state;
        if self.in_flight.is_none() {
            self.state = RequestState::Idle;
        }
        previous
    }

    /// One-shot submission: begin, execute, resolve, settle.
    pub async fn submit(
        &mut self,
        backend: &dyn ChartBackend,
        selection: &Selection,
    ) -> Result<ChartSuccess, SubmitError> {
        let pending = self.begin(selection)?;
        let outcome = Self::execute(backend, pending.request, self.deadline).await;
        self.resolve(pending.ticket, &outcome);
        self.settle();
        outcome
    }
}
