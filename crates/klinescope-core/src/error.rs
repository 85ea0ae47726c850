//! Error taxonomy for the orchestration core.
//!
//! | Failure | Type | User-facing outcome |
//! |---------|------|---------------------|
//! | Search | [`ApiError`] | Empty results, logged only |
//! | Bootstrap | [`BootstrapError`] | Persistent danger notification |
//! | Submission timeout | [`SubmitError::Timeout`] | Timeout-specific danger notification |
//! | Submission failure | [`SubmitError::Failure`] | Server message or generic danger notification |
//! | Render | [`RenderError`] | Danger notification, placeholder restored |

use std::fmt::{Display, Formatter};
use std::time::Duration;

use thiserror::Error;

/// Message shown when the chart request exceeds its deadline.
pub const TIMEOUT_MESSAGE: &str = "请求超时，请稍后重试";
/// Message shown when the chart request fails without a server explanation.
pub const SUBMIT_FAILURE_MESSAGE: &str = "图表生成失败";
/// Message shown when a chart payload cannot be drawn.
pub const RENDER_FAILURE_MESSAGE: &str = "图表渲染失败";

/// Validation errors for user input and outgoing requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("index name cannot be empty")]
    EmptyIndex,

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("date range start {start} is after end {end}")]
    InvertedDateRange { start: String, end: String },

    #[error("chart request must include at least one symbol")]
    NoSymbols,
    #[error("chart request must name an index")]
    NoIndex,
}

/// Classification of backend client failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection or I/O failure before a response arrived.
    Transport,
    /// The transport gave up waiting.
    Timeout,
    /// Non-2xx status without an application error body.
    Status,
    /// Body could not be decoded into the expected shape.
    Malformed,
    /// Structurally valid response carrying `success: false`.
    Application,
}

/// Structured backend error, carrying the server message when one was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            kind: ApiErrorKind::Status,
            message: format!("backend responded with HTTP {status}"),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Malformed,
            message: message.into(),
        }
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Application,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ApiErrorKind::Transport => "api.transport",
            ApiErrorKind::Timeout => "api.timeout",
            ApiErrorKind::Status => "api.status",
            ApiErrorKind::Malformed => "api.malformed",
            ApiErrorKind::Application => "api.application",
        }
    }

    /// Server-provided explanation, if the backend sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self.kind {
            ApiErrorKind::Application if !self.message.trim().is_empty() => Some(&self.message),
            _ => None,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ApiError {}

/// Why a submission was refused before any network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitRejection {
    #[error("a chart request is already in flight")]
    Busy,
    #[error("selection is not submittable: {0}")]
    Invalid(#[from] ValidationError),
}

/// Outcome classification for a chart submission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] SubmitRejection),

    #[error("chart request timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    #[error("chart request failed: {detail}")]
    Failure {
        server_message: Option<String>,
        detail: String,
    },
}

impl SubmitError {
    pub fn failure(detail: impl Into<String>) -> Self {
        Self::Failure {
            server_message: None,
            detail: detail.into(),
        }
    }

    /// Text for the status line and notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(rejection) => rejection.to_string(),
            Self::Timeout { .. } => String::from(TIMEOUT_MESSAGE),
            Self::Failure {
                server_message: Some(message),
                ..
            } => message.clone(),
            Self::Failure { .. } => String::from(SUBMIT_FAILURE_MESSAGE),
        }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ApiError> for SubmitError {
    fn from(error: ApiError) -> Self {
        Self::Failure {
            server_message: error.server_message().map(str::to_owned),
            detail: error.to_string(),
        }
    }
}

/// The chart payload was delivered but could not be drawn.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("chart payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("chart payload is missing '{field}'")]
    MissingField { field: &'static str },
    #[error("render sink failed: {0}")]
    Sink(String),
}

/// Bootstrap phase failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("bootstrap already ran for this session")]
    AlreadyStarted,
    #[error("bootstrap failed: {}", join_messages(.0))]
    Failed(Vec<ApiError>),
}

fn join_messages(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("session has shut down")]
    SessionClosed,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
