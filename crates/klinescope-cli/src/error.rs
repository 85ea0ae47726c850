use thiserror::Error;

use klinescope_core::{ApiError, CoreError, RenderError, SubmitError, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{}", .0.user_message())]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Session(#[from] CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Api(_) => 3,
            Self::Submit(SubmitError::Timeout { .. }) => 7,
            Self::Submit(SubmitError::Rejected(_)) => 2,
            Self::Submit(_) => 3,
            Self::Render(_) => 5,
            Self::Session(_) => 6,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
