use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::HostError;
use crate::status::StatusLevel;

/// Classified failure for one assistant operation.
///
/// Acquisition strategies and the document gateway classify every failure
/// into one of these variants at their own boundary; the lifecycle
/// controller never sees an unclassified error.
#[derive(Debug, Error)]
pub enum AssistError {
    /// Bad or missing user input. Recoverable by correcting the input.
    #[error("{0}")]
    User(String),

    /// A remote or host call failed or returned non-success. Surfaced,
    /// never retried automatically.
    #[error("{0}")]
    Transient(String),

    /// The operation needs a credential that is not configured.
    #[error("{0}")]
    ConfigurationMissing(String),

    /// Normalizer contract violation. Should not occur when strategies
    /// hold up their end.
    #[error("invalid image encoding: {0}")]
    InvalidEncoding(String),
}

impl AssistError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationMissing(message.into())
    }

    pub fn invalid_encoding(message: impl Into<String>) -> Self {
        Self::InvalidEncoding(message.into())
    }
}

impl From<HostError> for AssistError {
    fn from(err: HostError) -> Self {
        Self::Transient(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    UserError,
    TransientFailure,
    ConfigurationMissing,
}

/// Terminal result of one operation. Drives the status signal and the
/// caller's exit decision; lives for the duration of that operation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub kind: OutcomeKind,
    pub message: String,
}

impl OperationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Success,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// Status level a sink should render this outcome with. Missing
    /// configuration reads as an informational limitation, not an error.
    pub fn level(&self) -> StatusLevel {
        match self.kind {
            OutcomeKind::Success => StatusLevel::Success,
            OutcomeKind::UserError | OutcomeKind::TransientFailure => StatusLevel::Error,
            OutcomeKind::ConfigurationMissing => StatusLevel::Info,
        }
    }
}

impl From<AssistError> for OperationOutcome {
    fn from(err: AssistError) -> Self {
        let message = err.to_string();
        let kind = match err {
            AssistError::User(_) => OutcomeKind::UserError,
            AssistError::Transient(_) => OutcomeKind::TransientFailure,
            AssistError::ConfigurationMissing(_) => OutcomeKind::ConfigurationMissing,
            // A normalizer defect still surfaces as a failed operation;
            // the message keeps the defect text.
            AssistError::InvalidEncoding(_) => OutcomeKind::TransientFailure,
        };
        Self { kind, message }
    }
}
