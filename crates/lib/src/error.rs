//! Turn errors and the apology text each kind maps to.

use crate::channels::ConnectorError;
use crate::extract::parse_failure_text;
use crate::flow::FlowError;

/// Why a turn could not produce an answer.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("no directory identity for the sender")]
    Identity,
    /// Sending a reply failed; not apologized for, the turn error boundary handles it.
    #[error(transparent)]
    Send(#[from] ConnectorError),
    #[error("{0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnErrorKind {
    Connect,
    Timeout,
    Request,
    Parse,
    Identity,
    Unexpected,
}

impl TurnErrorKind {
    /// Text sent to the user. `detail` is only shown for `Parse`.
    pub fn user_message(self, detail: &str) -> String {
        match self {
            TurnErrorKind::Connect => "I'm being fixed, my AI module is not responding right now for some reason. Please try again later.".to_string(),
            TurnErrorKind::Timeout => "I'm taking too long to respond due to backend issues. Please try again later.".to_string(),
            TurnErrorKind::Request => "I'm experiencing some technical difficulties with my AI module right now. Please try again later.".to_string(),
            TurnErrorKind::Parse => parse_failure_text(detail),
            TurnErrorKind::Identity => "I couldn't identify your email address. Please try again later or contact support.".to_string(),
            TurnErrorKind::Unexpected => "An unexpected error occurred. Our team has been notified.".to_string(),
        }
    }
}

impl TurnError {
    pub fn kind(&self) -> TurnErrorKind {
        match self {
            TurnError::Flow(FlowError::Connect(_)) => TurnErrorKind::Connect,
            TurnError::Flow(FlowError::Timeout(_)) => TurnErrorKind::Timeout,
            TurnError::Flow(FlowError::Request(_)) | TurnError::Flow(FlowError::Api(_)) => {
                TurnErrorKind::Request
            }
            TurnError::Flow(FlowError::Parse(_)) => TurnErrorKind::Parse,
            TurnError::Identity => TurnErrorKind::Identity,
            TurnError::Send(_) | TurnError::Unexpected(_) => TurnErrorKind::Unexpected,
        }
    }

    pub fn user_message(&self) -> String {
        self.kind().user_message(&self.to_string())
    }
}
