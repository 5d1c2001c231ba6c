use thiserror::Error;

use crate::session::states::{SessionAction, SessionPhaseKind};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot {action:?} while session is {phase:?}")]
    InvalidTransition { phase: SessionPhaseKind, action: SessionAction },
    #[error("analysis prompt is empty")]
    EmptyPrompt,
    #[error("quotation has no line items to finalize")]
    EmptyQuotation,
}

/// Failure of one call to an external service. Each boundary (analysis,
/// finalize, catalog, history) fails independently.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("backend rejected request{}: {detail}", status_suffix(.status))]
    Rejected { status: Option<u16>, detail: String },
    #[error("could not decode backend response: {0}")]
    Decode(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

impl ServiceError {
    pub fn rejected(detail: impl Into<String>) -> Self {
        Self::Rejected { status: None, detail: detail.into() }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Request failed. Check the connection and try again.".to_string(),
            Self::Rejected { detail, .. } if !detail.trim().is_empty() => detail.clone(),
            Self::Rejected { .. } => "The service could not process the request.".to_string(),
            Self::Decode(_) => "The service returned an unexpected response.".to_string(),
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Rejected { .. } => "backend_rejected",
            Self::Decode(_) => "decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DomainError, ServiceError};
    use crate::session::states::{SessionAction, SessionPhaseKind};

    #[test]
    fn transport_failure_has_generic_notice() {
        let error = ServiceError::Transport("connection refused".to_owned());
        assert_eq!(error.user_message(), "Request failed. Check the connection and try again.");
        assert_eq!(error.error_class(), "transport");
    }

    #[test]
    fn backend_detail_is_surfaced() {
        let error = ServiceError::Rejected { status: Some(404), detail: "PDF not found".to_owned() };
        assert_eq!(error.user_message(), "PDF not found");
        assert_eq!(error.to_string(), "backend rejected request (404): PDF not found");
    }

    #[test]
    fn blank_backend_detail_gets_fallback() {
        let error = ServiceError::rejected("  ");
        assert_eq!(error.user_message(), "The service could not process the request.");
        assert_eq!(error.to_string(), "backend rejected request:   ");
    }

    #[test]
    fn invalid_transition_names_phase_and_action() {
        let error = DomainError::InvalidTransition {
            phase: SessionPhaseKind::Finalizing,
            action: SessionAction::Finalize,
        };
        assert_eq!(error.to_string(), "cannot Finalize while session is Finalizing");
    }
}
