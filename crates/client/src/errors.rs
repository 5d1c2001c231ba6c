use std::path::PathBuf;

use smartquote_core::errors::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to `{endpoint}` failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend returned {status} for `{endpoint}`: {detail}")]
    Status { endpoint: String, status: u16, detail: String },
    #[error("could not decode response from `{endpoint}`: {reason}")]
    Decode { endpoint: String, reason: String },
    #[error("could not write document to `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { source, .. } => source.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Build(_) => "client_init",
            Self::InvalidUrl { .. } | Self::Request { .. } => "transport",
            Self::Status { .. } => "backend_rejected",
            Self::Decode { .. } => "decode",
            Self::Write { .. } => "io",
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Status { status, detail, .. } => {
                ServiceError::Rejected { status: Some(status), detail }
            }
            ClientError::Decode { reason, .. } => ServiceError::Decode(reason),
            other => ServiceError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use smartquote_core::errors::ServiceError;

    use super::ClientError;

    #[test]
    fn status_errors_keep_backend_detail() {
        let error = ClientError::Status {
            endpoint: "http://127.0.0.1:8000/finalize-quotation".to_string(),
            status: 500,
            detail: "Server error: disk full".to_string(),
        };
        assert_eq!(error.status(), Some(500));

        let service: ServiceError = error.into();
        assert_eq!(
            service,
            ServiceError::Rejected { status: Some(500), detail: "Server error: disk full".to_string() }
        );
        assert_eq!(service.user_message(), "Server error: disk full");
    }

    #[test]
    fn decode_and_url_errors_map_to_distinct_classes() {
        let decode: ServiceError = ClientError::Decode {
            endpoint: "http://127.0.0.1:8000/history".to_string(),
            reason: "expected array".to_string(),
        }
        .into();
        assert_eq!(decode.error_class(), "decode");

        let invalid: ServiceError =
            ClientError::InvalidUrl { url: "::".to_string(), reason: "relative".to_string() }
                .into();
        assert_eq!(invalid.error_class(), "transport");
    }
}
