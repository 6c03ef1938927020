//! Error taxonomy of a render run.
//!
//! Every variant is fatal: the run stops, the error is logged, and nothing is
//! emitted. The polling loop's "not ready yet" answers are not errors.

use std::time::Duration;

use static_origin::OriginError;
use thiserror::Error;
use url::Url;
use wd_session::SessionError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("local origin failed to start")]
    OriginStartError(#[source] OriginError),

    #[error("could not contact origin at {url}")]
    OriginUnreachable {
        url: Url,
        #[source]
        source: OriginError,
    },

    #[error("browser session could not be started")]
    SessionStartError(#[source] SessionError),

    #[error("navigation to {url} failed")]
    NavigationError {
        url: Url,
        #[source]
        source: SessionError,
    },

    #[error("polling for {selector:?} failed on attempt {attempts}")]
    PollError {
        selector: String,
        attempts: u64,
        #[source]
        source: SessionError,
    },

    #[error("readiness marker {selector:?} still present after {waited:?} ({attempts} polls)")]
    PollTimeout {
        selector: String,
        attempts: u64,
        waited: Duration,
    },

    #[error("failed to extract rendered markup: {reason}")]
    ExtractionError {
        reason: String,
        #[source]
        source: Option<SessionError>,
    },

    #[error("failed to write rendered markup to {destination}")]
    EmissionError {
        destination: String,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::InvalidConfig(_) => "invalid_config",
            RenderError::OriginStartError(_) => "origin_start",
            RenderError::OriginUnreachable { .. } => "origin_unreachable",
            RenderError::SessionStartError(_) => "session_start",
            RenderError::NavigationError { .. } => "navigation",
            RenderError::PollError { .. } => "poll",
            RenderError::PollTimeout { .. } => "poll_timeout",
            RenderError::ExtractionError { .. } => "extraction",
            RenderError::EmissionError { .. } => "emission",
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        RenderError::InvalidConfig(message.into())
    }

    pub(crate) fn extraction(reason: impl Into<String>, source: Option<SessionError>) -> Self {
        RenderError::ExtractionError {
            reason: reason.into(),
            source,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn poll_errors_keep_the_session_cause() {
        let err = RenderError::PollError {
            selector: "#loading".into(),
            attempts: 3,
            source: SessionError::Command("stale element reference".into()),
        };

        assert_eq!(err.code(), "poll");
        assert_eq!(
            err.to_string(),
            "polling for \"#loading\" failed on attempt 3"
        );
        let cause = err.source().map(|source| source.to_string());
        assert_eq!(
            cause.as_deref(),
            Some("webdriver command failed: stale element reference")
        );
    }

    #[test]
    fn extraction_without_cause_has_no_source() {
        let err = RenderError::extraction("document has no <html> element", None);
        assert_eq!(err.code(), "extraction");
        assert!(err.source().is_none());
    }
}
