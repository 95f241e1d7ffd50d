use chrono::{DateTime, Utc};
use log::error;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Rejected user input. Raised before any network call.
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("local storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl SyncError {
    pub fn transport(operation: &'static str, err: impl std::fmt::Display) -> Self {
        SyncError::Transport {
            operation,
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Validation(_) => ErrorKind::Validation,
            SyncError::Transport { .. } => ErrorKind::Transport,
            SyncError::Decode(_) => ErrorKind::Decode,
            SyncError::Storage(_) => ErrorKind::Storage,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    Transport,
    Decode,
    Storage,
}

/// Payload handed to the UI for every failed operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedError {
    pub operation: &'static str,
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Single sink that every asynchronous failure is funneled into.
#[derive(Clone)]
pub struct ErrorReporter {
    sender: mpsc::UnboundedSender<ReportedError>,
}

impl ErrorReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReportedError>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn report(&self, operation: &'static str, err: &SyncError) {
        error!("{operation}: {err}");
        let payload = ReportedError {
            operation,
            kind: err.kind(),
            message: err.to_string(),
            at: Utc::now(),
        };
        // A closed receiver means the UI is gone; the log line above still stands.
        let _ = self.sender.send(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_reach_the_receiver_with_their_kind() {
        let (reporter, mut rx) = ErrorReporter::channel();
        reporter.report("commit", &SyncError::Validation("reading must be positive".into()));
        reporter.report("refresh_steps", &SyncError::transport("aggregate query", "401"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.operation, "commit");
        assert_eq!(first.kind, ErrorKind::Validation);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.kind, ErrorKind::Transport);
        assert_eq!(second.message, "aggregate query failed: 401");
    }
}
