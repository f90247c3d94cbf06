//! Client error types.
//!
//! Every failure in the job flow is terminal for the poller that hit it and
//! is surfaced as one human-readable message. Nothing is retried
//! automatically; the user re-submits the document.
//!
//! | Kind | Variants | Recovery |
//! |------|----------|----------|
//! | **Configuration** | `Configuration`, `AlreadyPolling` | Fix caller input |
//! | **Rejected** | `InvalidUpload`, `SubmissionFailed` | Fix the document and re-submit |
//! | **RemoteFailure** | `JobFailed` | Re-submit |
//! | **Integrity** | `MissingResult` | Re-submit |
//! | **Transport** | `Transport` | Re-submit once connectivity returns |
//! | **Timeout** | `Timeout` | Check the dashboard later |

use std::fmt;

use thiserror::Error;

/// Fallback shown when the server reports `failed` without a message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Analysis failed. Please try again.";

/// Shown when the attempt ceiling is reached while the job is still running.
pub const TIMEOUT_MESSAGE: &str =
    "Analysis is taking longer than expected. Please check your dashboard later.";

/// Shown when the server reports `completed` without a result identifier.
pub const MISSING_RESULT_MESSAGE: &str = "Analysis completed but no result ID found";

/// Shown when the poller is started without a job or owner id.
pub const MISSING_IDS_MESSAGE: &str = "Missing job ID or user ID. Please try uploading again.";

/// Remote call that produced a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `POST /analyze-file-async`
    Submit,
    /// `GET /job-status/{jobId}`
    JobStatus,
    /// `GET /analysis-result/{resultId}`
    AnalysisResult,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Submit => write!(f, "document submission"),
            Operation::JobStatus => write!(f, "job status check"),
            Operation::AnalysisResult => write!(f, "result retrieval"),
        }
    }
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Rejected,
    RemoteFailure,
    Integrity,
    Transport,
    Timeout,
}

/// Errors produced while submitting or tracking an analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ClientError {
    // ── Caller errors ───────────────────────────────────────────────
    /// Missing or invalid configuration (e.g. blank job id).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A poller for this job is already running in this session.
    #[error("Job {0} is already being polled")]
    AlreadyPolling(String),

    // ── Rejected submissions ────────────────────────────────────────
    /// The document failed local validation before upload.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// The server accepted the request but did not create a job.
    #[error("Job submission failed: {0}")]
    SubmissionFailed(String),

    // ── Job-level errors ────────────────────────────────────────────
    /// The server reported `status: failed`.
    #[error("Job failed: {}", .0.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    JobFailed(Option<String>),

    /// The server reported `completed` without a result identifier.
    #[error("Job {0} completed but no result identifier was returned")]
    MissingResult(String),

    /// The attempt ceiling was reached while the job was still running.
    #[error("Timed out waiting for job {job_id} after {attempts} status checks")]
    Timeout { job_id: String, attempts: u32 },

    // ── Transport ───────────────────────────────────────────────────
    /// Network, HTTP or decode failure talking to the analysis service.
    #[error("{operation} failed: {message}")]
    Transport {
        operation: Operation,
        /// HTTP status code, when a response was received.
        status: Option<u16>,
        message: String,
    },
}

impl ClientError {
    /// Build a transport error without an HTTP status.
    pub fn transport(operation: Operation, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            status: None,
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::AlreadyPolling(_) => ErrorKind::Configuration,
            Self::InvalidUpload(_) | Self::SubmissionFailed(_) => ErrorKind::Rejected,
            Self::JobFailed(_) => ErrorKind::RemoteFailure,
            Self::MissingResult(_) => ErrorKind::Integrity,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// The message shown to the user for this error.
    ///
    /// Server-provided failure messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(msg) | Self::InvalidUpload(msg) | Self::SubmissionFailed(msg) => {
                msg.clone()
            }
            Self::AlreadyPolling(_) => "This analysis is already being tracked.".to_string(),
            Self::JobFailed(Some(msg)) if !msg.is_empty() => msg.clone(),
            Self::JobFailed(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            Self::MissingResult(_) => MISSING_RESULT_MESSAGE.to_string(),
            Self::Timeout { .. } => TIMEOUT_MESSAGE.to_string(),
            Self::Transport {
                operation, message, ..
            } => match operation {
                Operation::Submit => format!("Upload failed: {message}"),
                Operation::JobStatus => format!("Failed to check job status: {message}"),
                Operation::AnalysisResult => format!("Failed to load results: {message}"),
            },
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ClientError::Configuration("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(ClientError::JobFailed(None).kind(), ErrorKind::RemoteFailure);
        assert_eq!(
            ClientError::MissingResult("job-1".into()).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            ClientError::transport(Operation::JobStatus, "refused").kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ClientError::Timeout {
                job_id: "job-1".into(),
                attempts: 60
            }
            .kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn test_remote_failure_message_is_verbatim() {
        let err = ClientError::JobFailed(Some("Unsupported file".into()));
        assert_eq!(err.user_message(), "Unsupported file");
        assert_eq!(err.to_string(), "Job failed: Unsupported file");
    }

    #[test]
    fn test_remote_failure_fallback() {
        assert_eq!(
            ClientError::JobFailed(None).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
        assert_eq!(
            ClientError::JobFailed(Some(String::new())).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
    }

    #[test]
    fn test_timeout_copy_differs_from_failure() {
        let timeout = ClientError::Timeout {
            job_id: "job-1".into(),
            attempts: 60,
        };
        assert_eq!(timeout.user_message(), TIMEOUT_MESSAGE);
        assert_ne!(timeout.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_transport_messages_name_the_stage() {
        let status = ClientError::transport(Operation::JobStatus, "Job not found");
        assert_eq!(
            status.user_message(),
            "Failed to check job status: Job not found"
        );

        let result = ClientError::transport(Operation::AnalysisResult, "HTTP 500");
        assert_eq!(result.user_message(), "Failed to load results: HTTP 500");
        assert_eq!(result.to_string(), "result retrieval failed: HTTP 500");
    }
}
