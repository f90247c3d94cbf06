//! Job lifecycle types.
//!
//! The job state machine as seen from the client:
//!
//! ```text
//!   submit() ──→ pending ──→ processing ──→ completed (resultId)
//!                   │             │
//!                   └─────────────┴──→ failed (errorMessage)
//! ```
//!
//! **Invariants:**
//! - Job state is owned by the remote service; the client only reads it.
//! - Terminal states (`completed`, `failed`) are permanent.
//! - A result can only be fetched once a `completed` report carries a
//!   result identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the identifier is empty or whitespace.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

opaque_id! {
    /// Server-assigned identifier of an analysis job.
    JobId
}

opaque_id! {
    /// Identifier of the user who owns a job (the auth provider's uid).
    OwnerId
}

opaque_id! {
    /// Identifier of a stored analysis, returned once a job completes.
    ResultId
}

/// Status of a job as reported by the job status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job created, waiting for a worker.
    Pending,
    /// A worker is analyzing the document.
    Processing,
    /// Analysis finished; results are available.
    Completed,
    /// Analysis failed.
    Failed,
    /// Any status string this client does not recognise.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check if the job is still waiting on the worker.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    /// Progress indicator value, in percent.
    pub fn progress(&self) -> u8 {
        match self {
            JobStatus::Pending => 25,
            JobStatus::Processing => 60,
            JobStatus::Completed => 100,
            JobStatus::Failed => 0,
            JobStatus::Unknown => 10,
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `GET /job-status/{jobId}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    /// Current status.
    pub status: JobStatus,
    /// Result identifier, present once the job is completed.
    #[serde(
        default,
        alias = "resultAnalysisId",
        skip_serializing_if = "Option::is_none"
    )]
    pub result_id: Option<ResultId>,
    /// Failure reason, present when the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobStatusReport {
    /// A report carrying only a status.
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            result_id: None,
            error_message: None,
            job_id: None,
            document_title: None,
            processing_time_seconds: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// A `completed` report pointing at `result_id`.
    pub fn completed(result_id: impl Into<ResultId>) -> Self {
        Self::new(JobStatus::Completed).with_result_id(result_id)
    }

    /// A `failed` report with an optional reason.
    pub fn failed(error_message: Option<String>) -> Self {
        Self {
            error_message,
            ..Self::new(JobStatus::Failed)
        }
    }

    /// Set the result identifier.
    pub fn with_result_id(mut self, result_id: impl Into<ResultId>) -> Self {
        self.result_id = Some(result_id.into());
        self
    }

    /// The result identifier, treating an empty string as absent.
    pub fn usable_result_id(&self) -> Option<&ResultId> {
        self.result_id.as_ref().filter(|id| !id.is_blank())
    }
}
