//! The analysis service seam.
//!
//! The [`AnalysisService`] trait covers the three remote calls of the job
//! flow:
//!
//! ```text
//!   submit() ──→ job_status() ×N ──→ analysis_result()
//!   (async)       (async, polled)      (async, once)
//! ```
//!
//! | Method | Endpoint | Returns |
//! |--------|----------|---------|
//! | `submit()` | `POST /analyze-file-async` | `ClientResult<Submission>` |
//! | `job_status()` | `GET /job-status/{jobId}?user_id=` | `ClientResult<JobStatusReport>` |
//! | `analysis_result()` | `GET /analysis-result/{resultId}?user_id=` | `ClientResult<AnalysisResult>` |
//!
//! [`HttpAnalysisService`](crate::http::HttpAnalysisService) is the real
//! implementation; tests and demos plug in in-memory ones.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::job::{JobId, JobStatusReport, OwnerId, ResultId};
use crate::result::AnalysisResult;
use crate::upload::{DocumentUpload, Submission};

/// Remote collaborator that runs document analysis jobs.
///
/// # Contract
///
/// - `submit()` returns as soon as the job is queued; it never waits for
///   the analysis.
/// - `job_status()` is read-only and may be called repeatedly.
/// - `analysis_result()` is only meaningful for a result id taken from a
///   `completed` report.
/// - Implementations MUST NOT retry internally; callers decide.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload a document and create an analysis job.
    async fn submit(&self, upload: &DocumentUpload) -> ClientResult<Submission>;

    /// Query the current status of a job.
    async fn job_status(&self, job_id: &JobId, owner_id: &OwnerId)
    -> ClientResult<JobStatusReport>;

    /// Fetch the analysis produced by a completed job.
    async fn analysis_result(
        &self,
        result_id: &ResultId,
        owner_id: &OwnerId,
    ) -> ClientResult<AnalysisResult>;
}
