//! LexiGuard client — asynchronous document-analysis jobs.
//!
//! This crate submits legal documents to the LexiGuard analysis service and
//! tracks the resulting job until its analysis is ready.
//!
//! # Overview
//!
//! - An [`AnalysisService`] trait covering submission, status and result
//!   retrieval, with an HTTP implementation in [`HttpAnalysisService`]
//! - A [`JobPoller`] that drives one job to a terminal state and hands off
//!   the [`AnalysisResult`] exactly once
//! - [`JobId`] / [`JobStatus`] / [`JobStatusReport`] for job tracking
//! - [`StatusView`] and [`ElapsedTimer`] for status display
//! - [`ClientError`] with a user-facing message for every failure
//!
//! # Lifecycle
//!
//! ```text
//!   submit() ──→ JobPoller::start() ──→ job_status() every 2s ──→ analysis_result()
//!   (async)       (spawns a task)        (until terminal or 60×)     (once)
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use lexiguard_client::{ClientConfig, DocumentUpload, HttpAnalysisService, JobPoller, AnalysisService};
//!
//! let config = ClientConfig::from_env()?;
//! let service = Arc::new(HttpAnalysisService::new(config.service)?);
//! let upload = DocumentUpload::from_path("lease.pdf", "user1").await?;
//! let submission = service.submit(&upload).await?;
//!
//! let poller = JobPoller::new(service, config.poll);
//! let handle = poller.start(submission.job_id, "user1")?;
//! let outcome = handle.outcome().await;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod job;
pub mod poller;
pub mod progress;
pub mod result;
pub mod service;
pub mod upload;

pub use config::{ClientConfig, PollPolicy, ServiceConfig};
pub use error::{ClientError, ClientResult, ErrorKind, Operation};
pub use http::HttpAnalysisService;
pub use job::{JobId, JobStatus, JobStatusReport, OwnerId, ResultId};
pub use poller::{JobPoller, PollEvent, PollHandle, PollOutcome, PollerMachine, PollerState};
pub use progress::{ElapsedTimer, StatusView, format_elapsed};
pub use result::{AnalysisResult, ClauseFinding, RiskFinding, Severity};
pub use service::AnalysisService;
pub use upload::{AnalysisType, DocumentUpload, FileType, Submission};
