//! In-memory analysis service driven through the LexiGuard job poller.
//!
//! Jobs advance `pending → processing → completed` as they are polled, so
//! the demo shows the full status display without a running backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lexiguard_client::{
    AnalysisResult, AnalysisService, AnalysisType, ClauseFinding, ClientError, ClientResult,
    DocumentUpload, ElapsedTimer, JobId, JobPoller, JobStatus, JobStatusReport, Operation,
    OwnerId, PollEvent, PollOutcome, PollPolicy, ResultId, RiskFinding, StatusView, Submission,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// A job tracked by the mock service.
struct MockJob {
    owner: OwnerId,
    title: String,
    analysis_type: AnalysisType,
    polls: u32,
}

/// In-memory analysis service.
struct MockService {
    jobs: Mutex<HashMap<String, MockJob>>,
    next_id: Mutex<u64>,
    /// Status queries a job spends in each non-terminal state.
    polls_per_stage: u32,
}

impl MockService {
    fn new(polls_per_stage: u32) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
            polls_per_stage: polls_per_stage.max(1),
        }
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, MockJob>> {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl AnalysisService for MockService {
    async fn submit(&self, upload: &DocumentUpload) -> ClientResult<Submission> {
        upload.validate(10 * 1024 * 1024)?;

        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|p| p.into_inner());
            *next += 1;
            format!("mock-{}", *next)
        };

        self.lock_jobs().insert(
            id.clone(),
            MockJob {
                owner: upload.user_id.clone(),
                title: upload.document_title.clone(),
                analysis_type: upload.analysis_type,
                polls: 0,
            },
        );

        Ok(Submission {
            job_id: JobId::new(id),
            document_title: upload.document_title.clone(),
            status: JobStatus::Pending,
            estimated_time: Some("a few seconds".into()),
        })
    }

    async fn job_status(
        &self,
        job_id: &JobId,
        owner_id: &OwnerId,
    ) -> ClientResult<JobStatusReport> {
        let mut jobs = self.lock_jobs();
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| ClientError::transport(Operation::JobStatus, "Job not found"))?;
        if &job.owner != owner_id {
            return Err(ClientError::transport(
                Operation::JobStatus,
                "Unauthorized access to this job",
            ));
        }

        job.polls += 1;
        let status = match job.polls / self.polls_per_stage {
            0 => JobStatus::Pending,
            1 => JobStatus::Processing,
            _ => JobStatus::Completed,
        };

        let mut report = JobStatusReport::new(status);
        report.job_id = Some(job_id.clone());
        report.document_title = Some(job.title.clone());
        if status == JobStatus::Completed {
            report = report.with_result_id(format!("result-{job_id}"));
        }
        Ok(report)
    }

    async fn analysis_result(
        &self,
        result_id: &ResultId,
        _owner_id: &OwnerId,
    ) -> ClientResult<AnalysisResult> {
        let job_id = result_id.as_str().trim_start_matches("result-");
        let jobs = self.lock_jobs();
        let job = jobs
            .get(job_id)
            .ok_or_else(|| ClientError::transport(Operation::AnalysisResult, "Analysis not found"))?;

        let summary = format!("{} is a twelve-month residential lease.", job.title);
        let mut result = AnalysisResult::new(summary)
            .with_risk(RiskFinding::Text("High Risk: Tenant bears all repair costs".into()))
            .with_risk(RiskFinding::Text("Low Risk: Late fee after five days".into()))
            .with_recommendation("Negotiate a cap on tenant repair obligations");
        result.analysis_type = job.analysis_type;
        if job.analysis_type == AnalysisType::Detailed {
            result = result.with_clause(
                "Termination",
                ClauseFinding {
                    content: "Either party may terminate with 60 days notice.".into(),
                    risk_level: Some("Low".into()),
                    concerns: vec![],
                },
            );
        }
        Ok(result)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexiguard_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let service = Arc::new(MockService::new(2));
    let user = OwnerId::from("demo-user");

    let upload = DocumentUpload::new("lease.txt", b"This lease agreement...".to_vec(), user.clone())
        .with_title("Apartment lease")
        .with_analysis_type(AnalysisType::Detailed);
    let submission = service.submit(&upload).await?;
    println!("Job ID:   {}", submission.job_id);
    println!("Document: {}", submission.document_title);
    println!();

    let poller = JobPoller::new(
        Arc::clone(&service),
        PollPolicy::new(Duration::from_millis(500), 20),
    );
    let mut handle = poller.start(submission.job_id, user)?;
    let timer = ElapsedTimer::spawn(handle.subscribe());

    while let Some(event) = handle.next_event().await {
        match event {
            PollEvent::Status {
                status, attempt, ..
            } => {
                let view = StatusView::for_status(status, None);
                println!(
                    "[{:>3}%] {} - {} (check #{attempt}, {})",
                    view.progress,
                    view.title,
                    view.message,
                    timer.display()
                );
            }
            PollEvent::Completed { result_id, .. } => {
                let view = StatusView::for_status(JobStatus::Completed, None);
                println!("[{:>3}%] {} ({result_id})", view.progress, view.title);
            }
            PollEvent::Failed { message, .. } => {
                let view = StatusView::for_status(JobStatus::Failed, Some(&message));
                println!("[{:>3}%] {} - {}", view.progress, view.title, view.message);
            }
        }
    }

    match handle.outcome().await {
        PollOutcome::Completed { result, .. } => {
            println!();
            println!("Summary: {}", result.summary);
            println!("Risks ({} high):", result.high_risk_count());
            for risk in result.risks_by_severity() {
                println!("  {}", risk.description());
            }
            for (clause, finding) in &result.clause_analysis {
                println!("Clause {clause}: {}", finding.content);
            }
            for recommendation in &result.recommendations {
                println!("Recommendation: {recommendation}");
            }
        }
        PollOutcome::Failed(err) => {
            println!("Analysis error: {}", err.user_message());
        }
        PollOutcome::Cancelled => println!("Polling cancelled"),
    }

    Ok(())
}
