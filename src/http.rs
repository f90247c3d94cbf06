//! HTTP implementation of [`AnalysisService`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{ClientError, ClientResult, Operation};
use crate::job::{JobId, JobStatusReport, OwnerId, ResultId};
use crate::result::AnalysisResult;
use crate::service::AnalysisService;
use crate::upload::{DocumentUpload, Submission, SubmissionResponse};

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Talks to the analysis service over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    config: ServiceConfig,
    client: Client,
}

impl HttpAnalysisService {
    /// Create a client for the configured service.
    pub fn new(config: ServiceConfig) -> ClientResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn url(&self, collection: &str, id: &str) -> String {
        self.config
            .endpoint(&format!("{collection}/{}", urlencoding::encode(id)))
    }

    /// Decode a JSON body, turning non-2xx responses into transport errors
    /// carrying the server's `detail`.
    async fn decode<T: DeserializeOwned>(operation: Operation, resp: Response) -> ClientResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.detail)
                .filter(|detail| !detail.is_empty())
                .unwrap_or_else(|| format!("HTTP {code}"));
            warn!(%operation, code, %message, "analysis service returned an error");
            return Err(ClientError::Transport {
                operation,
                status: Some(code),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ClientError::transport(operation, format!("invalid response: {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: Operation,
        url: String,
        owner_id: &OwnerId,
    ) -> ClientResult<T> {
        debug!(%operation, %url, "GET");
        let resp = self
            .client
            .get(&url)
            .query(&[("user_id", owner_id.as_str())])
            .send()
            .await
            .map_err(|e| ClientError::transport(operation, e.to_string()))?;
        Self::decode(operation, resp).await
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn submit(&self, upload: &DocumentUpload) -> ClientResult<Submission> {
        let file_type = upload.validate(self.config.max_upload_bytes)?;

        let file = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(file_type.mime_type())
            .map_err(|e| ClientError::InvalidUpload(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("documentTitle", upload.document_title.clone())
            .text("analysisType", upload.analysis_type.as_str())
            .text("userId", upload.user_id.to_string());

        let url = self.config.endpoint("analyze-file-async");
        debug!(%url, file = %upload.file_name, bytes = upload.bytes.len(), "submitting document");
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::transport(Operation::Submit, e.to_string()))?;

        let response: SubmissionResponse = Self::decode(Operation::Submit, resp).await?;
        let submission = response.into_submission(&upload.document_title)?;
        info!(job_id = %submission.job_id, title = %submission.document_title, "document queued for analysis");
        Ok(submission)
    }

    async fn job_status(
        &self,
        job_id: &JobId,
        owner_id: &OwnerId,
    ) -> ClientResult<JobStatusReport> {
        let url = self.url("job-status", job_id.as_str());
        self.get(Operation::JobStatus, url, owner_id).await
    }

    async fn analysis_result(
        &self,
        result_id: &ResultId,
        owner_id: &OwnerId,
    ) -> ClientResult<AnalysisResult> {
        let url = self.url("analysis-result", result_id.as_str());
        self.get(Operation::AnalysisResult, url, owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_encode_ids() {
        let service =
            HttpAnalysisService::new(ServiceConfig::with_base_url("http://localhost:8000/"))
                .unwrap();
        assert_eq!(
            service.url("job-status", "abc123"),
            "http://localhost:8000/job-status/abc123"
        );
        assert_eq!(
            service.url("analysis-result", "a/b c"),
            "http://localhost:8000/analysis-result/a%2Fb%20c"
        );
    }

    #[test]
    fn test_rejects_bad_config() {
        let err = HttpAnalysisService::new(ServiceConfig::with_base_url("localhost")).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }
}
