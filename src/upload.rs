//! Document submission types.
//!
//! A [`DocumentUpload`] is validated locally with the same rules the
//! analysis service applies, so obviously bad uploads fail before any bytes
//! leave the machine.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ClientError, ClientResult, MISSING_IDS_MESSAGE};
use crate::job::{JobId, JobStatus, OwnerId};

/// Default upload size limit: 10 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
}

impl FileType {
    /// Detect the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "txt" => Some(FileType::Txt),
            _ => None,
        }
    }

    /// MIME type sent with the multipart file part.
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileType::Pdf => "application/pdf",
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Txt => "text/plain",
        }
    }
}

/// Depth of analysis requested.
///
/// Decoding is lenient: the service stores whatever the submitter sent, so
/// any casing of `detailed` is [`AnalysisType::Detailed`] and anything else
/// is [`AnalysisType::Standard`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    /// Summary, key risks and recommendations.
    #[default]
    Standard,
    /// Adds a clause-by-clause breakdown.
    Detailed,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Standard => "standard",
            AnalysisType::Detailed => "detailed",
        }
    }

    pub fn parse(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("detailed") {
            AnalysisType::Detailed
        } else {
            AnalysisType::Standard
        }
    }
}

impl<'de> Deserialize<'de> for AnalysisType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse(&label))
    }
}

/// A document to submit for analysis.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub document_title: String,
    pub analysis_type: AnalysisType,
    pub user_id: OwnerId,
}

impl DocumentUpload {
    /// Create an upload from in-memory bytes. The title defaults to the file
    /// name.
    pub fn new(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        user_id: impl Into<OwnerId>,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            document_title: file_name.clone(),
            file_name,
            bytes,
            analysis_type: AnalysisType::default(),
            user_id: user_id.into(),
        }
    }

    /// Read a document from disk.
    pub async fn from_path(
        path: impl AsRef<Path>,
        user_id: impl Into<OwnerId>,
    ) -> ClientResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::InvalidUpload(format!("Not a file: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::InvalidUpload(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(Self::new(file_name, bytes, user_id))
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.document_title = title.into();
        self
    }

    /// Set the analysis type.
    pub fn with_analysis_type(mut self, analysis_type: AnalysisType) -> Self {
        self.analysis_type = analysis_type;
        self
    }

    /// Check the upload against the service's acceptance rules.
    ///
    /// Returns the detected file type on success.
    pub fn validate(&self, max_bytes: u64) -> ClientResult<FileType> {
        if self.user_id.is_blank() {
            return Err(ClientError::Configuration(MISSING_IDS_MESSAGE.to_string()));
        }
        if self.document_title.trim().is_empty() {
            return Err(ClientError::InvalidUpload(
                "Document title is required.".to_string(),
            ));
        }

        let file_type = FileType::from_file_name(&self.file_name).ok_or_else(|| {
            ClientError::InvalidUpload(
                "Unsupported file type. Only PDF, DOCX, and TXT are allowed.".to_string(),
            )
        })?;

        let size = self.bytes.len() as u64;
        if size > max_bytes {
            #[allow(clippy::cast_precision_loss)]
            let (size_mb, limit_mb) = (
                size as f64 / (1024.0 * 1024.0),
                max_bytes as f64 / (1024.0 * 1024.0),
            );
            return Err(ClientError::InvalidUpload(format!(
                "File size ({size_mb:.2}MB) exceeds {limit_mb:.0}MB limit"
            )));
        }

        Ok(file_type)
    }
}

/// Body of a `POST /analyze-file-async` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub file_type: Option<FileType>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// An accepted submission: the job to poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub job_id: JobId,
    pub document_title: String,
    /// Initial status, `pending` unless the server says otherwise.
    pub status: JobStatus,
    /// Server's estimate, e.g. `"30-60 seconds"`.
    pub estimated_time: Option<String>,
}

impl SubmissionResponse {
    /// Turn the raw response into a [`Submission`].
    ///
    /// `success: false` or a missing job id means no job exists to poll.
    pub fn into_submission(self, fallback_title: &str) -> ClientResult<Submission> {
        let job_id = match self.job_id {
            Some(id) if self.success && !id.is_blank() => id,
            _ => {
                let reason = self
                    .detail
                    .or(self.message)
                    .unwrap_or_else(|| "No job ID returned by the server".to_string());
                return Err(ClientError::SubmissionFailed(reason));
            }
        };

        Ok(Submission {
            job_id,
            document_title: self
                .document_title
                .unwrap_or_else(|| fallback_title.to_string()),
            status: self.status.unwrap_or(JobStatus::Pending),
            estimated_time: self.estimated_time,
        })
    }
}
