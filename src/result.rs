//! Analysis result types.
//!
//! The payload returned by `GET /analysis-result/{resultId}` once a job has
//! completed. Standard analyses report risks as plain text lines
//! (`"High Risk: ..."`); detailed analyses may return structured findings and
//! a clause-by-clause breakdown. Both shapes decode into the same types.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::upload::AnalysisType;

/// Decode an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Severity of a risk finding or clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Parse a severity label, case-insensitively. Labels such as
    /// `"Low/Medium/High"` that name several levels are `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    /// Infer severity from a `"High Risk: ..."` style prefix.
    fn from_prefix(text: &str) -> Self {
        let head = text.trim_start().split([' ', ':']).next().unwrap_or_default();
        Self::parse(head)
    }
}

/// A single risk identified in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskFinding {
    /// Structured finding tied to a clause.
    Detailed {
        #[serde(default)]
        clause_text: Option<String>,
        #[serde(default)]
        risk_explanation: Option<String>,
        #[serde(default)]
        severity: Option<String>,
    },
    /// Free-text finding.
    Text(String),
}

impl RiskFinding {
    /// Severity of this finding.
    pub fn severity(&self) -> Severity {
        match self {
            RiskFinding::Detailed { severity, .. } => {
                severity.as_deref().map_or(Severity::Unknown, Severity::parse)
            }
            RiskFinding::Text(text) => Severity::from_prefix(text),
        }
    }

    /// Human-readable description of the finding.
    pub fn description(&self) -> &str {
        match self {
            RiskFinding::Detailed {
                risk_explanation,
                clause_text,
                ..
            } => risk_explanation
                .as_deref()
                .or(clause_text.as_deref())
                .unwrap_or_default(),
            RiskFinding::Text(text) => text,
        }
    }
}

/// Analysis of one clause category (payment terms, liability, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClauseFinding {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub concerns: Vec<String>,
}

impl ClauseFinding {
    pub fn severity(&self) -> Severity {
        self.risk_level
            .as_deref()
            .map_or(Severity::Unknown, Severity::parse)
    }
}

/// Full analysis payload for a completed job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Original file name of the analyzed document.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    /// File type label (`PDF`, `DOCX`, `TXT`).
    #[serde(default, deserialize_with = "null_as_default", rename = "file_type")]
    pub file_type: String,
    /// Short summary of the document.
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    /// Identified risks.
    #[serde(default, deserialize_with = "null_as_default")]
    pub risks: Vec<RiskFinding>,
    /// Clause-by-clause findings, keyed by clause category.
    #[serde(default, deserialize_with = "null_as_default")]
    pub clause_analysis: FxHashMap<String, ClauseFinding>,
    /// Suggested actions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
    /// Whether personal information was redacted before analysis.
    #[serde(default, deserialize_with = "null_as_default", rename = "pii_redacted")]
    pub pii_redacted: bool,
    #[serde(default, deserialize_with = "null_as_default", rename = "redacted_document_text")]
    pub redacted_document_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analysis_type: AnalysisType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
}

impl AnalysisResult {
    /// Create a result with just a summary.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Add a risk finding.
    pub fn with_risk(mut self, risk: RiskFinding) -> Self {
        self.risks.push(risk);
        self
    }

    /// Add a recommendation.
    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }

    /// Add a clause finding.
    pub fn with_clause(mut self, name: impl Into<String>, clause: ClauseFinding) -> Self {
        self.clause_analysis.insert(name.into(), clause);
        self
    }

    /// Number of risks classified as high severity.
    pub fn high_risk_count(&self) -> usize {
        self.risks
            .iter()
            .filter(|r| r.severity() == Severity::High)
            .count()
    }

    /// Risks sorted from most to least severe; order within a level is kept.
    pub fn risks_by_severity(&self) -> Vec<&RiskFinding> {
        let mut items: Vec<_> = self.risks.iter().collect();
        items.sort_by_key(|r| r.severity());
        items
    }

    /// True when the analysis produced nothing to show.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.risks.is_empty()
            && self.clause_analysis.is_empty()
            && self.recommendations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_result_decodes() {
        let result: AnalysisResult = serde_json::from_str(
            r#"{
                "filename": "lease.pdf",
                "file_type": "PDF",
                "summary": "A residential lease.",
                "risks": ["High Risk: Unlimited liability", "Low Risk: Late fee"],
                "recommendations": ["Negotiate a liability cap"],
                "clauseAnalysis": {},
                "pii_redacted": true,
                "redacted_document_text": "[REDACTED] agrees...",
                "analysisType": "standard",
                "uploadTimestamp": null,
                "processingTimeSeconds": 12.0
            }"#,
        )
        .unwrap();

        assert_eq!(result.filename, "lease.pdf");
        assert_eq!(result.risks.len(), 2);
        assert_eq!(result.high_risk_count(), 1);
        assert!(result.pii_redacted);
        assert_eq!(result.analysis_type, AnalysisType::Standard);
    }

    #[test]
    fn test_detailed_findings() {
        let result: AnalysisResult = serde_json::from_str(
            r#"{
                "summary": "Employment agreement.",
                "risks": [
                    {"clause_text": "Employee waives all claims", "risk_explanation": "Overbroad waiver", "severity": "High"},
                    "Medium Risk: Non-compete spans 5 years"
                ],
                "clauseAnalysis": {
                    "Termination": {"content": "At-will", "risk_level": "Low", "concerns": []}
                },
                "analysisType": "detailed"
            }"#,
        )
        .unwrap();

        assert_eq!(result.risks[0].severity(), Severity::High);
        assert_eq!(result.risks[0].description(), "Overbroad waiver");
        assert_eq!(result.risks[1].severity(), Severity::Medium);
        assert_eq!(result.clause_analysis["Termination"].severity(), Severity::Low);
        assert_eq!(result.analysis_type, AnalysisType::Detailed);
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let result: AnalysisResult = serde_json::from_str(
            r#"{
                "filename": null,
                "file_type": null,
                "summary": null,
                "risks": null,
                "recommendations": null,
                "clauseAnalysis": {
                    "Payment": {"content": null, "risk_level": null, "concerns": null}
                },
                "pii_redacted": null,
                "redacted_document_text": null,
                "analysisType": null
            }"#,
        )
        .unwrap();

        assert_eq!(result.summary, "");
        assert!(result.risks.is_empty());
        assert!(!result.pii_redacted);
        assert_eq!(result.analysis_type, AnalysisType::Standard);
        assert_eq!(result.clause_analysis["Payment"], ClauseFinding::default());
        assert_eq!(result.clause_analysis["Payment"].severity(), Severity::Unknown);
    }

    #[test]
    fn test_unexpected_analysis_type_still_decodes() {
        let result: AnalysisResult = serde_json::from_str(
            r#"{"summary": "NDA.", "analysisType": "Detailed"}"#,
        )
        .unwrap();
        assert_eq!(result.analysis_type, AnalysisType::Detailed);

        let result: AnalysisResult =
            serde_json::from_str(r#"{"summary": "NDA.", "analysisType": "express"}"#).unwrap();
        assert_eq!(result.analysis_type, AnalysisType::Standard);
        assert_eq!(result.summary, "NDA.");
    }

    #[test]
    fn test_risks_by_severity() {
        let result = AnalysisResult::new("summary")
            .with_risk(RiskFinding::Text("Low Risk: a".into()))
            .with_risk(RiskFinding::Text("Something odd".into()))
            .with_risk(RiskFinding::Text("High Risk: b".into()));

        let sorted: Vec<_> = result
            .risks_by_severity()
            .into_iter()
            .map(RiskFinding::severity)
            .collect();
        assert_eq!(
            sorted,
            vec![Severity::High, Severity::Low, Severity::Unknown]
        );
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("HIGH"), Severity::High);
        assert_eq!(Severity::parse("Low/Medium/High"), Severity::Unknown);
        assert_eq!(Severity::from_prefix("Medium: x"), Severity::Medium);
    }

    #[test]
    fn test_empty_result() {
        assert!(AnalysisResult::default().is_empty());
        assert!(!AnalysisResult::new("s").is_empty());
    }
}
