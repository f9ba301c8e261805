//! Normalized analysis results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::detect::{LanguageSet, RulePackList};

/// Severity assigned when a result carries none.
pub const DEFAULT_SEVERITY: &str = "INFO";

/// A location in a scanned file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub col: u32,
    #[serde(default)]
    pub offset: u64,
}

/// A single normalized finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check_id: String,
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub path: String,
    pub start: Position,
    pub end: Position,
}

/// Problems with the analysis tool. Recorded in the report, never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisIssue {
    #[error("{tool} not available: {reason}")]
    UnavailableTool { tool: String, reason: String },
    #[error("{tool} could not be started: {reason}")]
    SpawnFailure { tool: String, reason: String },
    #[error("{tool} output could not be read: {reason}")]
    OutputUnreadable { tool: String, reason: String },
    #[error("{tool} exited with unexpected code {code}")]
    InvocationFailure { tool: String, code: String },
    #[error("{tool} scan timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
    #[error("failed to parse {tool} JSON output: {reason}")]
    MalformedOutput { tool: String, reason: String },
}

impl AnalysisIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisIssue::UnavailableTool { .. } => "unavailable_tool",
            AnalysisIssue::SpawnFailure { .. } => "invocation_failure",
            AnalysisIssue::OutputUnreadable { .. } => "invocation_failure",
            AnalysisIssue::InvocationFailure { .. } => "invocation_failure",
            AnalysisIssue::Timeout { .. } => "invocation_failure",
            AnalysisIssue::MalformedOutput { .. } => "malformed_output",
        }
    }
}

/// Outcome of one analysis run plus project bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ok: bool,
    pub exit_code: Option<i32>,
    pub findings: Vec<Finding>,
    pub errors: Vec<String>,
    #[serde(default)]
    pub stats: Map<String, Value>,
    pub file_count: usize,
    pub files: Vec<String>,
    pub languages: Vec<String>,
    pub packs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// Tail of the tool's stderr, kept when the scan failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Tail of the tool's stdout, kept when it could not be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

impl AnalysisReport {
    /// A failed report carrying a single issue.
    pub fn failed(issue: AnalysisIssue) -> Self {
        Self {
            ok: false,
            errors: vec![issue.to_string()],
            ..Default::default()
        }
    }

    /// Attach the file, language and pack bookkeeping of the scanned project.
    pub fn with_project(
        mut self,
        files: &[String],
        languages: &LanguageSet,
        packs: &RulePackList,
    ) -> Self {
        let mut files = files.to_vec();
        files.sort();
        self.file_count = files.len();
        self.files = files;
        self.languages = languages.to_vec();
        self.packs = packs.as_slice().to_vec();
        self
    }

    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    /// Number of findings per severity, keyed by the tool's severity string.
    pub fn severity_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for f in &self.findings {
            *counts.entry(f.severity.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_report() {
        let report = AnalysisReport::failed(AnalysisIssue::UnavailableTool {
            tool: "semgrep".to_string(),
            reason: "No such file or directory".to_string(),
        });
        assert!(!report.ok);
        assert_eq!(report.exit_code, None);
        assert_eq!(
            report.errors,
            vec!["semgrep not available: No such file or directory".to_string()]
        );
    }

    #[test]
    fn test_with_project_sorts_files() {
        let languages: LanguageSet = ["java", "text"].into_iter().collect();
        let packs: RulePackList = ["p/secrets", "p/java"].into_iter().collect();
        let report = AnalysisReport::default().with_project(
            &["b/Main.java".to_string(), "a.xml".to_string()],
            &languages,
            &packs,
        );

        assert_eq!(report.file_count, 2);
        assert_eq!(report.files, vec!["a.xml", "b/Main.java"]);
        assert_eq!(report.languages, vec!["java", "text"]);
        assert_eq!(report.packs, vec!["p/secrets", "p/java"]);
    }

    #[test]
    fn test_optional_diagnostics_are_omitted() {
        let json = serde_json::to_value(AnalysisReport::default()).unwrap();
        assert!(json.get("stderr").is_none());
        assert!(json.get("tool_version").is_none());
        assert_eq!(json["exit_code"], Value::Null);
    }

    #[test]
    fn test_issue_kinds() {
        let issue = AnalysisIssue::MalformedOutput {
            tool: "semgrep".to_string(),
            reason: "empty output".to_string(),
        };
        assert_eq!(issue.kind(), "malformed_output");
        assert_eq!(
            issue.to_string(),
            "failed to parse semgrep JSON output: empty output"
        );
    }
}
