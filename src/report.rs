//! Output formatting for securegen results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the pipeline response or analysis report as a document
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::analysis::{AnalysisReport, Finding};
use crate::pipeline::PipelineResponse;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
    Sarif,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(OutputFormat::Pretty),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(format!(
                "invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
                other
            )),
        }
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// Render any result document as pretty-printed JSON.
pub fn render_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write a result document in JSON format.
pub fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "securegen";

#[derive(Serialize, Deserialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invocations: Vec<SarifInvocation>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Serialize, Deserialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRule {
    pub id: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    pub default_config: SarifRuleConfig,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRuleConfig {
    pub level: String,
}

#[derive(Serialize, Deserialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Serialize, Deserialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Serialize, Deserialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Serialize, Deserialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: u32,
    #[serde(rename = "startColumn")]
    pub start_column: u32,
    #[serde(rename = "endLine")]
    pub end_line: u32,
    #[serde(rename = "endColumn")]
    pub end_column: u32,
}

#[derive(Serialize, Deserialize)]
pub struct SarifInvocation {
    #[serde(rename = "executionSuccessful")]
    pub execution_successful: bool,
    #[serde(rename = "toolExecutionNotifications")]
    pub notifications: Vec<SarifNotification>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifNotification {
    pub level: String,
    pub message: SarifMessage,
}

/// Map the analysis tool's severity onto a SARIF level.
pub fn map_severity_to_level(severity: &str) -> &'static str {
    match severity.to_ascii_uppercase().as_str() {
        "ERROR" => "error",
        "WARNING" => "warning",
        _ => "note",
    }
}

fn sarif_region(f: &Finding) -> SarifRegion {
    let start_line = f.start.line.max(1);
    let start_column = f.start.col.max(1);
    SarifRegion {
        start_line,
        start_column,
        end_line: f.end.line.max(start_line),
        end_column: f.end.col.max(1),
    }
}

/// Build a SARIF document from an analysis report.
pub fn build_sarif(report: &AnalysisReport) -> SarifReport {
    // One rule per distinct check id; the first finding's severity wins
    let mut rule_levels: BTreeMap<&str, &str> = BTreeMap::new();
    for f in &report.findings {
        rule_levels
            .entry(f.check_id.as_str())
            .or_insert_with(|| map_severity_to_level(&f.severity));
    }

    let rules = rule_levels
        .into_iter()
        .map(|(id, level)| SarifRule {
            id: id.to_string(),
            short_description: SarifMessage {
                text: id.rsplit('.').next().unwrap_or(id).to_string(),
            },
            default_config: SarifRuleConfig {
                level: level.to_string(),
            },
        })
        .collect();

    let results = report
        .findings
        .iter()
        .map(|f| SarifResult {
            rule_id: f.check_id.clone(),
            level: map_severity_to_level(&f.severity).to_string(),
            message: SarifMessage {
                text: f.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: f.path.replace('\\', "/"),
                    },
                    region: sarif_region(f),
                },
            }],
        })
        .collect();

    let invocations = if report.ok && report.errors.is_empty() {
        Vec::new()
    } else {
        vec![SarifInvocation {
            execution_successful: report.ok,
            notifications: report
                .errors
                .iter()
                .map(|e| SarifNotification {
                    level: "error".to_string(),
                    message: SarifMessage { text: e.clone() },
                })
                .collect(),
        }]
    };

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
            invocations,
        }],
    }
}

pub fn render_sarif(report: &AnalysisReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&build_sarif(report))?)
}

/// Write results in SARIF format.
pub fn write_sarif(report: &AnalysisReport) -> anyhow::Result<()> {
    println!("{}", render_sarif(report)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Render a full pipeline response for the terminal.
pub fn render_pretty_response(response: &PipelineResponse) -> String {
    let mut out = String::new();
    write_header(&mut out);

    let _ = writeln!(out, "  {}{}", "Policy:   ".dimmed(), response.report.policy_version);
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", "Generated code:".bold());
    for line in response.code.lines() {
        let _ = writeln!(out, "    {}", line.dimmed());
    }
    let _ = writeln!(out);

    write_report_body(&mut out, &response.report.semgrep);
    out
}

/// Render an analysis report for the terminal.
pub fn render_pretty_report(target: &str, report: &AnalysisReport) -> String {
    let mut out = String::new();
    write_header(&mut out);
    let _ = writeln!(out, "  {}{}", "Scanning: ".dimmed(), target);
    let _ = writeln!(out);
    write_report_body(&mut out, report);
    out
}

pub fn write_pretty_response(response: &PipelineResponse) {
    print!("{}", render_pretty_response(response));
}

pub fn write_pretty_report(target: &str, report: &AnalysisReport) {
    print!("{}", render_pretty_report(target, report));
}

fn write_header(out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {} v{}",
        TOOL_NAME.cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(out);
}

fn write_report_body(out: &mut String, report: &AnalysisReport) {
    let _ = writeln!(out, "  {}{}", "Files:    ".dimmed(), report.files.join(", "));
    let _ = writeln!(out, "  {}{}", "Languages:".dimmed(), format_list(&report.languages));
    let _ = writeln!(out, "  {}{}", "Packs:    ".dimmed(), format_list(&report.packs));
    if let Some(version) = &report.tool_version {
        let _ = writeln!(out, "  {}{}", "Tool:     ".dimmed(), version);
    }
    let _ = writeln!(out);

    write_summary(out, report);
    let _ = writeln!(out);

    if !report.findings.is_empty() {
        write_findings(out, &report.findings);
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out, "  {} ({}):", "Errors".red().bold(), report.errors.len());
        for e in &report.errors {
            let _ = writeln!(out, "    {}", e);
        }
        let _ = writeln!(out);
    }
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        " (none)".to_string()
    } else {
        format!(" {}", items.join(", "))
    }
}

fn write_summary(out: &mut String, report: &AnalysisReport) {
    let status = if !report.ok {
        "✗ SCAN FAILED".red().to_string()
    } else if report.has_findings() {
        "! FINDINGS".yellow().to_string()
    } else {
        "✓ CLEAN".green().to_string()
    };
    let _ = write!(out, "  {}", status);

    let counts = report.severity_counts();
    if !counts.is_empty() {
        let parts: Vec<String> = counts
            .iter()
            .map(|(severity, n)| format!("{} {}", n, severity.to_lowercase()))
            .collect();
        let _ = write!(out, "  {}", parts.join(", "));
    }
    let _ = writeln!(out);
}

fn write_findings(out: &mut String, findings: &[Finding]) {
    let _ = writeln!(out, "  {} ({}):", "Findings".bold(), findings.len());
    let _ = writeln!(out);

    for f in findings {
        let _ = write!(out, "    {} ", severity_tag(&f.severity));
        let _ = write!(out, "{}", f.path.blue());
        if f.start.line > 0 {
            let _ = write!(out, "{}", format!(":{}:{}", f.start.line, f.start.col).dimmed());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "            {}", f.check_id.dimmed());
        let _ = writeln!(out, "            {}", f.message);
        let _ = writeln!(out);
    }
}

fn severity_tag(severity: &str) -> ColoredString {
    match map_severity_to_level(severity) {
        "error" => "ERROR".red(),
        "warning" => "WARN ".yellow(),
        _ => "INFO ".blue(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Position;

    fn finding(check_id: &str, severity: &str, line: u32) -> Finding {
        Finding {
            check_id: check_id.to_string(),
            severity: severity.to_string(),
            message: format!("{} found", check_id),
            metadata: Default::default(),
            path: "src/Main.java".to_string(),
            start: Position {
                line,
                col: 5,
                offset: 0,
            },
            end: Position {
                line,
                col: 20,
                offset: 0,
            },
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("sarif".parse::<OutputFormat>().unwrap(), OutputFormat::Sarif);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(map_severity_to_level("ERROR"), "error");
        assert_eq!(map_severity_to_level("warning"), "warning");
        assert_eq!(map_severity_to_level("INFO"), "note");
        assert_eq!(map_severity_to_level("EXPERIMENT"), "note");
    }

    #[test]
    fn test_sarif_rules_are_unique_and_sorted() {
        let report = AnalysisReport {
            ok: true,
            exit_code: Some(1),
            findings: vec![
                finding("java.lang.security.sqli", "ERROR", 10),
                finding("generic.secrets.aws-key", "WARNING", 3),
                finding("java.lang.security.sqli", "ERROR", 22),
            ],
            ..Default::default()
        };

        let sarif = build_sarif(&report);
        let run = &sarif.runs[0];
        let ids: Vec<&str> = run.tool.driver.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["generic.secrets.aws-key", "java.lang.security.sqli"]);
        assert_eq!(run.tool.driver.rules[0].short_description.text, "aws-key");
        assert_eq!(run.results.len(), 3);
        assert_eq!(run.results[0].level, "error");
        assert_eq!(run.results[0].locations[0].physical_location.region.start_line, 10);
        assert!(run.invocations.is_empty());
    }

    #[test]
    fn test_sarif_records_failed_scan() {
        let report = AnalysisReport {
            ok: false,
            errors: vec!["semgrep not available: not installed".to_string()],
            ..Default::default()
        };

        let json: serde_json::Value =
            serde_json::from_str(&render_sarif(&report).unwrap()).unwrap();
        assert_eq!(json["version"], "2.1.0");
        let invocation = &json["runs"][0]["invocations"][0];
        assert_eq!(invocation["executionSuccessful"], false);
        assert_eq!(
            invocation["toolExecutionNotifications"][0]["message"]["text"],
            "semgrep not available: not installed"
        );
    }

    #[test]
    fn test_sarif_region_clamps_missing_positions() {
        let mut f = finding("x", "INFO", 0);
        f.start.col = 0;
        f.end.col = 0;
        let region = sarif_region(&f);
        assert_eq!(region.start_line, 1);
        assert_eq!(region.start_column, 1);
        assert_eq!(region.end_line, 1);
    }

    #[test]
    fn test_pretty_report_lists_findings_and_errors() {
        colored::control::set_override(false);
        let report = AnalysisReport {
            ok: true,
            exit_code: Some(1),
            findings: vec![finding("java.lang.security.sqli", "ERROR", 10)],
            errors: vec!["warn: rule skipped".to_string()],
            files: vec!["src/Main.java".to_string()],
            languages: vec!["java".to_string()],
            packs: vec!["p/java".to_string()],
            ..Default::default()
        };

        let text = render_pretty_report("blob.md", &report);
        assert!(text.contains("Scanning: blob.md"));
        assert!(text.contains("Languages: java"));
        assert!(text.contains("! FINDINGS  1 error"));
        assert!(text.contains("src/Main.java:10:5"));
        assert!(text.contains("warn: rule skipped"));
    }
}
