//! Invocation of the external static-analysis binary.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::output::parse_output;
use super::{AnalysisIssue, AnalysisReport, CommandProbe, ToolProbe, ToolStatus};
use crate::config::AnalysisConfig;
use crate::detect::RulePackList;

/// Exit code for a clean scan.
pub const EXIT_NO_FINDINGS: i32 = 0;
/// Exit code for a scan that produced findings.
pub const EXIT_FINDINGS: i32 = 1;

/// Diagnostic output kept in failed reports, in bytes.
const DIAGNOSTIC_TAIL: usize = 4096;

/// Runs the analysis tool over a directory and normalizes its output.
pub struct AnalysisRunner {
    binary: PathBuf,
    rule_timeout_secs: u64,
    scan_timeout: Duration,
    extra_args: Vec<String>,
    probe: Arc<dyn ToolProbe>,
}

impl AnalysisRunner {
    /// Create a runner for `binary`, probing availability with `--version`.
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        let binary = binary.into();
        let defaults = AnalysisConfig::default();
        Self {
            probe: Arc::new(CommandProbe::new(binary.clone())),
            binary,
            rule_timeout_secs: defaults.rule_timeout_secs,
            scan_timeout: Duration::from_secs(defaults.scan_timeout_secs),
            extra_args: Vec::new(),
        }
    }

    /// Create a runner from the `analysis` configuration section.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(&config.binary)
            .rule_timeout_secs(config.rule_timeout_secs)
            .scan_timeout(Duration::from_secs(config.scan_timeout_secs))
            .extra_args(config.extra_args.clone())
    }

    /// Per-rule timeout handed to the tool.
    pub fn rule_timeout_secs(mut self, secs: u64) -> Self {
        self.rule_timeout_secs = secs;
        self
    }

    /// Wall-clock bound on the whole scan.
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Replace the availability probe.
    pub fn probe(mut self, probe: Arc<dyn ToolProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Short tool name used in messages (`semgrep` for `/usr/bin/semgrep`).
    pub fn tool_name(&self) -> String {
        self.binary
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.binary.to_string_lossy().to_string())
    }

    /// Arguments for scanning `target` with `packs`.
    pub fn command_args(&self, target: &Path, packs: &RulePackList) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--json".into(),
            "--error".into(),
            "--timeout".into(),
            self.rule_timeout_secs.to_string().into(),
        ];
        for pack in packs.iter() {
            args.push("--config".into());
            args.push(pack.into());
        }
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(target.as_os_str().to_os_string());
        args
    }

    /// Scan `target` with `packs`.
    ///
    /// Never fails: tool absence, unexpected exit codes, timeouts and
    /// unparseable output all come back as a report with `ok == false` or a
    /// recorded error. The scan is not retried.
    pub async fn analyze(&self, target: &Path, packs: &RulePackList) -> AnalysisReport {
        let tool = self.tool_name();

        let version = match self.probe.probe().await {
            ToolStatus::Available(version) => version,
            ToolStatus::Unavailable(reason) => {
                warn!(tool = %tool, reason = %reason, "analysis tool unavailable, skipping scan");
                return AnalysisReport::failed(AnalysisIssue::UnavailableTool { tool, reason });
            }
        };

        let args = self.command_args(target, packs);
        debug!(tool = %tool, ?args, "starting scan");

        let spawned = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(tool = %tool, error = %e, "failed to start scan");
                let mut report = AnalysisReport::failed(AnalysisIssue::SpawnFailure {
                    tool,
                    reason: e.to_string(),
                });
                report.tool_version = Some(version);
                return report;
            }
        };

        // Output is buffered as it arrives so a timed-out scan keeps what it wrote
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let finished = tokio::time::timeout(self.scan_timeout, async {
            let (out, err, status) = tokio::join!(
                drain(stdout_pipe, &mut stdout_buf),
                drain(stderr_pipe, &mut stderr_buf),
                child.wait()
            );
            out.and(err).and(status)
        })
        .await;

        let status = match finished {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(tool = %tool, error = %e, "failed to collect scan output");
                let _ = child.kill().await;
                let mut report = AnalysisReport::failed(AnalysisIssue::OutputUnreadable {
                    tool,
                    reason: e.to_string(),
                });
                report.tool_version = Some(version);
                report.stderr = tail(&String::from_utf8_lossy(&stderr_buf));
                return report;
            }
            Err(_) => {
                let secs = self.scan_timeout.as_secs();
                warn!(tool = %tool, secs, "scan timed out");
                if let Err(e) = child.kill().await {
                    debug!(tool = %tool, error = %e, "kill after timeout failed");
                }
                let mut report = AnalysisReport::failed(AnalysisIssue::Timeout { tool, secs });
                report.tool_version = Some(version);
                report.stderr = tail(&String::from_utf8_lossy(&stderr_buf));
                return report;
            }
        };

        let exit_code = status.code();
        let stdout = String::from_utf8_lossy(&stdout_buf);
        let stderr = String::from_utf8_lossy(&stderr_buf);

        let mut report = build_report(&tool, exit_code, &stdout, &stderr);
        report.tool_version = Some(version).filter(|v| !v.is_empty());

        info!(
            tool = %tool,
            exit_code = ?exit_code,
            ok = report.ok,
            findings = report.findings.len(),
            errors = report.errors.len(),
            "scan finished"
        );
        report
    }
}

/// Read `pipe` to EOF, appending each chunk to `buf` as it arrives.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Build a report from a finished process.
pub fn build_report(
    tool: &str,
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> AnalysisReport {
    let ok = matches!(exit_code, Some(EXIT_NO_FINDINGS) | Some(EXIT_FINDINGS));
    let mut report = AnalysisReport {
        ok,
        exit_code,
        ..Default::default()
    };

    if !ok {
        report.errors.push(
            AnalysisIssue::InvocationFailure {
                tool: tool.to_string(),
                code: exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "none (terminated by signal)".to_string()),
            }
            .to_string(),
        );
    }

    match parse_output(stdout) {
        Ok(parsed) => {
            report.findings = parsed.findings;
            report.errors.extend(parsed.errors);
            report.stats = parsed.stats;
        }
        Err(reason) => {
            warn!(tool = %tool, reason = %reason, "unparseable scan output");
            report.errors.push(
                AnalysisIssue::MalformedOutput {
                    tool: tool.to_string(),
                    reason,
                }
                .to_string(),
            );
            report.stdout = tail(stdout);
        }
    }

    if !ok || report.stdout.is_some() {
        report.stderr = tail(stderr);
    }

    report
}

/// Last `DIAGNOSTIC_TAIL` bytes of `text`, on a char boundary. `None` if blank.
fn tail(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut start = text.len().saturating_sub(DIAGNOSTIC_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    Some(text[start..].to_string())
}
