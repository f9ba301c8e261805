//! Availability checks for the external analysis tool.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How long a version probe may take.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of probing the analysis tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// The tool answered; carries its reported version.
    Available(String),
    /// The tool is missing or misbehaving; carries a human-readable reason.
    Unavailable(String),
}

/// Capability that answers "can the analysis tool be invoked right now?".
#[async_trait]
pub trait ToolProbe: Send + Sync {
    async fn probe(&self) -> ToolStatus;
}

/// Probes a binary by running it with `--version`.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    binary: PathBuf,
}

impl CommandProbe {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ToolProbe for CommandProbe {
    async fn probe(&self) -> ToolStatus {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(PROBE_TIMEOUT, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ToolStatus::Unavailable(e.to_string()),
            Err(_) => {
                return ToolStatus::Unavailable(format!(
                    "version probe timed out after {}s",
                    PROBE_TIMEOUT.as_secs()
                ))
            }
        };

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            ToolStatus::Available(version)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                ToolStatus::Unavailable(format!("version probe exited with {}", output.status))
            } else {
                ToolStatus::Unavailable(stderr)
            }
        }
    }
}

/// A probe with a fixed answer.
#[derive(Debug, Clone)]
pub struct StaticProbe(ToolStatus);

impl StaticProbe {
    pub fn available(version: &str) -> Self {
        Self(ToolStatus::Available(version.to_string()))
    }

    pub fn unavailable(reason: &str) -> Self {
        Self(ToolStatus::Unavailable(reason.to_string()))
    }
}

#[async_trait]
impl ToolProbe for StaticProbe {
    async fn probe(&self) -> ToolStatus {
        self.0.clone()
    }
}
