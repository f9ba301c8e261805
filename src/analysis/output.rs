//! Parsing and normalization of the analysis tool's JSON output.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Finding, Position, DEFAULT_SEVERITY};

/// Top-level shape of the tool output. Everything else is ignored.
/// Missing and `null` lists both read as empty.
#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    #[serde(default)]
    results: Option<Vec<Value>>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
    #[serde(default)]
    stats: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResult {
    #[serde(default)]
    check_id: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    start: Option<Position>,
    #[serde(default)]
    end: Option<Position>,
    #[serde(default)]
    extra: Option<RawExtra>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtra {
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Findings, errors and stats extracted from one tool run.
#[derive(Debug, Default)]
pub struct ParsedOutput {
    pub findings: Vec<Finding>,
    pub errors: Vec<String>,
    pub stats: Map<String, Value>,
}

/// Parse the tool's standard output.
///
/// Fails only when the output as a whole is empty or not a JSON object.
/// Individual result records that do not have the expected shape are skipped
/// and reported in `errors`.
pub fn parse_output(stdout: &str) -> Result<ParsedOutput, String> {
    if stdout.trim().is_empty() {
        return Err("empty output".to_string());
    }

    let raw: RawOutput = serde_json::from_str(stdout).map_err(|e| e.to_string())?;
    let mut parsed = ParsedOutput {
        stats: raw.stats.unwrap_or_default(),
        ..Default::default()
    };

    for (i, value) in raw.results.unwrap_or_default().into_iter().enumerate() {
        match serde_json::from_value::<RawResult>(value) {
            Ok(r) => parsed.findings.push(normalize(r)),
            Err(e) => parsed.errors.push(format!("skipped malformed result #{}: {}", i, e)),
        }
    }

    parsed
        .errors
        .extend(raw.errors.unwrap_or_default().iter().map(error_message));

    Ok(parsed)
}

fn normalize(raw: RawResult) -> Finding {
    let extra = raw.extra.unwrap_or_default();
    let metadata = match extra.metadata {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    Finding {
        check_id: raw.check_id.unwrap_or_default(),
        severity: extra
            .severity
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        message: extra.message.unwrap_or_default(),
        metadata,
        path: raw.path.unwrap_or_default(),
        start: raw.start.unwrap_or_default(),
        end: raw.end.unwrap_or_default(),
    }
}

/// Render one tool error record as a single line.
fn error_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .map(|m| m.trim().to_string());
            let level = obj.get("level").and_then(Value::as_str);
            match (level, message) {
                (Some(level), Some(message)) => format!("{}: {}", level, message),
                (None, Some(message)) => message,
                _ => value.to_string(),
            }
        }
        other => other.to_string(),
    }
}
