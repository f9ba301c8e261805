//! End-to-end tests for the generation and analysis pipeline.
//!
//! The analysis tool is replaced either by a `StaticProbe` (tool absent) or by
//! a small shell script standing in for the real binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use securegen::analysis::{AnalysisRunner, StaticProbe};
use securegen::collab::ReplayGenerator;
use securegen::detect::BASELINE_PACKS;
use securegen::pipeline::{Decision, EMPTY_BLOB_SENTINEL};
use securegen::{Pipeline, PipelineError, PipelineStage};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn offline_runner() -> AnalysisRunner {
    AnalysisRunner::new("semgrep").probe(Arc::new(StaticProbe::unavailable(
        "executable not found",
    )))
}

/// Write an executable stand-in for the analysis tool.
#[cfg(unix)]
fn fake_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("semgrep");
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 1.50.0; exit 0; fi\n{}\n",
        body
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_java_blob_without_analysis_tool() {
    let blob = "```java\n=== FILE: Main.java ===\npublic class Main {}\n```";
    let pipeline = Pipeline::new(Arc::new(ReplayGenerator::from_text(blob)), offline_runner());

    let response = pipeline.run("write a java main class").await.unwrap();

    assert_eq!(response.code, blob);
    assert_eq!(response.decision, Decision::CodeOnly);
    assert!(response
        .report
        .prompt_after_enhancement
        .ends_with("write a java main class"));

    let report = &response.report.semgrep;
    assert!(!report.ok);
    assert_eq!(report.exit_code, None);
    assert!(report.findings.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("not available"));
    assert_eq!(report.file_count, 1);
    assert_eq!(report.files, vec!["Main.java"]);
    assert_eq!(report.languages, vec!["java"]);

    let mut expected: Vec<String> = BASELINE_PACKS.iter().map(|p| p.to_string()).collect();
    expected.push("p/java".to_string());
    assert_eq!(report.packs, expected);
}

#[tokio::test]
async fn test_response_json_shape() {
    let blob = "```python\nprint('hi')\n```";
    let pipeline = Pipeline::new(Arc::new(ReplayGenerator::from_text(blob)), offline_runner());

    let response = pipeline.run("hello").await.unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["decision"], "CODE_ONLY");
    assert_eq!(json["report"]["policy_version"], "secure-codegen-v1");
    assert_eq!(json["report"]["semgrep"]["files"][0], "Main.py");
    assert_eq!(json["report"]["semgrep"]["exit_code"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_empty_generation_is_analyzed_as_sentinel() {
    let pipeline = Pipeline::new(Arc::new(ReplayGenerator::new(["\n", "   "])), offline_runner());

    let response = pipeline.run("nothing").await.unwrap();
    assert_eq!(response.code, EMPTY_BLOB_SENTINEL);
    assert_eq!(response.report.semgrep.file_count, 1);
}

#[tokio::test]
async fn test_traversal_in_manifest_is_fatal() {
    let work = TempDir::new().unwrap();
    let blob = "```js\n=== FILE: src/ok.js ===\nok()\n=== FILE: src/../../evil.js ===\nevil()\n```";
    let pipeline = Pipeline::new(Arc::new(ReplayGenerator::from_text(blob)), offline_runner())
        .work_dir(Some(work.path().to_path_buf()));

    let err = pipeline.run("x").await.unwrap_err();
    assert!(matches!(err, PipelineError::PathTraversalRejected(_)));
    assert_eq!(err.kind(), "path_traversal_rejected");
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_file_directory_conflict_is_fatal() {
    let work = TempDir::new().unwrap();
    let blob = "```python\n=== FILE: a ===\nx\n=== FILE: a/b.py ===\ny\n```";
    let pipeline = Pipeline::new(Arc::new(ReplayGenerator::from_text(blob)), offline_runner())
        .work_dir(Some(work.path().to_path_buf()));

    let err = pipeline.run("x").await.unwrap_err();
    assert!(matches!(err, PipelineError::MaterializationFailure { .. }));
    assert_eq!(err.kind(), "materialization_failure");
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_blank_marker_block_is_dropped() {
    let blob = "```python\n=== FILE: a.py ===\nx = 1\n=== FILE: ===\ny = 2\n```";
    let pipeline = Pipeline::new(Arc::new(ReplayGenerator::from_text(blob)), offline_runner());

    let response = pipeline.run("x").await.unwrap();
    assert_eq!(response.report.semgrep.files, vec!["a.py"]);
    assert_eq!(response.report.semgrep.file_count, 1);
    assert_eq!(response.report.semgrep.languages, vec!["python"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_findings_from_tool_output() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let fixture = testdata_path().join("semgrep_findings.json");
    let seen = tools.path().join("seen.txt");
    let args = tools.path().join("args.txt");

    // Record the arguments and the materialized tree, then exit with "findings"
    let binary = fake_tool(
        tools.path(),
        &format!(
            "echo \"$@\" > '{args}'\nfor last; do :; done\n(cd \"$last\" && find . -type f | sort) > '{seen}'\ncat '{fixture}'\nexit 1",
            args = args.display(),
            seen = seen.display(),
            fixture = fixture.display(),
        ),
    );

    let blob = fs::read_to_string(testdata_path().join("java_project.md")).unwrap();
    let pipeline = Pipeline::new(
        Arc::new(ReplayGenerator::from_text(&blob)),
        AnalysisRunner::new(&binary).rule_timeout_secs(42),
    )
    .work_dir(Some(work.path().to_path_buf()));

    let response = pipeline.run("a java dao").await.unwrap();
    let report = &response.report.semgrep;

    assert!(report.ok);
    assert_eq!(report.exit_code, Some(1));
    assert_eq!(report.tool_version.as_deref(), Some("1.50.0"));
    assert_eq!(report.findings.len(), 3);
    assert_eq!(report.findings[0].severity, "ERROR");
    assert_eq!(report.findings[0].start.line, 14);
    assert_eq!(report.findings[0].metadata["confidence"], "HIGH");
    assert_eq!(report.findings[2].severity, "INFO");
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Syntax error"));
    assert_eq!(report.stats["okfiles"], 3);
    assert_eq!(report.languages, vec!["java", "text"]);
    assert_eq!(
        report.files,
        vec![
            "src/main/java/app/Main.java",
            "src/main/java/app/UserDao.java",
            "src/main/resources/application.properties",
        ]
    );

    let args = fs::read_to_string(&args).unwrap();
    assert!(args.starts_with("--json --error --timeout 42 --config p/owasp-top-ten"));
    assert!(args.contains("--config p/java"));

    let seen = fs::read_to_string(&seen).unwrap();
    assert_eq!(
        seen.lines().collect::<Vec<_>>(),
        vec![
            "./src/main/java/app/Main.java",
            "./src/main/java/app/UserDao.java",
            "./src/main/resources/application.properties",
        ]
    );

    // The project root is gone once the run returns
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unexpected_exit_code_keeps_diagnostics() {
    let tools = TempDir::new().unwrap();
    let binary = fake_tool(tools.path(), "echo 'invalid config: p/nope' >&2\nexit 7");

    let pipeline = Pipeline::new(
        Arc::new(ReplayGenerator::from_text("```go\npackage main\n```")),
        AnalysisRunner::new(&binary),
    );

    let report = pipeline.run("x").await.unwrap().report.semgrep;
    assert!(!report.ok);
    assert_eq!(report.exit_code, Some(7));
    assert!(report.errors[0].contains("unexpected code 7"));
    assert!(report.stderr.as_deref().unwrap_or_default().contains("invalid config"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_malformed_output_is_absorbed() {
    let tools = TempDir::new().unwrap();
    let binary = fake_tool(tools.path(), "echo 'Traceback (most recent call last):'\nexit 0");

    let pipeline = Pipeline::new(
        Arc::new(ReplayGenerator::from_text("```ruby\nputs 1\n```")),
        AnalysisRunner::new(&binary),
    );

    let report = pipeline.run("x").await.unwrap().report.semgrep;
    assert!(report.ok);
    assert_eq!(report.exit_code, Some(0));
    assert!(report.findings.is_empty());
    assert!(report.errors.iter().any(|e| e.contains("failed to parse")));
    assert_eq!(report.languages, vec!["ruby"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_scan_timeout_is_a_failed_report() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let binary = fake_tool(tools.path(), "echo 'loading rules' >&2\nexec sleep 30");

    let pipeline = Pipeline::new(
        Arc::new(ReplayGenerator::from_text("```php\n<?php echo 1;\n```")),
        AnalysisRunner::new(&binary).scan_timeout(Duration::from_millis(300)),
    )
    .work_dir(Some(work.path().to_path_buf()));

    let report = pipeline.run("x").await.unwrap().report.semgrep;
    assert!(!report.ok);
    assert!(report.errors[0].contains("timed out"));
    assert_eq!(report.stderr.as_deref(), Some("loading rules"));
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_cancel_during_analysis_cleans_up() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let binary = fake_tool(tools.path(), "exec sleep 30");

    let pipeline = Pipeline::new(
        Arc::new(ReplayGenerator::from_text("```kotlin\nfun main() {}\n```")),
        AnalysisRunner::new(&binary),
    )
    .work_dir(Some(work.path().to_path_buf()));

    let err = pipeline
        .run_until("x", tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap_err();

    match err {
        PipelineError::Cancelled { stage } => assert_eq!(stage, PipelineStage::Analyzing),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let work = TempDir::new().unwrap();
    let blobs = [
        "```python\n=== FILE: a.py ===\nprint(1)\n```",
        "```go\n=== FILE: cmd/b.go ===\npackage main\n```",
        "```rust\n=== FILE: src/c.rs ===\nfn main() {}\n```",
    ];

    let runs = blobs.iter().map(|blob| {
        let pipeline = Pipeline::new(Arc::new(ReplayGenerator::from_text(blob)), offline_runner())
            .work_dir(Some(work.path().to_path_buf()));
        async move { pipeline.run("x").await }
    });
    let responses = futures::future::join_all(runs).await;

    let files: Vec<Vec<String>> = responses
        .into_iter()
        .map(|r| r.unwrap().report.semgrep.files)
        .collect();
    assert_eq!(files, vec![vec!["a.py"], vec!["cmd/b.go"], vec!["src/c.rs"]]);
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_analyze_blob_file_fixture() {
    let blob = fs::read_to_string(testdata_path().join("java_project.md")).unwrap();
    let pipeline = Pipeline::new(Arc::new(ReplayGenerator::default()), offline_runner());

    let report = pipeline.analyze_blob(&blob).await.unwrap();
    assert_eq!(report.file_count, 3);
    assert_eq!(report.languages, vec!["java", "text"]);
    assert!(report.packs.contains(&"p/java".to_string()));
    assert!(!report.packs.iter().any(|p| p == "p/text"));
}
