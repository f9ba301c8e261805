//! Sequencing of the pipeline stages.

use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Decision, PipelineReport, PipelineResponse, PipelineStage};
use crate::analysis::{AnalysisReport, AnalysisRunner};
use crate::blob::{strip_fence, FileManifest, MaterializedProject};
use crate::collab::{BasicSanitizer, Enhancer, Generator, PolicyEnhancer, Sanitizer};
use crate::config::Config;
use crate::detect::{detect_languages, RulePackSelector};
use crate::error::PipelineError;

/// Stands in for generator output that is empty after trimming.
pub const EMPTY_BLOB_SENTINEL: &str = "// empty";

/// Records the current stage of one run.
struct StageTracker {
    tx: watch::Sender<PipelineStage>,
}

impl StageTracker {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(PipelineStage::Sanitizing);
        Self { tx }
    }

    fn enter(&self, stage: PipelineStage) {
        info!(stage = %stage, "entering stage");
        self.tx.send_replace(stage);
    }

    fn current(&self) -> PipelineStage {
        *self.tx.borrow()
    }
}

/// Runs prompts through sanitize, enhance, generate, materialize, detect,
/// select and analyze.
///
/// A `Pipeline` holds no per-run state; one instance can serve concurrent
/// runs, each of which owns its own temporary project root.
pub struct Pipeline {
    sanitizer: Arc<dyn Sanitizer>,
    enhancer: Arc<dyn Enhancer>,
    generator: Arc<dyn Generator>,
    selector: RulePackSelector,
    runner: AnalysisRunner,
    work_dir: Option<PathBuf>,
    generation_timeout: Option<Duration>,
}

impl Pipeline {
    /// Create a pipeline with the default sanitizer, enhancer and pack tables.
    pub fn new(generator: Arc<dyn Generator>, runner: AnalysisRunner) -> Self {
        Self {
            sanitizer: Arc::new(BasicSanitizer::default()),
            enhancer: Arc::new(PolicyEnhancer::default()),
            generator,
            selector: RulePackSelector::default(),
            runner,
            work_dir: None,
            generation_timeout: None,
        }
    }

    /// Create a pipeline configured by `config`.
    pub fn from_config(config: &Config, generator: Arc<dyn Generator>) -> Self {
        Self::new(generator, AnalysisRunner::from_config(&config.analysis))
            .sanitizer(Arc::new(BasicSanitizer::new(config.prompt.max_chars)))
            .enhancer(Arc::new(PolicyEnhancer::new(&config.prompt.policy_version)))
            .selector(config.pack_selector())
            .work_dir(config.work_dir.clone())
            .generation_timeout(Some(Duration::from_secs(config.generation.timeout_secs)))
    }

    pub fn sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = enhancer;
        self
    }

    pub fn selector(mut self, selector: RulePackSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Parent directory for temporary project roots.
    pub fn work_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.work_dir = dir;
        self
    }

    /// Limit on receiving the complete generated stream.
    pub fn generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Run the full pipeline for `prompt`.
    pub async fn run(&self, prompt: &str) -> Result<PipelineResponse, PipelineError> {
        self.run_until(prompt, futures::future::pending()).await
    }

    /// Run the full pipeline, giving up when `cancel` completes first.
    ///
    /// On cancellation the in-flight run is dropped before the error is
    /// returned: the generation stream is closed, a running scan is killed and
    /// the temporary project root is deleted.
    pub async fn run_until<C>(&self, prompt: &str, cancel: C) -> Result<PipelineResponse, PipelineError>
    where
        C: Future<Output = ()>,
    {
        let tracker = StageTracker::new();

        let outcome = tokio::select! {
            result = self.execute(prompt, &tracker) => Some(result),
            _ = cancel => None,
        };

        let result = outcome.unwrap_or_else(|| {
            Err(PipelineError::Cancelled {
                stage: tracker.current(),
            })
        });

        if let Err(e) = &result {
            warn!(stage = %tracker.current(), kind = e.kind(), error = %e, "pipeline failed");
            tracker.enter(PipelineStage::Failed);
        }
        result
    }

    /// Materialize and analyze an already generated blob.
    pub async fn analyze_blob(&self, blob: &str) -> Result<AnalysisReport, PipelineError> {
        let tracker = StageTracker::new();
        self.analyze_blob_tracked(blob, &tracker).await
    }

    /// Analyze an existing project directory given its relative file paths.
    pub async fn analyze_directory(&self, root: &Path, files: &[String]) -> AnalysisReport {
        let tracker = StageTracker::new();

        tracker.enter(PipelineStage::Detecting);
        let languages = detect_languages(files, "");

        tracker.enter(PipelineStage::Selecting);
        let packs = self.selector.select(&languages);

        tracker.enter(PipelineStage::Analyzing);
        let report = self
            .runner
            .analyze(root, &packs)
            .await
            .with_project(files, &languages, &packs);

        tracker.enter(PipelineStage::Done);
        report
    }

    async fn execute(
        &self,
        prompt: &str,
        tracker: &StageTracker,
    ) -> Result<PipelineResponse, PipelineError> {
        tracker.enter(PipelineStage::Sanitizing);
        let safe_prompt = self.sanitizer.sanitize(prompt);

        tracker.enter(PipelineStage::Enhancing);
        let enhanced = self.enhancer.enhance(&safe_prompt);

        tracker.enter(PipelineStage::Generating);
        let code = self.generate(&enhanced.text).await?;

        let semgrep = self.analyze_blob_tracked(&code, tracker).await?;

        tracker.enter(PipelineStage::Done);
        Ok(PipelineResponse {
            code,
            report: PipelineReport {
                policy_version: enhanced.policy_version,
                prompt_after_enhancement: enhanced.text,
                semgrep,
            },
            decision: Decision::CodeOnly,
        })
    }

    /// Consume the generator's stream into one blob.
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let collect = async {
            let mut stream = self.generator.generate(prompt).await?;
            let mut blob = String::new();
            let mut chunks = 0usize;
            while let Some(chunk) = stream.next().await {
                blob.push_str(&chunk?);
                chunks += 1;
            }
            debug!(chunks, bytes = blob.len(), "generation stream finished");
            Ok::<_, PipelineError>(blob)
        };

        let blob = match self.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| PipelineError::GenerationTimeout(limit.as_secs()))??,
            None => collect.await?,
        };

        Ok(finalize_blob(&blob))
    }

    async fn analyze_blob_tracked(
        &self,
        blob: &str,
        tracker: &StageTracker,
    ) -> Result<AnalysisReport, PipelineError> {
        tracker.enter(PipelineStage::Materializing);
        let fence = strip_fence(blob);
        let manifest = FileManifest::parse(&fence.inner_text, &fence.declared_language)?;
        let work_dir = self.work_dir.clone();
        // Filesystem work runs off the async workers. A dropped handle still
        // lets the task finish, and its TempDir removes itself on drop.
        let project = tokio::task::spawn_blocking(move || {
            MaterializedProject::write(&manifest, work_dir.as_deref())
        })
        .await??;
        let files = project.relative_paths();

        tracker.enter(PipelineStage::Detecting);
        let languages = detect_languages(&files, &fence.declared_language);

        tracker.enter(PipelineStage::Selecting);
        let packs = self.selector.select(&languages);
        debug!(
            languages = ?languages.to_vec(),
            packs = ?packs.as_slice(),
            "selected rule packs"
        );

        tracker.enter(PipelineStage::Analyzing);
        let report = self
            .runner
            .analyze(project.root(), &packs)
            .await
            .with_project(&files, &languages, &packs);

        match tokio::task::spawn_blocking(move || project.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to remove project root"),
            Err(e) => warn!(error = %e, "project cleanup task failed"),
        }
        Ok(report)
    }
}

/// Trim a generated blob, replacing empty output with [`EMPTY_BLOB_SENTINEL`].
pub fn finalize_blob(blob: &str) -> String {
    let trimmed = blob.trim();
    if trimmed.is_empty() {
        EMPTY_BLOB_SENTINEL.to_string()
    } else {
        trimmed.to_string()
    }
}
