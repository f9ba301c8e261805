//! Contracts for the collaborators around the core pipeline.
//!
//! The pipeline only depends on these traits. The crate ships small
//! implementations of each so the CLI works end to end; callers with their own
//! firewall, policy engine or model service plug in their own.

mod enhance;
mod generate;
mod sanitize;

pub use enhance::{PolicyEnhancer, DEFAULT_POLICY_VERSION};
pub use generate::{HttpGenerator, ReplayGenerator, Utf8Chunker};
pub use sanitize::BasicSanitizer;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Errors raised by a [`Generator`].
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Stream(String),
}

/// Streamed generator output.
pub type ChunkStream = BoxStream<'static, Result<String, GenerationError>>;

/// Cleans a raw user prompt. Must accept any input, including an empty one.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, raw_prompt: &str) -> String;
}

/// A prompt after policy enhancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedPrompt {
    pub text: String,
    pub policy_version: String,
}

/// Wraps a sanitized prompt with generation policy.
pub trait Enhancer: Send + Sync {
    fn enhance(&self, sanitized_prompt: &str) -> EnhancedPrompt;
}

/// Produces code for a prompt as a finite, ordered stream of text chunks.
///
/// The stream is consumed once; it is not restarted.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<ChunkStream, GenerationError>;
}
