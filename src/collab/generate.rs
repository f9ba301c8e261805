//! Generator implementations: a streaming HTTP client and a replay source.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::debug;

use super::{ChunkStream, GenerationError, Generator};

/// Streams code from an HTTP generation service.
///
/// Sends `POST <endpoint>` with `{"prompt": "..."}` and treats the response
/// body as plain text arriving in arbitrary chunks.
pub struct HttpGenerator {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpGenerator {
    pub fn new(endpoint: &str, connect_timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("securegen/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<ChunkStream, GenerationError> {
        debug!(endpoint = %self.endpoint, "requesting generation");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = Box::pin(response.bytes_stream());
        let chunks = stream::unfold(
            (body, Utf8Chunker::default(), false),
            |(mut body, mut decoder, done)| async move {
                if done {
                    return None;
                }
                match body.next().await {
                    Some(Ok(bytes)) => Some((Ok(decoder.push(&bytes)), (body, decoder, false))),
                    Some(Err(e)) => Some((Err(GenerationError::from(e)), (body, decoder, true))),
                    None => {
                        let rest = decoder.finish();
                        if rest.is_empty() {
                            None
                        } else {
                            Some((Ok(rest), (body, decoder, true)))
                        }
                    }
                }
            },
        );

        Ok(chunks.boxed())
    }
}

/// Incremental UTF-8 decoder for byte chunks.
///
/// A multi-byte character split across two chunks is held back until the rest
/// of it arrives. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    /// Feed a chunk and return all text that is complete so far.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // valid_up_to always lands on a char boundary.
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is left, replacing an incomplete tail with U+FFFD.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).to_string();
        self.pending.clear();
        rest
    }
}

/// Replays pre-recorded chunks.
#[derive(Debug, Clone, Default)]
pub struct ReplayGenerator {
    chunks: Vec<String>,
}

impl ReplayGenerator {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Replay a whole text as a single chunk.
    pub fn from_text(text: &str) -> Self {
        Self::new([text])
    }
}

#[async_trait]
impl Generator for ReplayGenerator {
    async fn generate(&self, _prompt: &str) -> Result<ChunkStream, GenerationError> {
        Ok(stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed())
    }
}
