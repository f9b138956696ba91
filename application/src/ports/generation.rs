//! Generation service port
//!
//! The raw text-generation API as seen by the application: one request per
//! call, no retries, no state. Retry and health policy are layered on top
//! by [`ServiceProvider`](crate::provider::ServiceProvider) and
//! [`ProviderLifecycle`](crate::provider::ProviderLifecycle).

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use solver_domain::GenerationConfig;
use std::fmt;
use thiserror::Error;

/// Broad category of a service failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Quota or rate limit hit; worth retrying after a pause
    RateLimited,
    /// Network or protocol failure
    Transport,
    /// The service refused or could not process the request
    Rejected,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceErrorKind::RateLimited => "rate limited",
            ServiceErrorKind::Transport => "transport error",
            ServiceErrorKind::Rejected => "request rejected",
        };
        f.write_str(label)
    }
}

/// Error returned by a [`GenerationService`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::RateLimited, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Transport, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Rejected, message)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ServiceErrorKind::RateLimited
    }
}

/// A lazy, finite, one-shot sequence of text chunks.
///
/// Not restartable: a new request is needed for a new stream. Dropping the
/// stream before it is exhausted cancels it; nothing runs in the
/// background.
pub struct TextStream<E> {
    inner: BoxStream<'static, Result<String, E>>,
    exhausted: bool,
}

impl<E: Send + 'static> TextStream<E> {
    pub fn new(inner: BoxStream<'static, Result<String, E>>) -> Self {
        Self {
            inner,
            exhausted: false,
        }
    }

    /// Stream over already available chunks
    pub fn from_chunks(chunks: Vec<String>) -> Self {
        Self::new(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    /// Next chunk, or `None` once exhausted. An error also exhausts the
    /// stream.
    pub async fn next_chunk(&mut self) -> Option<Result<String, E>> {
        if self.exhausted {
            return None;
        }
        match self.inner.next().await {
            Some(Ok(chunk)) => Some(Ok(chunk)),
            Some(Err(e)) => {
                self.exhausted = true;
                Some(Err(e))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Convert the error type of every item
    pub fn map_err<F, E2>(self, mut f: F) -> TextStream<E2>
    where
        F: FnMut(E) -> E2 + Send + 'static,
        E2: Send + 'static,
    {
        TextStream {
            inner: self.inner.map(move |item| item.map_err(&mut f)).boxed(),
            exhausted: self.exhausted,
        }
    }

    /// Drain the stream, calling `on_chunk` for each piece, and return the
    /// concatenated text.
    pub async fn collect_text(mut self, mut on_chunk: impl FnMut(&str)) -> Result<String, E> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk?;
            on_chunk(&chunk);
            text.push_str(&chunk);
        }
        Ok(text)
    }
}

impl<E> fmt::Debug for TextStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextStream")
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

/// External text-generation service
///
/// Implementations live in the infrastructure layer (e.g. the Gemini REST
/// client). The config passed in is already merged with any per-call
/// overrides.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ServiceError>;

    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextStream<ServiceError>, ServiceError>;

    async fn count_tokens(
        &self,
        text: &str,
        config: &GenerationConfig,
    ) -> Result<u64, ServiceError>;
}
