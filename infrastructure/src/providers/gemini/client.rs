//! Gemini REST client
//!
//! Implements [`GenerationService`] over the Generative Language API:
//! `generateContent`, `streamGenerateContent` (SSE) and `countTokens`.
//! Retries are not done here; the owning provider wraps this client in
//! its backoff policy.

use super::sse::SseDecoder;
use super::types::{
    CountTokensRequest, CountTokensResponse, GenerateContentRequest, GenerateContentResponse,
    classify_error, decode,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use solver_application::{GenerationService, ServiceError, TextStream};
use solver_domain::GenerationConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/models/{model}:{method}`
    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    /// POST a JSON body, turning transport failures and non-2xx statuses
    /// into service errors
    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<reqwest::Response, ServiceError> {
        let response = self
            .http
            .post(url)
            .query(query)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::transport(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    ServiceError::transport(format!("Connection failed: {}", e))
                } else {
                    ServiceError::transport(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = classify_error(status.as_u16(), &body);
        debug!(url, status = status.as_u16(), error = %error, "Gemini request failed");
        Err(error)
    }

    async fn read_body(response: reqwest::Response) -> Result<String, ServiceError> {
        response
            .text()
            .await
            .map_err(|e| ServiceError::transport(format!("Failed to read response: {}", e)))
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ServiceError> {
        let url = self.endpoint(config.model(), "generateContent");
        let request = GenerateContentRequest::new(prompt, config);
        debug!(model = config.model(), "Gemini generateContent");

        let response = self.post(&url, &[], &request).await?;
        let body = Self::read_body(response).await?;
        decode::<GenerateContentResponse>(&body)?.into_text()
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextStream<ServiceError>, ServiceError> {
        let url = self.endpoint(config.model(), "streamGenerateContent");
        let request = GenerateContentRequest::new(prompt, config);
        debug!(model = config.model(), "Gemini streamGenerateContent");

        let response = self.post(&url, &[("alt", "sse")], &request).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|b| b.to_vec())
                    .map_err(|e| ServiceError::transport(format!("Stream interrupted: {}", e)))
            })
            .boxed();
        Ok(TextStream::new(text_chunks(bytes)))
    }

    async fn count_tokens(
        &self,
        text: &str,
        config: &GenerationConfig,
    ) -> Result<u64, ServiceError> {
        let url = self.endpoint(config.model(), "countTokens");
        let response = self.post(&url, &[], &CountTokensRequest::new(text)).await?;
        let body = Self::read_body(response).await?;
        Ok(decode::<CountTokensResponse>(&body)?.total_tokens)
    }
}

struct SseState {
    bytes: BoxStream<'static, Result<Vec<u8>, ServiceError>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Turn raw SSE bytes into non-empty text chunks
fn text_chunks(
    bytes: BoxStream<'static, Result<Vec<u8>, ServiceError>>,
) -> BoxStream<'static, Result<String, ServiceError>> {
    let state = SseState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                trace!(payload = %payload, "SSE event");
                let text = decode::<GenerateContentResponse>(&payload).and_then(|r| r.into_text());
                match text {
                    Ok(text) if text.is_empty() => continue,
                    other => return Some((other, state)),
                }
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.push(&bytes);
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver_application::ServiceErrorKind;

    fn byte_stream(
        chunks: Vec<Result<String, ServiceError>>,
    ) -> BoxStream<'static, Result<Vec<u8>, ServiceError>> {
        stream::iter(chunks.into_iter().map(|c| c.map(String::into_bytes))).boxed()
    }

    fn event(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{}\"}}]}}}}]}}\r\n\r\n",
            text
        )
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new("key", "https://example.test/v1beta/").unwrap();
        assert_eq!(client.base_url(), "https://example.test/v1beta");
        assert_eq!(
            client.endpoint("gemini-pro", "generateContent"),
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_stream_yields_text_chunks() {
        let first = event("Hel");
        let raw = format!("{}{}", first, event("lo"));
        let (a, b) = raw.split_at(first.len() / 2);

        let stream = TextStream::new(text_chunks(byte_stream(vec![
            Ok(a.to_string()),
            Ok(b.to_string()),
        ])));
        let text = stream.collect_text(|_| {}).await.unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_stream_skips_empty_events() {
        let raw = format!("{}{}", event(""), event("x"));
        let mut chunks = Vec::new();
        let stream = TextStream::new(text_chunks(byte_stream(vec![Ok(raw)])));
        stream
            .collect_text(|c| chunks.push(c.to_string()))
            .await
            .unwrap();
        assert_eq!(chunks, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_error_ends_stream() {
        let mut stream = TextStream::new(text_chunks(byte_stream(vec![
            Ok(event("partial")),
            Err(ServiceError::transport("reset")),
            Ok(event("more")),
        ])));

        assert_eq!(stream.next_chunk().await, Some(Ok("partial".to_string())));
        let err = stream.next_chunk().await.unwrap().unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Transport);
        assert_eq!(stream.next_chunk().await, None);
        assert!(stream.is_exhausted());
    }

    #[tokio::test]
    async fn test_malformed_event_is_rejected() {
        let stream = TextStream::new(text_chunks(byte_stream(vec![Ok("data: {not json\n\n".to_string())])));
        let err = stream.collect_text(|_| {}).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Rejected);
    }
}
