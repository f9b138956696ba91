//! Wire types for the Gemini `generateContent` family of endpoints
//!
//! Converts domain generation settings into request bodies and API
//! responses (including error envelopes) into plain text or
//! [`ServiceError`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use solver_application::ServiceError;
use solver_domain::GenerationConfig;
use std::collections::BTreeMap;

/// Harm categories the API accepts in `safetySettings`
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// ─── Domain → Gemini ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    /// Concatenated text of all parts
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(|p| p.text.as_deref()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    pub top_k: u32,
    /// Provider-specific parameters, passed through as given
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<&GenerationConfig> for WireGenerationConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature(),
            max_output_tokens: config.max_tokens(),
            top_p: config.top_p(),
            top_k: config.top_k(),
            extra: config.extra().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: WireGenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    /// Single-turn request for `prompt`; content filters are relaxed so
    /// code samples are not blocked
    pub fn new(prompt: &str, config: &GenerationConfig) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            generation_config: config.into(),
            safety_settings: HARM_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountTokensRequest {
    pub contents: Vec<Content>,
}

impl CountTokensRequest {
    pub fn new(text: &str) -> Self {
        Self {
            contents: vec![Content::user(text)],
        }
    }
}

// ─── Gemini → Domain ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text of the first candidate.
    ///
    /// A blocked prompt is a rejection; an empty candidate list yields an
    /// empty string, which the lifecycle reports as an empty response.
    pub fn into_text(self) -> Result<String, ServiceError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ServiceError::rejected(format!("Prompt blocked: {}", reason)));
        }
        Ok(self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.text())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Map a non-success HTTP response to a service error.
///
/// 429 and `RESOURCE_EXHAUSTED` are rate limits, 5xx are transport
/// failures, everything else is a rejection.
pub fn classify_error(status: u16, body: &str) -> ServiceError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), None),
    };
    let message = format!("HTTP {}: {}", status, message);

    if status == 429 || api_status.as_deref() == Some("RESOURCE_EXHAUSTED") {
        ServiceError::rate_limited(message)
    } else if status >= 500 {
        ServiceError::transport(message)
    } else {
        ServiceError::rejected(message)
    }
}

/// Decode a response body, mapping parse failures to rejections
pub fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body)
        .map_err(|e| ServiceError::rejected(format!("Failed to parse response: {}", e)))
}
