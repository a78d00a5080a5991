//! Google Gemini REST client.
//!
//! Two endpoints are used:
//!
//! - `models/{model}:generateContent` for generation
//! - `models/{model}:countTokens` for input-token accounting
//!
//! Text parts are sent as `{"text": ...}`; a [`DocumentHandle`] becomes an
//! `inlineData` part so the model reads the PDF natively. The API key travels
//! in the `x-goog-api-key` header, never in the URL, so request URLs are safe
//! to log.

use super::{DocumentHandle, Oracle, PromptPart};
use crate::error::OracleError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Public Gemini API root.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini-backed [`Oracle`].
pub struct GeminiOracle {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    system_instruction: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            system_instruction: None,
            temperature: 0.2,
            max_output_tokens: 8192,
        }
    }

    /// Point at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_generation(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    fn endpoint(&self, method: &str) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn generate_request<'a>(&'a self, parts: &'a [PromptPart]) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content::user(parts)],
            system_instruction: self.system_instruction.as_deref().map(|text| SystemContent {
                parts: vec![WirePart::Text { text }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, OracleError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body, retry_after))
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[PromptPart]) -> Result<String, OracleError> {
        let url = self.endpoint("generateContent");
        debug!(model = %self.model, parts = parts.len(), "Sending generateContent request");

        let response = self.post(&url, &self.generate_request(parts)).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))?;

        if let Some(usage) = &body.usage_metadata {
            debug!(
                "Gemini usage: {} prompt tokens, {} candidate tokens",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }
        extract_text(body)
    }

    async fn count_tokens(&self, parts: &[PromptPart]) -> Result<u64, OracleError> {
        let url = self.endpoint("countTokens");
        let request = CountTokensRequest {
            contents: vec![Content::user(parts)],
        };
        let response = self.post(&url, &request).await?;
        let body: CountTokensResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))?;
        Ok(body.total_tokens)
    }
}

/// Map a non-2xx status to the matching [`OracleError`].
fn status_error(status: StatusCode, body: String, retry_after: Option<u64>) -> OracleError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => OracleError::RateLimited {
            retry_after_secs: retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OracleError::Auth {
            detail: api_error_message(&body).unwrap_or(body),
        },
        _ => OracleError::Http {
            status: status.as_u16(),
            body: api_error_message(&body).unwrap_or(body),
        },
    }
}

/// `error.message` from a Google API error body, if it has one.
fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Result<String, OracleError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response.prompt_feedback.and_then(|f| f.block_reason);
        return Err(OracleError::EmptyResponse { reason });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(OracleError::EmptyResponse {
            reason: candidate.finish_reason,
        });
    }
    Ok(text)
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct CountTokensRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

impl<'a> Content<'a> {
    fn user(parts: &'a [PromptPart]) -> Self {
        Self {
            role: "user",
            parts: parts.iter().map(WirePart::from).collect(),
        }
    }
}

#[derive(Serialize)]
struct SystemContent<'a> {
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

impl<'a> From<&'a PromptPart> for WirePart<'a> {
    fn from(part: &'a PromptPart) -> Self {
        match part {
            PromptPart::Text(text) => WirePart::Text { text: text.as_str() },
            PromptPart::Document(DocumentHandle {
                mime_type, data, ..
            }) => WirePart::Inline {
                inline_data: InlineData {
                    mime_type: mime_type.as_str(),
                    data: data.as_ref(),
                },
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: u64,
}
