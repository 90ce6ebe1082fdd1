//! Chat-completion and speech HTTP client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::error::{AiError, AiResult};
use crate::types::{ChatMessage, ChatRequest, ChatResponse, SpeechRequest};

/// Configuration for the AI client.
#[derive(Debug, Clone)]
pub struct AiClientConfig {
    /// Bearer token for the service
    pub api_key: Option<String>,
    /// Base URL, including the `/v1` prefix
    pub base_url: String,
    /// Chat model for planning and code generation
    pub llm_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Speech model
    pub tts_model: String,
    /// Speech voice
    pub tts_voice: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for transport failures
    pub max_retries: u32,
}

impl Default for AiClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            llm_model: "gpt-4".to_string(),
            temperature: 0.7,
            tts_model: "tts-1-hd".to_string(),
            tts_voice: "alloy".to_string(),
            timeout: Duration::from_secs(300),
            max_retries: 2,
        }
    }
}

impl AiClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.temperature),
            tts_model: std::env::var("TTS_MODEL").unwrap_or(defaults.tts_model),
            tts_voice: std::env::var("TTS_VOICE").unwrap_or(defaults.tts_voice),
            timeout: Duration::from_secs(
                std::env::var("AI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("AI_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }
}

/// Client for the chat-completion and speech endpoints.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: Client,
    config: AiClientConfig,
    api_key: String,
}

impl AiClient {
    /// Create a new client. Fails without an API key.
    pub fn new(config: AiClientConfig) -> AiResult<Self> {
        let api_key = config.api_key.clone().ok_or(AiError::MissingApiKey)?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Network)?;

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> AiResult<Self> {
        Self::new(AiClientConfig::from_env())
    }

    pub fn config(&self) -> &AiClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Run a chat completion and return the first choice's text.
    pub async fn chat(&self, system: &str, user: &str) -> AiResult<String> {
        let url = self.url("chat/completions");
        let request = ChatRequest {
            model: self.config.llm_model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.config.temperature,
        };

        debug!(model = %request.model, "Sending chat completion request");

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(AiError::Network)?;
                check_status(response).await
            })
            .await?;

        let body: ChatResponse = response.json().await?;
        let text = body
            .first_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AiError::invalid_response("No content in chat completion"))?;

        Ok(text.to_string())
    }

    /// Synthesize `text` and write the audio to `output`.
    pub async fn speech(&self, text: &str, output: &Path) -> AiResult<PathBuf> {
        if text.trim().is_empty() {
            return Err(AiError::invalid_response("empty narration text"));
        }

        let url = self.url("audio/speech");
        let request = SpeechRequest {
            model: self.config.tts_model.clone(),
            voice: self.config.tts_voice.clone(),
            input: text.to_string(),
            speed: 1.0,
            response_format: "mp3".to_string(),
        };

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(AiError::Network)?;
                check_status(response).await
            })
            .await?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(AiError::invalid_response("speech response was empty"));
        }
        tokio::fs::write(output, &bytes).await?;

        info!(bytes = bytes.len(), "Wrote narration to {}", output.display());
        Ok(output.to_path_buf())
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> AiResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AiResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "AI request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(AiError::RequestFailed("Unknown error".to_string())))
    }
}

/// Map non-success statuses to errors, keeping the body for diagnostics.
async fn check_status(response: Response) -> AiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("AI service returned {}: {}", status, body);

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(AiError::ServiceUnavailable(message))
    } else {
        Err(AiError::RequestFailed(message))
    }
}
