//! The generative backend boundary: an OpenAI-compatible HTTP client
//! plus the trait that lets tests script replies.

use async_trait::async_trait;
use serde::Deserialize;

use super::GenerateRequest;
use crate::config::AiConfig;
use crate::error::{MemoWeaveError, Result};

const MAX_ERROR_DETAIL: usize = 300;

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Text generation; returns the model's raw reply.
    async fn generate(&self, request: GenerateRequest) -> Result<String>;

    /// Text to speech; returns raw 24 kHz 16-bit mono PCM.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    /// Speech to text.
    async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<String>;
}

/// Backend speaking the OpenAI-compatible REST surface described by
/// `AiConfig`.
pub struct HttpBackend {
    config: AiConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpBackend {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// The key is read from the environment variable named in config,
    /// never stored in the config file itself.
    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_env).map_err(|_| {
            MemoWeaveError::InvalidOperation(format!(
                "Set {} to use AI commands.",
                self.config.api_key_env
            ))
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn reject(flow: &'static str, response: reqwest::Response) -> MemoWeaveError {
        let status = response.status().as_u16();
        let mut detail = response.text().await.unwrap_or_default();
        detail.truncate(MAX_ERROR_DETAIL);
        tracing::debug!(flow, status, detail, "backend request failed");
        MemoWeaveError::Backend { status, detail }
    }
}

#[async_trait]
impl GenerativeBackend for HttpBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let api_key = self.api_key()?;
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });
        if let Some(schema) = &request.schema {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": request.flow, "schema": schema },
            });
        }

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::reject(request.flow, response).await);
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(MemoWeaveError::FlowOutputRejected { flow: request.flow })
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let api_key = self.api_key()?;
        let body = serde_json::json!({
            "model": self.config.speech_model,
            "input": text,
            "voice": voice,
            "response_format": "pcm",
        });

        let response = self
            .client
            .post(self.endpoint("audio/speech"))
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::reject("speak", response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let extension = mime.strip_prefix("audio/").unwrap_or("bin");
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(format!("audio.{}", extension))
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&api_key)
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::reject("transcribe", response).await);
        }

        let reply: TranscriptionResponse = response.json().await?;
        Ok(reply.text)
    }
}
