use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ContentReviewer, ReviewRequest, ReviewerError};
use crate::config::ReviewConfig;

const SYSTEM_PROMPT: &str = "You moderate rental listings for a student housing marketplace in India. \
Check that the listing is coherent, plausibly priced, free of discriminatory or unsafe content, and \
complete enough for a student to decide. Reply with JSON only: \
{\"confidence\": 0-100, \"score\": 0-100, \"recommendation\": \"APPROVE\" | \"REJECT\" | \"MANUAL_REVIEW\", \
\"reason\": \"short analysis\", \"concerns\": [\"...\"]}";

/// Reviewer backed by an OpenAI-compatible chat-completions endpoint (Groq by default).
pub struct HttpContentReviewer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl HttpContentReviewer {
    /// Build a reviewer when an API key is configured.
    pub fn from_config(config: &ReviewConfig) -> Result<Option<Self>, ReviewerError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ReviewerError::Transport(err.to_string()))?;

        Ok(Some(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        }))
    }
}

#[async_trait]
impl ContentReviewer for HttpContentReviewer {
    async fn review(&self, request: &ReviewRequest) -> Result<String, ReviewerError> {
        let prompt = request.prompt();
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.2,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReviewerError::Status(status.as_u16()));
        }

        let payload: ChatResponse = response.json().await.map_err(map_transport)?;
        tracing::debug!(model = %self.model, choices = payload.choices.len(), "reviewer replied");

        Ok(payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

fn map_transport(err: reqwest::Error) -> ReviewerError {
    if err.is_timeout() {
        ReviewerError::Timeout
    } else {
        ReviewerError::Transport(err.to_string())
    }
}

impl std::fmt::Debug for HttpContentReviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContentReviewer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
