use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One prompt in, the model's raw text out.
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// # Errors
    ///
    /// Returns `FetchError` for transport failures, non-2xx statuses and
    /// response envelopes without generated text.
    async fn complete(&self, prompt: &str) -> Result<String, FetchError>;
}

/// Client for the question-generation proxy.
///
/// Posts `{"prompt": ...}` and reads `choices[0].message.content` from a
/// chat-completions style reply.
#[derive(Clone)]
pub struct HttpContentClient {
    client: Client,
    endpoint: String,
}

impl HttpContentClient {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ContentClient for HttpContentClient {
    async fn complete(&self, prompt: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProxyRequest { prompt })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| FetchError::MalformedResponse(err.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| FetchError::MalformedResponse("missing generated content".into()))
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_without_choices_deserializes_empty() {
        let body: ChatResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.choices.is_empty());

        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "{\"definition\":\"d\"}"}}]
        }))
        .unwrap();
        assert_eq!(
            body.choices[0].message.content.as_deref(),
            Some("{\"definition\":\"d\"}")
        );
    }

    #[test]
    fn request_body_is_a_single_prompt_field() {
        let body = serde_json::to_value(ProxyRequest { prompt: "p" }).unwrap();
        assert_eq!(body, json!({"prompt": "p"}));
    }
}
