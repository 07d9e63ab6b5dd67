use async_trait::async_trait;
use secrecy::SecretString;
use textgen_api::{Client, Request, TextGenError};

use crate::server::config::AiConfiguration;
use crate::server::error::ServerError;

/// Produces text from a system persona and a single user prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, ServerError>;
}

/// Chat-completions backed generator.
pub struct ChatCompletionGenerator {
    client: Client,
    model: String,
}

impl ChatCompletionGenerator {
    pub fn new(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &AiConfiguration) -> Option<Self> {
        let api_key = config.api_key.as_deref().filter(|key| !key.is_empty())?;
        let api_key = SecretString::from(api_key.to_string());
        Some(Self::new(
            Client::with_base_url(&config.base_url, &api_key),
            &config.model,
        ))
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, ServerError> {
        let request = Request::chat().prompt(&self.model, system, prompt);
        let response = self
            .client
            .send(request)
            .await
            .map_err(|e| ServerError::Provider(e.to_string()))?;

        response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| ServerError::Provider(TextGenError::EmptyCompletion.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> ChatCompletionGenerator {
        ChatCompletionGenerator::from_config(&AiConfiguration {
            api_key: Some("sk-test".to_string()),
            base_url: server.uri(),
            model: "test-model".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn missing_key_disables_generator() {
        assert!(ChatCompletionGenerator::from_config(&AiConfiguration::default()).is_none());
        let empty = AiConfiguration {
            api_key: Some(String::new()),
            ..AiConfiguration::default()
        };
        assert!(ChatCompletionGenerator::from_config(&empty).is_none());
    }

    #[tokio::test]
    async fn generate_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "prompt"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cmpl-1",
                "model": "test-model",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "  Fresh caption #new  "},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let text = generator(&server).generate("persona", "prompt").await.unwrap();
        assert_eq!(text, "Fresh caption #new");
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = generator(&server).generate("persona", "prompt").await.unwrap_err();
        assert!(matches!(err, ServerError::Provider(_)));
    }

    #[tokio::test]
    async fn api_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = generator(&server).generate("persona", "prompt").await.unwrap_err();
        assert!(err.to_string().contains("Incorrect API key provided"));
    }
}
