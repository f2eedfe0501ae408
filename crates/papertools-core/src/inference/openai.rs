use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{InferenceError, InferredMetadata, MetadataService, build_prompt, parse_metadata_json};
use crate::{BatchError, Config};

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    /// Build a client from `config`. Fails with
    /// [`BatchError::CredentialMissing`] when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self, BatchError> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// JSON request body for one inference call.
    pub fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(text) }],
            "response_format": { "type": "json_object" },
        })
    }
}

/// Pull the assistant message out of a chat-completions response body and
/// parse it as metadata JSON.
pub fn parse_chat_response(body: &serde_json::Value) -> Result<InferredMetadata, InferenceError> {
    let choices = body["choices"]
        .as_array()
        .ok_or_else(|| InferenceError::MalformedResponse("missing `choices`".into()))?;
    let content = choices
        .first()
        .and_then(|c| c["message"]["content"].as_str())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(InferenceError::EmptyResponse)?;
    parse_metadata_json(content)
}

impl MetadataService for OpenAiClient {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn infer<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<InferredMetadata, InferenceError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(model = %self.model, chars = text.chars().count(), "inference request");

            let resp = self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .timeout(self.timeout)
                .json(&self.request_body(text))
                .send()
                .await
                .map_err(map_request_error)?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(InferenceError::Status {
                    code: status.as_u16(),
                    body: body.chars().take(300).collect(),
                });
            }

            let data: serde_json::Value = resp.json().await.map_err(map_request_error)?;
            let meta = parse_chat_response(&data)?;
            tracing::debug!(model = %self.model, "inference response parsed");
            Ok(meta)
        })
    }
}

fn map_request_error(e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout
    } else if e.is_decode() {
        InferenceError::MalformedResponse(e.to_string())
    } else {
        InferenceError::Request(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> Config {
        Config {
            api_key: Some("sk-test".into()),
            api_base_url: "http://localhost:9999/v1/".into(),
            ..Config::default()
        }
    }

    #[test]
    fn test_from_config_requires_key() {
        assert!(matches!(
            OpenAiClient::from_config(&Config::default()),
            Err(BatchError::CredentialMissing)
        ));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = OpenAiClient::from_config(&config_with_key()).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiClient::from_config(&config_with_key()).unwrap();
        let body = client.request_body("Front text");
        assert_eq!(body["model"], "gpt-4.1-nano");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(
            body["messages"][0]["content"]
                .as_str()
                .unwrap()
                .contains("Front text")
        );
    }

    #[test]
    fn test_parse_chat_response() {
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"title\": \"T\", \"authors\": [\"Doe\"], \"year\": \"2022\"}"
                }
            }]
        });
        let meta = parse_chat_response(&body).unwrap();
        assert_eq!(meta.authors, Some(vec!["Doe".to_string()]));
        assert_eq!(meta.year.as_deref(), Some("2022"));
    }

    #[test]
    fn test_parse_chat_response_empty() {
        let body = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_chat_response(&body),
            Err(InferenceError::EmptyResponse)
        ));
        let body = serde_json::json!({ "choices": [{ "message": { "content": null } }] });
        assert!(matches!(
            parse_chat_response(&body),
            Err(InferenceError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_chat_response_missing_choices() {
        let body = serde_json::json!({ "error": { "message": "bad key" } });
        assert!(matches!(
            parse_chat_response(&body),
            Err(InferenceError::MalformedResponse(_))
        ));
    }
}
