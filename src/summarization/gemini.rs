use super::response::extract_response_text;
use super::{RetryPolicy, SUMMARY_TEMPERATURE, SummarizationClient, SummarizationClientError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
}

impl GeminiSummarizationClient {
    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        let http = build_http_client(config.gemini_timeout)?;
        tracing::debug!(
            base_url = %config.gemini_base_url,
            model = %config.gemini_model,
            timeout_secs = config.gemini_timeout.as_secs(),
            max_attempts = config.gemini_max_attempts,
            "Initialized Gemini client"
        );
        Ok(Self {
            http,
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
            retry: RetryPolicy {
                max_attempts: config.gemini_max_attempts,
                initial_backoff: config.gemini_backoff,
                ..RetryPolicy::default()
            },
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": {
                "temperature": SUMMARY_TEMPERATURE,
                "candidateCount": 1
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed { status, body });
        }

        let body: Value = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Gemini response: {error}"
            ))
        })?;
        tracing::trace!(response = %body, "Gemini response");

        let text = extract_response_text(&body);
        if text.is_empty() {
            tracing::warn!(model = %self.model, "Gemini response contained no text");
        }
        Ok(text)
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, SummarizationClientError> {
    Client::builder()
        .user_agent("docsum/summary")
        .timeout(timeout)
        .build()
        .map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })
}

#[async_trait]
impl SummarizationClient for GeminiSummarizationClient {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizationClientError> {
        self.retry.run(|_| self.generate_once(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::LengthTier;
    use crate::summarization::SummarizationRequest;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer, retry: RetryPolicy) -> GeminiSummarizationClient {
        GeminiSummarizationClient {
            http: build_http_client(Duration::from_secs(5)).expect("client"),
            base_url: server.base_url(),
            model: "gemini-test".into(),
            api_key: "secret".into(),
            retry,
        }
    }

    #[tokio::test]
    async fn sends_prompt_with_low_temperature_single_candidate() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-test:generateContent")
                    .header("x-goog-api-key", "secret")
                    .json_body(json!({
                        "contents": [{
                            "role": "user",
                            "parts": [{ "text": "Summarize this text in 2-3 sentences:\n\nhello world" }]
                        }],
                        "generationConfig": { "temperature": 0.2, "candidateCount": 1 }
                    }));
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "Greeting." }] } }]
                }));
            })
            .await;

        let summary = client_for(&server, RetryPolicy::none())
            .generate_summary(SummarizationRequest {
                chunk: "hello world".into(),
                tier: LengthTier::Short,
            })
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Greeting.");
    }

    #[tokio::test]
    async fn unknown_response_shape_yields_empty_summary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "promptFeedback": { "blockReason": "OTHER" } }));
            })
            .await;

        let summary = client_for(&server, RetryPolicy::none())
            .generate("anything")
            .await
            .expect("empty summary is not an error");
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_reported_after_retries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("overloaded");
            })
            .await;

        let retry = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        };
        let error = client_for(&server, retry)
            .generate("anything")
            .await
            .expect_err("error response");

        mock.assert_hits_async(2).await;
        assert!(matches!(
            error,
            SummarizationClientError::GenerationFailed { status, ref body }
                if status.as_u16() == 503 && body == "overloaded"
        ));
    }

    #[tokio::test]
    async fn key_points_are_parsed_from_bullets() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).body_contains("key points");
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "- One\n- Two\n" }] } }]
                }));
            })
            .await;

        let points = client_for(&server, RetryPolicy::none())
            .generate_key_points("some long text")
            .await
            .expect("key points");
        assert_eq!(points, vec!["One", "Two"]);
    }
}
