//! Abstractive summarization through a hosted generative-text API.
//!
//! Callers hand over one chunk and a [`LengthTier`]; the client builds the tier's prompt,
//! issues a low-temperature single-candidate request and digs the reply text out of whichever
//! response shape the provider used.

mod gemini;
mod response;
mod retry;

pub use gemini::GeminiSummarizationClient;
pub use retry::RetryPolicy;

use crate::processing::LengthTier;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Sampling temperature sent with every request.
pub const SUMMARY_TEMPERATURE: f64 = 0.2;

/// Upper bound on key points kept from a reply.
pub const MAX_KEY_POINTS: usize = 7;

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider could not be reached (DNS, connect, timeout).
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider answered with a non-success status.
    #[error("Failed to generate summary ({status}): {body}")]
    GenerationFailed {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
    /// Provider response could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl SummarizationClientError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderUnavailable(_) => true,
            Self::GenerationFailed { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
            Self::InvalidResponse(_) => false,
        }
    }
}

/// One chunk to summarize at a given length.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Chunk text (already whitespace-normalized).
    pub chunk: String,
    /// Requested length tier; selects the prompt template.
    pub tier: LengthTier,
}

/// Interface implemented by abstractive summarization providers.
///
/// Implementors only supply [`generate`](SummarizationClient::generate); the summary and
/// key-point operations build their prompts on top of it.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Send `prompt` as the sole content and return the reply text (empty when none was found).
    async fn generate(&self, prompt: &str) -> Result<String, SummarizationClientError>;

    /// Summarize one chunk using the tier's prompt template.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        self.generate(&build_prompt(request.tier, &request.chunk))
            .await
    }

    /// Ask for a short bullet list of salient statements in `text`.
    async fn generate_key_points(
        &self,
        text: &str,
    ) -> Result<Vec<String>, SummarizationClientError> {
        let reply = self.generate(&build_key_points_prompt(text)).await?;
        Ok(parse_key_points(&reply))
    }
}

/// Build the summarization prompt for `chunk` at `tier`.
pub fn build_prompt(tier: LengthTier, chunk: &str) -> String {
    format!("Summarize this text {}:\n\n{chunk}", tier.instruction())
}

fn build_key_points_prompt(text: &str) -> String {
    format!(
        "List the {MAX_KEY_POINTS} most important key points of this text. \
         Return one point per line, each starting with \"- \", and nothing else:\n\n{text}"
    )
}

/// Turn a bullet-list reply into individual points.
///
/// Bullet markers and `1.`/`1)` numbering are stripped; blank lines are dropped.
pub(crate) fn parse_key_points(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(MAX_KEY_POINTS)
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix(['.', ')']) {
            return stripped.trim();
        }
    }
    line.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_follow_tier_templates() {
        assert_eq!(
            build_prompt(LengthTier::Short, "text"),
            "Summarize this text in 2-3 sentences:\n\ntext"
        );
        assert_eq!(
            build_prompt(LengthTier::Medium, "text"),
            "Summarize this text concisely:\n\ntext"
        );
        assert_eq!(
            build_prompt(LengthTier::Long, "text"),
            "Summarize this text with detailed points:\n\ntext"
        );
    }

    #[test]
    fn key_points_strip_markers_and_blank_lines() {
        let reply = "- First point\n\n* Second point\n3. Third point\n4) Fourth\n• Fifth\n2024 was a year";
        assert_eq!(
            parse_key_points(reply),
            vec![
                "First point",
                "Second point",
                "Third point",
                "Fourth",
                "Fifth",
                "2024 was a year"
            ]
        );
    }

    #[test]
    fn key_points_are_capped() {
        let reply = (0..20)
            .map(|index| format!("- point {index}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_key_points(&reply).len(), MAX_KEY_POINTS);
        assert!(parse_key_points("").is_empty());
    }

    #[test]
    fn retryable_classification() {
        assert!(SummarizationClientError::ProviderUnavailable("x".into()).is_retryable());
        assert!(
            SummarizationClientError::GenerationFailed {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !SummarizationClientError::GenerationFailed {
                status: StatusCode::FORBIDDEN,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!SummarizationClientError::InvalidResponse("x".into()).is_retryable());
    }
}
