use std::sync::Arc;
use std::time::Duration;

use super::{ChatMessage, ChatRequest, ChatTransport, CompletionOptions, GenerationError, TransportError};

/// Retry and timeout policy of a [`GenerationClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub model: String,
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay after the first retryable failure; doubles per failure.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound for a single attempt.
    pub request_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_owned(),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Stateless, retrying front end to a [`ChatTransport`].
///
/// Cloning is cheap; clones share the transport.
#[derive(Clone)]
pub struct GenerationClient {
    transport: Arc<dyn ChatTransport>,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn ChatTransport>, config: GenerationConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Run one completion, retrying transient failures.
    ///
    /// Returns the trimmed text content. Retryable failures (see
    /// [`TransportError::is_retryable`]) are retried up to
    /// `max_attempts` total with exponential backoff between attempts;
    /// anything else fails after the current attempt.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            json_mode: options.json_mode,
        };
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            let outcome =
                match tokio::time::timeout(self.config.request_timeout, self.transport.send(&request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout),
                };

            let failure = match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::debug!(attempt, chars = text.len(), "generation call succeeded");
                    return Ok(text.trim().to_owned());
                }
                Ok(_) => TransportError::EmptyResponse,
                Err(e) => e,
            };

            if !failure.is_retryable() {
                tracing::warn!(attempt, error = %failure, "generation call failed permanently");
                return Err(GenerationError::Rejected { source: failure });
            }
            if attempt >= max_attempts {
                tracing::warn!(attempt, error = %failure, "generation retries exhausted");
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    source: failure,
                });
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "generation call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Delay after the `failed_attempt`-th failure: `initial * 2^(n-1)`,
    /// capped at `max_backoff`.
    fn backoff(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempt.saturating_sub(1));
        self.config
            .initial_backoff
            .saturating_mul(factor)
            .min(self.config.max_backoff)
    }
}
