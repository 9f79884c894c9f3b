//! LLM-backed refinement of extracted text

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::providers::{CompletionRequest, LlmError, LlmProvider};

use super::prompt::{PromptBuilder, ENHANCEMENT_SYSTEM_PROMPT};

/// Sends raw text to a language model and returns the corrected text.
///
/// Every attempt is bounded by a timeout. Timeouts, connection errors, 429
/// and 5xx responses are retried with exponential backoff; anything else
/// fails on the first attempt.
pub struct Enhancer {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
    attempt_timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl Enhancer {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Refine `raw_text` extracted from a file of type `file_type_hint`
    pub async fn enhance(&self, raw_text: &str, file_type_hint: &str) -> Result<String> {
        if raw_text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "enhancement requires non-empty text".to_string(),
            ));
        }

        let request = CompletionRequest {
            system: ENHANCEMENT_SYSTEM_PROMPT.to_string(),
            prompt: PromptBuilder::build_enhancement_prompt(raw_text, file_type_hint),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::info!(
            "Enhancing {} characters of {} text with {}",
            raw_text.len(),
            file_type_hint,
            self.provider.model()
        );

        self.retry_request(&request)
            .await
            .map_err(|e| Error::enhancement(format!("{} ({})", e, self.provider.name())))
    }

    /// Retry transient failures with exponential backoff
    async fn retry_request(&self, request: &CompletionRequest) -> std::result::Result<String, LlmError> {
        let mut attempt = 0u32;
        loop {
            match self.attempt(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        "Enhancement request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, request: &CompletionRequest) -> std::result::Result<String, LlmError> {
        let text = timeout(self.attempt_timeout, self.provider.complete(request))
            .await
            .unwrap_or(Err(LlmError::Timeout))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::Malformed("empty completion".to_string()));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;

    fn enhancer(llm: Arc<ScriptedLlm>) -> Enhancer {
        Enhancer::new(llm, &LlmConfig::default())
            .with_attempt_timeout(Duration::from_millis(200))
            .with_retry_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_empty_input_makes_no_call() {
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let result = tokio_test::block_on(enhancer(llm.clone()).enhance("  \n\t", "pdf"));
        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_carries_prompt_and_bounds() {
        let llm = Arc::new(ScriptedLlm::always("  The quick fox\n"));
        let text = enhancer(llm.clone()).enhance("Tbe qu1ck fox", "png").await.unwrap();
        assert_eq!(text, "The quick fox");

        let request = llm.last_request().unwrap();
        assert_eq!(request.system, ENHANCEMENT_SYSTEM_PROMPT);
        assert!(request.prompt.contains("from a png file"));
        assert!(request.prompt.ends_with("Tbe qu1ck fox"));
        assert_eq!(request.max_tokens, 1500);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let llm = Arc::new(ScriptedLlm::sequence(vec![
            Err(LlmError::Status { status: 503, body: "busy".into() }),
            Err(LlmError::Timeout),
            Ok("recovered".into()),
        ]));
        let text = enhancer(llm.clone()).enhance("raw", "pdf").await.unwrap();
        assert_eq!(text, "recovered");
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let llm = Arc::new(ScriptedLlm::sequence(vec![
            Err(LlmError::Status { status: 429, body: String::new() }),
            Err(LlmError::Status { status: 429, body: String::new() }),
            Err(LlmError::Status { status: 429, body: String::new() }),
            Ok("too late".into()),
        ]));
        let err = enhancer(llm.clone()).enhance("raw", "pdf").await.unwrap_err();
        assert!(matches!(err, Error::EnhancementFailed(_)));
        // default max_retries = 2
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let llm = Arc::new(ScriptedLlm::sequence(vec![Err(LlmError::Status {
            status: 401,
            body: "bad key".into(),
        })]));
        let err = enhancer(llm.clone()).enhance("raw", "docx").await.unwrap_err();
        assert!(matches!(err, Error::EnhancementFailed(msg) if msg.contains("401")));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_completion_is_malformed() {
        let llm = Arc::new(ScriptedLlm::always("   "));
        let err = enhancer(llm.clone()).enhance("raw", "xlsx").await.unwrap_err();
        assert!(matches!(err, Error::EnhancementFailed(_)));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let llm = Arc::new(ScriptedLlm::always("slow").with_delay(Duration::from_secs(5)));
        let enhancer = Enhancer::new(
            llm.clone(),
            &LlmConfig {
                max_retries: 1,
                ..LlmConfig::default()
            },
        )
        .with_attempt_timeout(Duration::from_millis(20))
        .with_retry_base_delay(Duration::from_millis(1));

        let err = enhancer.enhance("raw", "pdf").await.unwrap_err();
        assert!(matches!(err, Error::EnhancementFailed(msg) if msg.contains("timed out")));
        assert_eq!(llm.calls(), 2);
    }
}
