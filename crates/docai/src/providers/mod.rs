//! Language-model backends used for text enhancement

pub mod llm;
pub mod ollama;
pub mod openai;

pub use llm::{CompletionRequest, LlmError, LlmProvider};
pub use ollama::OllamaLlm;
pub use openai::OpenAiLlm;

use std::sync::Arc;

use crate::config::{LlmBackend, LlmConfig};
use crate::error::Result;

/// Create the configured LLM provider
pub fn build_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        LlmBackend::OpenAi => Arc::new(OpenAiLlm::new(config)?),
        LlmBackend::Ollama => Arc::new(OllamaLlm::new(config)?),
    };

    tracing::info!(
        "LLM provider: {} (model: {})",
        provider.name(),
        provider.model()
    );
    Ok(provider)
}
