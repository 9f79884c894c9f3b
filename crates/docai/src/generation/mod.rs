//! Text enhancement with an LLM

pub mod enhancer;
pub mod prompt;

pub use enhancer::Enhancer;
pub use prompt::{PromptBuilder, ENHANCEMENT_SYSTEM_PROMPT};
