//! Prompt templates for text enhancement

/// System instruction sent with every enhancement request
pub const ENHANCEMENT_SYSTEM_PROMPT: &str =
    "You are a document text extraction enhancement assistant.";

/// Prompt builder for enhancement requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the enhancement prompt for text extracted from a `file_type` file
    pub fn build_enhancement_prompt(raw_text: &str, file_type: &str) -> String {
        format!(
            "Please analyze and enhance the following extracted text from a {} file. \
             If there are any obvious OCR errors or unclear sections, please correct them. \
             Maintain the original structure but improve clarity and readability.\n\n\
             Original text:\n{}",
            file_type, raw_text
        )
    }
}
