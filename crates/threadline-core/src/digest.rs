use anyhow::Result;

use crate::generator::Generator;
use crate::prompts::PromptSet;

/// Free-text summary of arbitrary content, a few paragraphs long.
pub async fn summarize_text(generator: &Generator, prompts: &PromptSet, content: &str) -> Result<String> {
    let summary = generator
        .generate("digest", None, prompts.digest_prompt(content))
        .await?;
    Ok(summary.trim().to_string())
}
