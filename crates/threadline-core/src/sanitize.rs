//! Transcript validation and cleanup ahead of any prompt.

use crate::config::PipelineConfig;
use crate::error::SanitizeError;
use crate::timestamp;

/// Prepended when the transcript was cut down to its most recent part.
pub const TRUNCATION_MARKER: &str = "[Content truncated due to length...]\n";

const LEFT_TO_RIGHT_MARK: char = '\u{200E}';
const RIGHT_TO_LEFT_MARK: char = '\u{200F}';

#[derive(Debug, Clone, Copy)]
pub struct Sanitizer {
    min_chars: usize,
    max_chars: usize,
}

impl Sanitizer {
    pub fn new(min_chars: usize, max_chars: usize) -> Self {
        Self {
            min_chars,
            max_chars,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.min_content_chars, config.max_content_chars)
    }

    /// Clean `content` and enforce the length bounds.
    ///
    /// Over-long transcripts are not rejected: the tail of at most
    /// `max_chars` characters is kept behind [`TRUNCATION_MARKER`]. The cut
    /// moves forward to the next line when it would split a timestamp token.
    /// Running the result through `validate` again returns it unchanged.
    pub fn validate(&self, content: Option<&str>) -> Result<String, SanitizeError> {
        let raw = match content {
            Some(text) if !text.is_empty() => text,
            _ => return Err(SanitizeError::InvalidFormat),
        };

        let cleaned = clean(raw);
        let actual = cleaned.chars().count();
        if actual < self.min_chars {
            return Err(SanitizeError::TooShort {
                min: self.min_chars,
                actual,
            });
        }

        let body = cleaned.strip_prefix(TRUNCATION_MARKER).unwrap_or(&cleaned);
        let body_chars = body.chars().count();
        if body_chars <= self.max_chars {
            return Ok(cleaned);
        }

        let cut = body
            .char_indices()
            .nth(body_chars - self.max_chars)
            .map_or(body.len(), |(idx, _)| idx);
        let line_starts = body[cut..].match_indices('\n').map(|(idx, _)| cut + idx + 1);
        let truncated = std::iter::once(cut)
            .chain(line_starts)
            .map(|start| format!("{TRUNCATION_MARKER}{}", &body[start..]))
            .find(|candidate| clean(candidate) == *candidate)
            .unwrap_or_else(|| format!("{TRUNCATION_MARKER}{}", &body[cut..]));
        tracing::debug!(
            actual,
            max = self.max_chars,
            kept = truncated.chars().count() - TRUNCATION_MARKER.chars().count(),
            "transcript truncated to most recent part"
        );
        Ok(truncated)
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

fn clean(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| *c != LEFT_TO_RIGHT_MARK && *c != RIGHT_TO_LEFT_MARK && (*c as u32) <= 0xFFFF)
        .collect();
    let fenced = stripped.replace("```", "'''");
    timestamp::standardize_all(&fenced).trim().to_string()
}
