//! Post and comment text rules.

use super::error::DomainError;

/// Number of characters shown when a post or comment is rendered in short form.
pub const EXCERPT_CHARS: usize = 15;

pub const TEXT_REQUIRED: &str = "This field is required.";

/// First [`EXCERPT_CHARS`] characters of a post or comment body.
pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Trim the submitted body, rejecting empty and whitespace-only input.
pub fn normalize_text(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(TEXT_REQUIRED));
    }
    Ok(trimmed.to_string())
}
