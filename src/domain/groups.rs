//! Group title and slug rules.

use slug::slugify;

use super::error::DomainError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_SLUG_CHARS: usize = 200;

pub fn validate_title(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::required("group title"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(DomainError::too_long("group title", MAX_TITLE_CHARS));
    }
    Ok(trimmed.to_string())
}

/// Accept letters, digits, hyphens and underscores only.
pub fn validate_slug(slug: &str) -> Result<(), DomainError> {
    if slug.is_empty() {
        return Err(DomainError::required("group slug"));
    }
    if slug.chars().count() > MAX_SLUG_CHARS {
        return Err(DomainError::too_long("group slug", MAX_SLUG_CHARS));
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(DomainError::validation(format!(
            "group slug `{slug}` may only contain letters, digits, `-` and `_`"
        )));
    }
    Ok(())
}

/// Derive a slug from a group title.
pub fn derive_slug(title: &str) -> Result<String, DomainError> {
    let candidate: String = slugify(title).chars().take(MAX_SLUG_CHARS).collect();
    let candidate = candidate.trim_end_matches('-').to_string();
    if candidate.is_empty() {
        return Err(DomainError::validation(format!(
            "failed to derive slug from `{title}`"
        )));
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_accepts_url_safe_identifiers() {
        assert!(validate_slug("test_slug").is_ok());
        assert!(validate_slug("rust-2024").is_ok());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("slash/inside").is_err());
    }

    #[test]
    fn derive_slug_from_title() {
        assert_eq!(derive_slug("Rust Lovers Club").expect("slug"), "rust-lovers-club");
        assert!(derive_slug("   ").is_err());
    }

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(validate_title("  Cats ").expect("title"), "Cats");
        assert!(validate_title("").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_CHARS + 1)).is_err());
    }
}
