use super::error::DomainError;

pub const MAX_USERNAME_CHARS: usize = 150;

/// Usernames are 1..=150 characters of letters, digits and `@.+-_`.
pub fn validate_username(raw: &str) -> Result<&str, DomainError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::required("username"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(DomainError::too_long("username", MAX_USERNAME_CHARS));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(format!(
            "username `{username}` contains unsupported characters"
        )));
    }
    Ok(username)
}
