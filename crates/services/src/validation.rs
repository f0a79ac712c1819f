//! Input normalisation shared by the engine and provisioning.

use domains::{DomainError, Result};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_BODY_CHARS: usize = 20_000;
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Trims `raw` and rejects it when blank or longer than `max_chars`.
pub fn required_text(field: &str, raw: &str, max_chars: usize) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidInput(format!("{field} must not be blank")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::InvalidInput(format!(
            "{field} exceeds {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}
