//! Slug rules shared by store creation, category creation, and the sheet importer.

use crate::ValidationError;

pub const MIN_STORE_SLUG_LEN: usize = 3;

/// Validates a store slug: at least three characters of `[a-z0-9-]`, first
/// and last character alphanumeric.
///
/// # Errors
///
/// Returns [`ValidationError::SlugTooShort`] or
/// [`ValidationError::SlugInvalidFormat`].
pub fn validate_store_slug(slug: &str) -> Result<(), ValidationError> {
    let bytes = slug.as_bytes();
    if bytes.len() < MIN_STORE_SLUG_LEN {
        return Err(ValidationError::SlugTooShort {
            min: MIN_STORE_SLUG_LEN,
        });
    }

    let is_edge = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let is_inner = |b: u8| is_edge(b) || b == b'-';

    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    if !is_edge(first) || !is_edge(last) || !bytes.iter().all(|&b| is_inner(b)) {
        return Err(ValidationError::SlugInvalidFormat);
    }

    Ok(())
}

/// Derives a URL-safe slug from free text.
///
/// Lowercases, maps whitespace, `-` and `_` to single hyphens, drops every
/// other non-alphanumeric character, and trims leading/trailing hyphens.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_hyphen = true;
        }
    }

    out
}
