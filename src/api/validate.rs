//! Input validation for signup, login and password changes.

use super::error::ApiError;

const INVALID_DATA: &str = "Invalid data";

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn char_len_within(s: &str, min: usize, max: usize) -> bool {
    let len = s.chars().count();
    (min..=max).contains(&len)
}

/// 6 to 32 characters of letters, digits and underscores.
pub fn username(s: &str) -> Result<(), ApiError> {
    if char_len_within(s, 6, 32) && s.chars().all(is_word_char) {
        Ok(())
    } else {
        Err(ApiError::bad_request(INVALID_DATA))
    }
}

/// 8 to 64 characters of letters, digits and underscores.
pub fn password(s: &str) -> Result<(), ApiError> {
    if char_len_within(s, 8, 64) && s.chars().all(is_word_char) {
        Ok(())
    } else {
        Err(ApiError::bad_request(INVALID_DATA))
    }
}

/// 1 to 64 characters of any script's letters or digits, underscores and spaces.
pub fn display_name(s: &str) -> Result<(), ApiError> {
    let allowed = |c: char| c.is_alphanumeric() || c == '_' || c == ' ';
    if char_len_within(s, 1, 64) && s.chars().all(allowed) {
        Ok(())
    } else {
        Err(ApiError::bad_request(INVALID_DATA))
    }
}
