//! Validation of the language codes stored in `source-language` / `target-language`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;

lazy_static! {
    static ref LANGUAGE_REGEX: Regex = Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap();
}

/// Whether `language` looks like an ISO 639-1 style code (`en`, `de-AT`, `zh-Hant-TW`).
pub fn is_valid_language(language: &str) -> bool {
    LANGUAGE_REGEX.is_match(language)
}

pub fn validate_language(language: &str) -> Result<(), Error> {
    if is_valid_language(language) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "Invalid language string: \"{language}\""
        )))
    }
}
