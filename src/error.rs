//! All error types for the i18n-xliff crate.
//!
//! These are returned from all fallible operations (parsing, serialization, dictionary access, etc.).

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Key \"{key}\" not found")]
    TranslationNotFound { key: String },

    #[error("Key \"{key}\" already contained")]
    TranslationAlreadyContained { key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("corrupted document: {0}")]
    Corrupted(String),

    #[error(
        "Languages do not match - source should be \"{expected_source}\" and is \"{real_source}\", destination should be \"{expected_target}\" and is \"{real_target}\""
    )]
    LanguageMismatch {
        expected_source: String,
        expected_target: String,
        real_source: String,
        real_target: String,
    },

    #[error(
        "Dictionary {name} not found (requested source language: \"{source_language}\", requested target language: \"{target_language}\")."
    )]
    DictionaryNotFound {
        name: String,
        source_language: String,
        target_language: String,
    },

    #[error("Dictionary {0} already exists.")]
    DictionaryExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] AttrError),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Creates a new not supported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Creates a new error for a document that violates the XLIFF skeleton
    pub fn corrupted(message: impl Into<String>) -> Self {
        Error::Corrupted(message.into())
    }

    pub(crate) fn not_found(key: &str) -> Self {
        Error::TranslationNotFound {
            key: key.to_string(),
        }
    }
}
