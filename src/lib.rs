//! XLIFF 1.2 translation dictionaries for Rust.
//!
//! Reads and writes `.xlf` files and exposes their translation units (key, source text,
//! target text) through the [`Dictionary`] family of traits.
//! Writable dictionaries persist every change right away, or batch changes between
//! [`begin_buffering`](BufferedWritableDictionary::begin_buffering) and
//! [`commit_buffer`](BufferedWritableDictionary::commit_buffer).
//!
//! ```rust,no_run
//! use i18n_xliff::{
//!     ProviderOptions, TranslationValue, WritableDictionary, WritableTranslationValue,
//!     XliffDictionaryProvider,
//! };
//!
//! let provider = XliffDictionaryProvider::new(ProviderOptions::new("translations"))?;
//! let mut dictionary = provider.create_dictionary("messages", "en", "de")?;
//! let mut value = dictionary.add("greeting")?;
//! value.set_source("Hello")?;
//! value.set_target("Hallo")?;
//! assert_eq!(value.target().as_deref(), Some("Hallo"));
//! Ok::<(), i18n_xliff::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod definition;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod language;
pub mod options;
pub mod provider;
pub mod traits;
pub mod value;
pub mod xml;

// Re-export most used types for easy consumption
pub use crate::{
    definition::{DefinitionBuilder, DictionaryDefinition, XliffDictionaryDefinitionBuilder},
    dictionary::{WritableXliffDictionary, XliffDictionary},
    document::{TranslationKeys, XliffDocument},
    error::Error,
    options::{FileNameTemplate, ProviderOptions},
    provider::{DictionaryInformation, XliffDictionaryProvider, guard_languages},
    traits::{
        BufferedWritableDictionary, ChangeNotifier, Dictionary, Parser, TranslationValue,
        WritableDictionary, WritableTranslationValue,
    },
    value::{WritableXliffTranslationValue, XliffTranslationValue},
};
