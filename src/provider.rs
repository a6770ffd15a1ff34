//! Locating dictionaries in a directory tree.

use std::{
    fs,
    path::{Path, PathBuf},
};

use ignore::WalkBuilder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dictionary::{WritableXliffDictionary, XliffDictionary, is_readable, is_writable},
    document::XliffDocument,
    error::Error,
    options::{FileNameTemplate, ProviderOptions},
    traits::Dictionary,
};

/// Name and language pair of a dictionary found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictionaryInformation {
    pub name: String,
    pub source_language: String,
    pub target_language: String,
}

/// Gives access to the `*.xlf` dictionaries below one root directory.
///
/// The file of a dictionary is found through the configured
/// [`FileNameTemplate`], by default `<source>-<target>/<name>.xlf`.
#[derive(Debug, Clone)]
pub struct XliffDictionaryProvider {
    root_dir: PathBuf,
    template: FileNameTemplate,
}

impl XliffDictionaryProvider {
    pub fn new(options: ProviderOptions) -> Result<Self, Error> {
        let template = options.template();
        let root_dir = fs::canonicalize(&options.root_dir)
            .ok()
            .filter(|path| path.is_dir())
            .ok_or_else(|| {
                Error::invalid_argument("Root directory does not exist or is not a directory.")
            })?;

        Ok(Self { root_dir, template })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Every readable dictionary, ordered by file path.
    pub fn available_dictionaries(&self) -> Vec<DictionaryInformation> {
        self.scan(is_readable)
    }

    /// Every writable dictionary, ordered by file path.
    pub fn available_writable_dictionaries(&self) -> Vec<DictionaryInformation> {
        self.scan(is_writable)
    }

    /// Opens a dictionary for reading.
    ///
    /// Fails with [`Error::DictionaryNotFound`] when there is no readable file
    /// and with [`Error::LanguageMismatch`] when the file declares other
    /// languages.
    pub fn dictionary(
        &self,
        name: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<XliffDictionary, Error> {
        debug!(
            dictionary = name,
            source = source_language,
            target = target_language,
            "opening xliff dictionary"
        );
        let path = self.file_name_for(name, source_language, target_language);
        if !is_readable(&path) {
            return Err(not_found(name, source_language, target_language));
        }

        let dictionary = XliffDictionary::open(&path)?;
        guard_languages(source_language, target_language, &dictionary)?;
        Ok(dictionary)
    }

    /// Opens an existing dictionary for writing and records `name` as its
    /// original.
    pub fn dictionary_for_write(
        &self,
        name: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<WritableXliffDictionary, Error> {
        debug!(
            dictionary = name,
            source = source_language,
            target = target_language,
            "opening writable xliff dictionary"
        );
        let path = self.file_name_for(name, source_language, target_language);
        if !path.exists() {
            return Err(not_found(name, source_language, target_language));
        }

        let mut dictionary = WritableXliffDictionary::open(&path, None, None)?;
        dictionary.set_original(name)?;
        guard_languages(source_language, target_language, &dictionary)?;
        Ok(dictionary)
    }

    /// Creates a new, empty dictionary file.
    pub fn create_dictionary(
        &self,
        name: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<WritableXliffDictionary, Error> {
        debug!(
            dictionary = name,
            source = source_language,
            target = target_language,
            "creating xliff dictionary"
        );
        let path = self.file_name_for(name, source_language, target_language);
        if path.exists() {
            return Err(Error::DictionaryExists(name.to_string()));
        }
        if !is_writable(&self.root_dir) {
            return Err(Error::not_supported("Dictionary root directory is not writable."));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        WritableXliffDictionary::open(&path, Some(source_language), Some(target_language))
    }

    fn file_name_for(&self, name: &str, source_language: &str, target_language: &str) -> PathBuf {
        self.root_dir
            .join(self.template.resolve(name, source_language, target_language))
    }

    fn scan(&self, accept: fn(&Path) -> bool) -> Vec<DictionaryInformation> {
        let walker = WalkBuilder::new(&self.root_dir)
            .standard_filters(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        let mut found = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "xlf") || !accept(path) {
                continue;
            }
            match information(path) {
                Ok(information) => found.push(information),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping invalid xliff file")
                }
            }
        }
        found
    }
}

fn information(path: &Path) -> Result<DictionaryInformation, Error> {
    let mut document = XliffDocument::new();
    document.load(path)?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(DictionaryInformation {
        name,
        source_language: document.source_language().to_string(),
        target_language: document.target_language().to_string(),
    })
}

fn not_found(name: &str, source_language: &str, target_language: &str) -> Error {
    Error::DictionaryNotFound {
        name: name.to_string(),
        source_language: source_language.to_string(),
        target_language: target_language.to_string(),
    }
}

/// Fails with [`Error::LanguageMismatch`] unless `dictionary` declares exactly
/// the given languages.
pub fn guard_languages<D: Dictionary + ?Sized>(
    source_language: &str,
    target_language: &str,
    dictionary: &D,
) -> Result<(), Error> {
    if dictionary.source_language() != source_language
        || dictionary.target_language() != target_language
    {
        return Err(Error::LanguageMismatch {
            expected_source: source_language.to_string(),
            expected_target: target_language.to_string(),
            real_source: dictionary.source_language().to_string(),
            real_target: dictionary.target_language().to_string(),
        });
    }
    Ok(())
}
