//! Dictionaries backed by one XLIFF file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::Local;
use tracing::{debug, trace};

use crate::{
    document::{TranslationKeys, XliffDocument},
    error::Error,
    traits::{BufferedWritableDictionary, ChangeNotifier, Dictionary, WritableDictionary},
    value::{WritableXliffTranslationValue, XliffTranslationValue},
    xml::NodeId,
};

/// A read-only dictionary over one XLIFF file.
///
/// # Example
///
/// ```rust,no_run
/// use i18n_xliff::{Dictionary, TranslationValue, XliffDictionary};
///
/// let dictionary = XliffDictionary::open("translations/en-de/messages.xlf")?;
/// for key in dictionary.keys() {
///     let value = dictionary.get(key?)?;
///     println!("{} => {:?}", value.key(), value.target());
/// }
/// Ok::<(), i18n_xliff::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct XliffDictionary {
    path: Option<PathBuf>,
    document: XliffDocument,
}

impl XliffDictionary {
    /// An empty, unbacked dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the file at `path`.
    ///
    /// A file that does not exist or cannot be read yields an empty
    /// dictionary. A path naming something other than a regular file, or a
    /// readable file that is not a valid XLIFF document, fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.exists() && !path.is_file() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )));
        }
        let mut document = XliffDocument::new();
        if is_readable(path) {
            document.load(path)?;
        }
        Ok(Self {
            path: Some(path.to_path_buf()),
            document,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn document(&self) -> &XliffDocument {
        &self.document
    }

    pub fn original(&self) -> &str {
        self.document.original()
    }
}

impl Dictionary for XliffDictionary {
    type Value<'a> = XliffTranslationValue<'a>;

    fn keys(&self) -> TranslationKeys<'_> {
        self.document.extract_translation_keys()
    }

    fn get(&self, key: &str) -> Result<Self::Value<'_>, Error> {
        let unit = self
            .document
            .search_translation_unit(key)?
            .ok_or_else(|| Error::not_found(key))?;
        Ok(XliffTranslationValue::new(&self.document, unit))
    }

    fn has(&self, key: &str) -> Result<bool, Error> {
        Ok(self.document.search_translation_unit(key)?.is_some())
    }

    fn source_language(&self) -> &str {
        self.document.source_language()
    }

    fn target_language(&self) -> &str {
        self.document.target_language()
    }
}

/// Persistence bookkeeping of a writable dictionary.
///
/// Kept apart from the document so that a writable value can borrow both at
/// the same time.
#[derive(Debug)]
struct BufferState {
    path: PathBuf,
    changed: bool,
    buffering: bool,
}

impl ChangeNotifier for BufferState {
    fn mark_changed(&mut self, document: &mut XliffDocument) -> Result<(), Error> {
        self.changed = true;
        document.set_date(&Local::now())?;
        if self.buffering {
            trace!(path = %self.path.display(), "change buffered");
            return Ok(());
        }

        trace!(path = %self.path.display(), "writing change");
        document.save(&self.path)?;
        self.changed = false;
        Ok(())
    }
}

/// A dictionary that writes every change back to its XLIFF file.
///
/// Each mutation is persisted immediately unless buffering is active, in
/// which case changes accumulate in memory until
/// [`commit_buffer`](BufferedWritableDictionary::commit_buffer). There is no
/// locking against other writers of the same file; the last write wins.
#[derive(Debug)]
pub struct WritableXliffDictionary {
    inner: XliffDictionary,
    state: BufferState,
}

impl WritableXliffDictionary {
    /// Opens or creates the file at `path`.
    ///
    /// Fails with [`Error::NotSupported`] unless the file is writable, or does
    /// not exist and its directory is writable. A new file gets the given
    /// languages (English otherwise) and is written right away.
    pub fn open<P: AsRef<Path>>(
        path: P,
        source_language: Option<&str>,
        target_language: Option<&str>,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let exists = path.exists();
        if exists && !path.is_file() {
            return Err(Error::not_supported(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }
        let writable = if exists {
            is_writable(path)
        } else {
            is_writable(parent_dir(path))
        };
        if !writable {
            return Err(Error::not_supported(format!(
                "File is not writable: {}",
                path.display()
            )));
        }

        let mut dictionary = Self {
            inner: XliffDictionary::open(path)?,
            state: BufferState {
                path: path.to_path_buf(),
                changed: false,
                buffering: false,
            },
        };

        if !exists {
            if let Some(language) = source_language.filter(|l| !l.is_empty()) {
                dictionary.inner.document.set_source_language(language)?;
            }
            if let Some(language) = target_language.filter(|l| !l.is_empty()) {
                dictionary.inner.document.set_target_language(language)?;
            }
            debug!(path = %path.display(), "creating xliff dictionary");
            dictionary.mark_changed()?;
        }

        Ok(dictionary)
    }

    pub fn path(&self) -> &Path {
        &self.state.path
    }

    pub fn document(&self) -> &XliffDocument {
        &self.inner.document
    }

    pub fn original(&self) -> &str {
        self.inner.original()
    }

    /// Records a change: bumps the file date and writes the file unless
    /// buffering.
    pub fn mark_changed(&mut self) -> Result<(), Error> {
        self.state.mark_changed(&mut self.inner.document)
    }

    pub fn set_source_language(&mut self, language: &str) -> Result<(), Error> {
        self.inner.document.set_source_language(language)?;
        self.mark_changed()
    }

    pub fn set_target_language(&mut self, language: &str) -> Result<(), Error> {
        self.inner.document.set_target_language(language)?;
        self.mark_changed()
    }

    pub fn set_original(&mut self, original: &str) -> Result<(), Error> {
        self.inner.document.set_original(original)?;
        self.mark_changed()
    }

    fn writable_value(&mut self, unit: NodeId) -> WritableXliffTranslationValue<'_> {
        WritableXliffTranslationValue::new(&mut self.inner.document, &mut self.state, unit)
    }
}

impl Dictionary for WritableXliffDictionary {
    type Value<'a> = XliffTranslationValue<'a>;

    fn keys(&self) -> TranslationKeys<'_> {
        self.inner.keys()
    }

    fn get(&self, key: &str) -> Result<Self::Value<'_>, Error> {
        self.inner.get(key)
    }

    fn has(&self, key: &str) -> Result<bool, Error> {
        self.inner.has(key)
    }

    fn source_language(&self) -> &str {
        self.inner.source_language()
    }

    fn target_language(&self) -> &str {
        self.inner.target_language()
    }
}

impl WritableDictionary for WritableXliffDictionary {
    type WritableValue<'a> = WritableXliffTranslationValue<'a>;

    fn add(&mut self, key: &str) -> Result<Self::WritableValue<'_>, Error> {
        if self.inner.document.search_translation_unit(key)?.is_some() {
            return Err(Error::TranslationAlreadyContained {
                key: key.to_string(),
            });
        }

        let was_changed = self.state.changed;
        let unit = self.inner.document.create_translation_unit(key, None)?;
        if let Err(err) = self.mark_changed() {
            // A unit that never reached the file must not linger in memory.
            self.inner.document.xml_mut().detach(unit);
            self.state.changed = was_changed;
            return Err(err);
        }
        Ok(self.writable_value(unit))
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        let unit = self
            .inner
            .document
            .search_translation_unit(key)?
            .ok_or_else(|| Error::not_found(key))?;

        let xml = self.inner.document.xml_mut();
        let parent = xml.parent_node(unit).ok_or_else(|| {
            Error::corrupted(format!("trans-unit \"{key}\" has no parent element"))
        })?;
        xml.remove_child(parent, unit)?;

        self.mark_changed()
    }

    fn get_writable(&mut self, key: &str) -> Result<Self::WritableValue<'_>, Error> {
        let unit = self
            .inner
            .document
            .search_translation_unit(key)?
            .ok_or_else(|| Error::not_found(key))?;
        Ok(self.writable_value(unit))
    }
}

impl BufferedWritableDictionary for WritableXliffDictionary {
    fn begin_buffering(&mut self) -> Result<(), Error> {
        if self.state.buffering {
            return Err(Error::InvalidState("Already buffering.".to_string()));
        }
        self.state.buffering = true;
        debug!(path = %self.state.path.display(), "begin buffering");
        Ok(())
    }

    fn commit_buffer(&mut self) -> Result<(), Error> {
        if !self.state.buffering {
            return Err(Error::InvalidState("Not buffering.".to_string()));
        }
        self.state.buffering = false;

        let write = self.state.changed;
        if write {
            self.inner.document.save(&self.state.path)?;
            self.state.changed = false;
        }
        debug!(path = %self.state.path.display(), written = write, "committed buffer");
        Ok(())
    }

    fn is_buffering(&self) -> bool {
        self.state.buffering
    }
}

impl Drop for WritableXliffDictionary {
    fn drop(&mut self) {
        if self.state.buffering && self.state.changed {
            debug!(
                path = %self.state.path.display(),
                "dropping buffered dictionary, uncommitted changes are discarded"
            );
        }
    }
}

/// Whether `path` is a regular file that can be opened for reading.
pub(crate) fn is_readable(path: &Path) -> bool {
    path.is_file() && fs::File::open(path).is_ok()
}

/// Whether `path` exists and its permissions allow writing.
pub(crate) fn is_writable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| !metadata.permissions().readonly())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{TranslationValue, WritableTranslationValue};
    use indoc::indoc;
    use tempfile::TempDir;

    const FIXTURE: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <xliff xmlns="urn:oasis:names:tc:xliff:document:1.2" version="1.2">
          <file datatype="plaintext" date="2018-01-01T00:00:00Z" original="test1" source-language="en" target-language="de">
            <body>
              <trans-unit id="test-string-with-only-source">
                <source>The source value</source>
              </trans-unit>
              <trans-unit id="test-string-with-source-and-target">
                <source>The source value</source>
                <target>The target value</target>
              </trans-unit>
            </body>
          </file>
        </xliff>
    "#};

    fn fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("test1.xlf");
        fs::write(&path, FIXTURE).unwrap();
        path
    }

    fn keys<D: Dictionary>(dictionary: &D) -> Vec<String> {
        dictionary
            .keys()
            .map(|key| key.unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_read_only_dictionary() {
        let dir = TempDir::new().unwrap();
        let dictionary = XliffDictionary::open(fixture(&dir)).unwrap();

        assert_eq!(dictionary.source_language(), "en");
        assert_eq!(dictionary.target_language(), "de");
        assert_eq!(dictionary.original(), "test1");
        assert_eq!(
            keys(&dictionary),
            vec!["test-string-with-only-source", "test-string-with-source-and-target"]
        );

        let value = dictionary.get("test-string-with-only-source").unwrap();
        assert_eq!(value.source().as_deref(), Some("The source value"));
        assert_eq!(value.target(), None);
        assert!(value.is_target_empty());

        assert!(dictionary.has("test-string-with-source-and-target").unwrap());
        assert!(!dictionary.has("unknown").unwrap());
        assert!(dictionary.has("").is_err());
    }

    #[test]
    fn test_get_unknown_key_fails() {
        let dictionary = XliffDictionary::new();
        let err = dictionary.get("unknown-key").unwrap_err();
        assert!(matches!(err, Error::TranslationNotFound { ref key } if key == "unknown-key"));
        assert_eq!(err.to_string(), "Key \"unknown-key\" not found");
    }

    #[test]
    fn test_missing_file_gives_empty_dictionary() {
        let dir = TempDir::new().unwrap();
        let dictionary = XliffDictionary::open(dir.path().join("missing.xlf")).unwrap();
        assert!(keys(&dictionary).is_empty());
        assert_eq!(dictionary.source_language(), "en");
        assert_eq!(dictionary.target_language(), "en");
    }

    #[test]
    fn test_writable_new_file_is_written_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.xlf");
        let dictionary = WritableXliffDictionary::open(&path, Some("en"), Some("de")).unwrap();

        assert!(path.exists());
        assert_eq!(dictionary.path(), path.as_path());
        let stored = XliffDictionary::open(&path).unwrap();
        assert_eq!(stored.source_language(), "en");
        assert_eq!(stored.target_language(), "de");
    }

    #[test]
    fn test_writable_rejects_invalid_language_for_new_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.xlf");
        let err = WritableXliffDictionary::open(&path, Some("not a language"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_add_get_remove() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir);
        let mut dictionary = WritableXliffDictionary::open(&path, None, None).unwrap();

        dictionary
            .add("test-new")
            .unwrap()
            .set_source("New source")
            .unwrap();
        assert!(matches!(
            dictionary.add("test-new").unwrap_err(),
            Error::TranslationAlreadyContained { .. }
        ));

        dictionary
            .get_writable("test-new")
            .unwrap()
            .set_target("New target")
            .unwrap();

        let stored = XliffDictionary::open(&path).unwrap();
        let value = stored.get("test-new").unwrap();
        assert_eq!(value.source().as_deref(), Some("New source"));
        assert_eq!(value.target().as_deref(), Some("New target"));

        dictionary.remove("test-new").unwrap();
        assert!(!dictionary.has("test-new").unwrap());
        assert!(matches!(
            dictionary.remove("test-new").unwrap_err(),
            Error::TranslationNotFound { .. }
        ));
        assert!(dictionary.get_writable("test-new").is_err());

        let stored = XliffDictionary::open(&path).unwrap();
        assert!(!stored.has("test-new").unwrap());
    }

    #[test]
    fn test_buffering_state_machine() {
        let dir = TempDir::new().unwrap();
        let mut dictionary = WritableXliffDictionary::open(fixture(&dir), None, None).unwrap();

        assert!(!dictionary.is_buffering());
        assert_eq!(
            dictionary.commit_buffer().unwrap_err().to_string(),
            "invalid state: Not buffering."
        );

        dictionary.begin_buffering().unwrap();
        assert!(dictionary.is_buffering());
        assert_eq!(
            dictionary.begin_buffering().unwrap_err().to_string(),
            "invalid state: Already buffering."
        );

        dictionary.commit_buffer().unwrap();
        assert!(!dictionary.is_buffering());
    }

    #[test]
    fn test_buffered_changes_are_written_on_commit() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir);
        let mut dictionary = WritableXliffDictionary::open(&path, None, None).unwrap();

        dictionary.begin_buffering().unwrap();
        dictionary.add("a").unwrap();
        dictionary.add("b").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), FIXTURE);

        dictionary.commit_buffer().unwrap();
        let stored = XliffDictionary::open(&path).unwrap();
        assert!(stored.has("a").unwrap());
        assert!(stored.has("b").unwrap());
    }

    #[test]
    fn test_setters_persist() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir);
        let mut dictionary = WritableXliffDictionary::open(&path, None, None).unwrap();

        dictionary.set_source_language("fr").unwrap();
        dictionary.set_target_language("it").unwrap();
        dictionary.set_original("messages").unwrap();
        assert!(dictionary.set_target_language("no way").is_err());

        let stored = XliffDictionary::open(&path).unwrap();
        assert_eq!(stored.source_language(), "fr");
        assert_eq!(stored.target_language(), "it");
        assert_eq!(stored.original(), "messages");
    }

    #[test]
    fn test_failed_add_leaves_no_unit_behind() {
        let dir = TempDir::new().unwrap();
        let sub_dir = dir.path().join("en-de");
        fs::create_dir(&sub_dir).unwrap();
        let path = sub_dir.join("messages.xlf");
        let mut dictionary = WritableXliffDictionary::open(&path, None, None).unwrap();

        fs::remove_dir_all(&sub_dir).unwrap();
        assert!(matches!(dictionary.add("k").unwrap_err(), Error::Io(_)));
        assert!(!dictionary.has("k").unwrap());
        assert!(!dictionary.state.changed);
        assert!(keys(&dictionary).is_empty());

        fs::create_dir(&sub_dir).unwrap();
        dictionary.add("k").unwrap().set_source("Key").unwrap();
        let stored = XliffDictionary::open(&path).unwrap();
        assert_eq!(keys(&stored), vec!["k"]);
    }

    #[test]
    fn test_directory_path_is_rejected() {
        let dir = TempDir::new().unwrap();

        let err = XliffDictionary::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io(ref source) if source.kind() == io::ErrorKind::InvalidInput));

        let err = WritableXliffDictionary::open(dir.path(), None, None).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
        assert!(err.to_string().contains("Not a regular file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_file_is_not_supported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = fixture(&dir);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        let err = WritableXliffDictionary::open(&path, None, None).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
        assert!(err.to_string().contains("File is not writable"));
    }
}
