//! Traits for reading and writing XLIFF files and for the dictionary API built on them.

use std::{
    fs::{self, File},
    io::{BufRead, BufWriter, Cursor, Read, Write},
    path::Path,
};

use tempfile::NamedTempFile;

use crate::{
    document::{TranslationKeys, XliffDocument},
    error::Error,
};

/// A trait for parsing and writing one file.
///
/// # Example
///
/// ```rust,no_run
/// use i18n_xliff::{XliffDocument, traits::Parser};
/// let document = XliffDocument::read_from("messages.xlf")?;
/// document.write_to("messages_copy.xlf")?;
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path, decoding UTF-16 files with a byte order mark.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let file = File::open(path).map_err(Error::Io)?;
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .build(file);

        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).map_err(Error::Io)?;

        Self::from_str(&decoded)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Write to file path.
    ///
    /// The content goes to a temporary file next to `path` first, which then
    /// replaces `path`. A failed write leaves the previous file untouched.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            self.to_writer(&mut writer)?;
            writer.flush()?;
        }
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(file.path(), metadata.permissions())?;
        }
        file.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }
}

/// Read access to one translation unit.
pub trait TranslationValue {
    /// The translation key (the unit's `id`).
    fn key(&self) -> &str;

    /// The source text, `None` if there is no `<source>` or it has no text.
    fn source(&self) -> Option<String>;

    /// The target text, `None` if there is no `<target>` or it has no text.
    fn target(&self) -> Option<String>;

    fn is_source_empty(&self) -> bool;

    fn is_target_empty(&self) -> bool;
}

/// Write access to one translation unit.
pub trait WritableTranslationValue: TranslationValue {
    fn set_source(&mut self, value: &str) -> Result<(), Error>;

    fn set_target(&mut self, value: &str) -> Result<(), Error>;

    /// Removes the source text. Does not notify the owning dictionary.
    fn clear_source(&mut self);

    /// Removes the target text. Does not notify the owning dictionary.
    fn clear_target(&mut self);
}

/// Channel through which writable values report mutations to their owner.
pub trait ChangeNotifier {
    fn mark_changed(&mut self, document: &mut XliffDocument) -> Result<(), Error>;
}

/// Read-only, key based access to the translations of one file.
pub trait Dictionary {
    type Value<'a>: TranslationValue
    where
        Self: 'a;

    /// All keys in document order.
    fn keys(&self) -> TranslationKeys<'_>;

    /// Fails with [`Error::TranslationNotFound`] when there is no such key.
    fn get(&self, key: &str) -> Result<Self::Value<'_>, Error>;

    fn has(&self, key: &str) -> Result<bool, Error>;

    fn source_language(&self) -> &str;

    fn target_language(&self) -> &str;
}

pub trait WritableDictionary: Dictionary {
    type WritableValue<'a>: WritableTranslationValue
    where
        Self: 'a;

    /// Fails with [`Error::TranslationAlreadyContained`] for existing keys.
    fn add(&mut self, key: &str) -> Result<Self::WritableValue<'_>, Error>;

    /// Fails with [`Error::TranslationNotFound`] when there is no such key.
    fn remove(&mut self, key: &str) -> Result<(), Error>;

    /// Fails with [`Error::TranslationNotFound`] when there is no such key.
    fn get_writable(&mut self, key: &str) -> Result<Self::WritableValue<'_>, Error>;
}

/// A writable dictionary that can defer persisting until a commit.
///
/// Buffering batches in-process mutations into one write. It provides no
/// isolation against other processes writing the same file.
pub trait BufferedWritableDictionary: WritableDictionary {
    /// Fails with [`Error::InvalidState`] when already buffering.
    fn begin_buffering(&mut self) -> Result<(), Error>;

    /// Stops buffering and persists pending changes.
    ///
    /// Fails with [`Error::InvalidState`] when not buffering.
    fn commit_buffer(&mut self) -> Result<(), Error>;

    fn is_buffering(&self) -> bool;
}
