//! The XLIFF 1.2 document model.
//!
//! An [`XliffDocument`] always has the skeleton `xliff > file > body`, with
//! `trans-unit` elements appended to `body`. Header metadata lives in
//! attributes of the `file` element.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, TimeZone};
use tracing::debug;

use crate::{
    error::Error,
    language::validate_language,
    traits::Parser,
    xml::{Attribute, Element, LocationPath, NodeId, NodeKind, Step, XLIFF_NS, XPath, XmlDocument},
};

const PREFIX: &str = "xlf";

#[derive(Debug, Clone)]
pub struct XliffDocument {
    xml: XmlDocument,
}

impl Default for XliffDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XliffDocument {
    /// Creates a fresh skeleton: `datatype="plaintext"`, the current date,
    /// `original="unspecified source"` and English as both languages.
    pub fn new() -> Self {
        let mut xml = XmlDocument::new();

        let mut root = Element::new(Some(XLIFF_NS), None, "xliff");
        push_plain_attribute(&mut root, "version", "1.2");
        let root = xml.push(NodeKind::Element(root));
        xml.set_root(root);

        let mut file = Element::new(Some(XLIFF_NS), None, "file");
        push_plain_attribute(&mut file, "datatype", "plaintext");
        push_plain_attribute(&mut file, "date", &format_date(&Local::now()));
        push_plain_attribute(&mut file, "original", "unspecified source");
        push_plain_attribute(&mut file, "source-language", "en");
        push_plain_attribute(&mut file, "target-language", "en");
        let file = xml.push(NodeKind::Element(file));
        xml.attach(root, file);

        let body = xml.push(NodeKind::Element(Element::new(Some(XLIFF_NS), None, "body")));
        xml.attach(file, body);

        Self { xml }
    }

    /// Wraps a parsed XML document, checking the `xliff > file > body` skeleton.
    pub fn from_xml(xml: XmlDocument) -> Result<Self, Error> {
        let document = Self { xml };
        let root_matches = document
            .xml
            .document_element()
            .and_then(|root| document.xml.element(root))
            .is_some_and(|root| {
                root.namespace.as_deref() == Some(XLIFF_NS) && root.local_name == "xliff"
            });
        if !root_matches {
            return Err(Error::corrupted(format!(
                "root element is not <xliff> in namespace {XLIFF_NS}"
            )));
        }
        if document.body_element().is_none() {
            return Err(Error::corrupted("missing <file> or <body> element"));
        }
        Ok(document)
    }

    /// Replaces this document with the content of the file at `path`.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        *self = Self::read_from(path)?;
        debug!(path = %path.display(), units = self.translation_units().len(), "loaded xliff document");
        Ok(())
    }

    /// Writes the whole document to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        self.write_to(path)?;
        debug!(path = %path.display(), "saved xliff document");
        Ok(())
    }

    pub fn xml(&self) -> &XmlDocument {
        &self.xml
    }

    pub fn xml_mut(&mut self) -> &mut XmlDocument {
        &mut self.xml
    }

    pub fn file_element(&self) -> Option<NodeId> {
        self.first(&[Step::new(Some(PREFIX), "xliff"), Step::new(Some(PREFIX), "file")])
    }

    pub fn body_element(&self) -> Option<NodeId> {
        self.first(&[
            Step::new(Some(PREFIX), "xliff"),
            Step::new(Some(PREFIX), "file"),
            Step::new(Some(PREFIX), "body"),
        ])
    }

    /// Set the datatype of this file.
    ///
    /// See <http://docs.oasis-open.org/xliff/v1.2/os/xliff-core.html#datatype>.
    /// Custom data types must be prefixed with `x-`.
    pub fn set_data_type(&mut self, data_type: &str) -> Result<(), Error> {
        self.set_file_attribute("datatype", data_type)
    }

    pub fn data_type(&self) -> &str {
        self.file_attribute("datatype")
    }

    /// Sets the last modification time of this file.
    pub fn set_date<Tz: TimeZone>(&mut self, date: &DateTime<Tz>) -> Result<(), Error>
    where
        Tz::Offset: std::fmt::Display,
    {
        self.set_file_attribute("date", &format_date(date))
    }

    /// The last modification time of this file.
    pub fn date(&self) -> Result<DateTime<FixedOffset>, Error> {
        Ok(DateTime::parse_from_rfc3339(self.file_attribute("date"))?)
    }

    /// Set the name of the original data source, most likely a file name.
    pub fn set_original(&mut self, original: &str) -> Result<(), Error> {
        self.set_file_attribute("original", original)
    }

    pub fn original(&self) -> &str {
        self.file_attribute("original")
    }

    /// Set the source language. Invalid codes are rejected before anything changes.
    pub fn set_source_language(&mut self, language: &str) -> Result<(), Error> {
        validate_language(language)?;
        self.set_file_attribute("source-language", language)
    }

    pub fn source_language(&self) -> &str {
        self.file_attribute("source-language")
    }

    /// Set the target language. Invalid codes are rejected before anything changes.
    pub fn set_target_language(&mut self, language: &str) -> Result<(), Error> {
        validate_language(language)?;
        self.set_file_attribute("target-language", language)
    }

    pub fn target_language(&self) -> &str {
        self.file_attribute("target-language")
    }

    /// Finds the `trans-unit` with the given id.
    ///
    /// Documents using XLIFF as default namespace are matched on a plain `id`
    /// attribute first; the namespace-qualified `id` is the fallback.
    pub fn search_translation_unit(&self, id: &str) -> Result<Option<NodeId>, Error> {
        if id.is_empty() {
            return Err(Error::invalid_argument("Empty Id passed."));
        }

        if self.xml.is_default_namespace(XLIFF_NS) {
            if let Some(unit) = self.first(&unit_path(Some(id), None)) {
                return Ok(Some(unit));
            }
        }

        Ok(self.first(&unit_path(Some(id), Some(PREFIX))))
    }

    /// Appends a new `trans-unit` to the body. Duplicate ids are not checked here.
    pub fn create_translation_unit(
        &mut self,
        id: &str,
        source: Option<&str>,
    ) -> Result<NodeId, Error> {
        let body = self
            .body_element()
            .ok_or_else(|| Error::corrupted("Could not find the xliff body element"))?;

        let unit = self.xml.create_element(Some(XLIFF_NS), "trans-unit");
        self.xml.append_child(body, unit)?;
        self.xml.set_attribute_ns(unit, Some(XLIFF_NS), "id", id)?;

        let source_element = self.xml.create_element(Some(XLIFF_NS), "source");
        self.xml.append_child(unit, source_element)?;
        if let Some(value) = source {
            let text = self.xml.create_text_node(value);
            self.xml.append_child(source_element, text)?;
        }

        Ok(unit)
    }

    /// All `trans-unit` elements in document order.
    pub fn translation_units(&self) -> Vec<NodeId> {
        self.evaluate(&unit_path(None, None))
    }

    /// Lazily yields the id of every translation unit in document order.
    ///
    /// A unit without an id yields [`Error::Corrupted`] and ends the sequence.
    pub fn extract_translation_keys(&self) -> TranslationKeys<'_> {
        TranslationKeys {
            document: self,
            units: self.translation_units().into_iter(),
        }
    }

    fn xpath(&self) -> XPath<'_> {
        let mut xpath = XPath::new(&self.xml);
        xpath.register_namespace(PREFIX, XLIFF_NS);
        xpath
    }

    fn evaluate(&self, steps: &[Step]) -> Vec<NodeId> {
        // Every prefix used by this module is registered, so evaluation cannot fail.
        self.xpath()
            .evaluate(&LocationPath::absolute(steps.to_vec()), None)
            .unwrap_or_default()
    }

    fn first(&self, steps: &[Step]) -> Option<NodeId> {
        self.evaluate(steps).into_iter().next()
    }

    fn file_attribute(&self, name: &str) -> &str {
        self.file_element()
            .and_then(|file| self.xml.attribute_ns(file, Some(XLIFF_NS), name))
            .unwrap_or_default()
    }

    fn set_file_attribute(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let file = self
            .file_element()
            .ok_or_else(|| Error::corrupted("Could not find the xliff file element"))?;
        self.xml.set_attribute_ns(file, Some(XLIFF_NS), name, value)
    }
}

impl Parser for XliffDocument {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        Self::from_xml(XmlDocument::from_reader(reader)?)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        self.xml.to_writer(writer)
    }
}

/// Iterator over translation keys, see [`XliffDocument::extract_translation_keys`].
#[derive(Debug)]
pub struct TranslationKeys<'a> {
    document: &'a XliffDocument,
    units: std::vec::IntoIter<NodeId>,
}

impl<'a> Iterator for TranslationKeys<'a> {
    type Item = Result<&'a str, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.units.next()?;
        let document = self.document;
        match document.xml.attribute_ns(unit, Some(XLIFF_NS), "id") {
            Some(key) if !key.is_empty() => Some(Ok(key)),
            _ => {
                let position = document.translation_units().iter().position(|u| *u == unit);
                self.units = Vec::new().into_iter();
                Some(Err(Error::corrupted(format!(
                    "Empty Id: trans-unit #{}",
                    position.map_or(0, |p| p + 1)
                ))))
            }
        }
    }
}

fn unit_path(id: Option<&str>, id_prefix: Option<&str>) -> Vec<Step> {
    let unit = Step::new(Some(PREFIX), "trans-unit");
    vec![
        Step::new(Some(PREFIX), "xliff"),
        Step::new(Some(PREFIX), "file"),
        Step::new(Some(PREFIX), "body"),
        match id {
            Some(id) => unit.with_attribute(id_prefix, "id", id),
            None => unit,
        },
    ]
}

fn push_plain_attribute(element: &mut Element, name: &str, value: &str) {
    element.attributes.push(Attribute {
        namespace: None,
        prefix: None,
        local_name: name.to_string(),
        value: value.to_string(),
    });
}

fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}
