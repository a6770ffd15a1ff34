//! Views over a single `trans-unit` element.

use crate::{
    document::XliffDocument,
    error::Error,
    traits::{ChangeNotifier, TranslationValue, WritableTranslationValue},
    xml::{NodeId, XLIFF_NS},
};

/// Read-only access to one translation unit.
#[derive(Debug, Clone, Copy)]
pub struct XliffTranslationValue<'a> {
    document: &'a XliffDocument,
    node: NodeId,
}

impl<'a> XliffTranslationValue<'a> {
    pub fn new(document: &'a XliffDocument, node: NodeId) -> Self {
        Self { document, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl TranslationValue for XliffTranslationValue<'_> {
    fn key(&self) -> &str {
        unit_key(self.document, self.node)
    }

    fn source(&self) -> Option<String> {
        child_value(self.document, self.node, "source")
    }

    fn target(&self) -> Option<String> {
        child_value(self.document, self.node, "target")
    }

    fn is_source_empty(&self) -> bool {
        child_is_empty(self.document, self.node, "source")
    }

    fn is_target_empty(&self) -> bool {
        child_is_empty(self.document, self.node, "target")
    }
}

/// Read-write access to one translation unit.
///
/// Mutations are reported through the [`ChangeNotifier`] of the owning
/// dictionary, which decides when the document is persisted.
pub struct WritableXliffTranslationValue<'a> {
    document: &'a mut XliffDocument,
    notifier: &'a mut dyn ChangeNotifier,
    node: NodeId,
}

impl std::fmt::Debug for WritableXliffTranslationValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritableXliffTranslationValue")
            .field("key", &self.key())
            .field("node", &self.node)
            .finish()
    }
}

impl<'a> WritableXliffTranslationValue<'a> {
    pub fn new(
        document: &'a mut XliffDocument,
        notifier: &'a mut dyn ChangeNotifier,
        node: NodeId,
    ) -> Self {
        Self {
            document,
            notifier,
            node,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Writes `value` into the `source` or `target` child, creating the
    /// element and its text node as needed. Returns whether text existed before.
    fn write_child(&mut self, name: &str, value: &str) -> Result<bool, Error> {
        let existing = child_element(self.document, self.node, name);
        let xml = self.document.xml_mut();
        let element = match existing {
            Some(element) => element,
            None => {
                let element = xml.create_element(Some(XLIFF_NS), name);
                xml.append_child(self.node, element)?
            }
        };

        match xml.first_child(element) {
            Some(text) => {
                xml.set_node_value(text, value);
                Ok(true)
            }
            None => {
                let text = xml.create_text_node(value);
                xml.append_child(element, text)?;
                Ok(false)
            }
        }
    }

    fn clear_child(&mut self, name: &str) {
        let Some(element) = child_element(self.document, self.node, name) else {
            return;
        };
        let xml = self.document.xml_mut();
        if let Some(text) = xml.first_child(element) {
            xml.detach(text);
        }
    }
}

impl TranslationValue for WritableXliffTranslationValue<'_> {
    fn key(&self) -> &str {
        unit_key(self.document, self.node)
    }

    fn source(&self) -> Option<String> {
        child_value(self.document, self.node, "source")
    }

    fn target(&self) -> Option<String> {
        child_value(self.document, self.node, "target")
    }

    fn is_source_empty(&self) -> bool {
        child_is_empty(self.document, self.node, "source")
    }

    fn is_target_empty(&self) -> bool {
        child_is_empty(self.document, self.node, "target")
    }
}

impl WritableTranslationValue for WritableXliffTranslationValue<'_> {
    /// Sets the source text and flags the unit `state` as `new` for a first
    /// value or `needs-translation` when an existing value is overwritten.
    fn set_source(&mut self, value: &str) -> Result<(), Error> {
        let state = if self.write_child("source", value)? {
            "needs-translation"
        } else {
            "new"
        };
        let xml = self.document.xml_mut();
        xml.set_attribute_ns(self.node, Some(XLIFF_NS), "state", state)?;
        self.notifier.mark_changed(self.document)
    }

    fn set_target(&mut self, value: &str) -> Result<(), Error> {
        self.write_child("target", value)?;
        self.notifier.mark_changed(self.document)
    }

    fn clear_source(&mut self) {
        self.clear_child("source");
    }

    fn clear_target(&mut self) {
        self.clear_child("target");
    }
}

fn unit_key(document: &XliffDocument, node: NodeId) -> &str {
    document
        .xml()
        .attribute_ns(node, Some(XLIFF_NS), "id")
        .unwrap_or_default()
}

fn child_element(document: &XliffDocument, node: NodeId, name: &str) -> Option<NodeId> {
    document
        .xml()
        .elements_by_tag_name_ns(node, Some(XLIFF_NS), name)
        .into_iter()
        .next()
}

fn child_value(document: &XliffDocument, node: NodeId, name: &str) -> Option<String> {
    let element = child_element(document, node, name)?;
    let first = document.xml().first_child(element)?;
    Some(document.xml().text_content(first))
}

fn child_is_empty(document: &XliffDocument, node: NodeId, name: &str) -> bool {
    child_element(document, node, name)
        .and_then(|element| document.xml().first_child(element))
        .is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingNotifier {
        changes: usize,
    }

    impl ChangeNotifier for CountingNotifier {
        fn mark_changed(&mut self, _document: &mut XliffDocument) -> Result<(), Error> {
            self.changes += 1;
            Ok(())
        }
    }

    fn unit(
        document: &mut XliffDocument,
        key: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> NodeId {
        let unit = document.create_translation_unit(key, source).unwrap();
        if let Some(target) = target {
            let xml = document.xml_mut();
            let element = xml.create_element(Some(XLIFF_NS), "target");
            xml.append_child(unit, element).unwrap();
            let text = xml.create_text_node(target);
            xml.append_child(element, text).unwrap();
        }
        unit
    }

    fn state(document: &XliffDocument, node: NodeId) -> Option<&str> {
        document.xml().attribute_ns(node, Some(XLIFF_NS), "state")
    }

    #[test]
    fn test_empty_value() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", None, None);
        let value = XliffTranslationValue::new(&document, node);

        assert_eq!(value.key(), "test-key");
        assert_eq!(value.source(), None);
        assert_eq!(value.target(), None);
        assert!(value.is_source_empty());
        assert!(value.is_target_empty());
    }

    #[test]
    fn test_creating_with_values_works() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", Some("Source value"), Some("Target value"));
        let value = XliffTranslationValue::new(&document, node);

        assert_eq!(value.source().as_deref(), Some("Source value"));
        assert_eq!(value.target().as_deref(), Some("Target value"));
        assert!(!value.is_source_empty());
        assert!(!value.is_target_empty());
    }

    #[test]
    fn test_missing_source_element_is_empty() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", None, None);
        let source = document.xml().first_child(node).unwrap();
        document.xml_mut().remove_child(node, source).unwrap();
        let value = XliffTranslationValue::new(&document, node);

        assert_eq!(value.source(), None);
        assert!(value.is_source_empty());
    }

    #[test]
    fn test_setting_values_works() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", None, None);
        let mut notifier = CountingNotifier::default();

        {
            let mut value = WritableXliffTranslationValue::new(&mut document, &mut notifier, node);
            value.set_source("Source value").unwrap();
            value.set_target("Target value").unwrap();

            assert_eq!(value.source().as_deref(), Some("Source value"));
            assert_eq!(value.target().as_deref(), Some("Target value"));
            assert!(!value.is_source_empty());
            assert!(!value.is_target_empty());
        }
        assert_eq!(notifier.changes, 2);
    }

    #[test]
    fn test_setting_source_updates_state() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", None, None);
        let mut notifier = CountingNotifier::default();

        WritableXliffTranslationValue::new(&mut document, &mut notifier, node)
            .set_source("first")
            .unwrap();
        assert_eq!(state(&document, node), Some("new"));

        WritableXliffTranslationValue::new(&mut document, &mut notifier, node)
            .set_source("second")
            .unwrap();
        assert_eq!(state(&document, node), Some("needs-translation"));

        WritableXliffTranslationValue::new(&mut document, &mut notifier, node)
            .set_target("target")
            .unwrap();
        assert_eq!(state(&document, node), Some("needs-translation"));
    }

    #[test]
    fn test_setting_target_never_touches_state() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", Some("source"), None);
        let mut notifier = CountingNotifier::default();

        let mut value = WritableXliffTranslationValue::new(&mut document, &mut notifier, node);
        value.set_target("one").unwrap();
        value.set_target("two").unwrap();
        assert_eq!(value.target().as_deref(), Some("two"));
        drop(value);

        assert_eq!(state(&document, node), None);
        assert_eq!(notifier.changes, 2);
    }

    #[test]
    fn test_setting_source_recreates_missing_element() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", None, None);
        let source = document.xml().first_child(node).unwrap();
        document.xml_mut().remove_child(node, source).unwrap();
        let mut notifier = CountingNotifier::default();

        let mut value = WritableXliffTranslationValue::new(&mut document, &mut notifier, node);
        value.set_source("again").unwrap();
        assert_eq!(value.source().as_deref(), Some("again"));
        drop(value);
        assert_eq!(state(&document, node), Some("new"));
    }

    #[test]
    fn test_clearing_values_works() {
        let mut document = XliffDocument::new();
        let node = unit(&mut document, "test-key", Some("Source value"), Some("Target value"));
        let mut notifier = CountingNotifier::default();

        {
            let mut value = WritableXliffTranslationValue::new(&mut document, &mut notifier, node);
            value.clear_source();
            value.clear_target();

            assert_eq!(value.source(), None);
            assert_eq!(value.target(), None);
            assert!(value.is_source_empty());
            assert!(value.is_target_empty());

            value.clear_source();
            value.clear_target();
            assert!(value.is_source_empty());
        }
        assert_eq!(notifier.changes, 0);
    }
}
