use std::io::Write;

use quick_xml::{
    Writer,
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use super::{NodeId, NodeKind, XML_NS, XmlDocument};
use crate::error::Error;

/// Namespace bindings in scope while serializing, innermost last.
type Scope = Vec<(Option<String>, String)>;

impl XmlDocument {
    /// Write the document, pretty-printed with two-space indentation.
    ///
    /// Namespace declarations missing for created elements or attributes are
    /// added on the element that first needs them.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);
        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        if let Some(root) = self.document_element() {
            let mut scope = Scope::new();
            self.write_node(&mut xml_writer, root, &mut scope)?;
        }

        xml_writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    /// Serialize the document into a string.
    pub fn to_xml_string(&self) -> Result<String, Error> {
        let mut out = Vec::new();
        self.to_writer(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn write_node<W: Write>(
        &self,
        xml_writer: &mut Writer<W>,
        node: NodeId,
        scope: &mut Scope,
    ) -> Result<(), Error> {
        let element = match self.kind(node) {
            NodeKind::Text(value) => {
                xml_writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(
                    value.as_str(),
                ))))?;
                return Ok(());
            }
            NodeKind::Element(element) => element,
        };

        let mark = scope.len();
        let name = element.qualified_name();
        let mut start = BytesStart::new(name.as_str());

        for decl in &element.namespaces {
            declare(&mut start, scope, decl.prefix.clone(), &decl.uri);
        }

        let bound = lookup(scope, element.prefix.as_deref());
        match (&element.namespace, bound) {
            (Some(ns), bound) if bound != Some(ns.as_str()) => {
                declare(&mut start, scope, element.prefix.clone(), ns);
            }
            (None, Some(bound)) if element.prefix.is_none() && !bound.is_empty() => {
                declare(&mut start, scope, None, "");
            }
            _ => {}
        }

        for attr in &element.attributes {
            if let (Some(ns), Some(prefix)) = (&attr.namespace, &attr.prefix) {
                if lookup(scope, Some(prefix)) != Some(ns.as_str()) {
                    declare(&mut start, scope, Some(prefix.clone()), ns);
                }
            }
            let attr_name = attr.qualified_name();
            start.push_attribute((attr_name.as_str(), attr.value.as_str()));
        }

        let children = self.children(node);
        if children.is_empty() {
            xml_writer.write_event(Event::Empty(start))?;
        } else {
            xml_writer.write_event(Event::Start(start))?;
            for child in children {
                self.write_node(xml_writer, *child, scope)?;
            }
            xml_writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }

        scope.truncate(mark);
        Ok(())
    }
}

fn declare(start: &mut BytesStart<'_>, scope: &mut Scope, prefix: Option<String>, uri: &str) {
    let key = match &prefix {
        Some(prefix) => format!("xmlns:{prefix}"),
        None => "xmlns".to_string(),
    };
    start.push_attribute((key.as_str(), uri));
    scope.push((prefix, uri.to_string()));
}

fn lookup<'s>(scope: &'s Scope, prefix: Option<&str>) -> Option<&'s str> {
    if prefix == Some("xml") {
        return Some(XML_NS);
    }
    scope
        .iter()
        .rev()
        .find(|(bound, _)| bound.as_deref() == prefix)
        .map(|(_, uri)| uri.as_str())
}
