use std::io::BufRead;

use quick_xml::{
    NsReader,
    events::{BytesStart, Event},
    name::{PrefixDeclaration, ResolveResult},
};

use super::{Attribute, Element, NamespaceDecl, NodeId, NodeKind, XmlDocument};
use crate::error::Error;

impl XmlDocument {
    /// Parse a document from any reader.
    ///
    /// Whitespace-only text is dropped, as are comments, processing
    /// instructions and the XML declaration. CDATA sections become text.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut xml_reader = NsReader::from_reader(reader);

        let mut document = XmlDocument::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let (resolved, event) = xml_reader.read_resolved_event_into(&mut buf)?;
            let namespace = owned_namespace(resolved)?;
            match event {
                Event::Start(ref e) => {
                    let element = parse_element(&xml_reader, e, namespace)?;
                    let id = document.push(NodeKind::Element(element));
                    place(&mut document, &open, id)?;
                    open.push(id);
                }
                Event::Empty(ref e) => {
                    let element = parse_element(&xml_reader, e, namespace)?;
                    let id = document.push(NodeKind::Element(element));
                    place(&mut document, &open, id)?;
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(ref e) => {
                    let text = e.unescape()?;
                    if let Some(&parent) = open.last() {
                        if !text.trim().is_empty() {
                            let id = document.create_text_node(text.into_owned());
                            document.attach(parent, id);
                        }
                    }
                }
                Event::CData(ref e) => {
                    let text = std::str::from_utf8(e)?.to_string();
                    if let Some(&parent) = open.last() {
                        let id = document.create_text_node(text);
                        document.attach(parent, id);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !open.is_empty() {
            return Err(Error::corrupted("unexpected end of document"));
        }
        if document.document_element().is_none() {
            return Err(Error::corrupted("document has no root element"));
        }
        Ok(document)
    }

    /// Parse a document from a string.
    pub fn parse_str(s: &str) -> Result<Self, Error> {
        Self::from_reader(s.as_bytes())
    }
}

fn place(document: &mut XmlDocument, open: &[NodeId], id: NodeId) -> Result<(), Error> {
    match open.last() {
        Some(&parent) => document.attach(parent, id),
        None if document.document_element().is_none() => document.set_root(id),
        None => return Err(Error::corrupted("document has more than one root element")),
    }
    Ok(())
}

fn parse_element<R>(
    xml_reader: &NsReader<R>,
    e: &BytesStart,
    namespace: Option<String>,
) -> Result<Element, Error> {
    let prefix = e.name().prefix().map(|p| utf8(p.as_ref())).transpose()?;
    let local_name = utf8(e.local_name().as_ref())?;
    let mut element = Element {
        namespace,
        prefix,
        local_name,
        attributes: Vec::new(),
        namespaces: Vec::new(),
    };

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();

        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => None,
                PrefixDeclaration::Named(prefix) => Some(utf8(prefix)?),
            };
            element.namespaces.push(NamespaceDecl { prefix, uri: value });
            continue;
        }

        let (resolved, local_name) = xml_reader.resolve_attribute(attr.key);
        element.attributes.push(Attribute {
            namespace: owned_namespace(resolved)?,
            prefix: attr.key.prefix().map(|p| utf8(p.as_ref())).transpose()?,
            local_name: utf8(local_name.as_ref())?,
            value,
        });
    }

    Ok(element)
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, Error> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(utf8(ns.as_ref())?)),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::corrupted(format!(
            "undeclared namespace prefix `{}`",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn utf8(bytes: &[u8]) -> Result<String, Error> {
    Ok(std::str::from_utf8(bytes)?.to_string())
}
