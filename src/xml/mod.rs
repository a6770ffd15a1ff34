//! A small namespace-aware XML tree, restricted to what XLIFF files need.
//!
//! All nodes live in an arena owned by [`XmlDocument`] and are addressed by
//! copyable [`NodeId`] handles. Nodes removed from the tree stay in the arena
//! but are no longer reachable from the document element.
//!
//! Attribute access goes through [`XmlDocument::set_attribute_ns`] and
//! [`XmlDocument::attribute_ns`], which normalize attributes of the document's
//! default namespace to plain (unprefixed) attributes. Higher layers never need
//! to special-case that rule.

mod reader;
mod writer;
pub mod xpath;

pub use xpath::{LocationPath, QualifiedName, Step, XPath};

use crate::error::Error;

/// The XLIFF 1.2 namespace.
pub const XLIFF_NS: &str = "urn:oasis:names:tc:xliff:document:1.2";

/// The namespace reserved for the `xml:` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Handle to a node inside an [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl Attribute {
    /// The name as written in the document (`prefix:local` or `local`).
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }
}

/// An `xmlns` / `xmlns:prefix` declaration carried by an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    pub namespaces: Vec<NamespaceDecl>,
}

impl Element {
    pub fn new(namespace: Option<&str>, prefix: Option<&str>, local_name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }

    fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local_name == local_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// An in-memory XML document.
#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl XmlDocument {
    /// Creates an empty document without a document element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new detached element.
    ///
    /// The element reuses the prefix the document element has bound to
    /// `namespace`, unless that namespace is the document's default namespace.
    pub fn create_element(&mut self, namespace: Option<&str>, local_name: &str) -> NodeId {
        let prefix = match (namespace, self.root) {
            (Some(ns), Some(root)) if !self.is_default_namespace(ns) => {
                self.lookup_prefix(root, ns)
            }
            _ => None,
        };
        let element = Element::new(namespace, prefix.as_deref(), local_name);
        self.push(NodeKind::Element(element))
    }

    /// Creates a new detached text node.
    pub fn create_text_node(&mut self, value: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(value.into()))
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.root
    }

    /// Installs `element` as the document element, replacing any previous one.
    pub fn set_document_element(&mut self, element: NodeId) -> Result<(), Error> {
        if self.element(element).is_none() {
            return Err(Error::invalid_argument(
                "document element must be an element node",
            ));
        }
        self.detach(element);
        self.root = Some(element);
        Ok(())
    }

    /// Appends `child` to `parent`, detaching it from its previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, Error> {
        if self.element(parent).is_none() {
            return Err(Error::invalid_argument("only elements can have children"));
        }
        if self.ancestors_or_self(parent).any(|node| node == child) {
            return Err(Error::invalid_argument(
                "cannot append a node to one of its own descendants",
            ));
        }
        if self.root == Some(child) {
            self.root = None;
        }
        self.detach(child);
        self.attach(parent, child);
        Ok(child)
    }

    /// Removes `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, Error> {
        if self.parent_node(child) != Some(parent) {
            return Err(Error::invalid_argument("node is not a child of the given parent"));
        }
        self.detach(child);
        Ok(child)
    }

    pub fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).children.first().copied()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.node(node).kind
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.node(node).kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element, Error> {
        match &mut self.node_mut(node).kind {
            NodeKind::Element(element) => Ok(element),
            NodeKind::Text(_) => Err(Error::invalid_argument(
                "attributes are only available on element nodes",
            )),
        }
    }

    pub fn local_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.local_name.as_str())
    }

    pub fn namespace_uri(&self, node: NodeId) -> Option<&str> {
        self.element(node).and_then(|e| e.namespace.as_deref())
    }

    /// The value of a text node, `None` for elements.
    pub fn node_value(&self, node: NodeId) -> Option<&str> {
        match &self.node(node).kind {
            NodeKind::Text(value) => Some(value),
            NodeKind::Element(_) => None,
        }
    }

    /// Replaces the value of a text node, or the whole content of an element.
    pub fn set_node_value(&mut self, node: NodeId, value: impl Into<String>) {
        let value = value.into();
        if let NodeKind::Text(text) = &mut self.node_mut(node).kind {
            *text = value;
            return;
        }
        for child in self.node(node).children.clone() {
            self.detach(child);
        }
        let text = self.create_text_node(value);
        self.attach(node, text);
    }

    /// Concatenated text of a node and all of its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        match &self.node(node).kind {
            NodeKind::Text(value) => value.clone(),
            NodeKind::Element(_) => self
                .children(node)
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
        }
    }

    /// All descendant elements of `node` (excluding `node`) with the given
    /// namespace and local name, in document order.
    pub fn elements_by_tag_name_ns(
        &self,
        node: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_descendants(node, namespace, local_name, &mut found);
        found
    }

    fn collect_descendants(
        &self,
        node: NodeId,
        namespace: Option<&str>,
        local_name: &str,
        found: &mut Vec<NodeId>,
    ) {
        for &child in self.children(node) {
            if self
                .element(child)
                .is_some_and(|e| e.matches(namespace, local_name))
            {
                found.push(child);
            }
            self.collect_descendants(child, namespace, local_name, found);
        }
    }

    /// Whether `namespace` is the default namespace of the document element.
    pub fn is_default_namespace(&self, namespace: &str) -> bool {
        self.root
            .and_then(|root| self.lookup_namespace_uri(root, None))
            .is_some_and(|uri| uri == namespace)
    }

    /// Resolves `prefix` (or the default namespace for `None`) in scope of `node`.
    pub fn lookup_namespace_uri(&self, node: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        for current in self.ancestors_or_self(node) {
            let Some(element) = self.element(current) else {
                continue;
            };
            if let Some(decl) = element
                .namespaces
                .iter()
                .find(|decl| decl.prefix.as_deref() == prefix)
            {
                return Some(decl.uri.as_str()).filter(|uri| !uri.is_empty());
            }
            if element.prefix.as_deref() == prefix && element.namespace.is_some() {
                return element.namespace.as_deref();
            }
        }
        None
    }

    /// Finds a prefix bound to `namespace` in scope of `node`.
    pub fn lookup_prefix(&self, node: NodeId, namespace: &str) -> Option<String> {
        for current in self.ancestors_or_self(node) {
            let Some(element) = self.element(current) else {
                continue;
            };
            let declared = element.namespaces.iter().find_map(|decl| match &decl.prefix {
                Some(prefix) if decl.uri == namespace => Some(prefix.clone()),
                _ => None,
            });
            if declared.is_some() {
                return declared;
            }
            if let (Some(prefix), Some(ns)) = (&element.prefix, &element.namespace) {
                if ns == namespace {
                    return Some(prefix.clone());
                }
            }
        }
        None
    }

    /// Sets an attribute, honoring the default-namespace rule.
    ///
    /// When `namespace` is the XLIFF namespace and that namespace is the
    /// document's default, the attribute is written unprefixed. Otherwise a
    /// namespaced attribute is written, declaring a prefix on the document
    /// element if none is in scope yet.
    pub fn set_attribute_ns(
        &mut self,
        node: NodeId,
        namespace: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<(), Error> {
        let namespace = match namespace {
            Some(ns) if ns == XLIFF_NS && self.is_default_namespace(ns) => None,
            other => other,
        };
        let prefix = match namespace {
            Some(ns) => Some(self.ensure_prefix(node, ns)?),
            None => None,
        };

        let element = self.element_mut(node)?;
        match element
            .attributes
            .iter_mut()
            .find(|attr| attr.namespace.as_deref() == namespace && attr.local_name == local_name)
        {
            Some(attr) => attr.value = value.to_string(),
            None => element.attributes.push(Attribute {
                namespace: namespace.map(str::to_string),
                prefix,
                local_name: local_name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    /// Reads an attribute, applying the same default-namespace rule as
    /// [`XmlDocument::set_attribute_ns`].
    pub fn attribute_ns(
        &self,
        node: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<&str> {
        let namespace = match namespace {
            Some(ns) if ns == XLIFF_NS && self.is_default_namespace(ns) => None,
            other => other,
        };
        self.element(node)?
            .attributes
            .iter()
            .find(|attr| attr.namespace.as_deref() == namespace && attr.local_name == local_name)
            .map(|attr| attr.value.as_str())
    }

    /// Plain attribute (no namespace).
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attribute_ns(node, None, name)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), Error> {
        self.set_attribute_ns(node, None, name, value)
    }

    fn ensure_prefix(&mut self, node: NodeId, namespace: &str) -> Result<String, Error> {
        if namespace == XML_NS {
            return Ok("xml".to_string());
        }
        if let Some(prefix) = self.lookup_prefix(node, namespace) {
            return Ok(prefix);
        }
        let host = self.root.unwrap_or(node);
        let prefix = std::iter::once("xlf".to_string())
            .chain((1..u32::MAX).map(|n| format!("ns{n}")))
            .find(|candidate| {
                self.lookup_namespace_uri(node, Some(candidate)).is_none()
                    && self.lookup_namespace_uri(host, Some(candidate)).is_none()
            })
            .ok_or_else(|| Error::invalid_argument("no free namespace prefix left"))?;
        self.element_mut(host)?.namespaces.push(NamespaceDecl {
            prefix: Some(prefix.clone()),
            uri: namespace.to_string(),
        });
        Ok(prefix)
    }

    fn ancestors_or_self(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), |current| self.parent_node(*current))
    }

    pub(crate) fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn set_root(&mut self, node: NodeId) {
        self.root = Some(node);
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    pub(crate) fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != node);
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

fn qualify(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local_name}"),
        None => local_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xliff_root(document: &mut XmlDocument) -> NodeId {
        let root = document.create_element(Some(XLIFF_NS), "xliff");
        document.set_document_element(root).unwrap();
        root
    }

    #[test]
    fn test_default_namespace_attributes_are_plain() {
        let mut document = XmlDocument::new();
        let root = xliff_root(&mut document);
        assert!(document.is_default_namespace(XLIFF_NS));

        document
            .set_attribute_ns(root, Some(XLIFF_NS), "version", "1.2")
            .unwrap();

        let element = document.element(root).unwrap();
        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.attributes[0].namespace, None);
        assert_eq!(element.attributes[0].prefix, None);
        assert!(element.namespaces.is_empty());
        assert_eq!(document.attribute_ns(root, Some(XLIFF_NS), "version"), Some("1.2"));
        assert_eq!(document.attribute(root, "version"), Some("1.2"));
    }

    #[test]
    fn test_prefixed_namespace_attributes_are_qualified() {
        let mut document = XmlDocument::new();
        let root = document.push(NodeKind::Element(Element::new(
            Some(XLIFF_NS),
            Some("x"),
            "xliff",
        )));
        document.set_document_element(root).unwrap();
        assert!(!document.is_default_namespace(XLIFF_NS));

        document
            .set_attribute_ns(root, Some(XLIFF_NS), "version", "1.2")
            .unwrap();

        let element = document.element(root).unwrap();
        assert_eq!(element.attributes[0].qualified_name(), "x:version");
        assert_eq!(document.attribute(root, "version"), None);
        assert_eq!(document.attribute_ns(root, Some(XLIFF_NS), "version"), Some("1.2"));
    }

    #[test]
    fn test_foreign_namespace_attribute_declares_prefix_on_root() {
        let mut document = XmlDocument::new();
        let root = document.push(NodeKind::Element(Element::new(None, None, "root")));
        document.set_document_element(root).unwrap();
        let child = document.create_element(None, "child");
        document.append_child(root, child).unwrap();

        document
            .set_attribute_ns(child, Some(XLIFF_NS), "id", "a")
            .unwrap();

        let decls = &document.element(root).unwrap().namespaces;
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].prefix.as_deref(), Some("xlf"));
        assert_eq!(document.attribute_ns(child, Some(XLIFF_NS), "id"), Some("a"));
        assert_eq!(document.attribute(child, "id"), None);
    }

    #[test]
    fn test_create_element_reuses_bound_prefix() {
        let mut document = XmlDocument::new();
        let root = document.push(NodeKind::Element(Element::new(
            Some(XLIFF_NS),
            Some("x"),
            "xliff",
        )));
        document.set_document_element(root).unwrap();

        let file = document.create_element(Some(XLIFF_NS), "file");
        assert_eq!(document.element(file).unwrap().qualified_name(), "x:file");
    }

    #[test]
    fn test_append_and_remove_child() {
        let mut document = XmlDocument::new();
        let root = xliff_root(&mut document);
        let file = document.create_element(Some(XLIFF_NS), "file");
        document.append_child(root, file).unwrap();

        assert_eq!(document.first_child(root), Some(file));
        assert_eq!(document.parent_node(file), Some(root));

        document.remove_child(root, file).unwrap();
        assert_eq!(document.first_child(root), None);
        assert_eq!(document.parent_node(file), None);
        assert!(document.remove_child(root, file).is_err());
    }

    #[test]
    fn test_append_child_rejects_cycles_and_text_parents() {
        let mut document = XmlDocument::new();
        let root = xliff_root(&mut document);
        let file = document.create_element(Some(XLIFF_NS), "file");
        document.append_child(root, file).unwrap();
        let text = document.create_text_node("x");

        assert!(document.append_child(file, root).is_err());
        assert!(document.append_child(text, file).is_err());
    }

    #[test]
    fn test_elements_by_tag_name_ns_in_document_order() {
        let mut document = XmlDocument::new();
        let root = xliff_root(&mut document);
        let first = document.create_element(Some(XLIFF_NS), "source");
        let nested_parent = document.create_element(Some(XLIFF_NS), "group");
        let nested = document.create_element(Some(XLIFF_NS), "source");
        let foreign = document.create_element(None, "source");
        document.append_child(root, first).unwrap();
        document.append_child(root, nested_parent).unwrap();
        document.append_child(nested_parent, nested).unwrap();
        document.append_child(root, foreign).unwrap();

        assert_eq!(
            document.elements_by_tag_name_ns(root, Some(XLIFF_NS), "source"),
            vec![first, nested]
        );
        assert_eq!(
            document.elements_by_tag_name_ns(root, None, "source"),
            vec![foreign]
        );
    }

    #[test]
    fn test_set_node_value_on_text_and_element() {
        let mut document = XmlDocument::new();
        let root = xliff_root(&mut document);
        let text = document.create_text_node("old");
        document.append_child(root, text).unwrap();

        document.set_node_value(text, "new");
        assert_eq!(document.node_value(text), Some("new"));

        document.set_node_value(root, "replaced");
        assert_eq!(document.children(root).len(), 1);
        assert_eq!(document.text_content(root), "replaced");
    }
}
