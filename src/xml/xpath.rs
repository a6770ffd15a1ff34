//! Evaluation of a restricted XPath subset against an [`XmlDocument`].
//!
//! Supported grammar:
//!
//! ```text
//! path      := ["/"] step ("/" step)*
//! step      := qname [ "[@" qname "=" literal "]" ]
//! qname     := [prefix ":"] local-name
//! literal   := "'" chars "'" | '"' chars '"'
//! ```
//!
//! Unprefixed element and attribute names match nodes in no namespace, as in
//! XPath 1.0. The one prefix in use must be registered with
//! [`XPath::register_namespace`].

use std::str::FromStr;

use super::{NodeId, XmlDocument};
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub local_name: String,
}

impl QualifiedName {
    pub fn new(prefix: Option<&str>, local_name: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
        }
    }
}

impl FromStr for QualifiedName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, local_name) = match s.split_once(':') {
            Some((prefix, local_name)) => (Some(prefix), local_name),
            None => (None, s),
        };
        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(local_name) || !prefix.is_none_or(valid) {
            return Err(Error::invalid_argument(format!("invalid name `{s}`")));
        }
        Ok(Self::new(prefix, local_name))
    }
}

/// `[@name='value']`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePredicate {
    pub name: QualifiedName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: QualifiedName,
    pub predicate: Option<AttributePredicate>,
}

impl Step {
    pub fn new(prefix: Option<&str>, local_name: &str) -> Self {
        Self {
            name: QualifiedName::new(prefix, local_name),
            predicate: None,
        }
    }

    /// Restrict the step to elements carrying the given attribute value.
    pub fn with_attribute(mut self, prefix: Option<&str>, name: &str, value: &str) -> Self {
        self.predicate = Some(AttributePredicate {
            name: QualifiedName::new(prefix, name),
            value: value.to_string(),
        });
        self
    }
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(open) = s.find('[') else {
            return Ok(Step {
                name: s.parse()?,
                predicate: None,
            });
        };

        let inner = s[open + 1..]
            .strip_suffix(']')
            .and_then(|inner| inner.strip_prefix('@'))
            .ok_or_else(|| Error::invalid_argument(format!("unsupported predicate in `{s}`")))?;
        let (name, literal) = inner
            .split_once('=')
            .ok_or_else(|| Error::invalid_argument(format!("predicate without value in `{s}`")))?;
        let literal = literal.trim();
        let value = ['\'', '"']
            .iter()
            .find_map(|quote| {
                literal
                    .strip_prefix(*quote)
                    .and_then(|rest| rest.strip_suffix(*quote))
            })
            .ok_or_else(|| Error::invalid_argument(format!("unquoted literal in `{s}`")))?;

        Ok(Step {
            name: s[..open].parse()?,
            predicate: Some(AttributePredicate {
                name: name.trim().parse()?,
                value: value.to_string(),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

impl LocationPath {
    pub fn absolute(steps: Vec<Step>) -> Self {
        Self {
            absolute: true,
            steps,
        }
    }

    pub fn relative(steps: Vec<Step>) -> Self {
        Self {
            absolute: false,
            steps,
        }
    }
}

impl FromStr for LocationPath {
    type Err = Error;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let (absolute, rest) = match expression.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, expression),
        };

        let mut parts = Vec::new();
        let mut quote: Option<char> = None;
        let mut begin = 0;
        for (index, c) in rest.char_indices() {
            match (quote, c) {
                (None, '\'' | '"') => quote = Some(c),
                (Some(open), _) if open == c => quote = None,
                (None, '/') => {
                    parts.push(&rest[begin..index]);
                    begin = index + 1;
                }
                _ => {}
            }
        }
        if quote.is_some() {
            return Err(Error::invalid_argument(format!(
                "unterminated literal in `{expression}`"
            )));
        }
        parts.push(&rest[begin..]);

        let steps = parts
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<Step>, _>>()?;
        Ok(Self { absolute, steps })
    }
}

/// Query context over a document, holding the registered namespace prefix.
#[derive(Debug, Clone)]
pub struct XPath<'d> {
    document: &'d XmlDocument,
    namespace: Option<(String, String)>,
}

impl<'d> XPath<'d> {
    pub fn new(document: &'d XmlDocument) -> Self {
        Self {
            document,
            namespace: None,
        }
    }

    /// Binds `prefix` to `uri`, replacing any earlier registration.
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) {
        self.namespace = Some((prefix.to_string(), uri.to_string()));
    }

    /// Evaluate `expression` and return all matches in document order.
    pub fn query(&self, expression: &str, context: Option<NodeId>) -> Result<Vec<NodeId>, Error> {
        self.evaluate(&expression.parse()?, context)
    }

    /// Evaluate `expression` and return the first match.
    pub fn query_first(
        &self,
        expression: &str,
        context: Option<NodeId>,
    ) -> Result<Option<NodeId>, Error> {
        Ok(self.query(expression, context)?.into_iter().next())
    }

    pub fn evaluate(
        &self,
        path: &LocationPath,
        context: Option<NodeId>,
    ) -> Result<Vec<NodeId>, Error> {
        let mut current: Vec<NodeId> = if path.absolute {
            Vec::new()
        } else {
            vec![context.ok_or_else(|| {
                Error::invalid_argument("relative path evaluated without a context node")
            })?]
        };

        for (index, step) in path.steps.iter().enumerate() {
            let namespace = self.resolve(&step.name)?;
            let predicate = match &step.predicate {
                Some(predicate) => Some((self.resolve(&predicate.name)?, predicate)),
                None => None,
            };

            let candidates: Vec<NodeId> = if path.absolute && index == 0 {
                self.document.document_element().into_iter().collect()
            } else {
                current
                    .iter()
                    .flat_map(|node| self.document.children(*node).iter().copied())
                    .collect()
            };

            current = candidates
                .into_iter()
                .filter(|node| {
                    let Some(element) = self.document.element(*node) else {
                        return false;
                    };
                    if element.namespace.as_deref() != namespace
                        || element.local_name != step.name.local_name
                    {
                        return false;
                    }
                    predicate.is_none_or(|(attr_namespace, predicate)| {
                        element.attributes.iter().any(|attr| {
                            attr.namespace.as_deref() == attr_namespace
                                && attr.local_name == predicate.name.local_name
                                && attr.value == predicate.value
                        })
                    })
                })
                .collect();
        }

        Ok(current)
    }

    fn resolve(&self, name: &QualifiedName) -> Result<Option<&str>, Error> {
        match &name.prefix {
            None => Ok(None),
            Some(prefix) => self
                .namespace
                .as_ref()
                .filter(|(registered, _)| registered == prefix)
                .map(|(_, uri)| Some(uri.as_str()))
                .ok_or_else(|| {
                    Error::invalid_argument(format!("unregistered namespace prefix `{prefix}`"))
                }),
        }
    }
}
