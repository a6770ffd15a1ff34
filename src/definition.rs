//! Turning flat configuration maps into dictionary definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// A named dictionary together with its remaining configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryDefinition {
    pub name: String,
    pub data: Map<String, Value>,
}

/// Builds a definition from the values of one configuration entry.
pub trait DefinitionBuilder {
    type Definition;

    fn build(&self, data: Map<String, Value>) -> Result<Self::Definition, Error>;
}

/// Builder for dictionaries of type `xliff`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XliffDictionaryDefinitionBuilder;

impl XliffDictionaryDefinitionBuilder {
    pub const TYPE: &'static str = "xliff";
}

impl DefinitionBuilder for XliffDictionaryDefinitionBuilder {
    type Definition = DictionaryDefinition;

    /// Takes `name` out of `data` and tags the rest with `type = "xliff"`.
    fn build(&self, mut data: Map<String, Value>) -> Result<DictionaryDefinition, Error> {
        let name = match data.remove("name") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(Error::invalid_argument("Key 'name' must be a string")),
            None => return Err(Error::invalid_argument("Missing key 'name'")),
        };
        data.insert("type".to_string(), Value::String(Self::TYPE.to_string()));

        Ok(DictionaryDefinition { name, data })
    }
}
