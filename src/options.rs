use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{definition::DictionaryDefinition, error::Error};

/// File name layout of dictionaries below the provider root.
///
/// Placeholders: `{name}` (required), `{source}` and `{target}`. The result
/// is relative to the root directory; `/` separates directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileNameTemplate(String);

impl FileNameTemplate {
    pub const WITH_SUB_DIRECTORIES: &'static str = "{source}-{target}/{name}.xlf";
    pub const WITHOUT_SUB_DIRECTORIES: &'static str = "{name}.xlf";

    pub fn new(template: impl Into<String>) -> Result<Self, Error> {
        let template = template.into();
        if !template.contains("{name}") {
            return Err(Error::invalid_argument(format!(
                "File name template \"{template}\" lacks the {{name}} placeholder"
            )));
        }
        Ok(Self(template))
    }

    /// The default layout: one directory per language pair, or a flat root.
    pub fn for_sub_directories(sub_directories: bool) -> Self {
        if sub_directories {
            Self(Self::WITH_SUB_DIRECTORIES.to_string())
        } else {
            Self(Self::WITHOUT_SUB_DIRECTORIES.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expands the placeholders into a path relative to the provider root.
    pub fn resolve(&self, name: &str, source_language: &str, target_language: &str) -> PathBuf {
        let expanded = self
            .0
            .replace("{name}", name)
            .replace("{source}", source_language)
            .replace("{target}", target_language);
        expanded
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect()
    }
}

impl TryFrom<String> for FileNameTemplate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FileNameTemplate> for String {
    fn from(value: FileNameTemplate) -> Self {
        value.0
    }
}

/// Options for [`XliffDictionaryProvider`](crate::XliffDictionaryProvider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOptions {
    /// Directory holding the dictionary files.
    pub root_dir: PathBuf,
    /// Whether dictionaries live in one sub directory per language pair.
    #[serde(default = "default_sub_directories")]
    pub sub_directories: bool,
    /// Overrides the layout implied by `sub_directories`.
    #[serde(default)]
    pub file_name_template: Option<FileNameTemplate>,
}

fn default_sub_directories() -> bool {
    true
}

impl ProviderOptions {
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            sub_directories: true,
            file_name_template: None,
        }
    }

    pub fn with_sub_directories(mut self, sub_directories: bool) -> Self {
        self.sub_directories = sub_directories;
        self
    }

    pub fn with_file_name_template(mut self, template: FileNameTemplate) -> Self {
        self.file_name_template = Some(template);
        self
    }

    /// Reads the options from the data of a dictionary definition.
    pub fn from_definition(definition: &DictionaryDefinition) -> Result<Self, Error> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            definition.data.clone(),
        ))?)
    }

    /// The effective template.
    pub fn template(&self) -> FileNameTemplate {
        self.file_name_template
            .clone()
            .unwrap_or_else(|| FileNameTemplate::for_sub_directories(self.sub_directories))
    }
}
