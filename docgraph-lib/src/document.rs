//! Document model
//!
//! A [`Document`] is one ingestible unit of documentation: a standard library
//! item, a crate doc block or a book chapter. Its `url` is the natural key that
//! ties the vector record and the graph node of an indexed document together.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// Free-form key/value mapping used for vector metadata and node properties.
pub type Properties = serde_json::Map<String, Value>;

/// Well-known metadata and property keys.
///
/// These names form the contract between the two stores, so they are shared
/// by the indexer, the search engine and the reconciler.
pub mod keys {
    /// Vector metadata: the url of the document the vector was computed from.
    pub const DOC_ID: &str = "docId";
    /// Document node property: id of the node's vector record.
    pub const VECTOR_ID: &str = "vectorId";
    pub const TYPE: &str = "type";
    pub const TITLE: &str = "title";
    pub const URL: &str = "url";
    /// Module node property: the module name.
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const MODULE: &str = "module";
    pub const CATEGORY: &str = "category";
}

/// Where a document came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// Standard library reference page
    Std,
    /// Package registry / crate documentation
    Crate,
    /// Guide (book) chapter
    Guide,
}

impl DocType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Std => "std",
            Self::Crate => "crate",
            Self::Guide => "guide",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "std" => Ok(Self::Std),
            "crate" => Ok(Self::Crate),
            "guide" => Ok(Self::Guide),
            other => Err(Error::InvalidInput(format!("unknown document type: {other}"))),
        }
    }
}

/// Optional typed metadata attached to a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Module or namespace the document belongs to. Documents sharing a
    /// module are grouped under one module node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl DocMetadata {
    /// Writes every present field into `props`.
    pub fn extend_into(&self, props: &mut Properties) {
        let fields = [
            (keys::VERSION, &self.version),
            (keys::MODULE, &self.module),
            (keys::CATEGORY, &self.category),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                props.insert(key.to_string(), Value::String(value.clone()));
            }
        }
    }

    /// Module name, if present and not blank.
    #[must_use]
    pub fn module_name(&self) -> Option<&str> {
        self.module.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// A scraped, immutable unit of documentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub content: String,
    /// Unique identifier of the document
    pub url: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    #[serde(default)]
    pub metadata: DocMetadata,
}

impl Document {
    /// Text handed to the embedding provider.
    ///
    /// Falls back to the title when there is no content, which is the case for
    /// book chapters that were listed but not fetched.
    #[must_use]
    pub fn embedding_text(&self) -> &str {
        if self.content.trim().is_empty() {
            &self.title
        } else {
            &self.content
        }
    }

    /// Metadata stored alongside the document's vector.
    #[must_use]
    pub fn vector_metadata(&self) -> Properties {
        let mut meta = Properties::new();
        meta.insert(keys::DOC_ID.into(), Value::String(self.url.clone()));
        meta.insert(keys::TYPE.into(), Value::String(self.doc_type.to_string()));
        self.metadata.extend_into(&mut meta);
        meta
    }

    /// Properties of the document's graph node.
    #[must_use]
    pub fn node_properties(&self, vector_id: &str) -> Properties {
        let mut props = Properties::new();
        props.insert(keys::TITLE.into(), Value::String(self.title.clone()));
        props.insert(keys::URL.into(), Value::String(self.url.clone()));
        props.insert(keys::TYPE.into(), Value::String(self.doc_type.to_string()));
        props.insert(keys::VECTOR_ID.into(), Value::String(vector_id.to_string()));
        self.metadata.extend_into(&mut props);
        props
    }
}

/// Reads a string-valued entry out of a property map.
#[must_use]
pub fn str_prop<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_doc() -> Document {
        Document {
            title: "Option".to_string(),
            content: "An Option<T> type".to_string(),
            url: "std/option".to_string(),
            doc_type: DocType::Std,
            metadata: DocMetadata {
                module: Some("std".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_vector_metadata_carries_doc_id() {
        let meta = option_doc().vector_metadata();
        assert_eq!(str_prop(&meta, keys::DOC_ID), Some("std/option"));
        assert_eq!(str_prop(&meta, keys::TYPE), Some("std"));
        assert_eq!(str_prop(&meta, keys::MODULE), Some("std"));
        assert!(!meta.contains_key(keys::VERSION));
    }

    #[test]
    fn test_node_properties_carry_vector_id() {
        let props = option_doc().node_properties("v-1");
        assert_eq!(str_prop(&props, keys::VECTOR_ID), Some("v-1"));
        assert_eq!(str_prop(&props, keys::TITLE), Some("Option"));
        assert_eq!(str_prop(&props, keys::URL), Some("std/option"));
    }

    #[test]
    fn test_embedding_text_falls_back_to_title() {
        let mut doc = option_doc();
        doc.content = "   ".to_string();
        assert_eq!(doc.embedding_text(), "Option");
    }

    #[test]
    fn test_blank_module_is_ignored() {
        let meta = DocMetadata {
            module: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.module_name(), None);
    }

    #[test]
    fn test_doc_type_serializes_lowercase() {
        let json = serde_json::to_value(option_doc()).unwrap();
        assert_eq!(json["type"], "std");
        assert_eq!("guide".parse::<DocType>().unwrap(), DocType::Guide);
        assert!("wiki".parse::<DocType>().is_err());
    }
}
