use std::collections::HashSet;
use std::sync::LazyLock;
use regex::Regex;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};

static MODEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("static model name pattern")
});

/// Storage type tag of a model attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    Integer,
    Float,
    Boolean,
    DateTime,
    Text,
    String,
    Unicode,
    Binary,
}

impl StorageType {
    pub fn is_textual(&self) -> bool {
        matches!(self, StorageType::Text | StorageType::String | StorageType::Unicode)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub storage_type: StorageType,
    pub primary_key: bool,
}

impl Attribute {
    pub fn new(name: &str, storage_type: StorageType) -> Self {
        Attribute {
            name: name.to_string(),
            storage_type,
            primary_key: false,
        }
    }

    pub fn primary_key(name: &str, storage_type: StorageType) -> Self {
        Attribute {
            name: name.to_string(),
            storage_type,
            primary_key: true,
        }
    }
}

/// Declared shape of a data model, registered once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub searchable: Option<Vec<String>>,
    pub analyzer: Option<String>,
}

impl ModelDescriptor {
    pub fn new(name: &str) -> Self {
        ModelDescriptor {
            name: name.to_string(),
            attributes: Vec::new(),
            searchable: None,
            analyzer: None,
        }
    }

    pub fn add_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn add_primary_key(self, name: &str, storage_type: StorageType) -> Self {
        self.add_attribute(Attribute::primary_key(name, storage_type))
    }

    pub fn add_field(self, name: &str, storage_type: StorageType) -> Self {
        self.add_attribute(Attribute::new(name, storage_type))
    }

    pub fn searchable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_analyzer(mut self, analyzer: &str) -> Self {
        self.analyzer = Some(analyzer.to_string());
        self
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable.is_some()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The single primary-key attribute
    pub fn primary_key_attribute(&self) -> Result<&Attribute> {
        let mut keys = self.attributes.iter().filter(|a| a.primary_key);
        let first = keys.next().ok_or_else(|| {
            Error::config(format!("Model '{}' declares no primary key", self.name))
        })?;
        if keys.next().is_some() {
            return Err(Error::config(format!(
                "Model '{}' declares more than one primary key",
                self.name
            )));
        }
        Ok(first)
    }

    /// Searchable names in declaration order, duplicates collapsed
    pub fn searchable_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.searchable
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn check_name(&self) -> Result<()> {
        if MODEL_NAME.is_match(&self.name) {
            Ok(())
        } else {
            Err(Error::invalid_argument(format!(
                "Model name '{}' must match {}",
                self.name,
                MODEL_NAME.as_str()
            )))
        }
    }

    /// Everything schema derivation would reject, minus analyzer lookup
    pub fn validate(&self) -> Result<()> {
        self.check_name()?;
        self.primary_key_attribute()?;

        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(Error::config(format!(
                    "Model '{}' declares attribute '{}' twice",
                    self.name, attribute.name
                )));
            }
        }

        for name in self.searchable_names() {
            if self.attribute(name).is_none() {
                return Err(Error::config(format!(
                    "Model '{}' marks unknown attribute '{}' as searchable",
                    self.name, name
                )));
            }
        }
        Ok(())
    }
}
