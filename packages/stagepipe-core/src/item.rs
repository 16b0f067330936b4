//! Item model shared by every stage
//!
//! A pipeline moves values of one item type `T: Item` between stages. Sub-values
//! read or written by accessors are items too, so a stage can extract a field,
//! transform it and inject the result back into the original record.

use std::fmt::Debug;

use serde_json::Value;

use crate::error::{PipelineError, Result};

/// Minimal record capability required by accessors and collection-aware stages
pub trait Item: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Read a sub-field by name
    fn get_field(&self, name: &str) -> Result<Self>;

    /// Write a sub-field by name
    fn set_field(&mut self, name: &str, value: Self) -> Result<()>;

    /// Split a collection item into its elements; non-collections are returned unchanged
    fn into_elements(self) -> std::result::Result<Vec<Self>, Self>;

    /// Pack a list of items into one collection item
    fn from_elements(items: Vec<Self>) -> Self;

    /// Textual storage key of a scalar item
    fn to_key(&self) -> Result<String>;

    /// Render a log template; `{item}` stands for the whole item
    fn render(&self, template: &str) -> String {
        template.replace("{item}", &format!("{:?}", self))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Item for Value {
    fn get_field(&self, name: &str) -> Result<Self> {
        match self {
            Value::Object(map) => map
                .get(name)
                .cloned()
                .ok_or_else(|| PipelineError::FieldNotFound(name.to_string())),
            Value::Array(items) => name
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx).cloned())
                .ok_or_else(|| PipelineError::FieldNotFound(name.to_string())),
            other => Err(PipelineError::AccessorType(format!(
                "cannot read field '{}' from {} item",
                name,
                kind_of(other)
            ))),
        }
    }

    fn set_field(&mut self, name: &str, value: Self) -> Result<()> {
        match self {
            Value::Object(map) => {
                map.insert(name.to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                let slot = name
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| items.get_mut(idx))
                    .ok_or_else(|| PipelineError::FieldNotFound(name.to_string()))?;
                *slot = value;
                Ok(())
            }
            other => Err(PipelineError::AccessorType(format!(
                "cannot write field '{}' into {} item",
                name,
                kind_of(other)
            ))),
        }
    }

    fn into_elements(self) -> std::result::Result<Vec<Self>, Self> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(other),
        }
    }

    fn from_elements(items: Vec<Self>) -> Self {
        Value::Array(items)
    }

    fn to_key(&self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(PipelineError::AccessorType(format!(
                "{} item cannot be used as a key",
                kind_of(other)
            ))),
        }
    }

    fn render(&self, template: &str) -> String {
        match self {
            Value::Object(map) => map
                .iter()
                .fold(template.to_string(), |acc, (k, v)| {
                    let text = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    acc.replace(&format!("{{{}}}", k), &text)
                })
                .replace("{item}", &self.to_string()),
            Value::String(s) => template.replace("{item}", s),
            other => template.replace("{item}", &other.to_string()),
        }
    }
}
