//! By-name or by-function rules for reading and writing sub-fields of an item
//!
//! Every stage carries an optional input accessor (what `process_item` sees) and
//! an optional output accessor (how the result is written back). Absent
//! accessors are identity pass-through.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::item::Item;

type ReadFn<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;
type WriteFn<T> = Arc<dyn Fn(T, T) -> T + Send + Sync>;

/// Rule for reading the value a stage transforms
#[derive(Clone)]
pub enum InputAccessor<T> {
    /// Read the named field of the item
    ByName(String),
    /// Compute the value from the item
    ByFunction(ReadFn<T>),
}

impl<T> InputAccessor<T> {
    pub fn field(name: impl Into<String>) -> Self {
        InputAccessor::ByName(name.into())
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        InputAccessor::ByFunction(Arc::new(f))
    }
}

impl<T: Item> InputAccessor<T> {
    pub fn read(&self, item: &T) -> Result<T> {
        match self {
            InputAccessor::ByName(name) => item.get_field(name),
            InputAccessor::ByFunction(f) => Ok(f(item)),
        }
    }
}

impl<T> From<&str> for InputAccessor<T> {
    fn from(name: &str) -> Self {
        InputAccessor::ByName(name.to_string())
    }
}

impl<T> From<String> for InputAccessor<T> {
    fn from(name: String) -> Self {
        InputAccessor::ByName(name)
    }
}

impl<T> fmt::Debug for InputAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputAccessor::ByName(name) => write!(f, "ByName({:?})", name),
            InputAccessor::ByFunction(_) => write!(f, "ByFunction(..)"),
        }
    }
}

/// Rule for writing a stage result back into the originating item
#[derive(Clone)]
pub enum OutputAccessor<T> {
    /// Store the result in the named field and re-emit the original item
    ByName(String),
    /// Build the emitted item from `(original, result)`
    ByFunction(WriteFn<T>),
}

impl<T: 'static> OutputAccessor<T> {
    pub fn field(name: impl Into<String>) -> Self {
        OutputAccessor::ByName(name.into())
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        OutputAccessor::ByFunction(Arc::new(f))
    }

    /// Enrich the original item in place and re-emit it
    pub fn in_place<F>(f: F) -> Self
    where
        F: Fn(&mut T, T) + Send + Sync + 'static,
    {
        OutputAccessor::ByFunction(Arc::new(move |mut original, result| {
            f(&mut original, result);
            original
        }))
    }
}

impl<T: Item> OutputAccessor<T> {
    pub fn write(&self, mut original: T, result: T) -> Result<T> {
        match self {
            OutputAccessor::ByName(name) => {
                original.set_field(name, result)?;
                Ok(original)
            }
            OutputAccessor::ByFunction(f) => Ok(f(original, result)),
        }
    }
}

impl<T> From<&str> for OutputAccessor<T> {
    fn from(name: &str) -> Self {
        OutputAccessor::ByName(name.to_string())
    }
}

impl<T> From<String> for OutputAccessor<T> {
    fn from(name: String) -> Self {
        OutputAccessor::ByName(name)
    }
}

impl<T> fmt::Debug for OutputAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputAccessor::ByName(name) => write!(f, "ByName({:?})", name),
            OutputAccessor::ByFunction(_) => write!(f, "ByFunction(..)"),
        }
    }
}

/// Value a stage should transform: the accessor's reading, or the item itself
pub fn extract<T: Item>(accessor: Option<&InputAccessor<T>>, item: &T) -> Result<T> {
    match accessor {
        Some(a) => a.read(item),
        None => Ok(item.clone()),
    }
}

/// Item a stage should emit: the accessor's write-back, or the result itself
pub fn inject<T: Item>(accessor: Option<&OutputAccessor<T>>, original: T, result: T) -> Result<T> {
    match accessor {
        Some(a) => a.write(original, result),
        None => Ok(result),
    }
}

/// Name and accessors carried by every stage
#[derive(Clone)]
pub struct StageOptions<T> {
    pub name: String,
    pub input: Option<InputAccessor<T>>,
    pub output: Option<OutputAccessor<T>>,
}

impl<T> StageOptions<T> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: None,
            output: None,
        }
    }
}

impl<T> fmt::Debug for StageOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageOptions")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

/// Builder methods shared by all stages that own `StageOptions`
pub trait StageBuilder<T>: Sized {
    fn options_mut(&mut self) -> &mut StageOptions<T>;

    fn named(mut self, name: impl Into<String>) -> Self {
        self.options_mut().name = name.into();
        self
    }

    fn input(mut self, accessor: impl Into<InputAccessor<T>>) -> Self {
        self.options_mut().input = Some(accessor.into());
        self
    }

    fn output(mut self, accessor: impl Into<OutputAccessor<T>>) -> Self {
        self.options_mut().output = Some(accessor.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_extract_by_name_and_function() {
        let item = json!({"text": "abc", "n": 2});
        let by_name = InputAccessor::<Value>::from("text");
        let by_fn = InputAccessor::<Value>::func(|v| v["n"].clone());

        assert_eq!(extract(Some(&by_name), &item).unwrap(), json!("abc"));
        assert_eq!(extract(Some(&by_fn), &item).unwrap(), json!(2));
        assert_eq!(extract(None, &item).unwrap(), item);
    }

    #[test]
    fn test_inject_by_name_reemits_original() {
        let out = OutputAccessor::<Value>::from("embedding");
        let ret = inject(Some(&out), json!({"text": "abc"}), json!([0.1, 0.2])).unwrap();
        assert_eq!(ret, json!({"text": "abc", "embedding": [0.1, 0.2]}));
    }

    #[test]
    fn test_inject_by_function() {
        let out = OutputAccessor::<Value>::func(|orig, r| json!({"i": orig["i"], "l": r}));
        let ret = inject(Some(&out), json!({"i": 3, "l": [1, 2]}), json!(1)).unwrap();
        assert_eq!(ret, json!({"i": 3, "l": 1}));
    }

    #[test]
    fn test_inject_in_place() {
        let out = OutputAccessor::<Value>::in_place(|orig, r| {
            orig["count"] = r;
        });
        let ret = inject(Some(&out), json!({"id": 1}), json!(7)).unwrap();
        assert_eq!(ret, json!({"id": 1, "count": 7}));
    }

    #[test]
    fn test_inject_identity() {
        assert_eq!(inject(None, json!(1), json!(2)).unwrap(), json!(2));
    }

    #[test]
    fn test_by_name_on_scalar_fails() {
        let acc = InputAccessor::<Value>::from("x");
        assert!(extract(Some(&acc), &json!(1)).is_err());
        let out = OutputAccessor::<Value>::from("x");
        assert!(inject(Some(&out), json!(1), json!(2)).is_err());
    }

    #[test]
    fn test_accessor_debug() {
        assert_eq!(
            format!("{:?}", InputAccessor::<Value>::from("a")),
            "ByName(\"a\")"
        );
        assert_eq!(
            format!("{:?}", OutputAccessor::<Value>::func(|_, r| r)),
            "ByFunction(..)"
        );
    }
}
