//! Layered key-value store backing configuration resolution.
//!
//! Every layer is a flat mapping from dotted keys (`misc.host`) to scalar
//! [`Value`]s. Layers are loaded in order into a [`Store`]; by default a later
//! layer overwrites earlier keys, but a layer may instead be applied through a
//! custom merge function that decides on its own which keys to write.
//!
//! The accumulated mapping is decoded into a typed structure through the
//! `config` crate, which handles the string/bool/integer conversions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use config::{ConfigError, Map, Source, ValueKind};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, SabnzbdError};

/// Separator between nesting levels of a key.
pub const KEY_DELIMITER: char = '.';

/// Scalar configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Value> for ValueKind {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ValueKind::String(s),
            Value::Integer(i) => ValueKind::I64(i),
            Value::Boolean(b) => ValueKind::Boolean(b),
        }
    }
}

/// Flat accumulated mapping handed to merge functions.
pub type Mapping = BTreeMap<String, Value>;

/// One source of configuration values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    entries: Mapping,
}

impl Layer {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layer from a JSON object, flattening nested objects into
    /// dotted keys. `null` entries are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use sabnzbd_exporter::config::store::{Layer, Value};
    /// use serde_json::json;
    ///
    /// let layer = Layer::from_json(&json!({"misc": {"port": 8080}})).unwrap();
    /// assert_eq!(layer.get("misc.port"), Some(&Value::Integer(8080)));
    /// ```
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            SabnzbdError::Parse(format!("expected a JSON object, found {}", value))
        })?;

        let mut layer = Self::new();
        flatten_json(&mut layer, None, object)?;
        Ok(layer)
    }

    /// Set `key` to `value`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Look up a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Look up a dotted key, coercing the value to its string form.
    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(Value::to_string)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Layer {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut layer = Self::new();
        for (key, value) in iter {
            layer.insert(key, value);
        }
        layer
    }
}

fn flatten_json(
    layer: &mut Layer,
    prefix: Option<&str>,
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in object {
        let key = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, KEY_DELIMITER, key),
            None => key.clone(),
        };

        match value {
            serde_json::Value::Null => {}
            serde_json::Value::Bool(b) => layer.insert(key, *b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => layer.insert(key, i),
                None => layer.insert(key, n.to_string()),
            },
            serde_json::Value::String(s) => layer.insert(key, s.as_str()),
            serde_json::Value::Object(nested) => flatten_json(layer, Some(&key), nested)?,
            serde_json::Value::Array(_) => {
                return Err(SabnzbdError::Parse(format!(
                    "unsupported list value for key '{}'",
                    key
                )))
            }
        }
    }
    Ok(())
}

/// Decodes raw bytes into a [`Layer`] and back.
pub trait Parser {
    /// Parse `bytes` into a layer.
    fn unmarshal(&self, bytes: &[u8]) -> Result<Layer>;

    /// Serialize a layer back into bytes.
    fn marshal(&self, layer: &Layer) -> Result<Vec<u8>>;
}

/// Ordered accumulation of configuration layers.
#[derive(Debug, Clone, Default)]
pub struct Store {
    values: Mapping,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `layer` into the store; its keys overwrite existing ones.
    pub fn load(&mut self, layer: Layer) {
        debug!(keys = layer.len(), "Merging configuration layer");
        self.values.extend(layer.entries);
    }

    /// Merge `layer` through a custom merge function.
    ///
    /// The function receives the new layer and the accumulated mapping and is
    /// the only writer for this layer: none of the layer's keys are copied
    /// over unless the function does so itself.
    pub fn load_with<F>(&mut self, layer: Layer, merge: F) -> Result<()>
    where
        F: FnOnce(&Layer, &mut Mapping) -> Result<()>,
    {
        debug!(keys = layer.len(), "Merging configuration layer with custom merge");
        merge(&layer, &mut self.values)
    }

    /// Read the file at `path`, parse it with `parser`, and merge it through
    /// `merge`.
    pub fn load_file<P, F>(&mut self, path: impl AsRef<Path>, parser: &P, merge: F) -> Result<()>
    where
        P: Parser,
        F: FnOnce(&Layer, &mut Mapping) -> Result<()>,
    {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SabnzbdError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let layer = parser.unmarshal(&bytes)?;
        self.load_with(layer, merge)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String form of `key`, or an empty string when it is not set.
    pub fn string(&self, key: &str) -> String {
        self.get(key).map(Value::to_string).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Decode the accumulated values into `T`.
    ///
    /// `defaults` are applied first and are overridden by any key present in
    /// the store. Keys `T` does not declare are ignored.
    pub fn decode<T, I, K>(&self, defaults: I) -> Result<T>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut builder = config::Config::builder();
        for (key, value) in defaults {
            builder = builder.set_default(key, config::Value::new(None, value))?;
        }

        let decoded = builder.add_source(self.clone()).build()?.try_deserialize()?;
        Ok(decoded)
    }
}

impl Source for Store {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<Map<String, config::Value>, ConfigError> {
        let origin = String::from("layered store");
        Ok(self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), config::Value::new(Some(&origin), value.clone())))
            .collect())
    }
}
