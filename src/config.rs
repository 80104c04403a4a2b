//! Parameter sources.
//!
//! Parameters are usually registered one by one, but deployments often
//! keep them in the environment. A [`ParamSource`] lists keys and values
//! that [`Container::load_params`](crate::Container::load_params) turns
//! into value parameters.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::sync::Arc;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::provider::Object;
use crate::{DiError, DiResult};

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Parses a raw string as an integer, float or bool, else keeps it.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(float_val) = raw.parse::<f64>() {
            ConfigValue::Float(float_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    pub fn as_str(&self) -> DiResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            _ => Err(DiError::TypeMismatch("config string")),
        }
    }

    pub fn as_i64(&self) -> DiResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            _ => Err(DiError::TypeMismatch("config integer")),
        }
    }

    pub fn as_bool(&self) -> DiResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            _ => Err(DiError::TypeMismatch("config boolean")),
        }
    }

    /// Converts into the object stored as the parameter value.
    ///
    /// Scalars become `String`, `i64`, `f64` or `bool`; arrays and objects
    /// stay `ConfigValue`.
    pub fn into_object(self) -> Object {
        match self {
            ConfigValue::String(s) => Arc::new(s),
            ConfigValue::Integer(i) => Arc::new(i),
            ConfigValue::Float(f) => Arc::new(f),
            ConfigValue::Boolean(b) => Arc::new(b),
            other => Arc::new(other),
        }
    }
}

/// Trait for parameter sources
pub trait ParamSource: Send + Sync + std::fmt::Debug {
    /// Get a value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable parameter source
///
/// Keys are lowercased variable names with the prefix and its underscore
/// stripped, so `APP_DB_HOST` becomes `db_host` under prefix `APP`.
#[derive(Debug, Default)]
pub struct EnvironmentParamSource {
    prefix: Option<String>,
}

impl EnvironmentParamSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ParamSource for EnvironmentParamSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| ConfigValue::parse(&value))
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let head = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&head).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect();
        keys.sort();
        keys
    }
}

/// In-memory parameter source.
#[derive(Debug, Default, Clone)]
pub struct MapParamSource {
    values: BTreeMap<String, ConfigValue>,
}

impl MapParamSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }

    /// Parses a JSON object into a source. Nested objects are kept whole.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let values: BTreeMap<String, ConfigValue> = serde_json::from_str(json)
            .map_err(|e| DiError::msg(format!("invalid parameter json: {}", e)))?;
        Ok(Self { values })
    }
}

impl ParamSource for MapParamSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}
