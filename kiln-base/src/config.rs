use std::collections::BTreeMap;
use std::path::Path;

use kiln::ResolverConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::StdError;

/// Named configuration sections, each an arbitrary JSON value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub(crate) configs: BTreeMap<String, serde_json::Value>,
}

/// A typed view of one configuration section.
pub trait ConfigSection: DeserializeOwned {
    fn key() -> &'static str;
}

impl ConfigSection for ResolverConfig {
    fn key() -> &'static str {
        "resolver"
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads section `name`; an absent section reads as `null`.
    pub fn get<T>(&self, name: impl AsRef<str>) -> Result<T, StdError>
    where
        T: DeserializeOwned,
    {
        let name = name.as_ref();
        let value = self.configs.get(name).cloned().unwrap_or_default();
        serde_json::from_value(value).map_err(|err| format!("config section {name}: {err}").into())
    }

    /// Reads a typed section, falling back to its default when absent.
    pub fn section<T>(&self) -> Result<T, StdError>
    where
        T: ConfigSection + Default,
    {
        Ok(self.get::<Option<T>>(T::key())?.unwrap_or_default())
    }

    pub fn set<T>(&mut self, name: impl Into<String>, value: T) -> Result<(), StdError>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(value)?;
        self.configs.insert(name.into(), value);
        Ok(())
    }

    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Result<Self, StdError>
    where
        T: Serialize,
    {
        self.set(name, value)?;
        Ok(self)
    }

    /// Layers `other` over this config: objects merge key by key, arrays
    /// are appended, anything else is replaced.
    pub fn merge_from(&mut self, other: Self) {
        for (name, value) in other.configs {
            merge_value(self.configs.entry(name).or_default(), value);
        }
    }

    pub fn parse(text: impl AsRef<str>) -> Result<Self, StdError> {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
        Self::parse(text)
    }

    /// Parses each file in order, later files overriding earlier ones.
    pub fn load<I>(paths: I) -> Result<Self, StdError>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let mut config = Self::new();
        for path in paths {
            config.merge_from(Self::parse_file(path)?);
        }
        Ok(config)
    }

    /// Check if the config is empty
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Get the number of config entries
    pub fn len(&self) -> usize {
        self.configs.len()
    }
}

fn merge_value(lhs: &mut serde_json::Value, rhs: serde_json::Value) {
    use serde_json::Value;

    match (lhs, rhs) {
        (Value::Object(lhs), Value::Object(rhs)) => {
            for (name, value) in rhs {
                merge_value(lhs.entry(name).or_insert(Value::Null), value);
            }
        }
        (Value::Array(lhs), Value::Array(rhs)) => lhs.extend(rhs),
        (lhs, rhs) => *lhs = rhs,
    }
}
