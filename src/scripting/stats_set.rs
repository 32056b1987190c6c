use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing parameter '{0}'")]
    Missing(String),
    #[error("parameter '{key}' has invalid value '{value}'")]
    Invalid { key: String, value: String },
}

/// Named handler parameters as they appear in data files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StatsSet {
    values: BTreeMap<String, Value>,
}

impl StatsSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get_int(&self, key: &str) -> Result<i32, ParamError> {
        let value = self.require(key)?;
        match value {
            Value::Number(number) => number
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| invalid(key, value)),
            Value::String(text) => text.trim().parse::<i32>().map_err(|_| invalid(key, value)),
            _ => Err(invalid(key, value)),
        }
    }

    pub fn get_int_or(&self, key: &str, default: i32) -> Result<i32, ParamError> {
        if self.contains(key) {
            self.get_int(key)
        } else {
            Ok(default)
        }
    }

    pub fn get_double(&self, key: &str) -> Result<f64, ParamError> {
        let value = self.require(key)?;
        match value {
            Value::Number(number) => number.as_f64().ok_or_else(|| invalid(key, value)),
            Value::String(text) => text.trim().parse::<f64>().map_err(|_| invalid(key, value)),
            _ => Err(invalid(key, value)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<String, ParamError> {
        let value = self.require(key)?;
        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(flag.to_string()),
            _ => Err(invalid(key, value)),
        }
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String, ParamError> {
        if self.contains(key) {
            self.get_string(key)
        } else {
            Ok(default.to_string())
        }
    }

    /// Reads either a `;`-separated string or a sequence of enum names.
    pub fn get_enum_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ParamError> {
        let value = self.require(key)?;
        let names: Vec<String> = match value {
            Value::String(text) => text
                .split(';')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            Value::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text.trim().to_string()),
                    _ => Err(invalid(key, item)),
                })
                .collect::<Result<_, _>>()?,
            _ => return Err(invalid(key, value)),
        };
        names
            .into_iter()
            .map(|name| {
                serde_yaml::from_value(Value::String(name.clone())).map_err(|_| {
                    ParamError::Invalid {
                        key: key.to_string(),
                        value: name,
                    }
                })
            })
            .collect()
    }

    fn require(&self, key: &str) -> Result<&Value, ParamError> {
        self.values
            .get(key)
            .ok_or_else(|| ParamError::Missing(key.to_string()))
    }
}

fn invalid(key: &str, value: &Value) -> ParamError {
    let rendered = serde_yaml::to_string(value)
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|_| "?".to_string());
    ParamError::Invalid {
        key: key.to_string(),
        value: rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::abnormal::AbnormalType;

    #[test]
    fn reads_numbers_from_numbers_and_strings() {
        let set = StatsSet::new().with("minLevel", 40).with("maxLevel", "76");
        assert_eq!(set.get_int("minLevel"), Ok(40));
        assert_eq!(set.get_int("maxLevel"), Ok(76));
        assert_eq!(set.get_int_or("time", -1), Ok(-1));
    }

    #[test]
    fn missing_and_invalid_keys_are_reported() {
        let set = StatsSet::new().with("amount", "lots");
        assert_eq!(
            set.get_int("magicType"),
            Err(ParamError::Missing("magicType".to_string()))
        );
        assert!(matches!(set.get_double("amount"), Err(ParamError::Invalid { .. })));
    }

    #[test]
    fn enum_lists_accept_both_forms() {
        let joined = StatsSet::new().with("slot", "PA_UP;MA_UP");
        let list: Vec<AbnormalType> = joined.get_enum_list("slot").expect("list");
        assert_eq!(list, vec![AbnormalType::PaUp, AbnormalType::MaUp]);

        let set: StatsSet = serde_yaml::from_str("slot: [STUN, ROOT]").expect("parse");
        let list: Vec<AbnormalType> = set.get_enum_list("slot").expect("list");
        assert_eq!(list, vec![AbnormalType::Stun, AbnormalType::Root]);

        let bad = StatsSet::new().with("slot", "PA_UP;BOGUS");
        assert!(bad.get_enum_list::<AbnormalType>("slot").is_err());
    }
}
