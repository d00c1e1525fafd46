//! `Parameters`：feature 构造期使用的“名字 -> 值”配置表。
//!
//! 值一律以字符串保存，读取时再按需要的类型解析；解析失败/缺失都会变成 `DocentError`。

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{DocentError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// builder 风格设置一个值。
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// 读取并解析；不存在时返回 `Ok(None)`。
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = self.raw(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DocentError::invalid(key, raw, e.to_string()))
    }

    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn require<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(key)?.ok_or_else(|| DocentError::MissingParameter {
            key: key.to_string(),
        })
    }

    /// 逗号分隔的列表（空项会被忽略）。
    pub fn list(&self, key: &str) -> Vec<String> {
        self.raw(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let params = Parameters::new().with("max-order", 3).with("smoothing-floor", "0.5");
        assert_eq!(params.get::<usize>("max-order").unwrap(), Some(3));
        assert_eq!(params.get_or::<f64>("smoothing-floor", 0.1).unwrap(), 0.5);
        assert_eq!(params.get_or::<usize>("absent", 7).unwrap(), 7);
    }

    #[test]
    fn ill_typed_value_is_an_error() {
        let params = Parameters::new().with("max-order", "four");
        let err = params.get::<usize>("max-order").unwrap_err();
        assert!(matches!(err, DocentError::InvalidParameter { ref key, .. } if key == "max-order"));
    }

    #[test]
    fn missing_required_value() {
        let err = Parameters::new().require::<String>("lm-file").unwrap_err();
        assert!(matches!(err, DocentError::MissingParameter { .. }));
    }

    #[test]
    fn comma_separated_list() {
        let params = Parameters::new().with("reference-file", "ref.0, ref.1,,");
        assert_eq!(params.list("reference-file"), vec!["ref.0", "ref.1"]);
        assert!(params.list("other").is_empty());
    }
}
