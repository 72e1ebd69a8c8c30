//! 原始商品记录模型
//! 各数据源字段名、结构各不相同，统一装进有序的“原始字段包”，字段访问显式返回 Option

use serde_json::Value;

use crate::utils::{KeyNormalizer, NumericParser};

/// 原始字段值
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Nested(RawBag),
}

impl RawValue {
    /// 从 JSON 值转换
    /// 对象 -> 嵌套字段包；形如 [{name, value}] 的数组 -> 以 name 为键的嵌套字段包；
    /// 其余数组按下标展开
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Null),
            Value::String(s) => RawValue::Text(s.clone()),
            Value::Object(map) => {
                let mut bag = RawBag::new();
                for (k, v) in map {
                    bag.push(k.clone(), RawValue::from_json(v));
                }
                RawValue::Nested(bag)
            }
            Value::Array(items) => RawValue::Nested(RawBag::from_json_array(items)),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&RawBag> {
        match self {
            RawValue::Nested(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<RawBag> for RawValue {
    fn from(bag: RawBag) -> Self {
        RawValue::Nested(bag)
    }
}

/// 有序原始字段包（保留数据源给出的字段顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBag {
    entries: Vec<(String, RawValue)>,
}

impl RawBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式追加字段
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// 按原始字段名精确查找（首个匹配）
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// 按归一化字段名查找（首个匹配）
    pub fn get_normalized(&self, normalized_key: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(k, _)| KeyNormalizer::normalize(k) == normalized_key)
            .map(|(_, v)| v)
    }

    /// 读取非空文本字段
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(RawValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 读取数值字段（数值字符串也接受）
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(NumericParser::parse)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_json_array(items: &[Value]) -> Self {
        let mut bag = RawBag::new();
        for (idx, item) in items.iter().enumerate() {
            match Self::name_value_pair(item) {
                Some((name, value)) => bag.push(name, RawValue::from_json(value)),
                None => bag.push(idx.to_string(), RawValue::from_json(item)),
            }
        }
        bag
    }

    /// 识别 {"name": .., "value": ..} 形式的读数条目
    fn name_value_pair(item: &Value) -> Option<(String, &Value)> {
        let obj = item.as_object()?;
        let name = obj
            .get("name")
            .or_else(|| obj.get("compound_name"))
            .and_then(Value::as_str)?;
        let value = obj.get("value")?;
        Some((name.to_string(), value))
    }
}

/// 原始商品记录：数据源产出后不可变，不保证任何规范性
#[derive(Debug, Clone, PartialEq)]
pub struct RawProductRecord {
    /// 数据源标识
    pub source: String,
    /// 门店标识
    pub store: String,
    /// 数据源原始字段
    pub fields: RawBag,
}

impl RawProductRecord {
    pub fn new(source: impl Into<String>, store: impl Into<String>, fields: RawBag) -> Self {
        Self {
            source: source.into(),
            store: store.into(),
            fields,
        }
    }

    /// 从一条 JSON 商品对象构建（非对象输入得到空字段包）
    pub fn from_json(source: impl Into<String>, store: impl Into<String>, value: &Value) -> Self {
        let fields = match RawValue::from_json(value) {
            RawValue::Nested(bag) if value.is_object() => bag,
            _ => RawBag::new(),
        };
        Self::new(source, store, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_object_and_name_value_lists() {
        // 测试场景：[{name, value}] 列表展开为以名称为键的嵌套字段包
        let value = json!({
            "name": "Blue Dream",
            "terpenes": [
                {"name": "Limonene", "value": 0.8},
                {"name": "BetaPinene", "value": null}
            ],
            "price": "45.00"
        });
        let record = RawProductRecord::from_json("trulieve", "Camp Hill", &value);

        assert_eq!(record.fields.text("name"), Some("Blue Dream"));
        let terps = record.fields.get("terpenes").and_then(RawValue::as_nested).unwrap();
        assert_eq!(terps.get("Limonene"), Some(&RawValue::Number(0.8)));
        assert!(terps.get("BetaPinene").unwrap().is_null());
    }

    #[test]
    fn test_normalized_lookup() {
        let bag = RawBag::new().with("Brand_Name", "Cresco");
        assert_eq!(bag.get_normalized("brandname").and_then(RawValue::as_text), Some("Cresco"));
        assert!(bag.get("brand_name").is_none());
    }

    #[test]
    fn test_blank_text_is_absent() {
        let bag = RawBag::new().with("name", "   ");
        assert_eq!(bag.text("name"), None);
    }
}
