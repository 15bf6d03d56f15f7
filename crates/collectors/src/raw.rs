//! 原始 JSON 记录的反序列化辅助
//!
//! 各数据源的原始对象用带 `#[serde(default)]` 的结构体描述。可选字段缺失、为 null
//! 或为空白时统一规范化为空字符串，避免 `null` 与 `""` 被当成不同的键；只有自然键字段
//! 通过 [`required`] 检查是否为空。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

/// 原始记录无法映射为行的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmappable {
    /// 计算自然键所需的字段缺失或为空白
    MissingField(&'static str),
    /// 字段类型与预期不符
    Malformed(String),
}

impl fmt::Display for Unmappable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unmappable::MissingField(field) => write!(f, "缺少字段 {field}"),
            Unmappable::Malformed(reason) => write!(f, "格式错误: {reason}"),
        }
    }
}

/// 把原始记录反序列化为对应的结构体
pub fn decode<T: DeserializeOwned>(item: &Value) -> Result<T, Unmappable> {
    T::deserialize(item).map_err(|e| Unmappable::Malformed(e.to_string()))
}

/// 自然键字段为空时返回 [`Unmappable::MissingField`]
pub fn required(value: &str, field: &'static str) -> Result<String, Unmappable> {
    if value.is_empty() {
        Err(Unmappable::MissingField(field))
    } else {
        Ok(value.to_string())
    }
}

/// 字符串字段：null 视为缺失，首尾空白去掉
pub fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

/// null 视为缺失，取默认值
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339 时间；无法解析时为 None
pub fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

/// AWS 风格标签 `[{"Key": "Name", "Value": "..."}]`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Tag {
    #[serde(deserialize_with = "trimmed")]
    pub key: String,
    #[serde(deserialize_with = "trimmed")]
    pub value: String,
}

pub fn tag(tags: &[Tag], key: &str) -> String {
    tags.iter()
        .find(|t| t.key == key)
        .map(|t| t.value.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Meta {
        #[serde(deserialize_with = "trimmed")]
        name: String,
        #[serde(deserialize_with = "trimmed")]
        namespace: String,
        #[serde(rename = "Tags", deserialize_with = "nullable")]
        tags: Vec<Tag>,
        #[serde(rename = "LaunchTime", deserialize_with = "lenient_timestamp")]
        launch_time: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_absent_and_blank_fields_normalize_equal() {
        let a: Meta = decode(&json!({"name": "dev"})).unwrap();
        let b: Meta = decode(&json!({"name": "dev", "namespace": null})).unwrap();
        let c: Meta = decode(&json!({"name": " dev ", "namespace": "  "})).unwrap();
        assert_eq!(a.namespace, b.namespace);
        assert_eq!(b.namespace, c.namespace);
        assert_eq!(c.name, "dev");
    }

    #[test]
    fn test_required_field() {
        let meta: Meta = decode(&json!({"name": "dev"})).unwrap();
        assert_eq!(required(&meta.name, "name").unwrap(), "dev");
        assert_eq!(
            required(&meta.namespace, "namespace").unwrap_err(),
            Unmappable::MissingField("namespace")
        );
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let err = decode::<Meta>(&json!({"name": 42})).unwrap_err();
        assert!(matches!(err, Unmappable::Malformed(_)));
    }

    #[test]
    fn test_tags_and_timestamps() {
        let meta: Meta = decode(&json!({
            "Tags": [{"Key": "env", "Value": "prod"}, {"Key": "Name", "Value": "main"}],
            "LaunchTime": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(tag(&meta.tags, "Name"), "main");
        assert_eq!(tag(&meta.tags, "team"), "");
        assert_eq!(meta.launch_time.unwrap().timestamp(), 1_714_557_600);

        let meta: Meta = decode(&json!({"Tags": null, "LaunchTime": "yesterday"})).unwrap();
        assert!(meta.tags.is_empty());
        assert!(meta.launch_time.is_none());
    }
}
