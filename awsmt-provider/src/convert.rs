//! Helpers for moving values between attribute maps and SDK shapes

use std::collections::HashMap;

use aws_sdk_mediatailor::error::BuildError;
use aws_sdk_mediatailor::primitives::DateTime;
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::Value;

pub type Attributes = HashMap<String, Value>;

pub fn get_str<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a str> {
    attrs.get(key).and_then(Value::as_str)
}

/// Integer attribute narrowed to the i32 the API uses
pub fn get_i32(attrs: &Attributes, key: &str) -> ProviderResult<Option<i32>> {
    attrs
        .get(key)
        .and_then(Value::as_int)
        .map(|n| {
            i32::try_from(n).map_err(|_| {
                ProviderError::new(format!("Attribute '{}' is out of range: {}", key, n))
            })
        })
        .transpose()
}

pub fn get_bool(attrs: &Attributes, key: &str) -> Option<bool> {
    attrs.get(key).and_then(Value::as_bool)
}

/// Single nested block
pub fn get_block<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a Attributes> {
    attrs.get(key).and_then(Value::as_map)
}

/// Repeated nested blocks
pub fn get_blocks<'a>(attrs: &'a Attributes, key: &str) -> Vec<&'a Attributes> {
    attrs
        .get(key)
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_map).collect())
        .unwrap_or_default()
}

/// List of strings; `None` when the attribute is absent
pub fn get_string_list(attrs: &Attributes, key: &str) -> Option<Vec<String>> {
    attrs.get(key).and_then(Value::as_list).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect()
    })
}

/// Map of strings; non-string values are dropped
pub fn to_string_map(value: &Value) -> HashMap<String, String> {
    value
        .as_map()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

pub fn string_map_value(map: &HashMap<String, String>) -> Value {
    Value::Map(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::string(v)))
            .collect(),
    )
}

pub fn insert_str(attrs: &mut Attributes, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        attrs.insert(key.to_string(), Value::string(v));
    }
}

pub fn insert_int(attrs: &mut Attributes, key: &str, value: Option<i32>) {
    if let Some(v) = value {
        attrs.insert(key.to_string(), Value::Int(v as i64));
    }
}

/// Insert a nested block unless it is empty
pub fn insert_block(attrs: &mut Attributes, key: &str, block: Attributes) {
    if !block.is_empty() {
        attrs.insert(key.to_string(), Value::Map(block));
    }
}

/// RFC 3339 rendering of an API timestamp
pub fn datetime_value(value: Option<&DateTime>) -> Option<Value> {
    let dt = value?;
    chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
        .map(|t| Value::string(t.to_rfc3339()))
}

pub fn insert_datetime(attrs: &mut Attributes, key: &str, value: Option<&DateTime>) {
    if let Some(v) = datetime_value(value) {
        attrs.insert(key.to_string(), v);
    }
}

/// Error for an SDK shape that could not be built from the plan
pub fn build_error(what: &str, err: BuildError) -> ProviderError {
    ProviderError::new(format!("Invalid {}: {}", what, err)).with_cause(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_i32_rejects_overflow() {
        let mut attrs = Attributes::new();
        attrs.insert("small".to_string(), Value::Int(30));
        attrs.insert("huge".to_string(), Value::Int(i64::MAX));
        assert_eq!(get_i32(&attrs, "small").unwrap(), Some(30));
        assert_eq!(get_i32(&attrs, "missing").unwrap(), None);
        let err = get_i32(&attrs, "huge").unwrap_err();
        assert!(err.to_string().contains("Attribute 'huge' is out of range"));
    }

    #[test]
    fn blocks_skip_non_maps() {
        let mut block = Attributes::new();
        block.insert("name".to_string(), Value::string("a"));
        let mut attrs = Attributes::new();
        attrs.insert(
            "items".to_string(),
            Value::List(vec![Value::Map(block), Value::string("junk")]),
        );
        assert_eq!(get_blocks(&attrs, "items").len(), 1);
        assert!(get_blocks(&attrs, "missing").is_empty());
    }

    #[test]
    fn string_map_round_trip() {
        let mut tags = HashMap::new();
        tags.insert("env".to_string(), "prod".to_string());
        assert_eq!(to_string_map(&string_map_value(&tags)), tags);
    }

    #[test]
    fn empty_blocks_are_not_inserted() {
        let mut attrs = Attributes::new();
        insert_block(&mut attrs, "bumper", Attributes::new());
        insert_str(&mut attrs, "slate_ad_url", None);
        assert!(attrs.is_empty());
    }

    #[test]
    fn datetime_renders_rfc3339() {
        let dt = DateTime::from_secs(1_700_000_000);
        assert_eq!(
            datetime_value(Some(&dt)),
            Some(Value::string("2023-11-14T22:13:20+00:00"))
        );
    }
}
