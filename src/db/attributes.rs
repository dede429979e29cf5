//! DynamoDB attribute conversion
//!
//! Turns the store's typed attribute encoding into plain JSON values so dumps
//! can be read by tools that know nothing about DynamoDB.

use aws_sdk_dynamodb::types::AttributeValue;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Number, Value};
use std::collections::HashMap;

use super::models::PlainItem;

/// Convert a typed DynamoDB item into a plain attribute mapping
pub fn item_to_plain(item: &HashMap<String, AttributeValue>) -> PlainItem {
    let mut keys: Vec<&String> = item.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|k| (k.clone(), attribute_to_json(&item[k])))
        .collect()
}

/// Convert a single typed attribute value into JSON.
///
/// Numbers keep integer form when they fit and are dumped as strings when an
/// f64 cannot hold them exactly. Binary values become base64 strings.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::B(blob) => Value::String(STANDARD.encode(blob.as_ref())),
        AttributeValue::L(list) => Value::Array(list.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => Value::Object(item_to_plain(map)),
        AttributeValue::Ss(set) => Value::Array(set.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(set) => Value::Array(set.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::Bs(set) => Value::Array(
            set.iter()
                .map(|blob| Value::String(STANDARD.encode(blob.as_ref())))
                .collect(),
        ),
        other => {
            tracing::warn!(attribute = ?other, "Unknown attribute type, dumping as null");
            Value::Null
        }
    }
}

fn number_to_json(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Value::Number(u.into());
    }
    // Only numbers that survive the f64 round trip digit for digit become
    // JSON numbers; everything else keeps its exact text
    n.parse::<f64>()
        .ok()
        .filter(|f| f.to_string() == n)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::Blob;
    use serde_json::json;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(attribute_to_json(&AttributeValue::S("x".into())), json!("x"));
        assert_eq!(attribute_to_json(&AttributeValue::N("42".into())), json!(42));
        assert_eq!(attribute_to_json(&AttributeValue::N("-1.5".into())), json!(-1.5));
        assert_eq!(attribute_to_json(&AttributeValue::Bool(true)), json!(true));
        assert_eq!(attribute_to_json(&AttributeValue::Null(true)), Value::Null);
    }

    #[test]
    fn test_huge_number_kept_as_text() {
        let n = "1e400";
        assert_eq!(attribute_to_json(&AttributeValue::N(n.into())), json!("1e400"));
    }

    #[test]
    fn test_high_precision_numbers_keep_every_digit() {
        let integer = "12345678901234567890123456789";
        assert_eq!(attribute_to_json(&AttributeValue::N(integer.into())), json!(integer));

        let decimal = "0.1000000000000000055511151231257827";
        assert_eq!(attribute_to_json(&AttributeValue::N(decimal.into())), json!(decimal));

        let set = AttributeValue::Ns(vec![integer.into(), "7".into()]);
        assert_eq!(attribute_to_json(&set), json!([integer, 7]));
    }

    #[test]
    fn test_exact_decimals_stay_numbers() {
        assert_eq!(attribute_to_json(&AttributeValue::N("0.25".into())), json!(0.25));
        assert_eq!(
            attribute_to_json(&AttributeValue::N("18446744073709551615".into())),
            json!(u64::MAX)
        );
    }

    #[test]
    fn test_binary_is_base64() {
        let blob = AttributeValue::B(Blob::new(b"hi".to_vec()));
        assert_eq!(attribute_to_json(&blob), json!("aGk="));
    }

    #[test]
    fn test_nested_item() {
        let item = HashMap::from([
            ("pk".to_string(), AttributeValue::S("PROJECT#acme".into())),
            ("tags".to_string(), AttributeValue::Ss(vec!["a".into(), "b".into()])),
            (
                "meta".to_string(),
                AttributeValue::M(HashMap::from([(
                    "sizes".to_string(),
                    AttributeValue::L(vec![AttributeValue::N("1".into()), AttributeValue::N("2".into())]),
                )])),
            ),
        ]);

        let plain = item_to_plain(&item);
        assert_eq!(
            Value::Object(plain),
            json!({
                "meta": {"sizes": [1, 2]},
                "pk": "PROJECT#acme",
                "tags": ["a", "b"],
            })
        );
    }
}
