//! Storage codecs
//!
//! Values are stored as canonical text. Encoding formats the coerced value;
//! decoding dispatches on the attribute's current data type.

use serde_json::Value;

use super::types::DataType;
use super::validator::{canonical_number, display_string};

/// Text encoding of one data type's values
pub trait StorageCodec: Sync {
    fn encode(&self, value: &Value) -> String;
    fn decode(&self, text: &str) -> Value;
}

pub struct TextCodec;

impl StorageCodec for TextCodec {
    fn encode(&self, value: &Value) -> String {
        display_string(value)
    }

    fn decode(&self, text: &str) -> Value {
        Value::String(text.to_string())
    }
}

pub struct NumberCodec;

impl StorageCodec for NumberCodec {
    fn encode(&self, value: &Value) -> String {
        display_string(value)
    }

    /// Unparseable text decodes to null.
    fn decode(&self, text: &str) -> Value {
        text.trim()
            .parse::<f64>()
            .ok()
            .and_then(canonical_number)
            .unwrap_or(Value::Null)
    }
}

pub struct BooleanCodec;

impl StorageCodec for BooleanCodec {
    fn encode(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => b.to_string(),
            other => display_string(other),
        }
    }

    fn decode(&self, text: &str) -> Value {
        Value::Bool(text == "true" || text == "1")
    }
}

/// ENUM, DATE and DATETIME values are already canonical strings
pub struct PassthroughCodec;

impl StorageCodec for PassthroughCodec {
    fn encode(&self, value: &Value) -> String {
        display_string(value)
    }

    fn decode(&self, text: &str) -> Value {
        Value::String(text.to_string())
    }
}

/// Composite values (arrays, objects) stored as JSON text
pub struct StructuredCodec;

impl StorageCodec for StructuredCodec {
    fn encode(&self, value: &Value) -> String {
        value.to_string()
    }

    fn decode(&self, text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

pub fn codec_for(data_type: DataType) -> &'static dyn StorageCodec {
    match data_type {
        DataType::Text => &TextCodec,
        DataType::Number => &NumberCodec,
        DataType::Boolean => &BooleanCodec,
        DataType::Enum | DataType::Date | DataType::Datetime => &PassthroughCodec,
    }
}

/// Encodes a value for storage under `data_type`.
pub fn encode_value(data_type: DataType, value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => StructuredCodec.encode(value),
        _ => codec_for(data_type).encode(value),
    }
}

/// Decodes stored text under the attribute's current `data_type`.
pub fn decode_value(data_type: DataType, text: &str) -> Value {
    codec_for(data_type).decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_encoding() {
        assert_eq!(encode_value(DataType::Number, &json!(9)), "9");
        assert_eq!(encode_value(DataType::Number, &json!(9.25)), "9.25");
        assert_eq!(decode_value(DataType::Number, "9"), json!(9));
        assert_eq!(decode_value(DataType::Number, "9.25"), json!(9.25));
        assert_eq!(decode_value(DataType::Number, "Red"), Value::Null);
    }

    #[test]
    fn test_boolean_decoding() {
        assert_eq!(encode_value(DataType::Boolean, &json!(true)), "true");
        assert_eq!(decode_value(DataType::Boolean, "true"), json!(true));
        assert_eq!(decode_value(DataType::Boolean, "1"), json!(true));
        assert_eq!(decode_value(DataType::Boolean, "yes"), json!(false));
    }

    #[test]
    fn test_strings_pass_through() {
        for data_type in [DataType::Text, DataType::Enum, DataType::Date, DataType::Datetime] {
            assert_eq!(encode_value(data_type, &json!("2024-01-05")), "2024-01-05");
            assert_eq!(decode_value(data_type, "2024-01-05"), json!("2024-01-05"));
        }
    }

    #[test]
    fn test_composites_use_structured_codec() {
        assert_eq!(encode_value(DataType::Text, &json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
        assert_eq!(StructuredCodec.decode(r#"{"a":[1,2]}"#), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_decode_follows_current_type() {
        // Text stored under TEXT reads back as NUMBER after a type change
        let stored = encode_value(DataType::Text, &json!("42"));
        assert_eq!(decode_value(DataType::Number, &stored), json!(42));
    }
}
