//! JSON <-> HostValue conversion

use crate::bridge::{HostKind, HostView};
use crate::error::*;
use crate::types::*;
use serde_json::{Map, Number, Value as JsonValue};

/// Convert JSON value to HostValue
pub fn from_json(json: &JsonValue) -> HostValue {
    match json {
        JsonValue::Null => HostValue::Null,
        JsonValue::Bool(b) => HostValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                HostValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                HostValue::UInt(u)
            } else {
                HostValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => HostValue::Str(s.clone()),
        JsonValue::Array(arr) => HostValue::List(arr.iter().map(from_json).collect()),
        JsonValue::Object(obj) => {
            let entries: Vec<HostEntry> = obj
                .iter()
                .map(|(k, v)| HostEntry::new(k.clone(), from_json(v)))
                .collect();
            HostValue::Map(entries)
        }
    }
}

/// Convert HostValue to JSON value.
///
/// Duplicate map keys collapse to the last value.
pub fn to_json(hv: &HostValue) -> JsonValue {
    match hv {
        HostValue::Null => JsonValue::Null,
        HostValue::Bool(b) => JsonValue::Bool(*b),
        HostValue::Int(n) => JsonValue::Number(Number::from(*n)),
        HostValue::UInt(n) => JsonValue::Number(Number::from(*n)),
        HostValue::Float32(f) => f
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        HostValue::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        HostValue::Str(s) => JsonValue::String(s.clone()),
        HostValue::Bytes(data) => {
            use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
            JsonValue::String(BASE64.encode(data))
        }
        HostValue::Time(t) => JsonValue::String(t.to_rfc3339()),
        HostValue::List(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        HostValue::Map(entries) => {
            let mut map = Map::new();
            for entry in entries {
                map.insert(entry.key.clone(), to_json(&entry.value));
            }
            JsonValue::Object(map)
        }
    }
}

/// Parse JSON string to HostValue
pub fn parse_json(json_str: &str) -> Result<HostValue> {
    let json: JsonValue = serde_json::from_str(json_str)?;
    Ok(from_json(&json))
}

/// JSON documents encode directly, without an intermediate `HostValue`
impl HostView for JsonValue {
    fn view(&self) -> HostKind<'_, Self> {
        match self {
            JsonValue::Null => HostKind::Null,
            JsonValue::Bool(b) => HostKind::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    HostKind::Int(i)
                } else if let Some(u) = n.as_u64() {
                    HostKind::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    HostKind::Float64(f)
                } else {
                    HostKind::Unsupported("number")
                }
            }
            JsonValue::String(s) => HostKind::Str(s),
            JsonValue::Array(items) => HostKind::Seq(Box::new(items.iter())),
            JsonValue::Object(obj) => HostKind::Map(Box::new(obj.iter().map(|(k, v)| (k.as_str(), v)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{decode, encode};
    use crate::memory::MemoryEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_json_null() {
        let hv = from_json(&json!(null));
        assert!(hv.is_null());
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(from_json(&json!(42)).as_int(), Some(42));
        assert_eq!(from_json(&json!(-7)), HostValue::Int(-7));
        assert_eq!(from_json(&json!(u64::MAX)), HostValue::UInt(u64::MAX));
        assert_eq!(from_json(&json!(3.5)), HostValue::Float(3.5));
    }

    #[test]
    fn test_from_json_object_keeps_order() {
        let hv = from_json(&json!({"b": 1, "a": 2}));
        assert_eq!(hv.keys(), vec!["b", "a"]);
    }

    #[test]
    fn test_to_json_unrepresentable() {
        assert_eq!(to_json(&HostValue::Bytes(vec![1, 2, 3])), json!("AQID"));
        assert_eq!(to_json(&HostValue::float(f64::NAN)), JsonValue::Null);
        assert_eq!(to_json(&HostValue::float32(0.1)), json!(0.1));
    }

    #[test]
    fn test_roundtrip() {
        let original = json!({
            "name": "Alice",
            "age": 30,
            "active": true,
            "scores": [95, 87, 92]
        });

        let hv = from_json(&original);
        let restored = to_json(&hv);

        assert_eq!(original, restored);
    }

    #[test]
    fn test_json_encodes_directly() {
        let engine = MemoryEngine::new();
        let doc = json!({"id": 12345, "tags": ["a", "b"], "ratio": 0.5, "big": u64::MAX});
        let node = encode(&engine, &doc).unwrap();
        let decoded = decode(node.view()).unwrap();
        assert_eq!(to_json(&decoded), doc);
        assert_eq!(decoded, from_json(&doc));
    }

    #[test]
    fn test_parse_json_error() {
        assert!(matches!(parse_json("{oops"), Err(GblnError::Json(_))));
    }
}
