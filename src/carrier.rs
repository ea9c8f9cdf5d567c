//! JSON text carrier for the in-memory engine
//!
//! Parsed text is read into a [`Doc`], which keeps object entries in source
//! order and keeps repeated keys so the engine's key policy can rule on them.
//!
//! A scalar whose exact type would not be re-selected from its bare JSON form
//! is written as a tagged wrapper, `{"$t": "u8", "v": 200}`. Strings carry
//! their declared width the same way (`{"$t": "s64", "v": "Alice"}`). An
//! object whose own keys are exactly `$t` and `v` is wrapped as
//! `{"$t": "object", "v": {..}}` so it does not read back as a scalar.

use crate::selector::*;
use crate::types::*;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;

pub(crate) const TYPE_KEY: &str = "$t";
pub(crate) const VALUE_KEY: &str = "v";

/// A parsed JSON document with duplicate keys preserved
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Doc {
    Null,
    Bool(bool),
    Number(Number),
    Str(String),
    Seq(Vec<Doc>),
    Map(Vec<(String, Doc)>),
}

impl<'de> Deserialize<'de> for Doc {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocVisitor;

        impl<'de> Visitor<'de> for DocVisitor {
            type Value = Doc;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON value")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Doc, E> {
                Ok(Doc::Null)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<Doc, E> {
                Ok(Doc::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Doc, E> {
                Ok(Doc::Number(value.into()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Doc, E> {
                Ok(Doc::Number(value.into()))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Doc, E> {
                Number::from_f64(value)
                    .map(Doc::Number)
                    .ok_or_else(|| E::custom(format!("non-finite number {value}")))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Doc, E> {
                Ok(Doc::Str(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<Doc, E> {
                Ok(Doc::Str(value))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Doc, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Doc::Seq(items))
            }

            fn visit_map<M>(self, mut map: M) -> Result<Doc, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, Doc>()? {
                    entries.push(entry);
                }
                Ok(Doc::Map(entries))
            }
        }

        deserializer.deserialize_any(DocVisitor)
    }
}

impl Doc {
    /// The `(tag, value)` pair if this is a tagged wrapper
    pub(crate) fn as_tagged(&self) -> Option<(&str, &Doc)> {
        let Doc::Map(entries) = self else {
            return None;
        };
        if entries.len() != 2 {
            return None;
        }
        let field = |name: &str| entries.iter().find(|(k, _)| k == name).map(|(_, v)| v);
        match (field(TYPE_KEY), field(VALUE_KEY)) {
            (Some(Doc::Str(tag)), Some(value)) => Some((tag.as_str(), value)),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Doc::Null => "null",
            Doc::Bool(_) => "bool",
            Doc::Number(_) => "number",
            Doc::Str(_) => "string",
            Doc::Seq(_) => "array",
            Doc::Map(_) => "object",
        }
    }
}

/// Type named by a wrapper tag: a `ValueType` name or an `s<width>` string width
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Tag {
    Type(ValueType),
    Str(StringWidth),
}

pub(crate) fn parse_tag(tag: &str) -> Option<Tag> {
    if let Some(width) = tag.strip_prefix('s').and_then(|n| n.parse::<usize>().ok()) {
        return StringWidth::new(width).map(Tag::Str);
    }
    ValueType::ALL
        .iter()
        .copied()
        .find(|ty| ty.name() == tag)
        .map(Tag::Type)
}

/// Scalar the engine would select for a bare JSON number or string
pub(crate) fn reselect(json: &JsonValue) -> Option<ScalarValue> {
    match json {
        JsonValue::Null => Some(ScalarValue::Null),
        JsonValue::Bool(b) => Some(ScalarValue::Bool(*b)),
        JsonValue::Number(n) => number_scalar(n),
        JsonValue::String(s) => select_string_width(s)
            .ok()
            .map(|width| ScalarValue::Str { value: s.clone(), width }),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

pub(crate) fn number_scalar(n: &Number) -> Option<ScalarValue> {
    if let Some(i) = n.as_i64() {
        ScalarValue::int(i as i128, select_int_width(i))
    } else if let Some(u) = n.as_u64() {
        ScalarValue::int(u as i128, select_uint_width(u))
    } else {
        n.as_f64().map(ScalarValue::F64)
    }
}

/// Wrap `bare` with the scalar's exact type
pub(crate) fn tagged(scalar: &ScalarValue, bare: JsonValue) -> JsonValue {
    let tag = match scalar {
        ScalarValue::Str { width, .. } => width.to_string(),
        other => other.value_type().name().to_string(),
    };
    wrap(tag, bare)
}

pub(crate) fn wrap(tag: String, value: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), JsonValue::String(tag));
    map.insert(VALUE_KEY.to_string(), value);
    JsonValue::Object(map)
}

/// True if an object with these keys would read back as a wrapper
pub(crate) fn looks_tagged<'a>(mut keys: impl ExactSizeIterator<Item = &'a String>) -> bool {
    keys.len() == 2 && keys.all(|k| k == TYPE_KEY || k == VALUE_KEY)
}
