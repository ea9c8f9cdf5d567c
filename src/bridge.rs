//! Host value <-> GBLN tree conversion
//!
//! `encode` walks any [`HostView`] and builds a minimal-width tree bottom-up,
//! consume-attaching each child to its container. A failure anywhere drops the
//! partially built nodes, which releases them. `decode` walks a tree read-only
//! and never releases what it visits.

use crate::engine::*;
use crate::error::*;
use crate::node::*;
use crate::selector::*;
use crate::types::*;
use log::trace;

/// Shape of a host value as seen by the bridge
pub enum HostKind<'a, H: 'a> {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float64(f64),
    Str(&'a str),
    Map(Box<dyn Iterator<Item = (&'a str, &'a H)> + 'a>),
    Seq(Box<dyn Iterator<Item = &'a H> + 'a>),
    /// A host type GBLN cannot represent, by name
    Unsupported(&'static str),
}

impl<H> HostKind<'_, H> {
    pub fn name(&self) -> &'static str {
        match self {
            HostKind::Null => "null",
            HostKind::Bool(_) => "bool",
            HostKind::Int(_) => "int",
            HostKind::UInt(_) => "uint",
            HostKind::Float32(_) => "float32",
            HostKind::Float64(_) => "float",
            HostKind::Str(_) => "string",
            HostKind::Map(_) => "map",
            HostKind::Seq(_) => "list",
            HostKind::Unsupported(name) => *name,
        }
    }
}

/// Container abstraction the recursion is generic over
pub trait HostView: Sized {
    fn view(&self) -> HostKind<'_, Self>;
}

impl HostView for HostValue {
    fn view(&self) -> HostKind<'_, Self> {
        match self {
            HostValue::Null => HostKind::Null,
            HostValue::Bool(b) => HostKind::Bool(*b),
            HostValue::Int(i) => HostKind::Int(*i),
            HostValue::UInt(u) => HostKind::UInt(*u),
            HostValue::Float32(f) => HostKind::Float32(*f),
            HostValue::Float(f) => HostKind::Float64(*f),
            HostValue::Str(s) => HostKind::Str(s),
            HostValue::List(items) => HostKind::Seq(Box::new(items.iter())),
            HostValue::Map(entries) => {
                HostKind::Map(Box::new(entries.iter().map(|e| (e.key.as_str(), &e.value))))
            }
            HostValue::Bytes(_) | HostValue::Time(_) => HostKind::Unsupported(self.type_name()),
        }
    }
}

// ============================================================
// Encode
// ============================================================

/// Encode a host value into an owned tree using minimal widths
pub fn encode<'e, E, H>(engine: &'e E, value: &H) -> Result<OwnedNode<'e, E>>
where
    E: Engine + ?Sized,
    H: HostView,
{
    match value.view() {
        HostKind::Null => OwnedNode::new_scalar(engine, ScalarValue::Null),
        HostKind::Bool(b) => OwnedNode::new_scalar(engine, ScalarValue::Bool(b)),
        HostKind::Int(i) => {
            let scalar = check_int_fits(i as i128, select_int_width(i))?;
            OwnedNode::new_scalar(engine, scalar)
        }
        HostKind::UInt(u) => {
            let scalar = check_int_fits(u as i128, select_uint_width(u))?;
            OwnedNode::new_scalar(engine, scalar)
        }
        HostKind::Float32(f) => OwnedNode::new_scalar(engine, ScalarValue::F32(f)),
        HostKind::Float64(f) => OwnedNode::new_scalar(engine, ScalarValue::F64(f)),
        HostKind::Str(s) => {
            let width = select_string_width(s)?;
            OwnedNode::new_scalar(engine, ScalarValue::Str { value: s.to_string(), width })
        }
        HostKind::Map(entries) => {
            let mut object = OwnedNode::new_object(engine)?;
            for (key, child) in entries {
                let node = encode(engine, child)?;
                object.insert(key, node)?;
            }
            trace!("encoded object {}", object.raw());
            Ok(object)
        }
        HostKind::Seq(items) => {
            let mut array = OwnedNode::new_array(engine)?;
            for child in items {
                let node = encode(engine, child)?;
                array.push(node)?;
            }
            trace!("encoded array {}", array.raw());
            Ok(array)
        }
        HostKind::Unsupported(name) => Err(GblnError::conversion(name, "GBLN")),
    }
}

/// Encode a value under an explicitly declared type instead of auto-selecting.
///
/// Integers are range-checked against `declared`; `F32` rejects values that
/// would lose precision. Containers and strings fall back to `encode`.
pub fn encode_as<'e, E, H>(engine: &'e E, value: &H, declared: ValueType) -> Result<OwnedNode<'e, E>>
where
    E: Engine + ?Sized,
    H: HostView,
{
    let kind = value.view();
    let mismatch = || GblnError::conversion(kind.name(), declared.name());
    let scalar = match (declared, &kind) {
        (ty, HostKind::Int(i)) if ty.is_integer() => check_int_fits(*i as i128, ty)?,
        (ty, HostKind::UInt(u)) if ty.is_integer() => check_int_fits(*u as i128, ty)?,
        (ValueType::F32, HostKind::Float32(f)) => ScalarValue::F32(*f),
        (ValueType::F32, HostKind::Float64(f)) => ScalarValue::F32(narrow_to_f32(*f)?),
        (ValueType::F32, HostKind::Int(_) | HostKind::UInt(_)) => {
            ScalarValue::F32(narrow_to_f32(exact_f64(&kind)?)?)
        }
        (ValueType::F64, HostKind::Float32(f)) => ScalarValue::F64(f64::from(*f)),
        (ValueType::F64, HostKind::Float64(f)) => ScalarValue::F64(*f),
        (ValueType::F64, HostKind::Int(_) | HostKind::UInt(_)) => ScalarValue::F64(exact_f64(&kind)?),
        (ValueType::Bool, HostKind::Bool(b)) => ScalarValue::Bool(*b),
        (ValueType::Null, HostKind::Null) => ScalarValue::Null,
        (ValueType::Str, HostKind::Str(_))
        | (ValueType::Object, HostKind::Map(_))
        | (ValueType::Array, HostKind::Seq(_)) => return encode(engine, value),
        _ => return Err(mismatch()),
    };
    OwnedNode::new_scalar(engine, scalar)
}

/// Encode a string under an explicit maximum width
pub fn encode_string_as<'e, E>(engine: &'e E, value: &str, max_len: usize) -> Result<OwnedNode<'e, E>>
where
    E: Engine + ?Sized,
{
    let width = StringWidth::new(max_len)
        .ok_or_else(|| GblnError::conversion(format!("s{max_len}"), "GBLN string width"))?;
    check_string_fits(value, width)?;
    OwnedNode::new_scalar(engine, ScalarValue::Str { value: value.to_string(), width })
}

fn exact_f64<H>(kind: &HostKind<'_, H>) -> Result<f64> {
    let (as_float, exact) = match kind {
        HostKind::Int(i) => (*i as f64, (*i as f64) as i64 == *i && *i != i64::MAX),
        HostKind::UInt(u) => (*u as f64, (*u as f64) as u64 == *u && *u != u64::MAX),
        _ => return Err(GblnError::conversion(kind.name(), "f64")),
    };
    if exact {
        Ok(as_float)
    } else {
        Err(GblnError::FloatPrecisionLoss {
            value: as_float,
            type_name: "f64",
        })
    }
}

// ============================================================
// Decode
// ============================================================

/// Decode a tree into a host value without modifying or releasing it
pub fn decode<E: Engine + ?Sized>(node: NodeRef<'_, E>) -> Result<HostValue> {
    let ty = node.value_type()?;
    match ty {
        ValueType::Object => {
            let keys = node.keys()?;
            let mut entries = Vec::with_capacity(keys.len());
            for key in keys {
                let child = node
                    .get(&key)
                    .ok_or_else(|| GblnError::null_pointer(format!("object_get({key:?})")))?;
                entries.push(HostEntry::new(key, decode(child)?));
            }
            Ok(HostValue::Map(entries))
        }
        ValueType::Array => {
            let len = node.len()?;
            let mut items = Vec::with_capacity(len);
            for index in 0..len {
                let child = node
                    .index(index)
                    .ok_or_else(|| GblnError::null_pointer(format!("array_get({index})")))?;
                items.push(decode(child)?);
            }
            Ok(HostValue::List(items))
        }
        scalar_type => node.scalar(scalar_type).and_then(|s| scalar_to_host(s, scalar_type)),
    }
}

/// Widen an exact-width scalar into the host model.
///
/// Unsigned widths surface as `UInt(u64)`, which holds the full range of each.
fn scalar_to_host(scalar: ScalarValue, expected: ValueType) -> Result<HostValue> {
    let host = match scalar {
        ScalarValue::I8(v) => HostValue::Int(v.into()),
        ScalarValue::I16(v) => HostValue::Int(v.into()),
        ScalarValue::I32(v) => HostValue::Int(v.into()),
        ScalarValue::I64(v) => HostValue::Int(v),
        ScalarValue::U8(v) => HostValue::UInt(v.into()),
        ScalarValue::U16(v) => HostValue::UInt(v.into()),
        ScalarValue::U32(v) => HostValue::UInt(v.into()),
        ScalarValue::U64(v) => HostValue::UInt(v),
        ScalarValue::F32(v) => HostValue::Float32(v),
        ScalarValue::F64(v) => HostValue::Float(v),
        ScalarValue::Str { value, .. } => HostValue::Str(value),
        ScalarValue::Bool(b) => HostValue::Bool(b),
        ScalarValue::Null => HostValue::Null,
    };
    if scalar_matches(&host, expected) {
        Ok(host)
    } else {
        Err(GblnError::type_mismatch(expected.name(), host.type_name()))
    }
}

fn scalar_matches(host: &HostValue, expected: ValueType) -> bool {
    use ValueType::*;
    matches!(
        (host, expected),
        (HostValue::Int(_), I8 | I16 | I32 | I64)
            | (HostValue::UInt(_), U8 | U16 | U32 | U64)
            | (HostValue::Float32(_), F32)
            | (HostValue::Float(_), F64)
            | (HostValue::Str(_), Str)
            | (HostValue::Bool(_), Bool)
            | (HostValue::Null, Null)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngine;
    use chrono::Utc;

    fn roundtrip(engine: &MemoryEngine, value: &HostValue) -> HostValue {
        let node = encode(engine, value).unwrap();
        decode(node.view()).unwrap()
    }

    #[test]
    fn test_scalars_select_minimal_width() {
        let engine = MemoryEngine::new();
        let cases = [
            (HostValue::int(127), ValueType::I8),
            (HostValue::int(128), ValueType::I16),
            (HostValue::int(-129), ValueType::I16),
            (HostValue::int(i32::MAX as i64), ValueType::I32),
            (HostValue::int(i64::MAX), ValueType::I64),
            (HostValue::uint(200), ValueType::U8),
            (HostValue::uint(70_000), ValueType::U32),
            (HostValue::float32(1.5), ValueType::F32),
            (HostValue::float(1.5), ValueType::F64),
            (HostValue::bool(false), ValueType::Bool),
            (HostValue::null(), ValueType::Null),
            (HostValue::str(""), ValueType::Str),
        ];
        for (value, expected) in cases {
            let node = encode(&engine, &value).unwrap();
            assert_eq!(node.value_type().unwrap(), expected, "{value:?}");
            assert_eq!(decode(node.view()).unwrap(), value);
        }
        assert_eq!(engine.live_nodes(), 0);
    }

    #[test]
    fn test_string_width_recorded() {
        let engine = MemoryEngine::new();
        let node = encode(&engine, &HostValue::str("abc")).unwrap();
        let scalar = node.view().scalar(ValueType::Str).unwrap();
        assert!(matches!(scalar, ScalarValue::Str { width, .. } if width.get() == 4));
    }

    #[test]
    fn test_zero_and_empty_are_not_failures() {
        let engine = MemoryEngine::new();
        for value in [HostValue::int(0), HostValue::str(""), HostValue::bool(false), HostValue::float(0.0)] {
            assert_eq!(roundtrip(&engine, &value), value);
        }
    }

    #[test]
    fn test_unsupported_host_types() {
        let engine = MemoryEngine::new();
        let err = encode(&engine, &HostValue::Bytes(vec![1, 2])).unwrap_err();
        assert!(matches!(err, GblnError::Conversion { ref from, ref to } if from == "bytes" && to == "GBLN"));
        let err = encode(&engine, &HostValue::Time(Utc::now())).unwrap_err();
        assert!(matches!(err, GblnError::Conversion { ref from, .. } if from == "time"));
    }

    #[test]
    fn test_failure_mid_tree_releases_everything() {
        let engine = MemoryEngine::new();
        let value = HostValue::map(vec![
            field("a", HostValue::list(vec![HostValue::int(1), HostValue::str("x")])),
            field("b", HostValue::map(vec![field("c", HostValue::Bytes(vec![0]))])),
        ]);
        assert!(encode(&engine, &value).is_err());
        assert_eq!(engine.live_nodes(), 0);
    }

    #[test]
    fn test_duplicate_key_in_source() {
        let engine = MemoryEngine::new();
        let value = HostValue::map(vec![field("k", HostValue::int(1)), field("k", HostValue::int(2))]);
        let err = encode(&engine, &value).unwrap_err();
        assert!(matches!(err, GblnError::DuplicateKey { ref key } if key == "k"));
        assert_eq!(engine.live_nodes(), 0);
    }

    #[test]
    fn test_encode_as_declared_width() {
        let engine = MemoryEngine::new();
        let err = encode_as(&engine, &HostValue::int(999), ValueType::I8).unwrap_err();
        assert!(matches!(err, GblnError::IntegerOutOfRange { value: 999, type_name: "i8", .. }));

        let node = encode_as(&engine, &HostValue::int(5), ValueType::I64).unwrap();
        assert_eq!(node.value_type().unwrap(), ValueType::I64);

        let node = encode_as(&engine, &HostValue::int(5), ValueType::U16).unwrap();
        assert_eq!(decode(node.view()).unwrap(), HostValue::uint(5));

        assert!(encode_as(&engine, &HostValue::int(-5), ValueType::U8).is_err());
    }

    #[test]
    fn test_encode_as_float_precision() {
        let engine = MemoryEngine::new();
        let err = encode_as(&engine, &HostValue::float(0.1), ValueType::F32).unwrap_err();
        assert!(matches!(err, GblnError::FloatPrecisionLoss { .. }));

        let node = encode_as(&engine, &HostValue::float(0.25), ValueType::F32).unwrap();
        assert_eq!(decode(node.view()).unwrap(), HostValue::float32(0.25));

        let node = encode_as(&engine, &HostValue::int(3), ValueType::F64).unwrap();
        assert_eq!(decode(node.view()).unwrap(), HostValue::float(3.0));

        let err = encode_as(&engine, &HostValue::int((1 << 53) + 1), ValueType::F64).unwrap_err();
        assert!(matches!(err, GblnError::FloatPrecisionLoss { .. }));
    }

    #[test]
    fn test_encode_as_type_mismatch() {
        let engine = MemoryEngine::new();
        let err = encode_as(&engine, &HostValue::str("x"), ValueType::I32).unwrap_err();
        assert!(matches!(err, GblnError::Conversion { ref from, ref to } if from == "string" && to == "i32"));
        let list = HostValue::list(vec![HostValue::int(1)]);
        let node = encode_as(&engine, &list, ValueType::Array).unwrap();
        assert_eq!(decode(node.view()).unwrap(), list);
    }

    #[test]
    fn test_encode_string_as() {
        let engine = MemoryEngine::new();
        let node = encode_string_as(&engine, "Alice", 32).unwrap();
        let scalar = node.view().scalar(ValueType::Str).unwrap();
        assert!(matches!(scalar, ScalarValue::Str { width, .. } if width.get() == 32));
        assert!(matches!(
            encode_string_as(&engine, "Alice", 4),
            Err(GblnError::StringTooLong { length: 5, max: 4, .. })
        ));
        assert!(encode_string_as(&engine, "a", 2048).is_err());
    }

    #[test]
    fn test_decode_does_not_release() {
        let engine = MemoryEngine::new();
        let node = encode(&engine, &HostValue::list(vec![HostValue::int(1), HostValue::int(2)])).unwrap();
        let before = engine.live_nodes();
        decode(node.view()).unwrap();
        decode(node.view()).unwrap();
        assert_eq!(engine.live_nodes(), before);
    }
}
