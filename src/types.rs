//! Core GBLN bridge types

use chrono::{DateTime, Utc};
use std::fmt;

/// Type tag of a node in a GBLN value tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ValueType {
    I8 = 0,
    I16 = 1,
    I32 = 2,
    I64 = 3,
    U8 = 4,
    U16 = 5,
    U32 = 6,
    U64 = 7,
    F32 = 8,
    F64 = 9,
    Str = 10,
    Bool = 11,
    Null = 12,
    Object = 13,
    Array = 14,
}

impl ValueType {
    pub const ALL: [ValueType; 15] = [
        ValueType::I8,
        ValueType::I16,
        ValueType::I32,
        ValueType::I64,
        ValueType::U8,
        ValueType::U16,
        ValueType::U32,
        ValueType::U64,
        ValueType::F32,
        ValueType::F64,
        ValueType::Str,
        ValueType::Bool,
        ValueType::Null,
        ValueType::Object,
        ValueType::Array,
    ];

    /// Decode a raw engine tag. Unknown tags yield `None`.
    pub fn from_tag(tag: i32) -> Option<ValueType> {
        Self::ALL.iter().copied().find(|t| *t as i32 == tag)
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Name as written in GBLN type hints
    pub fn name(self) -> &'static str {
        match self {
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::U8 => "u8",
            ValueType::U16 => "u16",
            ValueType::U32 => "u32",
            ValueType::U64 => "u64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::Str => "str",
            ValueType::Bool => "bool",
            ValueType::Null => "null",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }

    /// Inclusive range for integer types
    pub fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            ValueType::I8 => (i8::MIN as i128, i8::MAX as i128),
            ValueType::I16 => (i16::MIN as i128, i16::MAX as i128),
            ValueType::I32 => (i32::MIN as i128, i32::MAX as i128),
            ValueType::I64 => (i64::MIN as i128, i64::MAX as i128),
            ValueType::U8 => (0, u8::MAX as i128),
            ValueType::U16 => (0, u16::MAX as i128),
            ValueType::U32 => (0, u32::MAX as i128),
            ValueType::U64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    pub fn is_integer(self) -> bool {
        self.int_range().is_some()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared maximum length of a string node, in code points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringWidth(u16);

impl StringWidth {
    /// Widths used for automatic selection
    pub const LADDER: [u16; 10] = [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];
    pub const MAX: usize = 1024;

    /// Any width in `1..=1024`; explicit declarations need not sit on the ladder.
    pub fn new(width: usize) -> Option<StringWidth> {
        if (1..=Self::MAX).contains(&width) {
            Some(StringWidth(width as u16))
        } else {
            None
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StringWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Payload of a scalar node, exact width
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str { value: String, width: StringWidth },
    Bool(bool),
    Null,
}

impl ScalarValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ScalarValue::I8(_) => ValueType::I8,
            ScalarValue::I16(_) => ValueType::I16,
            ScalarValue::I32(_) => ValueType::I32,
            ScalarValue::I64(_) => ValueType::I64,
            ScalarValue::U8(_) => ValueType::U8,
            ScalarValue::U16(_) => ValueType::U16,
            ScalarValue::U32(_) => ValueType::U32,
            ScalarValue::U64(_) => ValueType::U64,
            ScalarValue::F32(_) => ValueType::F32,
            ScalarValue::F64(_) => ValueType::F64,
            ScalarValue::Str { .. } => ValueType::Str,
            ScalarValue::Bool(_) => ValueType::Bool,
            ScalarValue::Null => ValueType::Null,
        }
    }

    /// Build an integer scalar of the given width, if the value fits
    pub fn int(value: i128, ty: ValueType) -> Option<ScalarValue> {
        let scalar = match ty {
            ValueType::I8 => ScalarValue::I8(i8::try_from(value).ok()?),
            ValueType::I16 => ScalarValue::I16(i16::try_from(value).ok()?),
            ValueType::I32 => ScalarValue::I32(i32::try_from(value).ok()?),
            ValueType::I64 => ScalarValue::I64(i64::try_from(value).ok()?),
            ValueType::U8 => ScalarValue::U8(u8::try_from(value).ok()?),
            ValueType::U16 => ScalarValue::U16(u16::try_from(value).ok()?),
            ValueType::U32 => ScalarValue::U32(u32::try_from(value).ok()?),
            ValueType::U64 => ScalarValue::U64(u64::try_from(value).ok()?),
            _ => return None,
        };
        Some(scalar)
    }
}

/// Host-side dynamic value
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Single precision float, kept apart so it round-trips as `f32`
    Float32(f32),
    Float(f64),
    Str(String),
    /// Binary data, not representable in GBLN
    Bytes(Vec<u8>),
    /// Timestamp, not representable in GBLN
    Time(DateTime<Utc>),
    List(Vec<HostValue>),
    /// Ordered entries; a source may carry duplicate keys
    Map(Vec<HostEntry>),
}

/// Map entry (key-value pair)
#[derive(Debug, Clone, PartialEq)]
pub struct HostEntry {
    pub key: String,
    pub value: HostValue,
}

impl HostEntry {
    pub fn new(key: impl Into<String>, value: HostValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

// ============================================================
// Builder functions
// ============================================================

impl HostValue {
    pub fn null() -> Self {
        HostValue::Null
    }

    pub fn bool(v: bool) -> Self {
        HostValue::Bool(v)
    }

    pub fn int(v: i64) -> Self {
        HostValue::Int(v)
    }

    pub fn uint(v: u64) -> Self {
        HostValue::UInt(v)
    }

    pub fn float(v: f64) -> Self {
        HostValue::Float(v)
    }

    pub fn float32(v: f32) -> Self {
        HostValue::Float32(v)
    }

    pub fn str(v: impl Into<String>) -> Self {
        HostValue::Str(v.into())
    }

    pub fn list(items: Vec<HostValue>) -> Self {
        HostValue::List(items)
    }

    pub fn map(entries: Vec<HostEntry>) -> Self {
        HostValue::Map(entries)
    }

    /// Host type name used in conversion errors
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::UInt(_) => "uint",
            HostValue::Float32(_) => "float32",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "string",
            HostValue::Bytes(_) => "bytes",
            HostValue::Time(_) => "time",
            HostValue::List(_) => "list",
            HostValue::Map(_) => "map",
        }
    }

    // ============================================================
    // Type checking
    // ============================================================

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, HostValue::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, HostValue::Map(_))
    }

    // ============================================================
    // Value extraction
    // ============================================================

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed view of any integer that fits `i64`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(v) => Some(*v),
            HostValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            HostValue::UInt(v) => Some(*v),
            HostValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Float(v) => Some(*v),
            HostValue::Float32(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[HostEntry]> {
        match self {
            HostValue::Map(v) => Some(v),
            _ => None,
        }
    }

    /// First value stored under `key` in a map
    pub fn get(&self, key: &str) -> Option<&HostValue> {
        match self {
            HostValue::Map(entries) => entries.iter().find(|e| e.key == key).map(|e| &e.value),
            _ => None,
        }
    }

    pub fn index(&self, idx: usize) -> Option<&HostValue> {
        match self {
            HostValue::List(items) => items.get(idx),
            _ => None,
        }
    }

    /// Keys of a map in entry order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            HostValue::Map(entries) => entries.iter().map(|e| e.key.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Helper to create a map entry
pub fn field(key: impl Into<String>, value: HostValue) -> HostEntry {
    HostEntry::new(key, value)
}
